use crate::api::models::Payment;
use anyhow::Context;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const PAYMENT_COLUMNS: [&str; 9] = [
    "Order ID",
    "Student Name",
    "Regd No",
    "Amount",
    "Status",
    "Transaction ID",
    "Method",
    "Created At",
    "Verified At",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" | "excel" => Some(ExportFormat::Xlsx),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

fn opt_text(v: &Option<String>) -> Cell {
    Cell::Text(v.clone().unwrap_or_default())
}

pub fn payment_rows(payments: &[Payment]) -> Vec<Vec<Cell>> {
    payments
        .iter()
        .map(|p| {
            vec![
                Cell::Text(p.order_id.clone()),
                Cell::Text(p.student_name.clone()),
                opt_text(&p.regd_no),
                Cell::Number(p.amount),
                Cell::Text(p.status.as_str().to_string()),
                opt_text(&p.transaction_id),
                opt_text(&p.payment_method),
                opt_text(&p.created_at),
                opt_text(&p.verified_at),
            ]
        })
        .collect()
}

pub fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn to_csv(header: &[&str], rows: &[Vec<Cell>]) -> String {
    let mut csv = header
        .iter()
        .map(|h| csv_quote(h))
        .collect::<Vec<_>>()
        .join(",");
    csv.push('\n');
    for row in rows {
        let line = row
            .iter()
            .map(|c| match c {
                Cell::Text(s) => csv_quote(s),
                Cell::Number(n) => n.to_string(),
            })
            .collect::<Vec<_>>()
            .join(",");
        csv.push_str(&line);
        csv.push('\n');
    }
    csv
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `0 -> A`, `25 -> Z`, `26 -> AA`.
fn column_name(mut idx: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (idx % 26) as u8);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

fn sheet_xml(header: &[&str], rows: &[Vec<Cell>]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData>",
    );
    let header_row: Vec<Cell> = header.iter().map(|h| Cell::Text(h.to_string())).collect();
    for (r, row) in std::iter::once(&header_row).chain(rows.iter()).enumerate() {
        let row_no = r + 1;
        xml.push_str(&format!("<row r=\"{row_no}\">"));
        for (c, cell) in row.iter().enumerate() {
            let cell_ref = format!("{}{}", column_name(c), row_no);
            match cell {
                Cell::Text(s) => xml.push_str(&format!(
                    "<c r=\"{cell_ref}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                    xml_escape(s)
                )),
                Cell::Number(n) if n.is_finite() => {
                    xml.push_str(&format!("<c r=\"{cell_ref}\"><v>{n}</v></c>"))
                }
                Cell::Number(_) => {}
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
         <sheets><sheet name=\"{}\" sheetId=\"1\" r:id=\"rId1\"/></sheets></workbook>",
        xml_escape(sheet_name)
    )
}

fn ensure_parent(out_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    Ok(())
}

/// Single-sheet workbook with inline strings.
pub fn write_xlsx(
    out_path: &Path,
    sheet_name: &str,
    header: &[&str],
    rows: &[Vec<Cell>],
) -> anyhow::Result<()> {
    ensure_parent(out_path)?;
    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let entries: [(&str, String); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", ROOT_RELS_XML.to_string()),
        ("xl/workbook.xml", workbook_xml(sheet_name)),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(header, rows)),
    ];
    for (name, body) in entries.iter() {
        zip.start_file(*name, opts)
            .with_context(|| format!("failed to start {name} entry"))?;
        zip.write_all(body.as_bytes())
            .with_context(|| format!("failed to write {name} entry"))?;
    }
    zip.finish().context("failed to finalize workbook")?;
    Ok(())
}

pub fn write_bytes(out_path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    ensure_parent(out_path)?;
    std::fs::write(out_path, bytes)
        .with_context(|| format!("failed to write {}", out_path.to_string_lossy()))
}

pub fn export_payments(
    out_path: &Path,
    format: ExportFormat,
    payments: &[Payment],
) -> anyhow::Result<usize> {
    let rows = payment_rows(payments);
    match format {
        ExportFormat::Csv => write_bytes(out_path, to_csv(&PAYMENT_COLUMNS, &rows).as_bytes())?,
        ExportFormat::Xlsx => write_xlsx(out_path, "Payments", &PAYMENT_COLUMNS, &rows)?,
    }
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_roll_over() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(8), "I");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[test]
    fn csv_quotes_only_when_needed() {
        let rows = vec![vec![
            Cell::Text("Rao, Asha".to_string()),
            Cell::Number(1500.0),
            Cell::Text("say \"hi\"".to_string()),
        ]];
        let csv = to_csv(&["Name", "Amount", "Note"], &rows);
        assert_eq!(csv, "Name,Amount,Note\n\"Rao, Asha\",1500,\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn sheet_xml_escapes_and_types_cells() {
        let xml = sheet_xml(
            &["Name", "Amount"],
            &[vec![Cell::Text("A & B".to_string()), Cell::Number(12.5)]],
        );
        assert!(xml.contains("<c r=\"A1\" t=\"inlineStr\"><is><t xml:space=\"preserve\">Name</t>"));
        assert!(xml.contains("A &amp; B"));
        assert!(xml.contains("<c r=\"B2\"><v>12.5</v></c>"));
    }
}
