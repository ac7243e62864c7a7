#[path = "../src/wizard.rs"]
mod wizard;

use wizard::{PaymentOrder, PaymentWizard, WizardOutcome, WizardStep};

fn order() -> PaymentOrder {
    PaymentOrder {
        order_id: "ORD-77".to_string(),
        student_name: "Meera Iyer".to_string(),
        regd_no: None,
        amount: 2500.0,
        purpose: "Hostel fee".to_string(),
    }
}

fn apply(w: &mut PaymentWizard, action: &str) -> bool {
    match action {
        "proceed" => w.proceed().is_ok(),
        "continue" => w.continue_to_transaction().is_ok(),
        "back" => w.back().is_ok(),
        "cancel" => w.cancel().is_ok(),
        other => panic!("unknown action {other}"),
    }
}

const ACTIONS: [&str; 4] = ["proceed", "continue", "back", "cancel"];

fn wizard_at(step: WizardStep) -> PaymentWizard {
    let mut w = PaymentWizard::new(order());
    if step != WizardStep::Details {
        w.proceed().expect("proceed");
    }
    if step == WizardStep::Transaction {
        w.continue_to_transaction().expect("continue");
    }
    w
}

#[test]
fn only_listed_edges_are_accepted() {
    let allowed = [
        (WizardStep::Details, "proceed", Some(WizardStep::Qr)),
        (WizardStep::Details, "cancel", None),
        (WizardStep::Qr, "continue", Some(WizardStep::Transaction)),
        (WizardStep::Qr, "back", Some(WizardStep::Details)),
        (WizardStep::Qr, "cancel", None),
    ];
    for from in [WizardStep::Details, WizardStep::Qr, WizardStep::Transaction] {
        for name in ACTIONS {
            let mut w = wizard_at(from);
            let accepted = apply(&mut w, name);
            let expected = allowed.iter().find(|(f, a, _)| *f == from && *a == name);
            match expected {
                Some((_, _, Some(to))) => {
                    assert!(accepted, "{name} from {from:?} should be accepted");
                    assert_eq!(w.step(), *to);
                }
                Some((_, _, None)) => {
                    assert!(accepted, "{name} from {from:?} should be accepted");
                    assert!(matches!(w.outcome(), Some(WizardOutcome::Cancelled { .. })));
                }
                None => {
                    assert!(!accepted, "{name} from {from:?} should be refused");
                    assert_eq!(w.step(), from);
                    assert!(w.outcome().is_none());
                }
            }
        }
    }
}

#[test]
fn blank_transaction_ids_never_pass_the_guard() {
    let w = wizard_at(WizardStep::Transaction);
    for raw in ["", " ", "\t", "\n  "] {
        assert!(w.begin_submit(raw).is_err(), "{raw:?} passed the guard");
    }
    assert_eq!(w.begin_submit("  UTR 42 ").as_deref(), Ok("UTR 42"));
}

#[test]
fn rejection_keeps_transaction_entry_open() {
    let mut w = wizard_at(WizardStep::Transaction);
    w.record_rejection("Transaction ID already submitted");
    assert_eq!(w.step(), WizardStep::Transaction);
    assert!(!w.is_finished());
    assert_eq!(w.last_error(), Some("Transaction ID already submitted"));

    let txn = w.begin_submit("UTR43").expect("retry allowed");
    w.record_acceptance(txn, None, None);
    assert!(w.is_finished());
    assert!(w.last_error().is_none());
    assert!(w.begin_submit("UTR44").is_err());
}
