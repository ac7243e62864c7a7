use crate::api::models::{AdminUser, Branch, FacultyOverview, HeadAdminStats, Payment, PaymentStats};
use crate::api::{ApiClient, ApiResult};
use crate::session::Credentials;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DashboardKind {
    HeadAdmin,
    Faculty,
    Finance,
}

impl DashboardKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "headAdmin" => Some(DashboardKind::HeadAdmin),
            "faculty" => Some(DashboardKind::Faculty),
            "finance" => Some(DashboardKind::Finance),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DashboardKind::HeadAdmin => "headAdmin",
            DashboardKind::Faculty => "faculty",
            DashboardKind::Finance => "finance",
        }
    }
}

/// One independently fetched part of a dashboard.
pub fn slice<T: Serialize>(name: &str, res: &ApiResult<T>) -> Value {
    match res {
        Ok(data) => json!({ "ok": true, "data": data }),
        Err(e) => {
            tracing::warn!(slice = name, code = e.code(), error = %e, "dashboard slice failed");
            json!({ "ok": false, "error": e.to_json() })
        }
    }
}

/// Issues generation tickets per dashboard so a slow, older refresh cannot
/// overwrite the result of a newer one.
///
/// The request loop is serial, so `begin` and `commit` run inside one call
/// and every commit from it is current. The stale path only fires when a
/// caller commits out of order. The generation still goes back in each reply
/// so the shell can discard responses that arrive after a newer one.
#[derive(Debug, Default)]
pub struct RefreshTracker {
    latest: HashMap<DashboardKind, u64>,
    committed: HashMap<DashboardKind, (u64, Value)>,
}

impl RefreshTracker {
    pub fn begin(&mut self, kind: DashboardKind) -> u64 {
        let next = self.latest.get(&kind).copied().unwrap_or(0) + 1;
        self.latest.insert(kind, next);
        next
    }

    pub fn is_current(&self, kind: DashboardKind, generation: u64) -> bool {
        self.latest.get(&kind).copied() == Some(generation)
    }

    /// Returns false, and keeps the previous snapshot, for a stale generation.
    pub fn commit(&mut self, kind: DashboardKind, generation: u64, snapshot: Value) -> bool {
        if !self.is_current(kind, generation) {
            tracing::debug!(dashboard = kind.as_str(), generation, "dropping stale refresh");
            return false;
        }
        self.committed.insert(kind, (generation, snapshot));
        true
    }

    pub fn snapshot(&self, kind: DashboardKind) -> Option<(u64, &Value)> {
        self.committed.get(&kind).map(|(g, v)| (*g, v))
    }
}

pub struct HeadAdminView {
    pub stats: ApiResult<HeadAdminStats>,
    pub users: ApiResult<Vec<AdminUser>>,
}

pub struct FacultyView {
    pub overview: ApiResult<FacultyOverview>,
    pub branches: ApiResult<Vec<Branch>>,
}

pub struct FinanceView {
    pub payments: ApiResult<Vec<Payment>>,
    pub stats: ApiResult<PaymentStats>,
}

/// Run two independent reads side by side and wait for both.
fn both<A, B, FA, FB>(fa: FA, fb: FB) -> (A, B)
where
    A: Send,
    B: Send,
    FA: FnOnce() -> A + Send,
    FB: FnOnce() -> B + Send,
{
    std::thread::scope(|s| {
        let hb = s.spawn(fb);
        let a = fa();
        let b = match hb.join() {
            Ok(b) => b,
            Err(panic) => std::panic::resume_unwind(panic),
        };
        (a, b)
    })
}

pub fn load_head_admin(api: &ApiClient, creds: &Credentials) -> HeadAdminView {
    let (stats, users) = both(|| api.head_admin_stats(creds), || api.admin_users(creds));
    HeadAdminView { stats, users }
}

pub fn load_faculty(api: &ApiClient, creds: &Credentials) -> FacultyView {
    let (overview, branches) = both(|| api.faculty_overview(creds), || api.branches(creds));
    FacultyView { overview, branches }
}

pub fn load_finance(api: &ApiClient, creds: &Credentials) -> FinanceView {
    let (payments, stats) = both(|| api.finance_payments(creds), || api.finance_stats(creds));
    FinanceView { payments, stats }
}

impl HeadAdminView {
    pub fn to_json(&self) -> Value {
        json!({
            "stats": slice("headAdmin.stats", &self.stats),
            "users": slice("headAdmin.users", &self.users),
        })
    }
}

impl FacultyView {
    pub fn to_json(&self) -> Value {
        json!({
            "overview": slice("faculty.overview", &self.overview),
            "branches": slice("faculty.branches", &self.branches),
        })
    }
}

impl FinanceView {
    pub fn to_json(&self) -> Value {
        json!({
            "payments": slice("finance.payments", &self.payments),
            "stats": slice("finance.stats", &self.stats),
        })
    }
}
