pub mod catalog;
pub mod core;
pub mod dashboard;
pub mod examination;
pub mod finance;
pub mod payments;
pub mod preferences;
pub mod session;
