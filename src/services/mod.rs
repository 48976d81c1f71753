pub mod access;
pub mod admin;
pub mod auth;
pub mod bootstrap_admin;
pub mod ledger;
pub mod lifecycle;
pub mod projection;
pub mod report;
