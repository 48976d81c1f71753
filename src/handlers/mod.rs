pub mod admin;
pub mod auth;
pub mod department;
pub mod report;

pub use auth::*;
