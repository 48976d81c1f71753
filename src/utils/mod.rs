pub mod cookie;
pub mod jwt;
pub mod password;

pub use jwt::encode_access_token;
pub use password::{hash_password, verify_password};
