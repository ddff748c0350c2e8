pub mod auth;
pub mod barcode;

pub use auth::{create_token, hash_password, verify_password, verify_token, Claims};
