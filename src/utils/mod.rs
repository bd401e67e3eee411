pub mod ip;
pub mod password;

pub use ip::{extract_client_ip, is_private_or_local, parse_ip};
pub use password::{hash_password, verify_password};
