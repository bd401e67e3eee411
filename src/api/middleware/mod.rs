pub mod session;

pub use session::SessionAuth;
