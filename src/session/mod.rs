pub mod manager;

pub use manager::{NewUser, SessionManager, SessionStatusView};
