pub mod chunks;
pub mod results;
pub mod sessions;
pub mod users;
