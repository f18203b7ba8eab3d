pub mod blog;
pub mod memory;
pub mod user;
