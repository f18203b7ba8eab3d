pub mod prelude;

pub mod blogs;
pub mod follows;
pub mod memories;
pub mod users;
