pub use super::blogs::Entity as Blogs;
pub use super::follows::Entity as Follows;
pub use super::memories::Entity as Memories;
pub use super::users::Entity as Users;
