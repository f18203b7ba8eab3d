use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    pub photo: String,

    pub phone: Option<String>,

    pub passion: Option<String>,

    pub bio: Option<String>,

    /// One of "user", "guide", "admin".
    pub role: String,

    /// Argon2id password hash. Never selectable through the query pipeline.
    pub password_hash: String,

    /// RFC 3339. Tokens issued before this instant are stale.
    pub password_changed_at: Option<String>,

    /// SHA-256 hex digest of the emailed reset token.
    pub password_reset_token: Option<String>,

    pub password_reset_expires: Option<String>,

    /// Soft-delete flag; inactive users vanish from default queries.
    pub active: bool,

    pub verified: bool,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::blogs::Entity")]
    Blogs,
    #[sea_orm(has_many = "super::memories::Entity")]
    Memories,
}

impl Related<super::blogs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Blogs.def()
    }
}

impl Related<super::memories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
