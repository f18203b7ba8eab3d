use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::db::query::{ListParams, ResourceQuerySpec, apply_features};
use crate::entities::{memories, prelude::*, users};

pub const MEMORY_QUERY_SPEC: ResourceQuerySpec = ResourceQuerySpec {
    filterable: &["author_id", "views", "created_at"],
    sortable: &["created_at", "views"],
    selectable: &["id", "content", "author_id", "views", "created_at"],
    default_sort: "-created_at",
};

pub struct MemoryRepository {
    conn: DatabaseConnection,
}

impl MemoryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, content: String, author_id: i32) -> Result<memories::Model> {
        let active = memories::ActiveModel {
            content: Set(content),
            author_id: Set(author_id),
            views: Set(0),
            created_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert memory")?;
        Ok(model)
    }

    pub async fn get(&self, id: i32) -> Result<Option<memories::Model>> {
        let memory = Memories::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query memory by id")?;
        Ok(memory)
    }

    pub async fn get_with_author(
        &self,
        id: i32,
    ) -> Result<Option<(memories::Model, Option<users::Model>)>> {
        let result = Memories::find_by_id(id)
            .find_also_related(Users)
            .one(&self.conn)
            .await
            .context("Failed to query memory with author")?;
        Ok(result)
    }

    pub async fn list(&self, params: &ListParams) -> Result<Vec<serde_json::Value>> {
        let select = apply_features(Memories::find(), params, &MEMORY_QUERY_SPEC);
        let rows = select
            .into_json()
            .all(&self.conn)
            .await
            .context("Failed to list memories")?;
        Ok(rows)
    }

    pub async fn update(&self, id: i32, content: String) -> Result<Option<memories::Model>> {
        let Some(memory) = self.get(id).await? else {
            return Ok(None);
        };

        let mut active: memories::ActiveModel = memory.into();
        active.content = Set(content);

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update memory")?;
        Ok(Some(updated))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = Memories::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete memory")?;
        Ok(result.rows_affected > 0)
    }

    pub async fn increment_views(&self, id: i32) -> Result<()> {
        Memories::update_many()
            .col_expr(
                memories::Column::Views,
                Expr::col(memories::Column::Views).add(1),
            )
            .filter(memories::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to increment memory views")?;
        Ok(())
    }
}
