use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::db::query::{ListParams, ResourceQuerySpec, apply_features};
use crate::entities::{blogs, prelude::*, users};

pub const BLOG_QUERY_SPEC: ResourceQuerySpec = ResourceQuerySpec {
    filterable: &["category", "blog_type", "author_id", "views", "created_at"],
    sortable: &["created_at", "views", "heading"],
    selectable: &[
        "id",
        "heading",
        "description",
        "featured_image",
        "content",
        "tags",
        "blog_type",
        "category",
        "author_id",
        "views",
        "created_at",
    ],
    default_sort: "-created_at",
};

#[derive(Debug, Clone)]
pub struct NewBlog {
    pub heading: String,
    pub description: String,
    pub featured_image: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub blog_type: String,
    pub category: String,
    pub author_id: i32,
}

#[derive(Debug, Clone, Default)]
pub struct BlogChanges {
    pub heading: Option<String>,
    pub description: Option<String>,
    pub featured_image: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub blog_type: Option<String>,
    pub category: Option<String>,
}

pub struct BlogRepository {
    conn: DatabaseConnection,
}

impl BlogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, new_blog: NewBlog) -> Result<blogs::Model> {
        let tags = serde_json::to_string(&new_blog.tags)?;
        let active = blogs::ActiveModel {
            heading: Set(new_blog.heading),
            description: Set(new_blog.description),
            featured_image: Set(new_blog
                .featured_image
                .unwrap_or_else(|| "default-blog.jpg".to_string())),
            content: Set(new_blog.content),
            tags: Set(tags),
            blog_type: Set(new_blog.blog_type),
            category: Set(new_blog.category),
            author_id: Set(new_blog.author_id),
            views: Set(0),
            created_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert blog")?;
        Ok(model)
    }

    pub async fn get(&self, id: i32) -> Result<Option<blogs::Model>> {
        let blog = Blogs::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query blog by id")?;
        Ok(blog)
    }

    /// Blog plus its author row, for the populated read responses.
    pub async fn get_with_author(
        &self,
        id: i32,
    ) -> Result<Option<(blogs::Model, Option<users::Model>)>> {
        let result = Blogs::find_by_id(id)
            .find_also_related(Users)
            .one(&self.conn)
            .await
            .context("Failed to query blog with author")?;
        Ok(result)
    }

    pub async fn list(&self, params: &ListParams) -> Result<Vec<serde_json::Value>> {
        let select = apply_features(Blogs::find(), params, &BLOG_QUERY_SPEC);
        let rows = select
            .into_json()
            .all(&self.conn)
            .await
            .context("Failed to list blogs")?;
        Ok(rows)
    }

    pub async fn update(&self, id: i32, changes: BlogChanges) -> Result<Option<blogs::Model>> {
        let Some(blog) = self.get(id).await? else {
            return Ok(None);
        };

        let mut active: blogs::ActiveModel = blog.into();
        if let Some(heading) = changes.heading {
            active.heading = Set(heading);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(featured_image) = changes.featured_image {
            active.featured_image = Set(featured_image);
        }
        if let Some(content) = changes.content {
            active.content = Set(content);
        }
        if let Some(tags) = changes.tags {
            active.tags = Set(serde_json::to_string(&tags)?);
        }
        if let Some(blog_type) = changes.blog_type {
            active.blog_type = Set(blog_type);
        }
        if let Some(category) = changes.category {
            active.category = Set(category);
        }

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update blog")?;
        Ok(Some(updated))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = Blogs::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete blog")?;
        Ok(result.rows_affected > 0)
    }

    /// Single atomic `views = views + 1`; exact even under contention.
    pub async fn increment_views(&self, id: i32) -> Result<()> {
        Blogs::update_many()
            .col_expr(blogs::Column::Views, Expr::col(blogs::Column::Views).add(1))
            .filter(blogs::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to increment blog views")?;
        Ok(())
    }
}
