use serde::{Deserialize, Serialize};

use crate::entities::{blogs, memories, users};

/// Uniform response envelope: `status` is "success", "fail" (4xx) or
/// "error" (5xx); `results` carries the row count on list endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            status: "success",
            data: Some(data),
            message: None,
            results: None,
        }
    }

    pub const fn success_with_results(data: T, results: usize) -> Self {
        Self {
            status: "success",
            data: Some(data),
            message: None,
            results: Some(results),
        }
    }

    pub fn success_message(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            data: None,
            message: Some(message.into()),
            results: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: "fail",
            data: None,
            message: Some(message.into()),
            results: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            data: None,
            message: Some(message.into()),
            results: None,
        }
    }
}

/// User as exposed over the API; password and reset columns never appear.
#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub name: String,
    pub username: String,
    pub email: String,
    pub photo: String,
    pub phone: Option<String>,
    pub passion: Option<String>,
    pub bio: Option<String>,
    pub role: String,
    pub verified: bool,
    pub created_at: String,
}

impl From<users::Model> for UserDto {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            username: model.username,
            email: model.email,
            photo: model.photo,
            phone: model.phone,
            passion: model.passion,
            bio: model.bio,
            role: model.role,
            verified: model.verified,
            created_at: model.created_at,
        }
    }
}

/// Compact author projection embedded in blog/memory reads.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorDto {
    pub id: i32,
    pub name: String,
    pub username: String,
    pub photo: String,
    pub verified: bool,
}

impl From<&users::Model> for AuthorDto {
    fn from(model: &users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            username: model.username.clone(),
            photo: model.photo.clone(),
            verified: model.verified,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDetailDto {
    #[serde(flatten)]
    pub user: UserDto,
    pub followers: Vec<AuthorDto>,
    pub following: Vec<AuthorDto>,
}

#[derive(Debug, Serialize)]
pub struct BlogDto {
    pub id: i32,
    pub heading: String,
    pub description: String,
    pub featured_image: String,
    pub content: String,
    pub tags: Vec<String>,
    pub blog_type: String,
    pub category: String,
    pub author_id: i32,
    pub views: i64,
    pub created_at: String,
    /// Minutes, derived from word count; not stored.
    pub read_time: u32,
    /// Derived from the heading; not stored.
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorDto>,
}

impl BlogDto {
    pub fn from_model(model: blogs::Model, author: Option<AuthorDto>) -> Self {
        let tags: Vec<String> = serde_json::from_str(&model.tags).unwrap_or_default();
        let read_time = read_time_minutes(&model.content);
        let slug = slugify(&model.heading);
        Self {
            id: model.id,
            heading: model.heading,
            description: model.description,
            featured_image: model.featured_image,
            content: model.content,
            tags,
            blog_type: model.blog_type,
            category: model.category,
            author_id: model.author_id,
            views: model.views,
            created_at: model.created_at,
            read_time,
            slug,
            author,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemoryDto {
    pub id: i32,
    pub content: String,
    pub author_id: i32,
    pub views: i64,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorDto>,
}

impl MemoryDto {
    pub fn from_model(model: memories::Model, author: Option<AuthorDto>) -> Self {
        Self {
            id: model.id,
            content: model.content,
            author_id: model.author_id,
            views: model.views,
            created_at: model.created_at,
            author,
        }
    }
}

/// Login/signup response body: the bearer token plus the user it names.
#[derive(Debug, Serialize)]
pub struct AuthData {
    pub token: String,
    pub user: UserDto,
}

#[derive(Debug, Serialize)]
pub struct TokenClaimsDto {
    pub user_id: i32,
    pub issued_at: i64,
    pub expires_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub passion: Option<String>,
    pub bio: Option<String>,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub password_current: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyTokenRequest {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub phone: Option<String>,
    pub passion: Option<String>,
    pub bio: Option<String>,
    // Present only to be rejected: password changes have their own route.
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub phone: Option<String>,
    pub passion: Option<String>,
    pub bio: Option<String>,
    pub role: Option<String>,
    pub verified: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    pub user_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateBlogRequest {
    pub heading: String,
    pub description: String,
    pub featured_image: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub blog_type: Option<String>,
    pub category: String,
    pub author: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBlogRequest {
    pub heading: Option<String>,
    pub description: Option<String>,
    pub featured_image: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub blog_type: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMemoryRequest {
    pub content: String,
    pub author: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemoryRequest {
    pub content: String,
}

/// Approximate read time at 120 words per minute, rounded up.
#[must_use]
pub fn read_time_minutes(content: &str) -> u32 {
    let words = content.split_whitespace().count();
    words.div_ceil(120).max(1) as u32
}

/// Heading words joined by `-`, truncated to 30 characters.
#[must_use]
pub fn slugify(heading: &str) -> String {
    let joined = heading.split_whitespace().collect::<Vec<_>>().join("-");
    joined.chars().take(30).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_time_rounds_up() {
        assert_eq!(read_time_minutes("word"), 1);
        let content = vec!["word"; 121].join(" ");
        assert_eq!(read_time_minutes(&content), 2);
        let content = vec!["word"; 240].join(" ");
        assert_eq!(read_time_minutes(&content), 2);
    }

    #[test]
    fn slug_joins_words_and_truncates() {
        assert_eq!(slugify("Hello World"), "Hello-World");
        let slug = slugify("a very long heading that keeps going and going");
        assert_eq!(slug.len(), 30);
        assert!(slug.starts_with("a-very-long-heading"));
    }
}
