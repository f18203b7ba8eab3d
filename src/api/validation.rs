use super::ApiError;
use super::types::{CreateBlogRequest, SignupRequest, UpdateBlogRequest};

pub const ROLES: [&str; 3] = ["user", "guide", "admin"];

pub const BLOG_TYPES: [&str; 5] = ["research", "blog", "story", "news", "book"];

pub const CATEGORIES: [&str; 30] = [
    "Adventure",
    "Arts",
    "Business",
    "Career Advice",
    "Culture",
    "Current Affairs",
    "Cybersecurity",
    "Economics",
    "Education",
    "Entertainment",
    "Environment",
    "Fashion",
    "Fitness",
    "Food",
    "Gaming",
    "Health",
    "History",
    "Lifestyle",
    "Literature",
    "Mental Health",
    "Music",
    "Nature",
    "News",
    "Opinion",
    "Photography",
    "Politics",
    "Science",
    "Sports",
    "Technology",
    "Travel",
];

pub fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::validation("Please provide your name"));
    }
    if name.chars().count() > 40 {
        return Err(ApiError::validation(
            "Name must not have more than 40 characters",
        ));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if !(5..=20).contains(&len) {
        return Err(ApiError::validation(
            "Username must have between 5 and 20 characters",
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::validation(
            "Username can only contain letters, numbers, and underscores",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(ApiError::validation("Please provide a valid email"));
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), ApiError> {
    if phone.chars().count() > 20 {
        return Err(ApiError::validation("Phone number is not valid"));
    }
    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
    {
        return Err(ApiError::validation("Phone number is not valid"));
    }
    Ok(())
}

pub fn validate_passion(passion: &str) -> Result<(), ApiError> {
    if passion.chars().count() > 100 {
        return Err(ApiError::validation(
            "Passion must have less than 100 characters",
        ));
    }
    Ok(())
}

pub fn validate_bio(bio: &str) -> Result<(), ApiError> {
    if bio.chars().count() > 500 {
        return Err(ApiError::validation(
            "Bio must have less than 500 characters",
        ));
    }
    Ok(())
}

pub fn validate_role(role: &str) -> Result<(), ApiError> {
    if !ROLES.contains(&role) {
        return Err(ApiError::validation("Role must be one of: user, guide, admin"));
    }
    Ok(())
}

/// Password plus its write-only confirmation; the pair never reaches the
/// data layer.
pub fn validate_password_pair(password: &str, password_confirm: &str) -> Result<(), ApiError> {
    if password.chars().count() < 8 {
        return Err(ApiError::validation(
            "Password must have at least 8 characters",
        ));
    }
    if password != password_confirm {
        return Err(ApiError::validation("Passwords are not the same"));
    }
    Ok(())
}

pub fn validate_signup(req: &SignupRequest) -> Result<(), ApiError> {
    validate_name(&req.name)?;
    validate_username(&req.username)?;
    validate_email(&req.email)?;
    validate_password_pair(&req.password, &req.password_confirm)?;
    if let Some(phone) = &req.phone {
        validate_phone(phone)?;
    }
    if let Some(passion) = &req.passion {
        validate_passion(passion)?;
    }
    if let Some(bio) = &req.bio {
        validate_bio(bio)?;
    }
    Ok(())
}

fn validate_heading(heading: &str) -> Result<(), ApiError> {
    let len = heading.chars().count();
    if !(30..=100).contains(&len) {
        return Err(ApiError::validation(
            "Heading must have between 30 and 100 characters",
        ));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ApiError> {
    let len = description.chars().count();
    if !(50..=300).contains(&len) {
        return Err(ApiError::validation(
            "Description must have between 50 and 300 characters",
        ));
    }
    Ok(())
}

fn validate_blog_content(content: &str) -> Result<(), ApiError> {
    let len = content.chars().count();
    if !(100..=40_000).contains(&len) {
        return Err(ApiError::validation(
            "Blog content must have between 100 and 40,000 characters",
        ));
    }
    Ok(())
}

fn validate_tags(tags: &[String]) -> Result<(), ApiError> {
    if tags.is_empty() {
        return Err(ApiError::validation("Blog must have at least one tag"));
    }
    for tag in tags {
        let len = tag.chars().count();
        if !(2..=20).contains(&len) {
            return Err(ApiError::validation(format!("Tag is not valid: {tag}")));
        }
    }
    Ok(())
}

fn validate_blog_type(blog_type: &str) -> Result<(), ApiError> {
    if !BLOG_TYPES.contains(&blog_type) {
        return Err(ApiError::validation(
            "Blog type must be one of: research, blog, story, news, book",
        ));
    }
    Ok(())
}

fn validate_category(category: &str) -> Result<(), ApiError> {
    if !CATEGORIES.contains(&category) {
        return Err(ApiError::validation("Blog must have a known category"));
    }
    Ok(())
}

pub fn validate_new_blog(req: &CreateBlogRequest) -> Result<(), ApiError> {
    validate_heading(&req.heading)?;
    validate_description(&req.description)?;
    validate_blog_content(&req.content)?;
    validate_tags(&req.tags)?;
    if let Some(blog_type) = &req.blog_type {
        validate_blog_type(blog_type)?;
    }
    validate_category(&req.category)?;
    Ok(())
}

pub fn validate_blog_changes(req: &UpdateBlogRequest) -> Result<(), ApiError> {
    if let Some(heading) = &req.heading {
        validate_heading(heading)?;
    }
    if let Some(description) = &req.description {
        validate_description(description)?;
    }
    if let Some(content) = &req.content {
        validate_blog_content(content)?;
    }
    if let Some(tags) = &req.tags {
        validate_tags(tags)?;
    }
    if let Some(blog_type) = &req.blog_type {
        validate_blog_type(blog_type)?;
    }
    if let Some(category) = &req.category {
        validate_category(category)?;
    }
    Ok(())
}

pub fn validate_memory_content(content: &str) -> Result<(), ApiError> {
    let len = content.trim().chars().count();
    if len == 0 {
        return Err(ApiError::validation("Memories must have content"));
    }
    if len > 100 {
        return Err(ApiError::validation(
            "Memories must have less than 100 characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_bounds() {
        assert!(validate_username("alice1").is_ok());
        assert!(validate_username("abcd").is_err());
        assert!(validate_username(&"a".repeat(21)).is_err());
        assert!(validate_username("bad name").is_err());
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("a@b.com").is_ok());
        assert!(validate_email("missing-at.com").is_err());
        assert!(validate_email("@no-local.com").is_err());
        assert!(validate_email("a@nodot").is_err());
    }

    #[test]
    fn password_pair_must_match_and_be_long_enough() {
        assert!(validate_password_pair("longenough", "longenough").is_ok());
        assert!(validate_password_pair("short", "short").is_err());
        assert!(validate_password_pair("longenough", "different1").is_err());
    }

    #[test]
    fn heading_under_30_chars_rejected() {
        assert!(validate_heading("Too short").is_err());
        assert!(validate_heading(&"h".repeat(30)).is_ok());
        assert!(validate_heading(&"h".repeat(101)).is_err());
    }

    #[test]
    fn tags_require_at_least_one_valid_entry() {
        assert!(validate_tags(&[]).is_err());
        assert!(validate_tags(&["rust".to_string()]).is_ok());
        assert!(validate_tags(&["x".to_string()]).is_err());
    }

    #[test]
    fn memory_content_bounds() {
        assert!(validate_memory_content("a note").is_ok());
        assert!(validate_memory_content("").is_err());
        assert!(validate_memory_content(&"m".repeat(101)).is_err());
    }
}
