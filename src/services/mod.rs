pub mod mailer;
pub mod token;

pub use mailer::{LogMailer, Mailer};
pub use token::{Claims, TokenError, TokenService, generate_reset_token, hash_reset_token};
