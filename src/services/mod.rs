pub mod auth;
pub mod export;
pub mod formatting;
pub mod mailer;
pub mod respondent;
pub mod stats;
pub mod validation;
