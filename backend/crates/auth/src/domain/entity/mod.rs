pub mod account_token;
pub mod credential;
pub mod security_event;
pub mod user;
