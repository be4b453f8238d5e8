pub mod chat;
pub mod submit;
