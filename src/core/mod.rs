pub mod chat_stream;
pub mod config;
pub mod conversation;
pub mod message;
pub mod session;
