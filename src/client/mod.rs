pub mod chat_sync;
pub mod notifications;
pub mod session;
