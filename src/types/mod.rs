pub mod messages;
pub mod thread;
