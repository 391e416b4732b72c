pub mod client;
pub mod coordinator;
pub mod observer;
pub mod session;
pub mod username;
