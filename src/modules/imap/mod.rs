pub mod capabilities;
pub mod client;
pub mod connection;
pub mod executor;
pub mod fetch;
pub mod flags;
pub mod mover;
pub mod retry;
pub mod search;
pub mod session;

#[cfg(test)]
pub mod mock;
