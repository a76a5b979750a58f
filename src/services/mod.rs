pub mod coordinator;
pub mod error;
pub mod music_service;
pub mod observer;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod transport;

#[cfg(test)]
pub mod testing;
