//! libSQL database layer shared by the local key-value store and the
//! remote document store

mod connection;
mod migrations;

pub use connection::{Database, RemoteConfig};
