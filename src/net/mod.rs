//! Transport layer for accepted RTSP connections

pub mod connection;

pub use connection::{Connection, ConnectionEvent, ConnectionHandle};

#[cfg(test)]
mod connection_tests;
