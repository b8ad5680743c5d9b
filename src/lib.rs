//! httpwire - HTTP/1.1 server built directly on TCP byte streams
//!
//! This crate turns raw socket bytes into structured requests and writes
//! structured responses back onto the wire, one request per connection.

pub mod config;
pub mod http;
pub mod net;
