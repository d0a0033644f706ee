//! Upstream module - request building, fetching and normalizing government API payloads

pub mod fanout;
pub mod fetch;
pub mod parse;
pub mod request;
pub mod types;
pub mod utils;

pub use types::*;
