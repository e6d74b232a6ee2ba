//! Resource lifecycle operations, independent of search

pub mod service;

pub use service::{RecordService, canonical_id};
