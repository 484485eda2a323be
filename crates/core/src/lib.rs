// crates/core/src/lib.rs
pub mod config;
pub mod consolidator;
pub mod delimited;
pub mod envelope;
pub mod error;
pub mod listing;
pub mod pipeline;
pub mod segmenter;
pub mod types;

pub use config::*;
pub use error::*;
pub use pipeline::*;
pub use types::*;
