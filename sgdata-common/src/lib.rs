//! # sgdata Common Library
//!
//! Shared code for all sgdata processors including:
//! - Persistent memoization of upstream fetches
//! - Great-circle distance
//! - Output artifacts and the metadata manifest
//! - Configuration loading
//! - Error types

pub mod cache;
pub mod config;
pub mod error;
pub mod geo;
pub mod output;

pub use cache::{CacheKey, ResponseCache};
pub use error::{Error, Result};
pub use geo::{haversine_km, Coordinates};
pub use output::{DataFile, ProcessorMeta};
