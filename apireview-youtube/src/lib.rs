//! API review YouTube - recording metadata lookup
//!
//! Talks to the YouTube Data API with an API key. Only finished live streams
//! count as review recordings.

mod client;
mod error;

pub use client::{YouTubeClient, DEFAULT_PLAYLIST};
pub use error::{Error, Result};
