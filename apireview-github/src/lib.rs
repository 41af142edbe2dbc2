//! API review GitHub - issue tracker integration
//!
//! Provides the REST issue lookup behind the issue cache and the GraphQL
//! timeline query behind live feedback collection.

mod client;
mod error;
mod graphql;
mod issues;

pub use client::{parse_repo, GitHubClient};
pub use error::{Error, Result};
