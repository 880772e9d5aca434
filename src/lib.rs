//! PoseSeek - Semantic retrieval over a pose catalogue
//!
//! Embeds free-text queries, recalls nearest neighbors from a vector index,
//! optionally reranks them with a language model, and applies adaptive
//! similarity thresholds so every search mode yields a usable result set.

pub mod catalogue;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod rerank;
pub mod search;

pub use error::{PoseSeekError, Result};
