//! # HighRatings Leaderboard Common Library
//!
//! Shared code for the leaderboard service and its tooling:
//! - Content model (categories, time ranges, normalized items, interactions)
//! - Configuration loading and credential resolution
//! - Common error type

pub mod config;
pub mod content;
pub mod error;

pub use content::{Category, ContentItem, TimeRange, TimeWindow, UserInteraction};
pub use error::{Error, Result};
