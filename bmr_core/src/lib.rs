#![forbid(unsafe_code)]

//! Core domain model and logic for the bmrp profile manager.
//!
//! This crate provides:
//! - Domain types (metrics, profiles, advice results)
//! - Mifflin-St Jeor BMR formula
//! - Bounded profile store with selection
//! - Persistence hooks (JSON blob, locked file repository)
//! - Advice service seam (prompts, response parsing)

pub mod types;
pub mod error;
pub mod formula;
pub mod store;
pub mod persist;
pub mod advice;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use formula::{compute_bmr, format_kcal, AGE_RANGE, HEIGHT_RANGE, WEIGHT_RANGE};
pub use store::{ProfileStore, MAX_PROFILES};
pub use persist::{
    update_profiles, JsonFileRepository, MemoryRepository, ProfileRepository, ProfileSnapshot,
    UpdateLock, PROFILES_KEY,
};
pub use advice::{
    classify_failure, parse_food_analysis, request_advice, request_food_analysis, AdviceProvider,
    AdviceRequest, FoodImage,
};
pub use config::Config;
