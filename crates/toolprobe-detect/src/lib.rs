//! # toolprobe-detect - Detection Engine
//!
//! Finds tool installations under a set of search roots, caches the outcome
//! per detector and keeps watching the roots for changes.
//!
//! ## Public API
//!
//! ### Engine (`engine`)
//! - [`Detector`] - Validator + search configuration + result cache
//! - [`DetectionRequest`] - Paths, force and multiple options for one pass
//! - [`SearchConfig`] - Default roots, environment overrides, depth
//!
//! ### Validators
//! - [`Validator`] - Probe one candidate directory
//! - [`NdkValidator`] / [`ndk::detector()`] - Android NDK
//! - [`GenymotionValidator`] / [`genymotion::detector()`] - Genymotion
//!
//! ### Watching (`watch`)
//! - [`WatchSession`] - Stream of [`WatchEvent`]s until stopped

pub mod cache;
pub mod engine;
pub mod genymotion;
pub mod ndk;
pub mod validator;
pub mod watch;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use cache::{CacheKey, ResultCache};
pub use engine::{DetectionRequest, Detector, SearchConfig, DEFAULT_DEBOUNCE_MS};
pub use genymotion::{GenymotionPlatform, GenymotionValidator, PlayerLayout, GENYMOTION_ID};
pub use ndk::{NdkValidator, NDK_ENV_OVERRIDES, NDK_ID};
pub use validator::{LocalValidator, Validator};
pub use watch::{WatchEvent, WatchSession, WatchState};
