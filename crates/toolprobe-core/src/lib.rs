//! # toolprobe-core - Core Domain Types
//!
//! Foundation crate for toolprobe. Provides the installation descriptor,
//! error handling, search path expansion, platform tables, settings and
//! logging setup.
//!
//! ## Public API
//!
//! ### Descriptors (`installation`)
//! - [`Installation`] - A validated installation: root, home, executables, version
//! - [`Detection`] - Ordered outcome of one detection pass ("none" when empty)
//!
//! ### Search Paths (`paths`)
//! - [`paths::expand()`] - Expand `~` and `%VAR%` into an absolute path
//! - [`paths::resolve()`] - Keep the search paths that exist as directories
//! - [`paths::enumerate_candidates()`] - Roots plus subdirectories to a depth
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum covering input, search and watch failures
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ### Settings (`settings`)
//! - [`Settings`] - Search depth, debounce interval, extra search roots
//! - [`load_settings()`] / [`load_user_settings()`]
//!
//! ## Prelude
//!
//! ```rust
//! use toolprobe_core::prelude::*;
//! ```

pub mod error;
pub mod installation;
pub mod logging;
pub mod paths;
pub mod platform;
pub mod settings;

/// Prelude for common imports used throughout the toolprobe crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use error::{Error, Result, ResultExt};
pub use installation::{Detection, Installation};
pub use paths::DEFAULT_SEARCH_DEPTH;
pub use platform::HostOs;
pub use settings::{
    load_settings, load_user_settings, user_settings_path, SearchSettings, Settings,
    ToolSettings, WatchSettings,
};
