//! Installation validator trait
//!
//! A validator decides whether one candidate directory holds an installation
//! of its tool. The detection pipeline only ever calls [`Validator::validate`],
//! which answers "no match" with `Ok(None)` rather than an error.

use std::path::Path;

use toolprobe_core::prelude::*;
use toolprobe_core::Installation;

/// Directory validator for one tool kind
#[trait_variant::make(Validator: Send)]
pub trait LocalValidator {
    /// Stable detector identity, used in logs
    fn id(&self) -> &'static str;

    /// Probe `dir`
    ///
    /// Returns `Ok(None)` when the directory is not an installation. `Err` is
    /// reserved for unexpected I/O failures; the engine treats those as "no
    /// match" for this candidate only.
    async fn validate(&self, dir: &Path) -> Result<Option<Installation>>;
}
