//! toolprobe
//!
//! Locates Android NDK and Genymotion installations on the local machine and
//! optionally keeps watching for them to appear or disappear.
//!
//! ```no_run
//! # async fn demo() -> toolprobe::Result<()> {
//! use toolprobe::prelude::*;
//!
//! let ndk = toolprobe::ndk();
//! let found = ndk.detect(&DetectionRequest::new()).await?;
//! if let Some(install) = found.first() {
//!     println!("NDK {:?} at {}", install.version, install.path.display());
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

pub use toolprobe_core::{
    logging, paths, Detection, Error, HostOs, Installation, Result, ResultExt, Settings,
};
pub use toolprobe_detect::{
    genymotion as genymotion_detector, ndk as ndk_detector, DetectionRequest, Detector,
    GenymotionValidator, NdkValidator, SearchConfig, Validator, WatchEvent, WatchSession,
    WatchState,
};

/// Common imports for callers
pub mod prelude {
    pub use toolprobe_core::prelude::*;
    pub use toolprobe_core::{Detection, Installation};
    pub use toolprobe_detect::{DetectionRequest, Detector, Validator, WatchEvent, WatchSession};
}

/// NDK detector configured from the user settings file
pub fn ndk() -> Arc<Detector<NdkValidator>> {
    Arc::new(toolprobe_detect::ndk::detector_with(
        &toolprobe_core::load_user_settings(),
    ))
}

/// Genymotion detector configured from the user settings file
pub fn genymotion() -> Arc<Detector<GenymotionValidator>> {
    Arc::new(toolprobe_detect::genymotion::detector_with(
        &toolprobe_core::load_user_settings(),
    ))
}

/// Both detectors, sharing one settings load
pub fn detectors_with(
    settings: &Settings,
) -> (Arc<Detector<NdkValidator>>, Arc<Detector<GenymotionValidator>>) {
    tracing::debug!("Building detectors (search depth {})", settings.search.depth);
    (
        Arc::new(toolprobe_detect::ndk::detector_with(settings)),
        Arc::new(toolprobe_detect::genymotion::detector_with(settings)),
    )
}
