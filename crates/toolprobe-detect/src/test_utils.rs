//! Test utilities for detectors
//!
//! Fake installation layouts on disk plus a validator wrapper that counts
//! probes and injects delays or failures per directory.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use toolprobe_core::prelude::*;
use toolprobe_core::{HostOs, Installation};

use crate::genymotion::GenymotionPlatform;
use crate::validator::Validator;

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    fs::write(path, "").expect("write marker file");
}

/// Creates a minimal NDK root at `dir` for the current OS.
///
/// Launchers plus the `build`, `prebuilt` and `platforms` directories. No
/// version file is written.
pub fn create_mock_ndk(dir: &Path) {
    let os = HostOs::current();
    touch(&dir.join(os.script("ndk-build")));
    touch(&dir.join(os.script("ndk-gdb")));
    for sub in ["build", "prebuilt", "platforms"] {
        fs::create_dir_all(dir.join(sub)).expect("create NDK directory");
    }
}

/// Creates a Genymotion installation at `dir` for the current OS.
pub fn create_mock_genymotion(dir: &Path) {
    create_mock_genymotion_for(dir, HostOs::current());
}

/// Creates a Genymotion installation at `dir` using the layout of `os`.
pub fn create_mock_genymotion_for(dir: &Path, os: HostOs) {
    let platform = GenymotionPlatform::for_os(os);
    touch(&platform.genymotion_exe(dir));
    touch(&platform.player_exe(dir));
}

/// Shared view of how many probes a validator has run
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Wraps a validator to count calls and misbehave on chosen directories
#[derive(Debug)]
pub struct InstrumentedValidator<V> {
    inner: V,
    calls: CallCounter,
    delays: HashMap<PathBuf, Duration>,
    failures: HashSet<PathBuf>,
}

impl<V> InstrumentedValidator<V> {
    pub fn new(inner: V) -> Self {
        Self {
            inner,
            calls: CallCounter::default(),
            delays: HashMap::new(),
            failures: HashSet::new(),
        }
    }

    pub fn call_counter(&self) -> CallCounter {
        self.calls.clone()
    }

    /// Sleep for `delay` before probing `dir`
    pub fn with_delay(mut self, dir: &Path, delay: Duration) -> Self {
        self.delays.insert(dir.to_path_buf(), delay);
        self
    }

    /// Fail every probe of `dir` with an I/O error
    pub fn with_failure(mut self, dir: &Path) -> Self {
        self.failures.insert(dir.to_path_buf());
        self
    }
}

impl<V: Validator + Sync> Validator for InstrumentedValidator<V> {
    fn id(&self) -> &'static str {
        self.inner.id()
    }

    async fn validate(&self, dir: &Path) -> Result<Option<Installation>> {
        self.calls.bump();

        if let Some(delay) = self.delays.get(dir) {
            tokio::time::sleep(*delay).await;
        }

        if self.failures.contains(dir) {
            return Err(Error::Io(io::Error::other(format!(
                "injected failure at {}",
                dir.display()
            ))));
        }

        self.inner.validate(dir).await
    }
}
