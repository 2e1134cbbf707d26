//! Detection engine
//!
//! A [`Detector`] pairs one [`Validator`] with its search configuration and
//! its own [`ResultCache`]. One detection pass:
//!
//! 1. picks search roots (request paths, else environment override, else
//!    configured and platform defaults),
//! 2. serves a cached answer unless the request is forced,
//! 3. expands the roots into candidate directories,
//! 4. validates every candidate concurrently on the calling task,
//! 5. reduces the matches in candidate order and caches the outcome.

use std::path::PathBuf;
use std::time::Duration;

use futures_util::future::join_all;
use toolprobe_core::paths::{self, DEFAULT_SEARCH_DEPTH};
use toolprobe_core::prelude::*;
use toolprobe_core::{Detection, Installation};

use crate::cache::{CacheKey, ResultCache};
use crate::validator::Validator;

/// Default debounce interval for watch sessions
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Options for one detection pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionRequest {
    /// Explicit search roots; when empty the detector's defaults apply
    pub paths: Vec<String>,
    /// Skip the cache lookup (the result is still cached)
    pub force: bool,
    /// Keep every match instead of only the first
    pub multiple: bool,
}

impl DetectionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a search root (may contain `~` or `%VAR%`)
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Add a concrete directory as a search root
    pub fn with_dir(mut self, dir: impl AsRef<std::path::Path>) -> Self {
        self.paths
            .push(dir.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    /// Same request with the cache bypassed
    pub fn forced(&self) -> Self {
        self.clone().with_force(true)
    }
}

/// Where a detector looks when the request names no paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Roots searched when neither request paths nor overrides apply
    pub default_paths: Vec<String>,
    /// Environment variables naming an installation, first set one wins
    pub env_overrides: Vec<&'static str>,
    /// Directory levels probed below each root
    pub depth: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_paths: Vec::new(),
            env_overrides: Vec::new(),
            depth: DEFAULT_SEARCH_DEPTH,
        }
    }
}

/// Cached, watchable detection pipeline for one tool kind
#[derive(Debug)]
pub struct Detector<V> {
    validator: V,
    search: SearchConfig,
    debounce: Duration,
    cache: ResultCache,
}

impl<V: Validator + Sync> Detector<V> {
    pub fn new(validator: V, search: SearchConfig) -> Self {
        let cache = ResultCache::new(validator.id());
        Self {
            validator,
            search,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            cache,
        }
    }

    /// Set the watch debounce interval
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn id(&self) -> &'static str {
        self.validator.id()
    }

    pub fn validator(&self) -> &V {
        &self.validator
    }

    pub fn search_config(&self) -> &SearchConfig {
        &self.search
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Forget every cached detection
    pub fn reset_cache(&self) {
        self.cache.invalidate();
    }

    /// Raw search roots for `request`, before expansion
    pub fn search_roots(&self, request: &DetectionRequest) -> Vec<String> {
        if !request.paths.is_empty() {
            return request.paths.clone();
        }

        for var in &self.search.env_overrides {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    debug!("{} using {}={}", self.id(), var, value);
                    return vec![value];
                }
            }
        }

        self.search.default_paths.clone()
    }

    /// Candidate directories for the given raw roots, in probe order
    pub async fn candidates(&self, roots: &[String]) -> Result<Vec<PathBuf>> {
        let resolved = paths::resolve(roots).await;
        paths::enumerate_candidates(&resolved, self.search.depth).await
    }

    /// Run one detection pass
    pub async fn detect(&self, request: &DetectionRequest) -> Result<Detection> {
        let roots = self.search_roots(request);
        let key = CacheKey::new(&roots, request.multiple);

        if !request.force {
            if let Some(cached) = self.cache.get(&key) {
                return Ok(cached);
            }
        }

        let generation = self.cache.generation();
        let candidates = self.candidates(&roots).await?;
        debug!(
            "{} probing {} candidate(s) from {} root(s)",
            self.id(),
            candidates.len(),
            roots.len()
        );

        let detection = self.scan(&candidates, request.multiple).await;
        self.cache.put(key, detection.clone(), generation);

        Ok(detection)
    }

    /// Validate every candidate and reduce the matches
    ///
    /// Matches are taken in candidate order regardless of which probe
    /// finishes first.
    async fn scan(&self, candidates: &[PathBuf], multiple: bool) -> Detection {
        let id = self.id();
        let verdicts: Vec<Option<Installation>> =
            join_all(candidates.iter().map(|dir| async move {
                match self.validator.validate(dir).await {
                    Ok(Some(installation)) => {
                        debug!("{} found installation at {}", id, dir.display());
                        Some(installation)
                    }
                    Ok(None) => {
                        trace!("{} no match at {}", id, dir.display());
                        None
                    }
                    Err(e) => {
                        warn!("{} failed to probe {}: {}", id, dir.display(), e);
                        None
                    }
                }
            }))
            .await;

        let mut matches = verdicts.into_iter().flatten();
        if multiple {
            Detection::from(matches.collect::<Vec<_>>())
        } else {
            matches.next().map(Detection::single).unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_mock_genymotion, InstrumentedValidator};
    use crate::GenymotionValidator;
    use serial_test::serial;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn detector(validator: InstrumentedValidator<GenymotionValidator>) -> Detector<InstrumentedValidator<GenymotionValidator>> {
        Detector::new(validator, SearchConfig::default())
    }

    #[test]
    fn test_request_builder() {
        let request = DetectionRequest::new()
            .with_path("~/tools")
            .with_dir("/opt/genymotion")
            .with_multiple(true);

        assert_eq!(request.paths, vec!["~/tools", "/opt/genymotion"]);
        assert!(request.multiple);
        assert!(!request.force);
        assert!(request.forced().force);
    }

    #[test]
    #[serial]
    fn test_search_roots_precedence() {
        let search = SearchConfig {
            default_paths: vec!["/opt".to_string()],
            env_overrides: vec!["TOOLPROBE_TEST_OVERRIDE"],
            depth: 1,
        };
        let detector = Detector::new(GenymotionValidator::new(), search);

        std::env::remove_var("TOOLPROBE_TEST_OVERRIDE");
        assert_eq!(detector.search_roots(&DetectionRequest::new()), vec!["/opt"]);

        std::env::set_var("TOOLPROBE_TEST_OVERRIDE", "/env/tool");
        assert_eq!(
            detector.search_roots(&DetectionRequest::new()),
            vec!["/env/tool"]
        );
        assert_eq!(
            detector.search_roots(&DetectionRequest::new().with_path("/explicit")),
            vec!["/explicit"]
        );
        std::env::remove_var("TOOLPROBE_TEST_OVERRIDE");
    }

    #[tokio::test]
    async fn test_detect_root_itself() {
        let temp = TempDir::new().unwrap();
        create_mock_genymotion(temp.path());

        let detector = detector(InstrumentedValidator::new(GenymotionValidator::new()));
        let detection = detector
            .detect(&DetectionRequest::new().with_dir(temp.path()))
            .await
            .unwrap();

        assert_eq!(detection.first().unwrap().path, temp.path());
    }

    #[tokio::test]
    async fn test_detect_one_level_below_root() {
        let temp = TempDir::new().unwrap();
        let install = temp.path().join("genymotion");
        create_mock_genymotion(&install);

        let detector = detector(InstrumentedValidator::new(GenymotionValidator::new()));
        let detection = detector
            .detect(&DetectionRequest::new().with_dir(temp.path()))
            .await
            .unwrap();

        assert_eq!(detection.first().unwrap().path, install);
    }

    #[tokio::test]
    async fn test_detect_empty_directory_is_none() {
        let temp = TempDir::new().unwrap();

        let detector = detector(InstrumentedValidator::new(GenymotionValidator::new()));
        let detection = detector
            .detect(&DetectionRequest::new().with_dir(temp.path()))
            .await
            .unwrap();

        assert!(detection.is_none());
    }

    #[tokio::test]
    async fn test_second_detect_is_served_from_cache() {
        let temp = TempDir::new().unwrap();
        create_mock_genymotion(&temp.path().join("a"));

        let validator = InstrumentedValidator::new(GenymotionValidator::new());
        let calls = validator.call_counter();
        let detector = detector(validator);
        let request = DetectionRequest::new().with_dir(temp.path());

        let first = detector.detect(&request).await.unwrap();
        let after_first = calls.get();
        assert!(after_first > 0);

        let second = detector.detect(&request).await.unwrap();
        assert_eq!(calls.get(), after_first);
        assert!(first.same_as(&second));
    }

    #[tokio::test]
    async fn test_force_rescans_and_refreshes_cache() {
        let temp = TempDir::new().unwrap();
        let request = DetectionRequest::new().with_dir(temp.path());

        let validator = InstrumentedValidator::new(GenymotionValidator::new());
        let calls = validator.call_counter();
        let detector = detector(validator);

        assert!(detector.detect(&request).await.unwrap().is_none());

        create_mock_genymotion(&temp.path().join("late"));
        assert!(detector.detect(&request).await.unwrap().is_none());

        let before = calls.get();
        let forced = detector.detect(&request.forced()).await.unwrap();
        assert!(calls.get() > before);
        assert!(forced.first().is_some());

        let cached = detector.detect(&request).await.unwrap();
        assert!(cached.same_as(&forced));
    }

    #[tokio::test]
    async fn test_reset_cache_forces_rescan() {
        let temp = TempDir::new().unwrap();
        let request = DetectionRequest::new().with_dir(temp.path());

        let validator = InstrumentedValidator::new(GenymotionValidator::new());
        let calls = validator.call_counter();
        let detector = detector(validator);

        detector.detect(&request).await.unwrap();
        let before = calls.get();

        detector.reset_cache();
        detector.detect(&request).await.unwrap();
        assert!(calls.get() > before);
    }

    #[tokio::test]
    async fn test_first_match_wins_despite_slow_probe() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        create_mock_genymotion(&a);
        create_mock_genymotion(&b);

        let validator = InstrumentedValidator::new(GenymotionValidator::new())
            .with_delay(&a, Duration::from_millis(150));
        let detector = detector(validator);

        let detection = detector
            .detect(&DetectionRequest::new().with_dir(temp.path()))
            .await
            .unwrap();

        assert_eq!(detection.len(), 1);
        assert_eq!(detection.first().unwrap().path, a);
    }

    #[tokio::test]
    async fn test_multiple_keeps_all_in_order() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let c = temp.path().join("c");
        create_mock_genymotion(&c);
        create_mock_genymotion(&a);
        fs::create_dir_all(temp.path().join("b")).unwrap();

        let validator = InstrumentedValidator::new(GenymotionValidator::new())
            .with_delay(&a, Duration::from_millis(100));
        let detector = detector(validator);

        let detection = detector
            .detect(
                &DetectionRequest::new()
                    .with_dir(temp.path())
                    .with_multiple(true),
            )
            .await
            .unwrap();

        let found: Vec<_> = detection.all().iter().map(|i| i.path.clone()).collect();
        assert_eq!(found, vec![a, c]);
    }

    #[tokio::test]
    async fn test_validator_error_is_no_match_for_that_candidate() {
        let temp = TempDir::new().unwrap();
        let broken = temp.path().join("a");
        let good = temp.path().join("b");
        create_mock_genymotion(&broken);
        create_mock_genymotion(&good);

        let validator =
            InstrumentedValidator::new(GenymotionValidator::new()).with_failure(&broken);
        let detector = detector(validator);

        let detection = detector
            .detect(&DetectionRequest::new().with_dir(temp.path()))
            .await
            .unwrap();

        assert_eq!(detection.first().unwrap().path, good);
    }

    #[tokio::test]
    async fn test_missing_roots_are_dropped() {
        let temp = TempDir::new().unwrap();
        let detector = detector(InstrumentedValidator::new(GenymotionValidator::new()));

        let detection = detector
            .detect(&DetectionRequest::new().with_dir(temp.path().join("nope")))
            .await
            .unwrap();

        assert!(detection.is_none());
    }
}
