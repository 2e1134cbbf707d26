//! Search path expansion and candidate enumeration
//!
//! Search paths are plain strings that may start with `~` and may contain
//! `%NAME%` environment placeholders (`%ProgramFiles%\Genymotion`). They
//! expand to absolute directories; anything that cannot be expanded or does
//! not exist is dropped without error.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// How many directory levels below each search root are probed.
///
/// Vendor directories usually nest an installation one level deep
/// (`/opt/genymotion`, `~/Android/Sdk/ndk/26.1.10909125`).
pub const DEFAULT_SEARCH_DEPTH: usize = 1;

/// Expand `~` and `%NAME%` placeholders into an absolute path
///
/// Returns `None` for blank input, unset environment variables, or when the
/// home directory cannot be determined.
pub fn expand(raw: &str) -> Option<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let substituted = substitute_env(raw)?;
    let expanded = expand_home(&substituted)?;
    let absolute = std::path::absolute(&expanded).ok()?;

    Some(dunce::simplified(&absolute).to_path_buf())
}

/// Replace every `%NAME%` with the value of the environment variable `NAME`.
/// `%%` is a literal percent sign; a trailing unmatched `%` is kept as is.
fn substitute_env(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find('%') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('%') else {
            break;
        };

        out.push_str(&rest[..start]);
        let name = &after[..end];
        if name.is_empty() {
            out.push('%');
        } else {
            match std::env::var(name) {
                Ok(value) => out.push_str(&value),
                Err(_) => {
                    trace!("Environment variable {} is not set", name);
                    return None;
                }
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Some(out)
}

fn expand_home(raw: &str) -> Option<PathBuf> {
    if raw == "~" {
        return dirs::home_dir();
    }

    match raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        Some(rest) => Some(dirs::home_dir()?.join(rest)),
        None => Some(PathBuf::from(raw)),
    }
}

/// Expand search paths and keep those that exist as directories
///
/// Input order is preserved and duplicates are kept.
pub async fn resolve<S: AsRef<str>>(raw: &[S]) -> Vec<PathBuf> {
    let mut resolved = Vec::with_capacity(raw.len());

    for entry in raw {
        let entry = entry.as_ref();
        let Some(path) = expand(entry) else {
            trace!("Dropping unexpandable search path {:?}", entry);
            continue;
        };

        if is_dir(&path).await {
            resolved.push(path);
        } else {
            trace!("Dropping missing search path {}", path.display());
        }
    }

    resolved
}

/// List each root followed by its subdirectories down to `depth` levels
///
/// Subdirectories of one parent are sorted by path so the candidate order
/// never depends on `read_dir` order. Failing to read a root is an error;
/// unreadable directories below a root are skipped.
pub async fn enumerate_candidates(roots: &[PathBuf], depth: usize) -> Result<Vec<PathBuf>> {
    let mut candidates = Vec::new();

    for root in roots {
        candidates.push(root.clone());

        let mut level = vec![root.clone()];
        for current_depth in 0..depth {
            let mut next = Vec::new();
            for dir in &level {
                match subdirectories(dir).await {
                    Ok(children) => next.extend(children),
                    Err(e) if current_depth == 0 => return Err(Error::search_root(dir, e)),
                    Err(e) => debug!("Skipping unreadable directory {}: {}", dir.display(), e),
                }
            }
            candidates.extend(next.iter().cloned());
            level = next;
        }
    }

    Ok(candidates)
}

/// Immediate subdirectories of `dir`, following symlinks, sorted by path
async fn subdirectories(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut children = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if is_dir(&path).await {
            children.push(path);
        }
    }

    children.sort();
    Ok(children)
}

pub async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

pub async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_expand_home() {
        let home = dirs::home_dir().expect("home dir");
        assert_eq!(expand("~"), Some(home.clone()));
        assert_eq!(expand("~/.Genymotion"), Some(home.join(".Genymotion")));
    }

    #[test]
    #[serial]
    fn test_expand_env_placeholder() {
        std::env::set_var("TOOLPROBE_TEST_ROOT", "/opt/vendor");
        assert_eq!(
            expand("%TOOLPROBE_TEST_ROOT%/Genymotion"),
            Some(PathBuf::from("/opt/vendor/Genymotion"))
        );
        std::env::remove_var("TOOLPROBE_TEST_ROOT");
    }

    #[test]
    #[serial]
    fn test_expand_unset_placeholder_is_dropped() {
        std::env::remove_var("TOOLPROBE_TEST_UNSET");
        assert_eq!(expand("%TOOLPROBE_TEST_UNSET%/Genymotion"), None);
    }

    #[test]
    fn test_expand_blank_is_dropped() {
        assert_eq!(expand(""), None);
        assert_eq!(expand("   "), None);
    }

    #[test]
    fn test_expand_makes_relative_absolute() {
        let expanded = expand("some/relative/dir").unwrap();
        assert!(expanded.is_absolute());
        assert!(expanded.ends_with("some/relative/dir"));
    }

    #[test]
    fn test_substitute_literal_percent() {
        assert_eq!(substitute_env("100%%").as_deref(), Some("100%"));
        assert_eq!(substitute_env("50% off").as_deref(), Some("50% off"));
    }

    #[tokio::test]
    async fn test_resolve_keeps_order_and_duplicates() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();
        let missing = temp.path().join("missing");

        let raw = vec![
            b.display().to_string(),
            missing.display().to_string(),
            a.display().to_string(),
            b.display().to_string(),
        ];

        let resolved = resolve(&raw).await;
        assert_eq!(resolved, vec![b.clone(), a, b]);
    }

    #[tokio::test]
    async fn test_resolve_drops_files() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        let resolved = resolve(&[file.display().to_string()]).await;
        assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn test_enumerate_candidates_depth_one() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        fs::create_dir_all(root.join("zeta/nested")).unwrap();
        fs::create_dir_all(root.join("alpha")).unwrap();
        fs::write(root.join("not-a-dir"), "").unwrap();

        let candidates = enumerate_candidates(&[root.clone()], 1).await.unwrap();
        assert_eq!(
            candidates,
            vec![root.clone(), root.join("alpha"), root.join("zeta")]
        );
    }

    #[tokio::test]
    async fn test_enumerate_candidates_depth_zero_is_roots_only() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("child")).unwrap();

        let root = temp.path().to_path_buf();
        let candidates = enumerate_candidates(&[root.clone()], 0).await.unwrap();
        assert_eq!(candidates, vec![root]);
    }

    #[tokio::test]
    async fn test_enumerate_candidates_depth_two() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        fs::create_dir_all(root.join("b/inner")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();

        let candidates = enumerate_candidates(&[root.clone()], 2).await.unwrap();
        assert_eq!(
            candidates,
            vec![
                root.clone(),
                root.join("a"),
                root.join("b"),
                root.join("b/inner")
            ]
        );
    }

    #[tokio::test]
    async fn test_enumerate_unreadable_root_is_error() {
        let temp = TempDir::new().unwrap();
        let gone = temp.path().join("gone");

        let err = enumerate_candidates(&[gone], 1).await.unwrap_err();
        assert!(matches!(err, Error::SearchRoot { .. }));
    }
}
