//! Android NDK detection
//!
//! An NDK root contains the `ndk-build` and `ndk-gdb` launchers plus the
//! `build`, `prebuilt` and `platforms` directories. The version comes from
//! `release.txt` (r10 and older) or `Pkg.Revision` in `source.properties`
//! (r11 and newer).

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use toolprobe_core::paths::{is_dir, is_file};
use toolprobe_core::prelude::*;
use toolprobe_core::{HostOs, Installation, Settings};

use crate::engine::{Detector, SearchConfig};
use crate::validator::Validator;

/// Detector identity
pub const NDK_ID: &str = "ndk";

/// Environment variables naming an NDK root, in priority order
pub const NDK_ENV_OVERRIDES: &[&str] = &["ANDROID_NDK", "ANDROID_NDK_HOME", "ANDROID_NDK_ROOT"];

/// Subdirectories every NDK root has
const REQUIRED_DIRECTORIES: &[&str] = &["build", "prebuilt", "platforms"];

const RELEASE_FILE: &str = "release.txt";
const SOURCE_PROPERTIES: &str = "source.properties";

static PKG_REVISION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)Pkg\.Revision\s*=\s*(.+)").expect("Invalid Pkg.Revision regex")
});

/// Default search roots; NDKs live one level below these
fn default_search_paths(os: HostOs) -> &'static [&'static str] {
    match os {
        HostOs::MacOs => &[
            "~/Library/Android/sdk/ndk",
            "~/Library/Android/sdk",
            "/opt",
            "/usr/local",
            "~",
        ],
        HostOs::Linux => &["~/Android/Sdk/ndk", "~/Android/Sdk", "/opt", "/usr/local", "~"],
        HostOs::Windows => &[
            "%LOCALAPPDATA%\\Android\\Sdk\\ndk",
            "%LOCALAPPDATA%\\Android\\Sdk",
            "%ProgramFiles%",
            "%ProgramFiles(x86)%",
            "%SystemDrive%\\",
        ],
    }
}

/// Validates Android NDK roots
#[derive(Debug, Clone)]
pub struct NdkValidator {
    ndk_build: String,
    ndk_gdb: String,
}

impl Default for NdkValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl NdkValidator {
    pub fn new() -> Self {
        Self::for_os(HostOs::current())
    }

    pub fn for_os(os: HostOs) -> Self {
        Self {
            ndk_build: os.script("ndk-build"),
            ndk_gdb: os.script("ndk-gdb"),
        }
    }
}

impl Validator for NdkValidator {
    fn id(&self) -> &'static str {
        NDK_ID
    }

    async fn validate(&self, dir: &Path) -> Result<Option<Installation>> {
        let ndk_build = dir.join(&self.ndk_build);
        let ndk_gdb = dir.join(&self.ndk_gdb);

        if !is_file(&ndk_build).await || !is_file(&ndk_gdb).await {
            return Ok(None);
        }

        for sub in REQUIRED_DIRECTORIES {
            if !is_dir(&dir.join(sub)).await {
                trace!("{} has no {}/ directory", dir.display(), sub);
                return Ok(None);
            }
        }

        let version = read_version(dir).await?;

        Ok(Some(
            Installation::new(dir)
                .with_executable("ndkbuild", ndk_build)
                .with_executable("ndkgdb", ndk_gdb)
                .with_version(version),
        ))
    }
}

/// Read the NDK version from `release.txt` or `source.properties`
///
/// Returns `Ok(None)` when neither file yields a value.
pub async fn read_version(dir: &Path) -> Result<Option<String>> {
    if let Some(release) = find_release_file(dir).await? {
        let content = tokio::fs::read(&release).await?;
        if let Some(version) = first_line(&String::from_utf8_lossy(&content)) {
            return Ok(Some(version));
        }
    }

    let props = dir.join(SOURCE_PROPERTIES);
    if is_file(&props).await {
        let content = tokio::fs::read(&props).await?;
        return Ok(parse_pkg_revision(&String::from_utf8_lossy(&content)));
    }

    Ok(None)
}

/// `release.txt`, matched case-insensitively
async fn find_release_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry
            .file_name()
            .to_string_lossy()
            .eq_ignore_ascii_case(RELEASE_FILE)
        {
            let path = entry.path();
            if is_file(&path).await {
                return Ok(Some(path));
            }
        }
    }
    Ok(None)
}

fn first_line(content: &str) -> Option<String> {
    content
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
}

fn parse_pkg_revision(content: &str) -> Option<String> {
    PKG_REVISION
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|revision| !revision.is_empty())
}

/// Search configuration for the current platform plus configured extras
pub fn search_config(settings: &Settings) -> SearchConfig {
    let mut default_paths = settings.ndk.paths.clone();
    default_paths.extend(
        default_search_paths(HostOs::current())
            .iter()
            .map(|p| (*p).to_string()),
    );

    SearchConfig {
        default_paths,
        env_overrides: NDK_ENV_OVERRIDES.to_vec(),
        depth: settings.search.depth,
    }
}

/// NDK detector with default settings
pub fn detector() -> Detector<NdkValidator> {
    detector_with(&Settings::default())
}

/// NDK detector configured from `settings`
pub fn detector_with(settings: &Settings) -> Detector<NdkValidator> {
    Detector::new(NdkValidator::new(), search_config(settings))
        .with_debounce(Duration::from_millis(settings.watch.debounce_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_mock_ndk;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_valid_ndk_with_release_txt() {
        let temp = TempDir::new().unwrap();
        create_mock_ndk(temp.path());
        fs::write(temp.path().join("release.txt"), "r10e\nfoo\n").unwrap();

        let ndk = NdkValidator::new()
            .validate(temp.path())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(ndk.version.as_deref(), Some("r10e"));
        assert_eq!(ndk.path, temp.path());
        assert!(ndk.home.is_none());
        assert_eq!(
            ndk.executable("ndkbuild"),
            Some(temp.path().join(HostOs::current().script("ndk-build")).as_path())
        );
        assert!(ndk.executables.values().all(|p| p.is_file()));
    }

    #[tokio::test]
    async fn test_version_from_source_properties() {
        let temp = TempDir::new().unwrap();
        create_mock_ndk(temp.path());
        fs::write(
            temp.path().join("source.properties"),
            "Pkg.Desc = Android NDK\nPkg.Revision = 11.0.2\n",
        )
        .unwrap();

        let ndk = NdkValidator::new()
            .validate(temp.path())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ndk.version.as_deref(), Some("11.0.2"));
    }

    #[tokio::test]
    async fn test_no_version_files() {
        let temp = TempDir::new().unwrap();
        create_mock_ndk(temp.path());

        let ndk = NdkValidator::new()
            .validate(temp.path())
            .await
            .unwrap()
            .unwrap();
        assert!(ndk.version.is_none());
    }

    #[tokio::test]
    async fn test_empty_release_txt_falls_back_to_source_properties() {
        let temp = TempDir::new().unwrap();
        create_mock_ndk(temp.path());
        fs::write(temp.path().join("release.txt"), "   \n").unwrap();
        fs::write(temp.path().join("source.properties"), "Pkg.Revision = 25.2.9519653\r\n").unwrap();

        assert_eq!(
            read_version(temp.path()).await.unwrap().as_deref(),
            Some("25.2.9519653")
        );
    }

    #[tokio::test]
    async fn test_empty_release_txt_alone_is_undefined() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("release.txt"), "\n").unwrap();

        assert!(read_version(temp.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_release_txt_name_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("RELEASE.TXT"), "r9d (64-bit)\n").unwrap();

        assert_eq!(
            read_version(temp.path()).await.unwrap().as_deref(),
            Some("r9d (64-bit)")
        );
    }

    #[tokio::test]
    async fn test_missing_markers_are_no_match() {
        for missing in ["ndk-build", "ndk-gdb", "build", "prebuilt", "platforms"] {
            let temp = TempDir::new().unwrap();
            create_mock_ndk(temp.path());

            let target = if missing.starts_with("ndk-") {
                temp.path().join(HostOs::current().script(missing))
            } else {
                temp.path().join(missing)
            };
            if target.is_dir() {
                fs::remove_dir_all(&target).unwrap();
            } else {
                fs::remove_file(&target).unwrap();
            }

            let verdict = NdkValidator::new().validate(temp.path()).await.unwrap();
            assert!(verdict.is_none(), "expected no match without {}", missing);
        }
    }

    #[tokio::test]
    async fn test_launcher_directory_is_not_an_executable() {
        let temp = TempDir::new().unwrap();
        create_mock_ndk(temp.path());
        let launcher = temp.path().join(HostOs::current().script("ndk-gdb"));
        fs::remove_file(&launcher).unwrap();
        fs::create_dir(&launcher).unwrap();

        assert!(NdkValidator::new()
            .validate(temp.path())
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_windows_uses_cmd_launchers() {
        let validator = NdkValidator::for_os(HostOs::Windows);
        assert_eq!(validator.ndk_build, "ndk-build.cmd");
        assert_eq!(validator.ndk_gdb, "ndk-gdb.cmd");
    }

    #[test]
    fn test_parse_pkg_revision() {
        assert_eq!(
            parse_pkg_revision("Pkg.Revision=21.4.7075529").as_deref(),
            Some("21.4.7075529")
        );
        assert_eq!(parse_pkg_revision("Pkg.Desc = NDK\n"), None);
        assert_eq!(parse_pkg_revision("Pkg.Revision = \n"), None);
    }

    #[test]
    fn test_search_config_puts_extras_first() {
        let mut settings = Settings::default();
        settings.ndk.paths = vec!["~/custom/ndk".to_string()];
        settings.search.depth = 2;

        let config = search_config(&settings);
        assert_eq!(config.default_paths[0], "~/custom/ndk");
        assert!(config.default_paths.len() > 1);
        assert_eq!(config.env_overrides, NDK_ENV_OVERRIDES.to_vec());
        assert_eq!(config.depth, 2);
    }

    #[test]
    fn test_detector_with_settings_debounce() {
        let mut settings = Settings::default();
        settings.watch.debounce_ms = 75;

        let detector = detector_with(&settings);
        assert_eq!(detector.debounce(), Duration::from_millis(75));
        assert_eq!(detector.id(), NDK_ID);
    }
}
