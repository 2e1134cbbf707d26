//! Genymotion detection
//!
//! A Genymotion installation directory holds the `genymotion` launcher and
//! the `player` executable. On macOS the player ships as an application
//! bundle next to the launcher. The user data directory (`home`) lives at a
//! fixed, platform-dependent location.

use std::path::{Path, PathBuf};
use std::time::Duration;

use toolprobe_core::paths::{self, is_dir, is_file};
use toolprobe_core::prelude::*;
use toolprobe_core::{HostOs, Installation, Settings};

use crate::engine::{Detector, SearchConfig};
use crate::validator::Validator;

/// Detector identity
pub const GENYMOTION_ID: &str = "genymotion";

const TOOL_NAME: &str = "Genymotion";

/// How the player executable is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerLayout {
    /// `player.app/Contents/MacOS/player`
    AppBundle,
    /// `player` (plus the platform executable suffix)
    Flat,
}

/// Per-platform Genymotion layout
#[derive(Debug, PartialEq, Eq)]
pub struct GenymotionPlatform {
    pub os: HostOs,
    /// Default search roots
    pub search_paths: &'static [&'static str],
    /// User data directory candidates, first existing wins
    pub home_dirs: &'static [&'static str],
    pub player: PlayerLayout,
}

static MACOS: GenymotionPlatform = GenymotionPlatform {
    os: HostOs::MacOs,
    search_paths: &[
        "/Applications/Genymotion.app/Contents/MacOS",
        "~/Applications/Genymotion.app/Contents/MacOS",
    ],
    home_dirs: &["~/.Genymobile/Genymotion", "~/.Genymotion"],
    player: PlayerLayout::AppBundle,
};

static LINUX: GenymotionPlatform = GenymotionPlatform {
    os: HostOs::Linux,
    search_paths: &["/opt", "/usr", "~"],
    home_dirs: &["~/.Genymobile/Genymotion", "~/.Genymotion"],
    player: PlayerLayout::Flat,
};

static WINDOWS: GenymotionPlatform = GenymotionPlatform {
    os: HostOs::Windows,
    search_paths: &[
        "%ProgramFiles%\\Genymobile\\Genymotion",
        "%ProgramFiles%\\Genymotion",
        "%ProgramFiles(x86)%\\Genymobile\\Genymotion",
        "%ProgramFiles(x86)%\\Genymotion",
    ],
    home_dirs: &["~/AppData/Local/Genymobile/Genymotion"],
    player: PlayerLayout::Flat,
};

impl GenymotionPlatform {
    pub fn for_os(os: HostOs) -> &'static Self {
        match os {
            HostOs::MacOs => &MACOS,
            HostOs::Linux => &LINUX,
            HostOs::Windows => &WINDOWS,
        }
    }

    pub fn genymotion_exe(&self, dir: &Path) -> PathBuf {
        dir.join(self.os.exe("genymotion"))
    }

    pub fn player_exe(&self, dir: &Path) -> PathBuf {
        match self.player {
            PlayerLayout::AppBundle => dir
                .join("player.app")
                .join("Contents")
                .join("MacOS")
                .join("player"),
            PlayerLayout::Flat => dir.join(self.os.exe("player")),
        }
    }

    /// Home directory candidates, with `~` taken from `user_home` when set
    fn home_candidates(&self, user_home: Option<&Path>) -> Vec<PathBuf> {
        self.home_dirs
            .iter()
            .filter_map(|dir| match (user_home, dir.strip_prefix("~/")) {
                (Some(home), Some(rest)) => Some(home.join(rest)),
                _ => paths::expand(dir),
            })
            .collect()
    }
}

/// Validates Genymotion installation directories
#[derive(Debug, Clone)]
pub struct GenymotionValidator {
    platform: &'static GenymotionPlatform,
    user_home: Option<PathBuf>,
}

impl Default for GenymotionValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl GenymotionValidator {
    pub fn new() -> Self {
        Self::for_os(HostOs::current())
    }

    pub fn for_os(os: HostOs) -> Self {
        Self {
            platform: GenymotionPlatform::for_os(os),
            user_home: None,
        }
    }

    /// Resolve home directory candidates against `dir` instead of the
    /// current user's home
    pub fn with_user_home(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_home = Some(dir.into());
        self
    }

    pub fn platform(&self) -> &'static GenymotionPlatform {
        self.platform
    }

    /// Build a descriptor for `dir`, failing loudly on bad input
    ///
    /// Checks, in order: the argument is not blank, the directory exists,
    /// and both executables are present. Used by callers that name a
    /// directory directly; the scanning pipeline uses [`Validator::validate`].
    pub fn parse_strict(&self, dir: &str) -> Result<Installation> {
        if dir.trim().is_empty() {
            return Err(Error::InvalidDirectory);
        }

        let path = paths::expand(dir).ok_or_else(|| Error::directory_not_found(dir))?;
        if !path.is_dir() {
            return Err(Error::directory_not_found(path));
        }

        let genymotion = self.platform.genymotion_exe(&path);
        let player = self.platform.player_exe(&path);
        if !genymotion.is_file() || !player.is_file() {
            return Err(Error::not_an_installation(TOOL_NAME, path));
        }

        let home = self
            .platform
            .home_candidates(self.user_home.as_deref())
            .into_iter()
            .find(|c| c.is_dir());

        Ok(describe(path, home, genymotion, player))
    }
}

impl Validator for GenymotionValidator {
    fn id(&self) -> &'static str {
        GENYMOTION_ID
    }

    async fn validate(&self, dir: &Path) -> Result<Option<Installation>> {
        let genymotion = self.platform.genymotion_exe(dir);
        let player = self.platform.player_exe(dir);

        if !is_file(&genymotion).await || !is_file(&player).await {
            return Ok(None);
        }

        let mut home = None;
        for candidate in self.platform.home_candidates(self.user_home.as_deref()) {
            if is_dir(&candidate).await {
                home = Some(candidate);
                break;
            }
        }

        Ok(Some(describe(dir.to_path_buf(), home, genymotion, player)))
    }
}

fn describe(path: PathBuf, home: Option<PathBuf>, genymotion: PathBuf, player: PathBuf) -> Installation {
    Installation::new(path)
        .with_home(home)
        .with_executable("genymotion", genymotion)
        .with_executable("player", player)
}

/// Search configuration for the current platform plus configured extras
pub fn search_config(settings: &Settings) -> SearchConfig {
    let mut default_paths = settings.genymotion.paths.clone();
    default_paths.extend(
        GenymotionPlatform::for_os(HostOs::current())
            .search_paths
            .iter()
            .map(|p| (*p).to_string()),
    );

    SearchConfig {
        default_paths,
        env_overrides: Vec::new(),
        depth: settings.search.depth,
    }
}

/// Genymotion detector with default settings
pub fn detector() -> Detector<GenymotionValidator> {
    detector_with(&Settings::default())
}

/// Genymotion detector configured from `settings`
pub fn detector_with(settings: &Settings) -> Detector<GenymotionValidator> {
    Detector::new(GenymotionValidator::new(), search_config(settings))
        .with_debounce(Duration::from_millis(settings.watch.debounce_ms))
}
