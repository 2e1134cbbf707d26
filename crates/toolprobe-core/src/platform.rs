//! Host platform selection
//!
//! Detectors keep their platform-specific knowledge (executable names, search
//! roots, bundle layouts) in small tables keyed by [`HostOs`]. The table is
//! picked once when a validator is built, so validation itself never branches
//! on `cfg!(target_os)`.

/// Operating system family the tables are keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOs {
    MacOs,
    Linux,
    Windows,
}

impl HostOs {
    /// The OS this binary was compiled for. Unknown Unixes use the Linux table.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            HostOs::MacOs
        } else if cfg!(windows) {
            HostOs::Windows
        } else {
            HostOs::Linux
        }
    }

    /// Suffix of native executables (`.exe` on Windows)
    pub fn exe_suffix(self) -> &'static str {
        match self {
            HostOs::Windows => ".exe",
            HostOs::MacOs | HostOs::Linux => "",
        }
    }

    /// Suffix of launcher scripts (`.cmd` on Windows)
    pub fn script_suffix(self) -> &'static str {
        match self {
            HostOs::Windows => ".cmd",
            HostOs::MacOs | HostOs::Linux => "",
        }
    }

    /// File name of a native executable on this OS
    pub fn exe(self, name: &str) -> String {
        format!("{}{}", name, self.exe_suffix())
    }

    /// File name of a launcher script on this OS
    pub fn script(self, name: &str) -> String {
        format!("{}{}", name, self.script_suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_suffixes() {
        assert_eq!(HostOs::Windows.exe("genymotion"), "genymotion.exe");
        assert_eq!(HostOs::Windows.script("ndk-build"), "ndk-build.cmd");
    }

    #[test]
    fn test_unix_suffixes_are_empty() {
        for os in [HostOs::Linux, HostOs::MacOs] {
            assert_eq!(os.exe("player"), "player");
            assert_eq!(os.script("ndk-gdb"), "ndk-gdb");
        }
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_current_on_linux() {
        assert_eq!(HostOs::current(), HostOs::Linux);
    }
}
