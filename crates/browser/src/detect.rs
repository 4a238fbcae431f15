//! Browser executable resolution and install guidance.

use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Executable used when nothing is configured; what the container image ships.
pub const DEFAULT_EXECUTABLE: &str = "/usr/bin/chromium";

/// Chromium-family executable names looked up on `PATH` as a last resort.
const CHROMIUM_EXECUTABLES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
    "headless_shell",
];

/// macOS app bundle paths, for running the relay on a developer machine.
#[cfg(target_os = "macos")]
const MACOS_APP_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

/// Where the executable was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// `browser.chrome_path` (or its environment override).
    Configured,
    /// [`DEFAULT_EXECUTABLE`].
    Default,
    /// The `CHROME` environment variable.
    ChromeEnv,
    /// A platform install location or a `PATH` lookup.
    System,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Configured => "configured",
            Self::Default => "default",
            Self::ChromeEnv => "CHROME env",
            Self::System => "system",
        };
        f.write_str(s)
    }
}

/// Result of browser detection.
#[derive(Debug, Clone)]
pub enum Detection {
    Found { path: PathBuf, source: Source },
    NotFound { install_hint: String },
}

impl Detection {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Found { path, .. } => Some(path),
            Self::NotFound { .. } => None,
        }
    }
}

/// Resolve the browser executable.
///
/// Checks, in order: the configured path, [`DEFAULT_EXECUTABLE`], the
/// `CHROME` environment variable, platform install locations, then known
/// executable names on `PATH`. A configured path that does not exist is
/// skipped rather than treated as fatal, so a stale override still falls
/// back to whatever the image provides.
pub fn detect_browser(configured: Option<&str>) -> Detection {
    let chrome_env = std::env::var("CHROME").ok();
    detect_with(configured, chrome_env.as_deref(), |name| {
        which::which(name).ok()
    })
}

fn detect_with(
    configured: Option<&str>,
    chrome_env: Option<&str>,
    lookup: impl Fn(&str) -> Option<PathBuf>,
) -> Detection {
    let candidates = [
        (configured, Source::Configured),
        (Some(DEFAULT_EXECUTABLE), Source::Default),
        (chrome_env, Source::ChromeEnv),
    ];
    for (candidate, source) in candidates {
        if let Some(path) = candidate.filter(|p| !p.is_empty()).map(PathBuf::from)
            && path.exists()
        {
            return Detection::Found { path, source };
        }
    }

    #[cfg(target_os = "macos")]
    for path in MACOS_APP_PATHS {
        let p = PathBuf::from(path);
        if p.exists() {
            return Detection::Found {
                path: p,
                source: Source::System,
            };
        }
    }

    if let Some(path) = CHROMIUM_EXECUTABLES.iter().find_map(|name| lookup(name)) {
        return Detection::Found {
            path,
            source: Source::System,
        };
    }

    Detection::NotFound {
        install_hint: install_instructions(),
    }
}

/// Get platform-specific install instructions.
pub fn install_instructions() -> String {
    let instructions = if cfg!(target_os = "macos") {
        "  brew install --cask chromium"
    } else if cfg!(target_os = "linux") {
        "  Debian/Ubuntu: sudo apt install chromium\n  \
         Alpine:        apk add chromium\n  \
         Fedora:        sudo dnf install chromium"
    } else {
        "  Download from https://www.chromium.org/getting-involved/download-chromium/"
    };

    format!(
        "Install Chromium:\n\n{instructions}\n\n\
         Or point the relay at an existing binary:\n  \
         [browser]\n  \
         chrome_path = \"/path/to/chromium\"\n\n\
         or set PUPPETEER_EXECUTABLE_PATH / NSE_RELAY_CHROME_PATH."
    )
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn no_lookup(_: &str) -> Option<PathBuf> {
        None
    }

    #[test]
    fn configured_path_takes_precedence() {
        let fake = tempfile::NamedTempFile::new().unwrap();
        let path = fake.path().to_str().unwrap();
        match detect_with(Some(path), None, no_lookup) {
            Detection::Found { path: found, source } => {
                assert_eq!(found, fake.path());
                assert_eq!(source, Source::Configured);
            },
            Detection::NotFound { .. } => panic!("configured executable not detected"),
        }
    }

    #[test]
    fn chrome_env_used_when_configured_path_missing() {
        let fake = tempfile::NamedTempFile::new().unwrap();
        let env = fake.path().to_str().unwrap();
        let result = detect_with(Some("/nonexistent/chrome"), Some(env), no_lookup);
        // The default executable may exist on the test host and wins over CHROME.
        if !Path::new(DEFAULT_EXECUTABLE).exists() {
            assert!(matches!(
                result,
                Detection::Found {
                    source: Source::ChromeEnv,
                    ..
                }
            ));
        }
        assert!(result.path().is_some());
    }

    #[test]
    fn path_lookup_is_last_resort() {
        let result = detect_with(None, None, |name| {
            (name == "google-chrome").then(|| PathBuf::from("/opt/google/chrome/google-chrome"))
        });
        assert!(result.path().is_some());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn not_found_carries_install_hint() {
        if Path::new(DEFAULT_EXECUTABLE).exists() {
            return;
        }
        match detect_with(None, None, no_lookup) {
            Detection::NotFound { install_hint } => {
                assert!(install_hint.contains("apt install chromium"));
                assert!(install_hint.contains("PUPPETEER_EXECUTABLE_PATH"));
            },
            Detection::Found { .. } => panic!("nothing should be found"),
        }
    }

    #[test]
    fn source_display() {
        assert_eq!(Source::ChromeEnv.to_string(), "CHROME env");
        assert_eq!(Source::Configured.to_string(), "configured");
    }
}
