use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::RelayConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "nse-relay.toml",
    "nse-relay.yaml",
    "nse-relay.yml",
    "nse-relay.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<RelayConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./nse-relay.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/nse-relay/nse-relay.{toml,yaml,yml,json}` (user-global)
///
/// Returns `RelayConfig::default()` if no config file is found or the one
/// found fails to parse.
pub fn discover_and_load() -> RelayConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    RelayConfig::default()
}

/// Returns the user-global config directory (`~/.config/nse-relay/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "nse-relay").map(|d| d.config_dir().to_path_buf())
}

/// Apply the environment variables a container deployment sets.
///
/// - `PORT` → `server.port`
/// - `NSE_RELAY_BIND` → `server.bind`
/// - `PUPPETEER_EXECUTABLE_PATH` / `NSE_RELAY_CHROME_PATH` → `browser.chrome_path`
///   (the latter wins when both are set)
pub fn apply_env_overrides(config: RelayConfig) -> RelayConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    mut config: RelayConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> RelayConfig {
    if let Some(port) = lookup("PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(e) => warn!(value = %port, error = %e, "ignoring invalid PORT"),
        }
    }
    if let Some(bind) = lookup("NSE_RELAY_BIND").filter(|b| !b.is_empty()) {
        config.server.bind = bind;
    }
    for var in ["PUPPETEER_EXECUTABLE_PATH", "NSE_RELAY_CHROME_PATH"] {
        if let Some(path) = lookup(var).filter(|p| !p.is_empty()) {
            debug!(var, path = %path, "browser executable overridden from environment");
            config.browser.chrome_path = Some(path);
        }
    }
    config
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<RelayConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::io::Write};

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_toml() {
        let file = write_temp(
            ".toml",
            r#"
            [server]
            port = 8080

            [browser]
            chrome_path = "/opt/chrome/chrome"
            navigation_timeout_ms = 15000
            "#,
        );
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.browser.chrome_path.as_deref(), Some("/opt/chrome/chrome"));
        assert_eq!(cfg.browser.navigation_timeout_ms, 15_000);
    }

    #[test]
    fn loads_yaml() {
        let file = write_temp(".yaml", "upstream:\n  base_url: http://127.0.0.1:9000\n");
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.upstream.base_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn loads_json() {
        let file = write_temp(".json", r#"{"runtime": {"worker_threads": 2}}"#);
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.runtime.worker_threads, 2);
        assert_eq!(cfg.runtime.max_blocking_threads, 16);
    }

    #[test]
    fn rejects_unknown_extension() {
        let file = write_temp(".ini", "port=1");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Path::new("/nonexistent/nse-relay.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn env_overrides_port_and_executable() {
        let lookup = |name: &str| match name {
            "PORT" => Some("4000".to_string()),
            "PUPPETEER_EXECUTABLE_PATH" => Some("/usr/bin/chromium-browser".to_string()),
            _ => None,
        };
        let cfg = apply_env_overrides_with(RelayConfig::default(), lookup);
        assert_eq!(cfg.server.port, 4000);
        assert_eq!(
            cfg.browser.chrome_path.as_deref(),
            Some("/usr/bin/chromium-browser")
        );
    }

    #[test]
    fn relay_specific_executable_var_wins() {
        let lookup = |name: &str| match name {
            "PUPPETEER_EXECUTABLE_PATH" => Some("/a".to_string()),
            "NSE_RELAY_CHROME_PATH" => Some("/b".to_string()),
            _ => None,
        };
        let cfg = apply_env_overrides_with(RelayConfig::default(), lookup);
        assert_eq!(cfg.browser.chrome_path.as_deref(), Some("/b"));
    }

    #[test]
    fn invalid_port_is_ignored() {
        let lookup = |name: &str| (name == "PORT").then(|| "not-a-port".to_string());
        let cfg = apply_env_overrides_with(RelayConfig::default(), lookup);
        assert_eq!(cfg.server.port, 3000);
    }
}
