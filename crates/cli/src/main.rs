mod browser_commands;
mod config_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    nse_relay_config::{RelayConfig, Severity},
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[cfg(all(
    feature = "jemalloc",
    not(target_os = "windows"),
    not(all(target_os = "linux", target_arch = "aarch64"))
))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser)]
#[command(
    name = "nse-relay",
    version,
    about = "NSE historical data relay backed by headless Chromium"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config and NSE_RELAY_BIND).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config and PORT).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Config file to load instead of searching the standard locations.
    #[arg(long, global = true, env = "NSE_RELAY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay (default when no subcommand is provided).
    Serve,
    /// Configuration inspection.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
    /// Browser executable diagnostics.
    Browser {
        #[command(subcommand)]
        action: browser_commands::BrowserAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// A panic anywhere means state we can no longer reason about, including
/// browser processes nobody will close. Log it and take the process down so
/// the supervisor restarts us.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".into());
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        error!(%location, %message, "panic, aborting");
        eprintln!("nse-relay panicked at {location}: {message}");
        std::process::abort();
    }));
}

/// Effective configuration: file (explicit or discovered), then environment,
/// then command-line flags.
fn resolve_config(cli: &Cli) -> anyhow::Result<RelayConfig> {
    let config = match cli.config {
        Some(ref path) => nse_relay_config::load_config(path)?,
        None => nse_relay_config::discover_and_load(),
    };
    let mut config = nse_relay_config::apply_env_overrides(config);

    if let Some(ref bind) = cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

fn serve(cli: &Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli)?;

    let report = nse_relay_config::validate(&config);
    for d in &report.diagnostics {
        match d.severity {
            Severity::Error => error!(path = d.path, "{}", d.message),
            Severity::Warning => warn!(path = d.path, "{}", d.message),
        }
    }
    if report.has_errors() {
        anyhow::bail!(
            "invalid configuration: {} error(s), run `nse-relay config check` for details",
            report.count(Severity::Error)
        );
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.runtime.worker_threads)
        .max_blocking_threads(config.runtime.max_blocking_threads)
        .thread_name("nse-relay-worker")
        .enable_all()
        .build()
        .map_err(|e| anyhow::anyhow!("failed to create tokio runtime: {e}"))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        worker_threads = config.runtime.worker_threads,
        "nse-relay starting"
    );

    runtime.block_on(nse_relay_gateway::start_gateway(config))
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);
    install_panic_hook();

    match cli.command {
        None | Some(Commands::Serve) => serve(&cli),
        Some(Commands::Config { ref action }) => {
            config_commands::handle_config(action, resolve_config(&cli)?)
        },
        Some(Commands::Browser { ref action }) => {
            browser_commands::handle_browser(action, &resolve_config(&cli)?)
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, clap::CommandFactory};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["nse-relay"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
        assert!(!cli.json_logs);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["nse-relay", "serve", "--port", "8080", "--bind", "127.0.0.1"])
                .unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve)));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.bind.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nse-relay.toml");
        std::fs::write(&path, "[server]\nport = 4000\n\n[browser]\nmax_concurrent_sessions = 3\n")
            .unwrap();

        let cli = Cli::try_parse_from([
            "nse-relay",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "5000",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.browser.max_concurrent_sessions, 3);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let cli = Cli::try_parse_from(["nse-relay", "--config", "/nonexistent/nse-relay.toml"])
            .unwrap();
        assert!(resolve_config(&cli).is_err());
    }
}
