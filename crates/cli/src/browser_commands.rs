//! CLI subcommands for browser executable diagnostics.

use {
    anyhow::Result,
    clap::Subcommand,
    nse_relay_browser::{
        LaunchOptions,
        detect::{self, Detection},
    },
    nse_relay_config::RelayConfig,
};

#[derive(Subcommand)]
pub enum BrowserAction {
    /// Resolve the Chromium executable the relay would launch.
    Check,
}

pub fn handle_browser(action: &BrowserAction, config: &RelayConfig) -> Result<()> {
    match action {
        BrowserAction::Check => check(config),
    }
}

fn check(config: &RelayConfig) -> Result<()> {
    let browser = &config.browser;

    println!("Browser configuration:");
    match browser.chrome_path {
        Some(ref path) => println!("  chrome_path:      {path}"),
        None => println!("  chrome_path:      (auto-detect)"),
    }
    println!("  headless:         {}", browser.headless);
    println!("  max_sessions:     {}", browser.max_concurrent_sessions);
    println!("  nav_timeout_ms:   {}", browser.navigation_timeout_ms);
    println!(
        "  launch args:      {}",
        LaunchOptions::from(browser).chrome_args().join(" ")
    );
    println!();

    match detect::detect_browser(browser.chrome_path.as_deref()) {
        Detection::Found { path, source } => {
            println!("Found browser: {} ({source})", path.display());
            Ok(())
        },
        Detection::NotFound { install_hint } => {
            eprintln!("No Chromium-based browser found.\n\n{install_hint}");
            anyhow::bail!("browser not available")
        },
    }
}
