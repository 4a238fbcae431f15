use {
    anyhow::Result,
    clap::Subcommand,
    nse_relay_config::{RelayConfig, Severity},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the effective configuration and report errors/warnings.
    Check,
    /// Print the effective configuration (file, env and flags applied) as TOML.
    Show,
}

pub fn handle_config(action: &ConfigAction, config: RelayConfig) -> Result<()> {
    match action {
        ConfigAction::Check => check(&config),
        ConfigAction::Show => show(&config),
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config: &RelayConfig) -> Result<()> {
    let result = nse_relay_config::validate(config);

    for d in &result.diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if !result.diagnostics.is_empty() {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        anyhow::bail!("configuration has {errors} error(s)");
    }
    Ok(())
}

fn show(config: &RelayConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("failed to render config: {e}"))?;
    print!("{rendered}");
    Ok(())
}
