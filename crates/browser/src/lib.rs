//! Short-lived headless Chromium sessions for one-shot fetches.
//!
//! Each session is a dedicated browser process with its own profile and a
//! single page. Sessions are never pooled: the fetch pipeline opens one
//! through the [`SessionGate`], drives it through the [`AutomationSession`]
//! trait, and lets the [`SessionGuard`] close it on every exit path.
//!
//! # Example
//!
//! ```ignore
//! use nse_relay_browser::{CdpLauncher, LaunchOptions, SessionGate};
//!
//! let launcher = CdpLauncher::new(LaunchOptions::default());
//! let gate = SessionGate::default();
//!
//! let mut guard = gate.open(&launcher).await?;
//! guard.session()?.navigate("https://example.com").await?;
//! let body = guard.session()?.body_text().await?;
//! guard.release().await;
//! ```

pub mod cdp;
pub mod detect;
pub mod error;
pub mod gate;
pub mod guard;
pub mod session;
pub mod types;

pub use {
    cdp::CdpLauncher,
    error::BrowserError,
    gate::{SessionGate, SessionPermit},
    guard::SessionGuard,
    session::{AutomationSession, SessionLauncher},
    types::{GateOptions, LaunchOptions},
};
