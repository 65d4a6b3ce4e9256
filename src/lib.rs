//! # Resonnet
//!
//! Live prompt analysis. As a prompt is edited, Resonnet decides when to ask a
//! remote model for misalignment risks (ambiguous instructions, unstated
//! assumptions, underspecified parameters, conflicting directives) so that
//! results arrive quickly without flooding the rate-limited service.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐ edits  ┌─────────────────────────────┐  one call  ┌────────────┐
//! │  Editor  │───────▶│        Coordinator          │───────────▶│  Analyze   │
//! │ (UI/CLI) │        │ debounce · cache · 1 slot   │◀───────────│  client    │
//! └──────────┘        └──────────────┬──────────────┘   issues   └────────────┘
//!       ▲                            │ AnalysisView
//!       └────────────────────────────┘
//! ```
//!
//! The decision logic lives in `resonnet-core` as a pure state machine; this
//! crate runs it on tokio and supplies the network client.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`client`] | Analyze client trait and Anthropic implementation |
//! | [`coordinator`] | Actor that runs the scheduler on tokio |
//! | [`check`] | One-shot analysis command |
//! | [`session`] | Line-driven editing session command |
//! | [`server`] | HTTP analyze proxy |

pub mod check;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod server;
pub mod session;
