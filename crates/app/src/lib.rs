//! SafeView - contained playback of parent-approved videos.
//!
//! This crate wires the pieces together:
//! - containment and escape detection (`sandbox`)
//! - the embedded player host (`player`)
//! - the parent gate and escape recovery (`gate`)
//! - metadata and storage contracts (`catalog`)

pub mod config;
pub mod scenario;
pub mod screen_time;
pub mod view;

pub use config::AppConfig;
pub use scenario::{Scenario, ScenarioReport, DEFAULT_VIDEO_ID};
pub use screen_time::{Bedtime, ScreenTimePolicy, ScreenTimeStatus};
pub use view::{PlaybackView, ViewCallbacks};

/// SafeView version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
