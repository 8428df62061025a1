//! Player host for the embedded video widget.
//!
//! Mounts a third-party widget with minimal chrome, listens for its
//! messages, tracks the per-video state machine and keeps shields over
//! the parts of the widget that link out.

pub mod error;
pub mod host;
pub mod layout;
pub mod state;
pub mod stub;
pub mod vars;
pub mod widget;

pub use error::{PlayerError, PlayerResult};
pub use host::{ErrorCallback, LifecycleCallback, PlayerCallbacks, PlayerHost};
pub use layout::{PlayerLayout, PointerTarget, Shield, ShieldKind};
pub use state::{HostConfig, PlayerState, Progress};
pub use stub::{StubWidget, WidgetCommand, STUB_ORIGIN};
pub use vars::{validate_video_id, PlayerVars, EMBED_BASE};
pub use widget::{EmbeddedWidget, WidgetEvent, WidgetPlayback};
