//! Scripted containment scenarios.
//!
//! Each scenario builds a fresh window, mounts a stub widget through a
//! `PlaybackView`, replays one interaction and records the checks it makes.

use crate::config::AppConfig;
use crate::view::{PlaybackView, ViewCallbacks};
use common::SafeViewResult;
use dom::{MessageData, Screen, Window};
use player::{StubWidget, STUB_ORIGIN};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_VIDEO_ID: &str = "abc12345678";
const STUB_DURATION: Duration = Duration::from_secs(180);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Back navigation while locked.
    A,
    /// Message from an untrusted origin.
    B,
    /// Routine status message from the embed origin.
    C,
    /// Fullscreen shortcut while playing.
    D,
    /// Escape key while locked.
    E,
    /// Back navigation after teardown.
    F,
}

impl Scenario {
    pub const ALL: [Scenario; 6] = [
        Scenario::A,
        Scenario::B,
        Scenario::C,
        Scenario::D,
        Scenario::E,
        Scenario::F,
    ];

    /// `a`..`f` or `all`.
    pub fn parse_selection(selection: &str) -> Option<Vec<Scenario>> {
        let selection = selection.trim().to_ascii_lowercase();
        if selection == "all" {
            return Some(Self::ALL.to_vec());
        }
        selection
            .split(',')
            .map(|s| match s.trim() {
                "a" => Some(Scenario::A),
                "b" => Some(Scenario::B),
                "c" => Some(Scenario::C),
                "d" => Some(Scenario::D),
                "e" => Some(Scenario::E),
                "f" => Some(Scenario::F),
                _ => None,
            })
            .collect()
    }

    pub fn description(&self) -> &'static str {
        match self {
            Scenario::A => "back navigation while locked opens the parent gate",
            Scenario::B => "untrusted message is stopped and opens the parent gate",
            Scenario::C => "status message from the embed origin is benign",
            Scenario::D => "fullscreen shortcut is swallowed without escalation",
            Scenario::E => "escape key is swallowed and opens the parent gate",
            Scenario::F => "after teardown back navigation behaves normally",
        }
    }

    pub fn run(
        &self,
        config: &AppConfig,
        mobile: bool,
        video_id: &str,
    ) -> SafeViewResult<ScenarioReport> {
        let stage = Stage::new(config, mobile, video_id)?;
        let mut report = ScenarioReport::new(*self);
        let view = &stage.view;
        let window = &stage.window;

        match self {
            Scenario::A => {
                let depth = window.history_length();
                let path = window.location().pathname;
                let changed = window.navigate_back();
                report.check("route unchanged", !changed && window.location().pathname == path);
                report.check("history not shortened", window.history_length() >= depth);
                report.check("one escape attempt", view.escape_attempts() == 1);
                report.check("parent gate visible", view.gate().is_visible());
            }
            Scenario::B => {
                let event = window.receive_message(
                    "https://evil.example",
                    MessageData::Text(r#"{"event":"navigate_out"}"#.to_string()),
                );
                report.check("propagation stopped", event.propagation_stopped);
                report.check("one escape attempt", view.escape_attempts() == 1);
                report.check("parent gate visible", view.gate().is_visible());
            }
            Scenario::C => {
                let before = view.containment().snapshot();
                let event = window.receive_message(
                    STUB_ORIGIN,
                    MessageData::Text(r#"{"event":"onStateChange"}"#.to_string()),
                );
                report.check("propagation continues", !event.propagation_stopped);
                report.check("state unchanged", view.containment().snapshot() == before);
                report.check("no escape attempt", view.escape_attempts() == 0);
            }
            Scenario::D => {
                stage.widget.bind_shortcuts();
                let event = window.key_down("f", Some(stage.widget.frame()));
                report.check("default prevented", event.default_prevented);
                report.check("no native fullscreen", window.fullscreen_element().is_none());
                report.check("no escape attempt", view.escape_attempts() == 0);
                report.check("parent gate hidden", !view.gate().is_visible());
            }
            Scenario::E => {
                let event = window.key_down("Escape", None);
                report.check("default prevented", event.default_prevented);
                report.check("one escape attempt", view.escape_attempts() == 1);
                report.check("parent gate visible", view.gate().is_visible());
            }
            Scenario::F => {
                view.unmount();
                let classified = view.containment().classified_count();
                let changed = window.navigate_back();
                report.check("route changed", changed);
                report.check(
                    "nothing classified",
                    view.containment().classified_count() == classified,
                );
                report.check("parent gate hidden", !view.gate().is_visible());
            }
        }

        stage.finish();
        Ok(report)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Scenario::A => 'A',
            Scenario::B => 'B',
            Scenario::C => 'C',
            Scenario::D => 'D',
            Scenario::E => 'E',
            Scenario::F => 'F',
        };
        write!(f, "Scenario {}", letter)
    }
}

/// Window, view and widget for one run.
struct Stage {
    window: Arc<Window>,
    view: Arc<PlaybackView>,
    widget: Arc<StubWidget>,
}

impl Stage {
    fn new(config: &AppConfig, mobile: bool, video_id: &str) -> SafeViewResult<Self> {
        let home = Url::parse(&config.app_origin)?;
        let window = Arc::new(Window::new(home.clone()));
        if mobile {
            window.set_screen(Screen::mobile());
        }
        window.navigate(&home.join(&format!("watch/{}", video_id))?);
        // Playback starts from a tap.
        window.set_user_activation(true);

        let view = PlaybackView::new(window.clone(), config.clone(), ViewCallbacks::new())?;
        let widget = StubWidget::new(&window, STUB_DURATION);
        view.mount(video_id, widget.clone())?;
        Ok(Self {
            window,
            view,
            widget,
        })
    }

    fn finish(&self) {
        self.view.unmount();
    }
}

/// One named check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Check {
    pub name: &'static str,
    pub passed: bool,
}

/// What a scenario observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub checks: Vec<Check>,
}

impl ScenarioReport {
    fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            checks: Vec::new(),
        }
    }

    fn check(&mut self, name: &'static str, passed: bool) {
        if !passed {
            tracing::warn!("{}: check '{}' failed", self.scenario, name);
        }
        self.checks.push(Check { name, passed });
    }

    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.scenario,
            if self.passed() { "PASS" } else { "FAIL" },
            self.scenario.description()
        )?;
        for check in self.failures() {
            write!(f, "\n    failed: {}", check.name)?;
        }
        Ok(())
    }
}
