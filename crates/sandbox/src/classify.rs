//! The escape classifier: a total function from signal and state to verdict.

use crate::flags::InterceptFlags;
use crate::keys::KeyAction;
use crate::message::WidgetMessage;
use crate::origin::Origin;
use crate::policy::ContainmentPolicy;
use crate::signal::{BenignReason, EscapeClassification, EscapeReason, EscapeSignal};
use std::sync::Arc;

use EscapeClassification::{Benign, EscapeAttempt};

/// Containment state the classifier reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SignalContext {
    pub locked: bool,
    pub playing: bool,
}

/// Classifies signals against a policy.
#[derive(Clone, Debug)]
pub struct Classifier {
    policy: Arc<ContainmentPolicy>,
    app_origin: Option<Origin>,
}

impl Classifier {
    pub fn new(policy: Arc<ContainmentPolicy>, app_origin: Option<Origin>) -> Self {
        Self { policy, app_origin }
    }

    pub fn policy(&self) -> &ContainmentPolicy {
        &self.policy
    }

    pub fn classify(&self, signal: &EscapeSignal, ctx: SignalContext) -> EscapeClassification {
        match signal {
            EscapeSignal::CrossOriginMessage { origin, payload } => {
                self.classify_message(origin, payload, ctx)
            }
            EscapeSignal::PopState => locked_escape(ctx, EscapeReason::HistoryPop),
            EscapeSignal::PopupRequest { url } => {
                locked_escape(ctx, EscapeReason::PopupBlocked { url: url.clone() })
            }
            EscapeSignal::LinkActivation { url } => {
                if !ctx.locked {
                    return Benign(BenignReason::Unlocked);
                }
                let same_origin = self
                    .app_origin
                    .as_ref()
                    .map_or(false, |app| app.is_same_origin_with_url(url));
                if same_origin {
                    Benign(BenignReason::SameOriginLink)
                } else {
                    EscapeAttempt(EscapeReason::ExternalLink {
                        url: url.to_string(),
                    })
                }
            }
            EscapeSignal::FullscreenRequest => locked_escape(ctx, EscapeReason::FullscreenRequest),
            EscapeSignal::FullscreenChange { .. } => Benign(BenignReason::FullscreenContained),
            EscapeSignal::BlockedKey(key) => {
                if !ctx.locked {
                    return Benign(BenignReason::Unlocked);
                }
                match self.policy.keys.action(key) {
                    KeyAction::SwallowAndEscape => EscapeAttempt(EscapeReason::EscapeKey),
                    KeyAction::Swallow | KeyAction::Pass => {
                        Benign(BenignReason::NuisanceKey(key.clone()))
                    }
                }
            }
            EscapeSignal::Gesture(kind) => Benign(BenignReason::NuisanceGesture(*kind)),
            EscapeSignal::VisibilityHidden => {
                if !self.policy.intercepts(InterceptFlags::VISIBILITY) {
                    return Benign(BenignReason::Disabled);
                }
                playing_escape(ctx, EscapeReason::VisibilityHidden)
            }
            EscapeSignal::Blur | EscapeSignal::FocusLoss => {
                if !self.policy.intercepts(InterceptFlags::BLUR) {
                    return Benign(BenignReason::Disabled);
                }
                playing_escape(ctx, EscapeReason::FocusLoss)
            }
        }
    }

    fn classify_message(
        &self,
        origin: &str,
        payload: &dom::MessageData,
        ctx: SignalContext,
    ) -> EscapeClassification {
        if !self.policy.origins.allows(origin) {
            // Nothing to protect without an active session.
            return locked_escape(
                ctx,
                EscapeReason::UntrustedOrigin {
                    origin: origin.to_string(),
                },
            );
        }

        match self.policy.vocabulary.parse(payload) {
            WidgetMessage::Known(event) => Benign(BenignReason::SafeWidgetEvent(event)),
            WidgetMessage::UnknownStructured(event)
                if self.policy.vocabulary.is_navigation_like(&event) =>
            {
                locked_escape(ctx, EscapeReason::NavigationMessage { event })
            }
            WidgetMessage::UnknownStructured(event) => {
                Benign(BenignReason::UnrecognizedEvent(event))
            }
            WidgetMessage::Unstructured => Benign(BenignReason::Unstructured),
        }
    }
}

fn locked_escape(ctx: SignalContext, reason: EscapeReason) -> EscapeClassification {
    if ctx.locked {
        EscapeAttempt(reason)
    } else {
        Benign(BenignReason::Unlocked)
    }
}

fn playing_escape(ctx: SignalContext, reason: EscapeReason) -> EscapeClassification {
    if !ctx.locked {
        Benign(BenignReason::Unlocked)
    } else if !ctx.playing {
        Benign(BenignReason::NotPlaying)
    } else {
        EscapeAttempt(reason)
    }
}
