//! Preview view model
//!
//! Pure presentation. A [`PreviewView`] is recomputed from each published
//! [`PlaybackSession`] and carries everything a host needs to draw: either
//! the error text, or the waveform surface with transport button, time
//! readout and loading indicator. User input comes back as [`ViewAction`]s,
//! which are forwarded untouched.

use earshot_core::{PlaybackController, PlaybackSession, PlaybackState, PreviewSession};

use crate::labels::Labels;
use crate::time::format_time;

/// The play/pause control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportButton {
    pub label: String,
    /// Renders the pause glyph when true
    pub playing: bool,
    /// Disabled until the first snapshot decoded
    pub enabled: bool,
}

/// Everything shown while the preview has not failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerView {
    pub transport: TransportButton,
    /// Elapsed time, `[HH:]MM:SS`
    pub current_time: String,
    /// Total time, `[HH:]MM:SS`
    pub total_time: String,
    pub time_separator: String,
    /// Loading indicator text; `None` hides the indicator
    pub loading: Option<String>,
}

impl PlayerView {
    /// `current / total` as one string
    pub fn time_readout(&self) -> String {
        format!("{}{}{}", self.current_time, self.time_separator, self.total_time)
    }
}

/// What the preview component displays
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewView {
    /// Replaces the waveform surface; no transport or time readout
    Error { message: String },
    /// Waveform surface plus controls
    Player(PlayerView),
}

impl PreviewView {
    /// Derive the view from a session state snapshot
    pub fn from_session(session: &PlaybackSession, labels: &Labels) -> Self {
        if session.state == PlaybackState::Errored || session.has_error() {
            let detail = session.error_message();
            return PreviewView::Error {
                message: labels.error_text(detail.as_deref()),
            };
        }

        let is_loading = session.is_loading || session.state == PlaybackState::Loading;
        let label = if session.is_playing {
            labels.pause.clone()
        } else {
            labels.play.clone()
        };

        PreviewView::Player(PlayerView {
            transport: TransportButton {
                label,
                playing: session.is_playing,
                enabled: session.state.accepts_toggle() && !is_loading,
            },
            current_time: format_time(session.current_time),
            total_time: format_time(session.duration),
            time_separator: labels.time_separator.clone(),
            loading: is_loading.then(|| labels.loading.clone()),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PreviewView::Error { .. })
    }

    /// The player part, if not in the error state
    pub fn player(&self) -> Option<&PlayerView> {
        match self {
            PreviewView::Player(player) => Some(player),
            PreviewView::Error { .. } => None,
        }
    }
}

/// User input from the preview component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
    TogglePlayback,
}

/// Receives forwarded view actions
pub trait ActionTarget {
    /// Returns whether the toggle was applied
    fn toggle_playback(&mut self) -> bool;
}

impl ActionTarget for PreviewSession {
    fn toggle_playback(&mut self) -> bool {
        PreviewSession::toggle_playback(self)
    }
}

impl ActionTarget for PlaybackController {
    fn toggle_playback(&mut self) -> bool {
        self.toggle()
    }
}

/// Forward an action verbatim
pub fn dispatch<T: ActionTarget + ?Sized>(action: ViewAction, target: &mut T) -> bool {
    match action {
        ViewAction::TogglePlayback => target.toggle_playback(),
    }
}
