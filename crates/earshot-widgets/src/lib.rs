//! View layer for earshot audio previews
//!
//! Framework-agnostic pieces a host UI builds on:
//!
//! - **View model**: [`PreviewView`] derived from a [`PlaybackSession`] snapshot
//! - **Actions**: [`ViewAction`] forwarded verbatim to the session
//! - **Time readout**: [`format_time`] (`[HH:]MM:SS`, truncating)
//! - **Labels**: user-visible text, replaceable for localisation
//! - **Peak generation**: min/max per column for drawing the waveform
//!
//! [`PlaybackSession`]: earshot_core::PlaybackSession

pub mod labels;
pub mod peaks;
pub mod time;
pub mod view;

pub use labels::Labels;
pub use peaks::{generate_peaks, normalize_peaks, smooth_peaks, PEAK_SMOOTHING_WINDOW};
pub use time::format_time;
pub use view::{dispatch, ActionTarget, PlayerView, PreviewView, TransportButton, ViewAction};
