use std::sync::Arc;

use crate::keys::KeyStroke;
use crate::models::{PlaybackMode, SubtitleTrack, Video};

// Collaborator contracts. The hosting playback app implements these; the
// session core only ever talks to playback, screen, audio and input through
// them, with errors surfaced as typed values instead of being swallowed.

/// The active player surface. Present only while a player UI exists.
pub trait PlayerFacade: Send + Sync {
    fn position_ms(&self) -> i64;
    fn duration_ms(&self) -> i64;
    fn is_playing(&self) -> bool;
    /// Whether playback resumes as soon as the engine is ready.
    fn play_when_ready(&self) -> bool;

    fn set_position_ms(&self, position_ms: i64);
    fn set_play_when_ready(&self, play: bool);

    fn subtitle_tracks(&self) -> Vec<SubtitleTrack>;
    fn select_subtitle_track(&self, track: &SubtitleTrack);
    fn show_subtitles(&self, visible: bool);
    fn set_subtitle_indicator(&self, enabled: bool);

    fn show_overlay(&self, visible: bool);
    fn close(&self);
}

/// Playback engine surface wider than one player UI: current item, queue
/// advance and open requests.
pub trait PlaybackHost: Send + Sync {
    /// The active player, if any UI is up.
    fn player(&self) -> Option<Arc<dyn PlayerFacade>>;
    /// Whether a playback session exists at all (engine may be backgrounded
    /// with no player UI).
    fn has_session(&self) -> bool;
    fn current_video(&self) -> Option<Video>;
    /// Open a video from scratch, replacing whatever plays now.
    fn open_video(&self, video: Video);
    /// Swap the metadata of the current item without restarting playback.
    fn replace_current_video(&self, video: Video);
    fn advance_next(&self);
    fn advance_previous(&self);
    fn playback_mode(&self) -> PlaybackMode;
    /// True when running inside an embedded/child playback surface, which
    /// must never publish state upstream.
    fn is_embedded(&self) -> bool;
}

/// App-level screen and affordance control.
pub trait ScreenControl: Send + Sync {
    fn bring_playback_to_foreground(&self);
    fn bring_app_to_foreground(&self);
    fn is_playback_foreground(&self) -> bool;
    fn show_notice(&self, message: &str);
    fn finish_app(&self);
    fn start_voice_search(&self);
    fn stop_voice_search(&self);
}

/// System volume access plus a change feed for the volume watcher.
pub trait AudioControl: Send + Sync {
    fn volume(&self) -> i32;
    fn set_volume(&self, volume: i32);
    /// Watch receiver carrying the current volume; every local or remote
    /// change must be visible here.
    fn volume_updates(&self) -> tokio::sync::watch::Receiver<i32>;
}

/// Sink for synthesized key events.
pub trait KeySink: Send + Sync {
    fn send(&self, stroke: KeyStroke);
}
