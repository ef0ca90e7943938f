use serde::{Deserialize, Serialize};

use crate::command::RemoteCommand;

/// A playable item as the session manager sees it.
///
/// `playlist_id` is the playlist identity assigned by the companion;
/// `playlist_params` are local continuation parameters that become stale as
/// soon as the companion takes over the playlist. Serde derives let stores
/// persist the "last video" fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub video_id: String,
    #[serde(default)]
    pub playlist_id: Option<String>,
    #[serde(default)]
    pub playlist_index: Option<i32>,
    #[serde(default)]
    pub playlist_params: Option<String>,
    #[serde(default)]
    pub is_remote: bool,
}

impl Video {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            playlist_id: None,
            playlist_index: None,
            playlist_params: None,
            is_remote: false,
        }
    }

    /// Build a remote-originated video from an open-video/subtitles command.
    pub fn from_command(command: &RemoteCommand) -> Option<Self> {
        let video_id = command.video_id.clone()?;
        Some(Self {
            video_id,
            playlist_id: command.playlist_id.clone(),
            playlist_index: command.playlist_index,
            playlist_params: None,
            is_remote: true,
        })
    }

    /// Identity used by the open-video dedup: same item means same
    /// `(video_id, playlist_id)` pair, regardless of index or flags.
    pub fn same_item(&self, other: &Video) -> bool {
        self.video_id == other.video_id && self.playlist_id == other.playlist_id
    }
}

/// Full "what is playing" snapshot pushed to the companion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayingSnapshot {
    pub video_id: Option<String>,
    pub position_ms: i64,
    pub duration_ms: i64,
    pub is_playing: bool,
}

impl PlayingSnapshot {
    /// The exact "nothing playing" shape the companion expects.
    pub fn idle() -> Self {
        Self {
            video_id: None,
            position_ms: -1,
            duration_ms: -1,
            is_playing: false,
        }
    }
}

/// Incremental playback-state snapshot (position/duration/play flag only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub position_ms: i64,
    pub duration_ms: i64,
    pub is_playing: bool,
}

/// One selectable subtitle track exposed by the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTrack {
    pub id: i32,
    pub language: Option<String>,
}

/// What the player does when the current item finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    Close,
    Pause,
    One,
    All,
    List,
    Shuffle,
}
