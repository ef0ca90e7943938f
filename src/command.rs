use serde::Deserialize;

/// Wire-level sentinel for "no volume delta supplied".
const NO_DELTA: i32 = -1;

fn default_delta() -> i32 {
    NO_DELTA
}

/// Inbound protocol message from the companion device.
///
/// Only the fields relevant to `command_type` are meaningful; everything else
/// keeps its serde default and is ignored by dispatch. Unknown JSON keys are
/// dropped, unknown `type` values collapse to [`CommandType::Undefined`] and
/// unknown `key` values to [`DpadKey::Unknown`], so a newer companion never
/// breaks an older device.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCommand {
    #[serde(rename = "type", default)]
    pub command_type: CommandType,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub playlist_id: Option<String>,
    #[serde(default)]
    pub playlist_index: Option<i32>,
    #[serde(default)]
    pub current_time_ms: i64,
    #[serde(default)]
    pub subtitle_language_code: Option<String>,
    #[serde(default)]
    pub volume: i32,
    #[serde(default = "default_delta")]
    pub volume_delta: i32,
    #[serde(default)]
    pub key: DpadKey,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub voice_started: bool,
}

impl RemoteCommand {
    pub fn of(command_type: CommandType) -> Self {
        Self {
            command_type,
            video_id: None,
            playlist_id: None,
            playlist_index: None,
            current_time_ms: 0,
            subtitle_language_code: None,
            volume: 0,
            volume_delta: NO_DELTA,
            key: DpadKey::Unknown,
            device_name: None,
            voice_started: false,
        }
    }

    /// Volume delta, filtering out the wire sentinel for "absent".
    /// A delta is sent when the companion drives volume via its hardware
    /// sliders; an absolute volume is sent otherwise.
    pub fn delta(&self) -> Option<i32> {
        if self.volume_delta == NO_DELTA {
            None
        } else {
            Some(self.volume_delta)
        }
    }
}

/// Closed enumeration of companion command types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandType {
    OpenVideo,
    Subtitles,
    UpdatePlaylist,
    Seek,
    Play,
    Pause,
    Next,
    Previous,
    GetState,
    Volume,
    Stop,
    Connected,
    Disconnected,
    Idle,
    Dpad,
    Voice,
    #[default]
    #[serde(other)]
    Undefined,
}

impl CommandType {
    /// How a command of this type affects the connection flag:
    /// `Some(true)` marks the companion as actively driving playback,
    /// `Some(false)` clears it, `None` leaves it untouched.
    pub fn marks_connected(self) -> Option<bool> {
        match self {
            CommandType::Idle | CommandType::Undefined | CommandType::UpdatePlaylist => None,
            CommandType::Stop | CommandType::Disconnected => Some(false),
            _ => Some(true),
        }
    }

    /// Wire name, mostly for log lines.
    pub fn name(self) -> &'static str {
        match self {
            CommandType::OpenVideo => "openVideo",
            CommandType::Subtitles => "subtitles",
            CommandType::UpdatePlaylist => "updatePlaylist",
            CommandType::Seek => "seek",
            CommandType::Play => "play",
            CommandType::Pause => "pause",
            CommandType::Next => "next",
            CommandType::Previous => "previous",
            CommandType::GetState => "getState",
            CommandType::Volume => "volume",
            CommandType::Stop => "stop",
            CommandType::Connected => "connected",
            CommandType::Disconnected => "disconnected",
            CommandType::Idle => "idle",
            CommandType::Dpad => "dpad",
            CommandType::Voice => "voice",
            CommandType::Undefined => "undefined",
        }
    }
}

/// Logical directional keys carried by `Dpad` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DpadKey {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Back,
    #[default]
    #[serde(other)]
    Unknown,
}
