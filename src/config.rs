//! Application configuration.
//!
//! Tunables come from two layers: a JSON file (usually
//! `$XDG_CONFIG_HOME/xtagbar/config.json`) parsed with serde, and
//! `XTAGBAR_*` environment variables that override individual fields on
//! top of it. Every field is optional: a minimal `{}` file is valid and
//! everything falls back to compiled-in defaults.
//!
//! # Example
//!
//! ```json
//! {
//!   "font": "monospace-11",
//!   "background": "#1d2021",
//!   "foreground": "#ebdbb2",
//!   "focus": "#458588",
//!   "workspaces": 9,
//!   "status_command": "date '+%a %b %d %H:%M:%S'",
//!   "right_commands": ["sb-battery", "sb-volume"],
//!   "interval_secs": 1
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Hard cap on the workspace count.
pub const MAX_WORKSPACES: u32 = 20;

/// Left/right margin inside the bar and around the status gap, in pixels.
pub const PADDING: i32 = 8;
/// Extra width added to each workspace tag label.
pub const TAG_PADDING: i32 = 6;
/// Horizontal gap between adjacent tags.
pub const TAG_SPACING: i32 = 12;
/// The bar never shrinks below this content width.
pub const MIN_CONTENT_WIDTH: i32 = 200;
/// Byte capacity of each child's line accumulator.
pub const MAX_TEXT: usize = 512;
/// Poll timeout; bounds restart latency and tick granularity.
pub const TICK_MS: i32 = 100;

const DEFAULT_FONT: &str = "xterm-12";
const DEFAULT_BG: &str = "#ffffff";
const DEFAULT_FG: &str = "#000000";
const DEFAULT_FOCUS: &str = "#1e90ff";
const DEFAULT_WS_COUNT: u32 = 9;
const DEFAULT_HEIGHT: u32 = 28;
const DEFAULT_CMD: &str = "date '+%a %b %d %H:%M:%S'";
const DEFAULT_INTERVAL_SECS: u64 = 1;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Xft font name (fontconfig syntax, e.g. `"monospace-12"`).
    pub font: String,
    /// Bar background color spec.
    pub background: String,
    /// Text color spec.
    pub foreground: String,
    /// Focused-tag highlight color spec.
    pub focus: String,
    /// Number of workspaces shown, clamped to `1..=MAX_WORKSPACES`.
    pub workspaces: u32,
    /// Bar height in pixels.
    pub height: u32,
    /// Stretch the bar across the whole screen instead of centering it.
    pub fullscreen: bool,
    /// Primary status command, run through `sh -c` and supervised.
    pub status_command: String,
    /// Right-aligned module commands, in display order.
    pub right_commands: Vec<String>,
    /// Workspace-switch command template; `%d` is replaced by the 1-based
    /// workspace id. `None` uses the wmctrl/xdotool fallback chain.
    pub switch_command: Option<String>,
    /// Child restart delay and periodic-redraw interval, in seconds.
    pub interval_secs: u64,
    /// File whose first line holds the focused workspace id.
    pub focused_path: Option<PathBuf>,
    /// File listing the occupied workspace ids.
    pub occupied_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let state_dir = std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".wm"));
        Self {
            font: DEFAULT_FONT.into(),
            background: DEFAULT_BG.into(),
            foreground: DEFAULT_FG.into(),
            focus: DEFAULT_FOCUS.into(),
            workspaces: DEFAULT_WS_COUNT,
            height: DEFAULT_HEIGHT,
            fullscreen: false,
            status_command: DEFAULT_CMD.into(),
            right_commands: Vec::new(),
            switch_command: None,
            interval_secs: DEFAULT_INTERVAL_SECS,
            focused_path: state_dir.as_ref().map(|d| d.join("focused.workspace")),
            occupied_path: state_dir.as_ref().map(|d| d.join("occupied.workspace")),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config.normalized())
    }

    /// Overlay `XTAGBAR_*` environment variables onto `self`.
    ///
    /// Recognised: `FONT`, `BG`, `FG`, `FOCUS`, `WS_COUNT`, `HEIGHT`,
    /// `FULLSCREEN`, `CMD`, `RIGHT_CMDS` (`;`-separated), `WS_SWITCH_CMD`,
    /// `INTERVAL`, `FOCUSED_FILE`, `OCCUPIED_FILE`, each prefixed with
    /// `XTAGBAR_`. Unparsable numeric values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("XTAGBAR_FONT") {
            self.font = v;
        }
        if let Ok(v) = std::env::var("XTAGBAR_BG") {
            self.background = v;
        }
        if let Ok(v) = std::env::var("XTAGBAR_FG") {
            self.foreground = v;
        }
        if let Ok(v) = std::env::var("XTAGBAR_FOCUS") {
            self.focus = v;
        }
        if let Ok(v) = std::env::var("XTAGBAR_WS_COUNT") {
            if let Ok(n) = v.parse() {
                self.workspaces = n;
            }
        }
        if let Ok(v) = std::env::var("XTAGBAR_HEIGHT") {
            if let Ok(n) = v.parse() {
                self.height = n;
            }
        }
        if let Ok(v) = std::env::var("XTAGBAR_FULLSCREEN") {
            self.fullscreen = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = std::env::var("XTAGBAR_CMD") {
            self.status_command = v;
        }
        if let Ok(v) = std::env::var("XTAGBAR_RIGHT_CMDS") {
            self.right_commands = v
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(v) = std::env::var("XTAGBAR_WS_SWITCH_CMD") {
            self.switch_command = Some(v);
        }
        if let Ok(v) = std::env::var("XTAGBAR_INTERVAL") {
            if let Ok(n) = v.parse() {
                self.interval_secs = n;
            }
        }
        if let Ok(v) = std::env::var("XTAGBAR_FOCUSED_FILE") {
            self.focused_path = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("XTAGBAR_OCCUPIED_FILE") {
            self.occupied_path = Some(PathBuf::from(v));
        }
        self.normalized()
    }

    /// Clamp out-of-range values into their valid domains.
    pub fn normalized(mut self) -> Self {
        self.workspaces = self.workspaces.clamp(1, MAX_WORKSPACES);
        if self.height == 0 {
            self.height = DEFAULT_HEIGHT;
        }
        if self.interval_secs == 0 {
            self.interval_secs = DEFAULT_INTERVAL_SECS;
        }
        self
    }

    /// The restart/redraw interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

//  Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.font, DEFAULT_FONT);
        assert_eq!(cfg.workspaces, DEFAULT_WS_COUNT);
        assert_eq!(cfg.height, DEFAULT_HEIGHT);
        assert!(!cfg.fullscreen);
        assert_eq!(cfg.status_command, DEFAULT_CMD);
        assert!(cfg.right_commands.is_empty());
        assert!(cfg.switch_command.is_none());
    }

    #[test]
    fn deserialize_partial_keeps_other_defaults() {
        let json = r##"{ "workspaces": 4, "focus": "#ff0000" }"##;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.workspaces, 4);
        assert_eq!(cfg.focus, "#ff0000");
        assert_eq!(cfg.font, DEFAULT_FONT);
    }

    #[test]
    fn deserialize_right_commands_preserves_order() {
        let json = r#"{ "right_commands": ["vol", "bat", "net"] }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.right_commands, vec!["vol", "bat", "net"]);
    }

    #[test]
    fn unknown_keys_ignored() {
        let json = r#"{ "workspaces": 3, "future_section": { "key": 42 } }"#;
        let _cfg: Config = serde_json::from_str(json).unwrap();
    }

    #[test]
    fn normalized_clamps_workspace_count() {
        let mut cfg = Config::default();
        cfg.workspaces = 0;
        assert_eq!(cfg.clone().normalized().workspaces, 1);
        cfg.workspaces = 99;
        assert_eq!(cfg.normalized().workspaces, MAX_WORKSPACES);
    }

    #[test]
    fn normalized_rejects_zero_height_and_interval() {
        let mut cfg = Config::default();
        cfg.height = 0;
        cfg.interval_secs = 0;
        let cfg = cfg.normalized();
        assert_eq!(cfg.height, DEFAULT_HEIGHT);
        assert_eq!(cfg.interval_secs, DEFAULT_INTERVAL_SECS);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let err = Config::load(Path::new("/nonexistent/xtagbar.json"));
        assert!(err.is_err());
    }
}
