/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub display: DisplayConfig,
    pub input: InputConfig,
    pub gamepad: GamepadConfig,
    pub sound: SoundConfig,
    pub terminal: TerminalConfig,
    pub seed: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub frame_ms: u64,
}

/// Panel geometry and pixel format, validated by `ui::display`.
#[derive(Clone, Debug)]
pub struct DisplayConfig {
    pub width: u16,
    pub height: u16,
    pub bits_per_pixel: u8,
    pub color_order: String,
}

#[derive(Clone, Debug)]
pub struct InputConfig {
    pub debounce_ms: u64,
    pub touch_slack: u16,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub start: Vec<String>,
    pub reset: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct SoundConfig {
    pub enabled: bool,
}

#[derive(Clone, Debug)]
pub struct TerminalConfig {
    pub scale: u16,
    pub orientation: String,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    display: TomlDisplay,
    #[serde(default)]
    input: TomlInput,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    sound: TomlSound,
    #[serde(default)]
    terminal: TomlTerminal,
    #[serde(default)]
    game: TomlGame,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlDisplay {
    #[serde(default = "default_width")]
    width: u16,
    #[serde(default = "default_height")]
    height: u16,
    #[serde(default = "default_bpp")]
    bits_per_pixel: u8,
    #[serde(default = "default_color_order")]
    color_order: String,
}

#[derive(Deserialize, Debug)]
struct TomlInput {
    #[serde(default = "default_debounce")]
    debounce_ms: u64,
    #[serde(default = "default_slack")]
    touch_slack: u16,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_start")]
    start: Vec<String>,
    #[serde(default = "default_reset")]
    reset: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlSound {
    #[serde(default = "default_sound_enabled")]
    enabled: bool,
}

#[derive(Deserialize, Debug)]
struct TomlTerminal {
    #[serde(default = "default_scale")]
    scale: u16,
    #[serde(default = "default_orientation")]
    orientation: String,
}

#[derive(Deserialize, Debug, Default)]
struct TomlGame {
    #[serde(default)]
    seed: Option<u64>,
}

// ── Defaults ──

fn default_frame_ms() -> u64 { 34 }     // ~30 Hz
fn default_width() -> u16 { 800 }
fn default_height() -> u16 { 480 }
fn default_bpp() -> u8 { 16 }
fn default_color_order() -> String { "rgb".into() }
fn default_debounce() -> u64 { 250 }
fn default_slack() -> u16 { 15 }
fn default_start() -> Vec<String> { vec!["Start".into(), "A".into()] }
fn default_reset() -> Vec<String> { vec!["Select".into()] }
fn default_sound_enabled() -> bool { true }
fn default_scale() -> u16 { 8 }         // virtual panel pixels per terminal column
fn default_orientation() -> String { "portrait".into() }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming { frame_ms: default_frame_ms() }
    }
}

impl Default for TomlDisplay {
    fn default() -> Self {
        TomlDisplay {
            width: default_width(),
            height: default_height(),
            bits_per_pixel: default_bpp(),
            color_order: default_color_order(),
        }
    }
}

impl Default for TomlInput {
    fn default() -> Self {
        TomlInput {
            debounce_ms: default_debounce(),
            touch_slack: default_slack(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            start: default_start(),
            reset: default_reset(),
        }
    }
}

impl Default for TomlSound {
    fn default() -> Self {
        TomlSound { enabled: default_sound_enabled() }
    }
}

impl Default for TomlTerminal {
    fn default() -> Self {
        TomlTerminal {
            scale: default_scale(),
            orientation: default_orientation(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) XDG data home, (4) system data directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        Self::from_toml(load_toml(&search_dirs))
    }

    /// Parse a config document directly. Used by `load` and by tests.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<TomlConfig>(text).map(Self::from_toml)
    }

    fn from_toml(cfg: TomlConfig) -> Self {
        GameConfig {
            timing: TimingConfig {
                frame_ms: cfg.timing.frame_ms.max(1),
            },
            display: DisplayConfig {
                width: cfg.display.width,
                height: cfg.display.height,
                bits_per_pixel: cfg.display.bits_per_pixel,
                color_order: cfg.display.color_order,
            },
            input: InputConfig {
                debounce_ms: cfg.input.debounce_ms,
                touch_slack: cfg.input.touch_slack,
            },
            gamepad: GamepadConfig {
                start: cfg.gamepad.start,
                reset: cfg.gamepad.reset,
            },
            sound: SoundConfig {
                enabled: cfg.sound.enabled,
            },
            terminal: TerminalConfig {
                scale: cfg.terminal.scale,
                orientation: cfg.terminal.orientation,
            },
            seed: cfg.game.seed,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default())
    }
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so an installed link still finds data next to the real binary.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/pacfield");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    let sys = PathBuf::from("/usr/share/pacfield");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => {
                        log::info!("config loaded from {}", path.display());
                        return cfg;
                    }
                    Err(e) => {
                        log::warn!("config.toml parse error: {e}; using default settings");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    log::warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = GameConfig::parse("").unwrap();
        assert_eq!(cfg.timing.frame_ms, 34);
        assert_eq!(cfg.display.width, 800);
        assert_eq!(cfg.display.height, 480);
        assert_eq!(cfg.display.bits_per_pixel, 16);
        assert_eq!(cfg.display.color_order, "rgb");
        assert_eq!(cfg.input.debounce_ms, 250);
        assert_eq!(cfg.input.touch_slack, 15);
        assert!(cfg.sound.enabled);
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::parse(
            "[display]\nbits_per_pixel = 18\ncolor_order = \"bgr\"\n\n[game]\nseed = 7\n",
        )
        .unwrap();
        assert_eq!(cfg.display.bits_per_pixel, 18);
        assert_eq!(cfg.display.color_order, "bgr");
        assert_eq!(cfg.display.width, 800);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.gamepad.reset, vec!["Select".to_string()]);
    }

    #[test]
    fn zero_frame_period_is_clamped() {
        let cfg = GameConfig::parse("[timing]\nframe_ms = 0\n").unwrap();
        assert_eq!(cfg.timing.frame_ms, 1);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(GameConfig::parse("[display\nwidth = ").is_err());
    }
}
