/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Up / Down / Left / Right
///   Start / A             →  A (start, pause)
///   Select                →  B (back to attract mode)
///
/// Only edges are reported: directions latch in the playfield, so a held
/// stick never needs repeating.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button as PadButton, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::entity::Button;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    L2,      // LeftTrigger2
    R2,      // RightTrigger2
    Start,
    Select,
}

const BTN_COUNT: usize = 10;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: PadButton) -> Option<Btn> {
        match btn {
            PadButton::South     => Some(Btn::A),
            PadButton::East      => Some(Btn::B),
            PadButton::West      => Some(Btn::X),
            PadButton::North     => Some(Btn::Y),
            PadButton::LeftTrigger  => Some(Btn::L1),
            PadButton::RightTrigger => Some(Btn::R1),
            PadButton::LeftTrigger2  => Some(Btn::L2),
            PadButton::RightTrigger2 => Some(Btn::R2),
            PadButton::Start     => Some(Btn::Start),
            PadButton::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Per-button state: held (continuous) and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

impl BtnState {
    fn set(&mut self, held: bool) {
        if held && !self.held {
            self.just_pressed = true;
        }
        self.held = held;
    }
}

/// Which pad buttons act as the game's A and B.
struct ActionMap {
    start: Vec<Btn>,
    reset: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            start: vec![Btn::Start, Btn::A],
            reset: vec![Btn::Select],
        }
    }
}

/// Index order of `dpad` and `stick`.
const DIRECTIONS: [Button; 4] = [Button::Up, Button::Down, Button::Left, Button::Right];

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    // All tracked buttons (indexed by Btn)
    buttons: [BtnState; BTN_COUNT],

    dpad: [BtnState; 4],
    stick: [BtnState; 4],
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
}

fn btn_index(btn: Btn) -> usize {
    btn as usize
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = {
            match Gilrs::new() {
                Ok(g) => {
                    let has_pad = g.gamepads().next().is_some();
                    (Some(g), has_pad)
                }
                Err(e) => {
                    log::warn!("gamepad backend unavailable: {e}");
                    (None, false)
                }
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BTN_COUNT],
            dpad: [BtnState::default(); 4],
            stick: [BtnState::default(); 4],
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config. Empty or unrecognised lists keep
    /// the default.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter().filter_map(|s| Btn::from_name(s)).collect()
        }
        let start = parse_list(&cfg.start);
        if !start.is_empty() { self.action_map.start = start; }
        let reset = parse_list(&cfg.reset);
        if !reset.is_empty() { self.action_map.reset = reset; }
    }

    pub fn update(&mut self) {
        self.clear_just_pressed();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => { self.connected = true; }
                EventType::Disconnected => {
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }

        self.apply_stick();
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, pad_btn: PadButton, held: bool) {
        // D-pad handled separately (not in Btn enum)
        let dpad = match pad_btn {
            PadButton::DPadUp => Some(0),
            PadButton::DPadDown => Some(1),
            PadButton::DPadLeft => Some(2),
            PadButton::DPadRight => Some(3),
            _ => None,
        };
        if let Some(i) = dpad {
            self.dpad[i].set(held);
        } else if let Some(btn) = Btn::from_gilrs(pad_btn) {
            self.press(btn, held);
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn press(&mut self, btn: Btn, held: bool) {
        self.buttons[btn_index(btn)].set(held);
    }

    /// Derive the stick's digital states from its axes.
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn apply_stick(&mut self) {
        self.stick[0].set(self.stick_y > STICK_DEADZONE);
        self.stick[1].set(self.stick_y < -STICK_DEADZONE);
        self.stick[2].set(self.stick_x < -STICK_DEADZONE);
        self.stick[3].set(self.stick_x > STICK_DEADZONE);
    }

    // ── Queries ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[btn_index(b)].just_pressed)
    }

    /// Game buttons pressed since the last `update`: directions first,
    /// then A, then B.
    pub fn pressed(&self) -> Vec<Button> {
        let mut out: Vec<Button> = DIRECTIONS
            .iter()
            .enumerate()
            .filter(|&(i, _)| self.dpad[i].just_pressed || self.stick[i].just_pressed)
            .map(|(_, &b)| b)
            .collect();
        if self.any_just_pressed(&self.action_map.start) {
            out.push(Button::A);
        }
        if self.any_just_pressed(&self.action_map.reset) {
            out.push(Button::B);
        }
        out
    }

    // ── Internal ──

    fn clear_just_pressed(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            b.just_pressed = false;
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            *b = BtnState::default();
        }
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad() -> GamepadState {
        let mut p = GamepadState::new();
        p.load_button_config(&GamepadConfig {
            start: vec!["Start".into(), "A".into()],
            reset: vec!["Select".into()],
        });
        p
    }

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!(Btn::from_name("start"), Some(Btn::Start));
        assert_eq!(Btn::from_name("Back"), Some(Btn::Select));
        assert_eq!(Btn::from_name("rb"), Some(Btn::R1));
        assert_eq!(Btn::from_name("turbo"), None);
    }

    #[test]
    fn action_buttons_map_to_a_and_b() {
        let mut p = pad();
        p.press(Btn::A, true);
        assert_eq!(p.pressed(), vec![Button::A]);
        p.clear_just_pressed();
        p.press(Btn::Select, true);
        assert_eq!(p.pressed(), vec![Button::B]);
    }

    #[test]
    fn held_buttons_fire_once() {
        let mut p = pad();
        p.press(Btn::Start, true);
        assert_eq!(p.pressed().len(), 1);
        p.clear_just_pressed();
        p.press(Btn::Start, true);
        assert!(p.pressed().is_empty());
        p.press(Btn::Start, false);
        p.press(Btn::Start, true);
        assert_eq!(p.pressed(), vec![Button::A]);
    }

    #[test]
    fn stick_respects_deadzone() {
        let mut p = pad();
        p.stick_x = -0.2;
        p.apply_stick();
        assert!(p.pressed().is_empty());
        p.stick_x = -0.6;
        p.stick_y = 0.9;
        p.apply_stick();
        assert_eq!(p.pressed(), vec![Button::Up, Button::Left]);
    }

    #[test]
    fn empty_config_keeps_defaults() {
        let mut p = GamepadState::new();
        p.load_button_config(&GamepadConfig { start: vec!["nope".into()], reset: vec![] });
        p.press(Btn::Start, true);
        p.press(Btn::Select, true);
        assert_eq!(p.pressed(), vec![Button::A, Button::B]);
    }
}
