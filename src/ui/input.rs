/// Input adapters: touch buttons and the terminal keyboard/mouse.
///
/// Touch samples arrive in the panel's native touch frame and are hit-
/// tested against a fixed button table. The terminal side tracks which
/// keys are held so that auto-repeat never counts as a fresh press (a
/// held A would otherwise toggle pause every frame).
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind,
};

use crate::config::InputConfig;
use crate::domain::entity::Button;
use crate::error::Result;

// ══════════════════════════════════════════════════════════════
// Touch
// ══════════════════════════════════════════════════════════════

/// One on-screen button in touch coordinates (touch x runs along the
/// panel's native y axis).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonBox {
    pub button: Button,
    pub x0: u16,
    pub y0: u16,
    /// Palette index of the face.
    pub color: u8,
    pub w: u16,
    pub h: u16,
}

impl ButtonBox {
    const fn new(button: Button, x0: u16, y0: u16, color: u8, w: u16, h: u16) -> Self {
        ButtonBox { button, x0, y0, color, w, h }
    }

    fn contains(&self, x: u16, y: u16, slack: u16) -> bool {
        let (x, y) = (x as i32, y as i32);
        let d = slack as i32;
        x >= self.x0 as i32 - d
            && x < (self.x0 + self.w) as i32 + d
            && y >= self.y0 as i32 - d
            && y < (self.y0 + self.h) as i32 + d
    }
}

pub const BUTTONS: [ButtonBox; 6] = [
    ButtonBox::new(Button::Up, 255, 610, 15, 100, 55),
    ButtonBox::new(Button::Left, 370, 675, 15, 100, 55),
    ButtonBox::new(Button::Right, 140, 675, 15, 100, 55),
    ButtonBox::new(Button::Down, 255, 740, 15, 100, 55),
    ButtonBox::new(Button::A, 0, 620, 6, 60, 60),
    ButtonBox::new(Button::B, 420, 620, 2, 60, 60),
];

/// First button whose box holds `(x, y)`. Direction boxes are widened
/// by `slack` on every side.
pub fn hit_test(x: u16, y: u16, slack: u16) -> Option<Button> {
    BUTTONS
        .iter()
        .find(|b| b.contains(x, y, if b.button.is_direction() { slack } else { 0 }))
        .map(|b| b.button)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TouchSample {
    /// Active touch points; coordinates are meaningful only when ≥ 1.
    pub count: u8,
    pub x: u16,
    pub y: u16,
}

/// Platform touch controller.
pub trait TouchSink {
    /// Latest sample, or `None` when nothing new was reported.
    fn read(&mut self) -> Result<Option<TouchSample>>;
}

/// Turns touch samples into button presses. A and B share one debounce
/// window; a press inside it is dropped.
pub struct TouchInput {
    slack: u16,
    debounce: Duration,
    last_action: Option<Instant>,
}

impl TouchInput {
    pub fn new(cfg: &InputConfig) -> Self {
        TouchInput {
            slack: cfg.touch_slack,
            debounce: Duration::from_millis(cfg.debounce_ms),
            last_action: None,
        }
    }

    pub fn feed(&mut self, sample: TouchSample, now: Instant) -> Option<Button> {
        if sample.count == 0 {
            return None;
        }
        let button = hit_test(sample.x, sample.y, self.slack)?;
        if !button.is_direction() {
            if let Some(t) = self.last_action {
                if now.saturating_duration_since(t) < self.debounce {
                    return None;
                }
            }
            self.last_action = Some(now);
        }
        Some(button)
    }
}

// ══════════════════════════════════════════════════════════════
// Keyboard and mouse
// ══════════════════════════════════════════════════════════════

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the most recent
    /// `drain_events()` call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Terminal cells clicked or dragged over this frame.
    pub mouse_presses: Vec<(u16, u16)>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            mouse_presses: Vec::with_capacity(4),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events. Call once per frame, before `step`.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();
        self.mouse_presses.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => self.on_key(key, Instant::now()),
                Ok(Event::Mouse(m)) => {
                    if matches!(m.kind, MouseEventKind::Down(_) | MouseEventKind::Drag(_)) {
                        self.mouse_presses.push((m.column, m.row));
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("terminal event read failed: {e}");
                    break;
                }
            }
        }

        // Expire keys that have timed out (fallback for terminals without Release)
        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn on_key(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            _ => {
                let was_held = self
                    .last_active
                    .get(&key.code)
                    .is_some_and(|t| now.duration_since(*t) < HOLD_TIMEOUT);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    /// Convenience: was any of these keys freshly pressed?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Fresh presses mapped to game buttons, in arrival order.
    pub fn buttons(&self) -> impl Iterator<Item = Button> + '_ {
        self.fresh_presses.iter().filter_map(|&c| button_for_key(c))
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    pub fn quit_requested(&self) -> bool {
        self.ctrl_c_pressed()
            || self.any_pressed(&[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')])
    }
}

pub fn button_for_key(code: KeyCode) -> Option<Button> {
    match code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(Button::Up),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(Button::Down),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(Button::Left),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Button::Right),
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('z') | KeyCode::Char('Z') => {
            Some(Button::A)
        }
        KeyCode::Backspace | KeyCode::Char('x') | KeyCode::Char('X') => Some(Button::B),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(x: u16, y: u16) -> TouchSample {
        TouchSample { count: 1, x, y }
    }

    fn adapter() -> TouchInput {
        TouchInput::new(&InputConfig { debounce_ms: 250, touch_slack: 15 })
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn buttons_hit_inside_their_boxes() {
        assert_eq!(hit_test(300, 630, 0), Some(Button::Up));
        assert_eq!(hit_test(400, 700, 0), Some(Button::Left));
        assert_eq!(hit_test(150, 700, 0), Some(Button::Right));
        assert_eq!(hit_test(300, 790, 0), Some(Button::Down));
        assert_eq!(hit_test(30, 650, 0), Some(Button::A));
        assert_eq!(hit_test(450, 650, 0), Some(Button::B));
        assert_eq!(hit_test(240, 300, 15), None);
    }

    #[test]
    fn slack_widens_directions_only() {
        // 10 px left of UP
        assert_eq!(hit_test(245, 630, 0), None);
        assert_eq!(hit_test(245, 630, 15), Some(Button::Up));
        // 5 px right of A
        assert_eq!(hit_test(65, 640, 15), None);
        // below DOWN's box, within slack
        assert_eq!(hit_test(300, 800, 15), Some(Button::Down));
    }

    #[test]
    fn overlapping_slack_prefers_table_order() {
        // Between UP (y < 665) and LEFT (y >= 675), inside both widened boxes
        assert_eq!(hit_test(360, 668, 15), Some(Button::Up));
    }

    #[test]
    fn action_buttons_are_debounced() {
        let mut input = adapter();
        let t0 = Instant::now();
        assert_eq!(input.feed(touch(30, 650), t0), Some(Button::A));
        assert_eq!(input.feed(touch(30, 650), t0 + Duration::from_millis(100)), None);
        assert_eq!(input.feed(touch(450, 650), t0 + Duration::from_millis(200)), None);
        assert_eq!(input.feed(touch(450, 650), t0 + Duration::from_millis(300)), Some(Button::B));
    }

    #[test]
    fn directions_are_never_debounced() {
        let mut input = adapter();
        let t0 = Instant::now();
        assert_eq!(input.feed(touch(30, 650), t0), Some(Button::A));
        for _ in 0..3 {
            assert_eq!(input.feed(touch(300, 630), t0), Some(Button::Up));
        }
    }

    #[test]
    fn empty_or_missed_touches_are_ignored() {
        let mut input = adapter();
        let now = Instant::now();
        assert_eq!(input.feed(TouchSample { count: 0, x: 300, y: 630 }, now), None);
        assert_eq!(input.feed(touch(200, 100), now), None);
    }

    #[test]
    fn keys_map_to_buttons() {
        assert_eq!(button_for_key(KeyCode::Char('w')), Some(Button::Up));
        assert_eq!(button_for_key(KeyCode::Left), Some(Button::Left));
        assert_eq!(button_for_key(KeyCode::Enter), Some(Button::A));
        assert_eq!(button_for_key(KeyCode::Char(' ')), Some(Button::A));
        assert_eq!(button_for_key(KeyCode::Backspace), Some(Button::B));
        assert_eq!(button_for_key(KeyCode::Char('q')), None);
    }

    #[test]
    fn repeats_are_not_fresh_presses() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        input.on_key(press(KeyCode::Enter), t0);
        input.on_key(press(KeyCode::Enter), t0 + Duration::from_millis(30));
        assert_eq!(input.buttons().collect::<Vec<_>>(), vec![Button::A]);

        input.fresh_presses.clear();
        input.on_key(press(KeyCode::Enter), t0 + Duration::from_millis(400));
        assert!(input.was_pressed(KeyCode::Enter));
    }

    #[test]
    fn quit_keys() {
        let mut input = InputState::new();
        assert!(!input.quit_requested());
        input.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), Instant::now());
        assert!(input.quit_requested());
    }
}
