/// Terminal panel: an on-screen stand-in for the LCD and its touch layer.
///
/// How it works:
///   1. The compositor flushes 16×16 blocks into a native-frame
///      `PanelMemory` (800×480 by default)
///   2. `present()` samples that memory into half-block cells: `▀` with
///      the upper pixel as foreground and the lower one as background
///   3. Each cell is compared with the previous frame and only changed
///      cells are emitted, batched with `queue!` and flushed once
///
/// Mouse presses on the panel are turned into touch samples in the same
/// frame a real touch controller would report.

use std::collections::VecDeque;
use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::config::TerminalConfig;
use crate::domain::entity::Button;
use crate::domain::rom::PALETTE_W;
use crate::error::{CoreError, Result};
use crate::ui::display::{DisplaySink, DisplaySpec, PanelMemory};
use crate::ui::input::{ButtonBox, TouchSample, TouchSink, BUTTONS};

// ── Orientation ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Orientation {
    /// Rotated upright: the maze reads top to bottom, buttons below it.
    Portrait,
    /// The panel's own landscape frame.
    Native,
}

impl Orientation {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "native" => Ok(Orientation::Native),
            other => Err(CoreError::Config(format!("unknown orientation {other:?}"))),
        }
    }
}

// ── Action face ──

/// What pressing A does right now, shown on its button face.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActionFace {
    /// Start a game, or resume a paused one.
    Play,
    /// Pause the running game.
    Pause,
}

impl ActionFace {
    pub fn for_game(demo: bool, paused: bool) -> Self {
        if demo || paused { ActionFace::Play } else { ActionFace::Pause }
    }
}

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    top: Color,
    bottom: Color,
}

impl Cell {
    /// Explicit dark background for cells outside the panel, so the gap
    /// between terminal rows matches every painted cell.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { top: Cell::BASE_BG, bottom: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { top: Color::Magenta, bottom: Color::Magenta };

    const GLYPH: &'static str = "▀";
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }
}

// ── Panel geometry ──

/// Maps between the upright view, the native panel and terminal cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Geometry {
    width: u16,
    height: u16,
    orientation: Orientation,
    scale: u16,
}

impl Geometry {
    /// Size of the view as shown, in panel pixels.
    fn view_size(&self) -> (u16, u16) {
        match self.orientation {
            Orientation::Portrait => (self.height, self.width),
            Orientation::Native => (self.width, self.height),
        }
    }

    /// Terminal columns and rows the whole view needs.
    fn cells(&self) -> (usize, usize) {
        let (w, h) = self.view_size();
        let s = self.scale as usize;
        let px_rows = (h as usize).div_ceil(s);
        ((w as usize).div_ceil(s), px_rows.div_ceil(2))
    }

    /// Native pixel behind view pixel `(ux, uy)`.
    fn to_native(&self, ux: u16, uy: u16) -> Option<(u16, u16)> {
        let (w, h) = self.view_size();
        if ux >= w || uy >= h {
            return None;
        }
        Some(match self.orientation {
            Orientation::Portrait => (uy, self.height - 1 - ux),
            Orientation::Native => (ux, uy),
        })
    }

    /// Touch coordinates for a click on terminal cell `(col, row)`; the
    /// touch frame swaps the native axes.
    fn touch_at(&self, col: u16, row: u16) -> Option<(u16, u16)> {
        let s = self.scale as u32;
        let ux = col as u32 * s + s / 2;
        let uy = row as u32 * 2 * s + s;
        let (nx, ny) = self.to_native(u16::try_from(ux).ok()?, u16::try_from(uy).ok()?)?;
        Some((ny, nx))
    }
}

// ── Panel ──

pub struct TerminalPanel {
    writer: BufWriter<io::Stdout>,
    spec: DisplaySpec,
    geometry: Geometry,
    memory: PanelMemory,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    /// Panel memory changed since the last `present`.
    dirty: bool,
    touches: VecDeque<TouchSample>,
    enhanced_keys: bool,
    action: ActionFace,
}

impl TerminalPanel {
    pub fn new(spec: DisplaySpec, cfg: &TerminalConfig) -> Result<Self> {
        let geometry = Geometry {
            width: spec.width,
            height: spec.height,
            orientation: Orientation::parse(&cfg.orientation)?,
            scale: cfg.scale.max(1),
        };
        Ok(TerminalPanel {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            spec,
            geometry,
            memory: PanelMemory::new(spec.width, spec.height),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            dirty: true,
            touches: VecDeque::with_capacity(4),
            enhanced_keys: false,
            action: ActionFace::Play,
        })
    }

    /// Enter the alternate screen and paint the button faces. Returns
    /// whether the terminal reports key releases.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.enhanced_keys = true;
        }

        let (cols, rows) = self.geometry.cells();
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if (tw as usize) < cols || (th as usize) < rows {
            log::warn!("terminal {tw}x{th} is smaller than the panel ({cols}x{rows}); view is clipped");
        }
        self.resize(tw as usize, th as usize);

        self.paint_faces();
        Ok(self.enhanced_keys)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced_keys {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, tw: usize, th: usize) {
        self.term_w = tw;
        self.term_h = th;
        let (cols, rows) = self.geometry.cells();
        self.front.resize(cols.min(tw), rows.min(th));
        self.back.resize(cols.min(tw), rows.min(th));
        // Force full repaint: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);
        self.dirty = true;
    }

    /// Queue a touch for a mouse press on terminal cell `(col, row)`.
    /// Presses outside the panel are dropped.
    pub fn mouse_press(&mut self, col: u16, row: u16) {
        if let Some((x, y)) = self.geometry.touch_at(col, row) {
            self.touches.push_back(TouchSample { count: 1, x, y });
        }
    }

    // ── Button faces ──

    fn paint_faces(&mut self) {
        for b in &BUTTONS {
            paint_face(&mut self.memory, &self.spec, b, self.action);
        }
        self.dirty = true;
    }

    /// Repaint the A face when its action flips between play and pause.
    pub fn show_action(&mut self, action: ActionFace) {
        if action == self.action {
            return;
        }
        self.action = action;
        if let Some(b) = BUTTONS.iter().find(|b| b.button == Button::A) {
            paint_face(&mut self.memory, &self.spec, b, action);
            self.dirty = true;
        }
    }

    // ── Output ──

    pub fn present(&mut self) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }
        if !self.dirty {
            return Ok(());
        }
        self.dirty = false;

        for row in 0..self.front.height {
            for col in 0..self.front.width {
                let cell = Cell {
                    top: self.sample(col, row * 2),
                    bottom: self.sample(col, row * 2 + 1),
                };
                self.front.set(col, row, cell);
            }
        }

        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    /// Colour of terminal pixel `(col, prow)`: the first lit panel pixel
    /// in its `scale × scale` block, so one-pixel dots stay visible.
    fn sample(&self, col: usize, prow: usize) -> Color {
        let s = self.geometry.scale as usize;
        let mut inside = false;
        for dy in 0..s {
            for dx in 0..s {
                let (Ok(ux), Ok(uy)) = (u16::try_from(col * s + dx), u16::try_from(prow * s + dy)) else {
                    continue;
                };
                if let Some((nx, ny)) = self.geometry.to_native(ux, uy) {
                    inside = true;
                    let px = self.memory.get(nx, ny);
                    if px != 0 {
                        let (r, g, b) = self.spec.unpack(px);
                        return Color::Rgb { r, g, b };
                    }
                }
            }
        }
        if inside { Color::Rgb { r: 0, g: 0, b: 0 } } else { Cell::BASE_BG }
    }

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Set explicit base colors at start of frame.
        // Do NOT use ResetColor here: it resets to the terminal's native
        // default, which may differ from BASE_BG and cause line artifacts.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.top != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.top))?;
                    last_fg = cell.top;
                }
                if cell.bottom != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bottom))?;
                    last_bg = cell.bottom;
                }
                queue!(self.writer, Print(Cell::GLYPH))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }
}

impl DisplaySink for TerminalPanel {
    fn flush(&mut self, x0: u16, y0: u16, x1: u16, y1: u16, pixels: &[u16]) -> Result<()> {
        self.memory.flush(x0, y0, x1, y1, pixels)?;
        self.dirty = true;
        Ok(())
    }
}

impl TouchSink for TerminalPanel {
    fn read(&mut self) -> Result<Option<TouchSample>> {
        Ok(self.touches.pop_front())
    }
}

/// Paint one button face into native panel memory: the touch box with
/// its axes swapped, filled in the button colour. Direction buttons get a
/// dark arrow, A a red play triangle or pause bars, B stays plain.
fn paint_face(memory: &mut PanelMemory, spec: &DisplaySpec, b: &ButtonBox, action: ActionFace) {
    let (x0, y0, w, h) = (b.y0, b.x0, b.h, b.w);
    memory.fill_rect(x0, y0, w, h, spec.pack(PALETTE_W[b.color as usize]));
    let red = spec.pack(PALETTE_W[1]);

    // Triangle direction in the native frame (upright up is native -x).
    let (vx, vy, ink): (i32, i32, u16) = match (b.button, action) {
        (Button::Up, _) => (-1, 0, 0),
        (Button::Down, _) => (1, 0, 0),
        (Button::Left, _) => (0, 1, 0),
        (Button::Right, _) => (0, -1, 0),
        (Button::A, ActionFace::Play) => (0, -1, red),
        (Button::A, ActionFace::Pause) => {
            // Two bars, upright vertical
            let (bw, bh) = (w * 2 / 3, h / 4);
            let bx = x0 + w / 6;
            memory.fill_rect(bx, y0 + h / 6, bw, bh, red);
            memory.fill_rect(bx, y0 + h - h / 6 - bh, bw, bh, red);
            return;
        }
        (Button::B, _) => return,
    };
    let r = (w.min(h) / 3) as i32;
    let (cx, cy) = ((x0 + w / 2) as i32, (y0 + h / 2) as i32);
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            let (dx, dy) = (x as i32 - cx, y as i32 - cy);
            let along = dx * vx + dy * vy;
            let across = (dx * vy - dy * vx).abs();
            if along >= -r / 2 && along <= r && across * 3 <= (r - along) * 2 {
                memory.fill_rect(x, y, 1, 1, ink);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::input::hit_test;

    fn portrait() -> Geometry {
        Geometry { width: 800, height: 480, orientation: Orientation::Portrait, scale: 8 }
    }

    #[test]
    fn orientation_names() {
        assert_eq!(Orientation::parse("Portrait").unwrap(), Orientation::Portrait);
        assert_eq!(Orientation::parse("native").unwrap(), Orientation::Native);
        assert!(Orientation::parse("sideways").is_err());
    }

    #[test]
    fn portrait_view_is_upright() {
        let g = portrait();
        assert_eq!(g.view_size(), (480, 800));
        assert_eq!(g.cells(), (60, 50));
        assert_eq!(g.to_native(0, 0), Some((0, 479)));
        assert_eq!(g.to_native(479, 799), Some((799, 0)));
        assert_eq!(g.to_native(480, 0), None);
    }

    #[test]
    fn clicks_land_on_the_painted_buttons() {
        let g = portrait();
        let (cols, rows) = g.cells();
        let mut hits = 0;
        for row in 0..rows as u16 {
            for col in 0..cols as u16 {
                let Some((tx, ty)) = g.touch_at(col, row) else { continue };
                let Some(hit) = hit_test(tx, ty, 0) else { continue };
                hits += 1;
                let b = BUTTONS.iter().find(|b| b.button == hit).unwrap();
                let (nx, ny) = (ty, tx);
                assert!(nx >= b.y0 && nx < b.y0 + b.h && ny >= b.x0 && ny < b.x0 + b.w);
            }
        }
        assert!(hits > 0);
    }

    #[test]
    fn faces_carry_colour_and_arrows() {
        let spec = DisplaySpec::from_config(&crate::config::GameConfig::default().display).unwrap();
        let mut memory = PanelMemory::new(800, 480);
        for b in &BUTTONS {
            paint_face(&mut memory, &spec, b, ActionFace::Pause);
        }
        let up = &BUTTONS[0];
        let face = spec.pack(PALETTE_W[up.color as usize]);
        assert_eq!(memory.get(up.y0, up.x0), face);
        assert_eq!(memory.get(up.y0 + up.h / 2, up.x0 + up.w / 2), 0);
        // Gap between the pause bars
        let a = &BUTTONS[4];
        assert_eq!(memory.get(a.y0 + a.h / 2, a.x0 + a.w / 2), spec.pack(PALETTE_W[a.color as usize]));
        assert_eq!(memory.get(a.y0 + a.h / 2, a.x0 + a.w / 6 + 2), spec.pack(PALETTE_W[1]));
    }

    #[test]
    fn action_face_follows_game_mode() {
        assert_eq!(ActionFace::for_game(true, false), ActionFace::Play);
        assert_eq!(ActionFace::for_game(false, true), ActionFace::Play);
        assert_eq!(ActionFace::for_game(false, false), ActionFace::Pause);
    }

    #[test]
    fn a_face_repaints_on_play_pause_flips() {
        let cfg = crate::config::GameConfig::default();
        let spec = DisplaySpec::from_config(&cfg.display).unwrap();
        let mut panel = TerminalPanel::new(spec, &cfg.terminal).unwrap();
        panel.paint_faces();
        let a = &BUTTONS[4];
        let (cx, cy) = (a.y0 + a.h / 2, a.x0 + a.w / 2);
        let red = spec.pack(PALETTE_W[1]);
        let face = spec.pack(PALETTE_W[a.color as usize]);
        assert_eq!(panel.memory.get(cx, cy), red);

        panel.dirty = false;
        panel.show_action(ActionFace::Pause);
        assert!(panel.dirty);
        assert_eq!(panel.memory.get(cx, cy), face);

        // No flip, no repaint
        panel.dirty = false;
        panel.show_action(ActionFace::Pause);
        assert!(!panel.dirty);

        panel.show_action(ActionFace::Play);
        assert_eq!(panel.memory.get(cx, cy), red);
    }

    #[test]
    fn portrait_button_layout() {
        let g = portrait();
        // Upright: LEFT sits left of RIGHT, UP above DOWN.
        let find = |want: Button| {
            let (cols, rows) = g.cells();
            (0..rows as u16)
                .flat_map(|r| (0..cols as u16).map(move |c| (c, r)))
                .find(|&(c, r)| g.touch_at(c, r).and_then(|(x, y)| hit_test(x, y, 0)) == Some(want))
        };
        let left = find(Button::Left).unwrap();
        let right = find(Button::Right).unwrap();
        let up = find(Button::Up).unwrap();
        let down = find(Button::Down).unwrap();
        assert!(left.0 < right.0);
        assert!(up.1 < down.1);
        // Field rows are above every button.
        assert!(up.1 as usize * 16 >= 2 * (36 * 8 + 16) - 16);
    }

    #[test]
    fn native_clicks_swap_axes() {
        let g = Geometry { width: 800, height: 480, orientation: Orientation::Native, scale: 4 };
        // cell (col 10, row 5): native pixel (42, 44) -> touch (44, 42)
        assert_eq!(g.touch_at(10, 5), Some((44, 42)));
        assert_eq!(g.touch_at(500, 0), None);
    }
}
