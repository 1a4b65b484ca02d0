/// Tile compositor: redraws dirty playfield cells onto the panel.
///
/// Each 8×8 cell is built as palette indices (background, then the five
/// actors and the active bonus on top), rotated a quarter turn counter-
/// clockwise, doubled to 16×16 and packed to 16-bit pixels before it is
/// flushed. The field sits in a 240×320 virtual screen, centred.

use log::warn;

use crate::domain::maze::MAP_W;
use crate::domain::rom::{self, Rom};
use crate::domain::tile::{Tile, EMPTY};
use crate::error::Result;
use crate::sim::world::{
    GameState, Playfield, ICON_ROW, READY_FIRST, READY_LAST, READY_ROW, SCORE_ROW, TEXT_LEN,
};
use crate::ui::display::{DisplaySink, DisplaySpec};

/// Side of a composed cell on the panel.
pub const BLOCK: u16 = 16;

const OFFSET_X: i32 = (240 - 224) / 2;
const OFFSET_Y: i32 = (320 - 288) / 2;

const HISCORE_COL: i16 = 10;
const DEMO_TEXT: &[u8; 6] = b" DEMO ";
const PAUSED_TEXT: &[u8; 6] = b"PAUSED";

pub struct Compositor {
    rom: Rom,
    palette: [u16; 16],
    scr_height: i32,
    block: [u16; (BLOCK * BLOCK) as usize],
}

impl Compositor {
    pub fn new(rom: Rom, spec: &DisplaySpec) -> Self {
        let palette = std::array::from_fn(|i| spec.pack(rom::PALETTE_W[i]));
        Compositor {
            rom,
            palette,
            scr_height: spec.height as i32,
            block: [0; (BLOCK * BLOCK) as usize],
        }
    }

    /// Panel rectangle origin for cell `(cx, cy)`.
    pub fn origin(&self, cx: i16, cy: i16) -> Option<(u16, u16)> {
        let x = cx as i32 * 8 + OFFSET_X;
        let y = cy as i32 * 8 + OFFSET_Y;
        let xt = 2 * y;
        let yt = self.scr_height - 2 * (x + 8);
        Some((u16::try_from(xt).ok()?, u16::try_from(yt).ok()?))
    }

    // ── Background ──

    pub fn draw_bg(&self, pf: &Playfield, cx: i16, cy: i16, tile: &mut [u8; 64]) {
        tile.fill(0);
        if cy >= ICON_ROW {
            self.draw_icons(pf, cx, cy, tile);
            return;
        }

        let mut color = rom::wall_color(pf.level);
        let mut code = pf.map()[cy as usize * MAP_W + cx as usize];

        if cy == READY_ROW && (READY_FIRST..=READY_LAST).contains(&cx) {
            code = ready_slot(pf, cx, code);
        } else if cy == SCORE_ROW {
            if (cx as usize) < TEXT_LEN {
                code = pf.score_text[cx as usize];
            } else if cx >= HISCORE_COL && ((cx - HISCORE_COL) as usize) < TEXT_LEN {
                code = pf.hiscore_text[(cx - HISCORE_COL) as usize];
            }
        } else {
            match Tile::from_code(code) {
                Tile::Dot | Tile::Pill => {
                    if !pf.dots.get(cx, cy) {
                        return;
                    }
                    color = rom::DOT_COLOR;
                }
                Tile::PenGate => color = rom::DOT_COLOR,
                _ => {}
            }
        }

        match Tile::from_code(code) {
            Tile::Unknown(_) => return,
            Tile::Glyph(_) => color = rom::TEXT_COLOR,
            _ => {}
        }

        for (row, &bits) in self.rom.tile(code).iter().enumerate() {
            for col in 0..8 {
                if bits & (0x80 >> col) != 0 {
                    tile[row * 8 + col] = color;
                }
            }
        }
    }

    /// Rows 34-35: each tray slot is a 16×16 icon split over four cells.
    fn draw_icons(&self, pf: &Playfield, cx: i16, cy: i16, tile: &mut [u8; 64]) {
        let icon = pf.icons[(cx >> 1) as usize];
        if icon == 0 {
            return;
        }
        let b = (1 - (cx & 1) as u8) + (((cy & 1) as u8) << 1);
        let data = self.rom.icon_tile(icon, b);
        let palette = rom::icon_palette(icon);
        for y in 0..8 {
            for x in 0..8 {
                let p = (data[y * 2 + x / 4] >> ((3 - (x & 3)) << 1)) & 3;
                tile[y * 8 + x] = palette[p as usize];
            }
        }
    }

    // ── Cells ──

    /// Background plus every actor overlapping the cell.
    pub fn compose(&self, pf: &Playfield, cx: i16, cy: i16, tile: &mut [u8; 64]) {
        self.draw_bg(pf, cx, cy, tile);
        let (x, y) = (cx << 3, cy << 3);
        for s in &pf.sprites {
            s.draw8(&self.rom, x, y, tile);
        }
        if pf.active_bonus {
            pf.bonus.draw8(&self.rom, x, y, tile);
        }
    }

    pub fn draw_cell(&mut self, pf: &Playfield, cx: i16, cy: i16, sink: &mut dyn DisplaySink) -> Result<()> {
        let Some((x0, y0)) = self.origin(cx, cy) else {
            return Ok(());
        };
        let mut tile = [0u8; 64];
        self.compose(pf, cx, cy, &mut tile);
        rotate_ccw(&tile, &self.palette, &mut self.block);
        sink.flush(x0, y0, x0 + BLOCK, y0 + BLOCK, &self.block)
    }

    /// Redraw every cell marked since the last call. Returns how many
    /// cells reached the sink.
    pub fn draw_all(&mut self, pf: &mut Playfield, sink: &mut dyn DisplaySink) -> usize {
        let dirty = pf.take_dirty();
        let mut drawn = 0;
        for (cx, cy) in dirty.iter() {
            match self.draw_cell(pf, cx, cy, sink) {
                Ok(()) => drawn += 1,
                Err(e) => warn!("flush of cell ({cx}, {cy}) dropped: {e}"),
            }
        }
        drawn
    }
}

/// What the READY slot shows this frame, given the maze's own code.
fn ready_slot(pf: &Playfield, cx: i16, code: u8) -> u8 {
    let i = (cx - READY_FIRST) as usize;
    if (pf.state != GameState::Ready && !pf.paused && !pf.demo) || pf.active_bonus {
        EMPTY
    } else if pf.demo {
        glyph(DEMO_TEXT[i])
    } else if pf.paused {
        glyph(PAUSED_TEXT[i])
    } else {
        code
    }
}

fn glyph(ch: u8) -> u8 {
    if ch == b' ' { EMPTY } else { ch }
}

/// Quarter turn counter-clockwise with 2×2 pixel doubling: tile pixel
/// `(tx, ty)` lands at block column `2·ty`, row `14 − 2·tx`.
pub fn rotate_ccw(tile: &[u8; 64], palette: &[u16; 16], out: &mut [u16; 256]) {
    let w = BLOCK as usize;
    for ty in 0..8 {
        for tx in 0..8 {
            let c = palette[(tile[ty * 8 + tx] & 15) as usize];
            let bx = 2 * ty;
            let by = 14 - 2 * tx;
            out[by * w + bx] = c;
            out[by * w + bx + 1] = c;
            out[(by + 1) * w + bx] = c;
            out[(by + 1) * w + bx + 1] = c;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::maze::MAP_H;
    use crate::domain::tile::DOT;
    use crate::error::CoreError;
    use crate::sim::step::step;

    #[derive(Default)]
    struct Recorder {
        rects: Vec<(u16, u16, u16, u16)>,
        pixels: Vec<Vec<u16>>,
    }

    impl DisplaySink for Recorder {
        fn flush(&mut self, x0: u16, y0: u16, x1: u16, y1: u16, pixels: &[u16]) -> Result<()> {
            self.rects.push((x0, y0, x1, y1));
            self.pixels.push(pixels.to_vec());
            Ok(())
        }
    }

    struct Broken;

    impl DisplaySink for Broken {
        fn flush(&mut self, _: u16, _: u16, _: u16, _: u16, _: &[u16]) -> Result<()> {
            Err(CoreError::Config("panel gone".into()))
        }
    }

    fn compositor() -> Compositor {
        let spec = DisplaySpec::from_config(&GameConfig::default().display).unwrap();
        Compositor::new(Rom::generate(), &spec)
    }

    fn player_game() -> Playfield {
        let mut pf = Playfield::new(Some(3));
        pf.demo = false;
        pf.init();
        pf
    }

    fn bg(c: &Compositor, pf: &Playfield, cx: i16, cy: i16) -> [u8; 64] {
        let mut tile = [0; 64];
        c.draw_bg(pf, cx, cy, &mut tile);
        tile
    }

    fn blank(tile: &[u8; 64]) -> bool {
        tile.iter().all(|&p| p == 0)
    }

    #[test]
    fn cell_origins_follow_rotation() {
        let c = compositor();
        assert_eq!(c.origin(0, 0), Some((32, 448)));
        assert_eq!(c.origin(27, 35), Some((592, 16)));
        assert_eq!(c.origin(1, 0), Some((32, 432)));
        assert_eq!(c.origin(0, 1), Some((48, 448)));
    }

    #[test]
    fn rotation_moves_top_left_to_bottom_left() {
        let mut palette = [0u16; 16];
        palette[3] = 0xABCD;
        let mut tile = [0u8; 64];
        tile[0] = 3;
        let mut out = [0u16; 256];
        rotate_ccw(&tile, &palette, &mut out);
        for (x, y) in [(0, 14), (1, 14), (0, 15), (1, 15)] {
            assert_eq!(out[y * 16 + x], 0xABCD);
        }
        assert_eq!(out.iter().filter(|&&p| p == 0xABCD).count(), 4);

        let mut tile = [0u8; 64];
        tile[7] = 3; // top-right pixel
        rotate_ccw(&tile, &palette, &mut out);
        assert_eq!(out[0], 0xABCD);
    }

    #[test]
    fn full_redraw_covers_the_field() {
        let mut c = compositor();
        let mut pf = player_game();
        let mut sink = Recorder::default();
        let drawn = c.draw_all(&mut pf, &mut sink);
        assert_eq!(drawn, MAP_W * MAP_H);
        for &(x0, y0, x1, y1) in &sink.rects {
            assert_eq!((x1 - x0, y1 - y0), (BLOCK, BLOCK));
            assert!(x1 <= 800 && y1 <= 480);
        }
        assert!(sink.pixels.iter().all(|p| p.len() == 256));
        assert_eq!(pf.dirty.count(), 0);
        assert_eq!(c.draw_all(&mut pf, &mut sink), 0);
    }

    #[test]
    fn eaten_dots_are_not_drawn() {
        let c = compositor();
        let mut pf = player_game();
        let (cx, cy) = (0..MAP_H as i16)
            .flat_map(|y| (0..MAP_W as i16).map(move |x| (x, y)))
            .find(|&(x, y)| pf.map()[y as usize * MAP_W + x as usize] == DOT && pf.dots.get(x, y))
            .unwrap();
        let before = bg(&c, &pf, cx, cy);
        assert!(before.iter().any(|&p| p == rom::DOT_COLOR));
        pf.dots.eat(cx, cy);
        assert!(blank(&bg(&c, &pf, cx, cy)));
    }

    #[test]
    fn ready_slot_reflects_mode() {
        let c = compositor();
        let mut pf = player_game();
        assert!(bg(&c, &pf, READY_FIRST, READY_ROW).iter().any(|&p| p == rom::TEXT_COLOR));

        pf.paused = true;
        assert!(!blank(&bg(&c, &pf, READY_FIRST, READY_ROW)));
        pf.paused = false;

        pf.state = GameState::Play;
        for cx in READY_FIRST..=READY_LAST {
            assert!(blank(&bg(&c, &pf, cx, READY_ROW)));
        }

        pf.demo = true;
        assert!(blank(&bg(&c, &pf, READY_FIRST, READY_ROW)));
        assert!(!blank(&bg(&c, &pf, READY_FIRST + 1, READY_ROW)));
        assert!(blank(&bg(&c, &pf, READY_LAST, READY_ROW)));

        pf.active_bonus = true;
        assert!(blank(&bg(&c, &pf, READY_FIRST + 1, READY_ROW)));
    }

    #[test]
    fn score_banner_and_tray() {
        let c = compositor();
        let pf = player_game();
        // "00" right-aligned in columns 5..6
        assert!(bg(&c, &pf, 6, SCORE_ROW).iter().any(|&p| p == rom::TEXT_COLOR));
        assert!(blank(&bg(&c, &pf, 0, SCORE_ROW)));
        // two lives on the left, nothing collected on the right
        assert!(!blank(&bg(&c, &pf, 0, ICON_ROW)));
        assert!(!blank(&bg(&c, &pf, 3, ICON_ROW + 1)));
        assert!(blank(&bg(&c, &pf, 27, ICON_ROW)));
    }

    #[test]
    fn actors_are_overlaid() {
        let c = compositor();
        let mut pf = player_game();
        step(&mut pf);
        let p = pf.pacman();
        let (cx, cy) = (p.x >> 3, p.y >> 3);
        let mut with = [0; 64];
        c.compose(&pf, cx, cy, &mut with);
        assert_ne!(with, bg(&c, &pf, cx, cy));
    }

    #[test]
    fn failed_flushes_are_dropped() {
        let mut c = compositor();
        let mut pf = player_game();
        assert_eq!(c.draw_all(&mut pf, &mut Broken), 0);
        assert_eq!(pf.dirty.count(), 0);
    }
}
