/// Playfield: the complete state of a running game.
///
/// ## Lifecycle
///
/// `init()` starts a game (or the next level when `game_win` is set),
/// `step()` mutates one frame at a time, `packman_died()` restarts the
/// round after a fatal collision. The compositor reads the public fields;
/// it never mutates them.
///
/// ## Dirty cells
///
/// Every change that affects the picture marks cells in `dirty`. The
/// compositor redraws exactly the marked cells and `take_dirty()` hands
/// them over, leaving the map clean.

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::domain::entity::{Keys, Sprite, Who, SEEDS};
use crate::domain::maze::{DotMap, Map, Mazes, MAP_H, MAP_W};
use crate::domain::rom;
use super::event::GameEvent;

/// Logical frame rate; all timers count these frames.
pub const FPS: u16 = 60;
pub const START_LEVEL: u8 = 1;
pub const START_LIVES: u8 = 2;
pub const MAX_LIVES: u8 = 5;
pub const BONUS_INACTIVE_TIME: u16 = 600;
pub const BONUS_ACTIVE_TIME: u16 = 300;
/// Bonus items cycle through this many kinds.
pub const BONUS_KINDS: u8 = 8;
pub const FRIGHTENED_TIME: u16 = 10 * FPS;
pub const DEAD_GHOST_TIME: u16 = 10;
pub const EXTRA_LIFE_EVERY: u32 = 10_000;

/// Scatter/chase wave lengths in seconds. Odd indices are scatter.
pub const SCATTER_CHASE: [u16; 8] = [7, 20, 7, 20, 5, 20, 5, 0];

pub const SCORE_ROW: i16 = 1;
pub const READY_ROW: i16 = 20;
pub const READY_FIRST: i16 = 11;
pub const READY_LAST: i16 = 16;
pub const ICON_ROW: i16 = 34;
pub const ICON_SLOTS: usize = 14;
/// Width of the score and hiscore fields in cells.
pub const TEXT_LEN: usize = 7;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameState {
    Ready,
    Play,
    DeadGhost,
    DeadPlayer,
    EndLevel,
}


// ── Dirty map ──

#[derive(Clone, Debug)]
pub struct DirtyMap {
    cells: [[bool; MAP_W]; MAP_H],
}

impl Default for DirtyMap {
    fn default() -> Self {
        DirtyMap { cells: [[false; MAP_W]; MAP_H] }
    }
}

impl DirtyMap {
    pub fn mark_cell(&mut self, cx: i16, cy: i16) {
        if cx >= 0 && cy >= 0 && (cx as usize) < MAP_W && (cy as usize) < MAP_H {
            self.cells[cy as usize][cx as usize] = true;
        }
    }

    /// Mark the 3×3 block of cells a 16×16 sprite at pixel `(x, y)` can touch.
    pub fn mark_sprite(&mut self, x: i16, y: i16) {
        let bx = (x - 4) >> 3;
        let by = (y - 4) >> 3;
        for dy in 0..3 {
            for dx in 0..3 {
                self.mark_cell((bx + dx).rem_euclid(MAP_W as i16), by + dy);
            }
        }
    }

    pub fn mark_row(&mut self, cy: i16) {
        for cx in 0..MAP_W as i16 {
            self.mark_cell(cx, cy);
        }
    }

    pub fn mark_all(&mut self) {
        self.cells = [[true; MAP_W]; MAP_H];
    }

    #[cfg(test)]
    pub fn is_marked(&self, cx: i16, cy: i16) -> bool {
        cx >= 0 && cy >= 0 && (cx as usize) < MAP_W && (cy as usize) < MAP_H
            && self.cells[cy as usize][cx as usize]
    }

    #[cfg(test)]
    pub fn count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&c| c).count()
    }

    /// Marked cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (i16, i16)> + '_ {
        self.cells.iter().enumerate().flat_map(|(cy, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, c)| **c)
                .map(move |(cx, _)| (cx as i16, cy as i16))
        })
    }
}

// ── Playfield ──

pub struct Playfield {
    pub mazes: Mazes,
    pub rng: StdRng,

    /// Indexed by `Who::index()`: four ghosts then Pac-Man.
    pub sprites: [Sprite; 5],
    pub bonus: Sprite,
    pub dots: DotMap,

    pub state: GameState,
    pub state_timer: u16,
    pub sc_index: usize,
    pub sc_timer: u16,
    pub frightened_timer: u16,
    pub frightened_count: u8,
    pub bonus_inactive_timer: u16,
    pub bonus_active_timer: u16,
    /// Pac-Man may make one U-turn (set by the flee rule).
    pub pacman_fallback: bool,

    pub score: u32,
    pub hiscore: u32,
    /// Next score at which an extra life is due.
    pub lifescore: u32,
    pub score_text: [u8; TEXT_LEN],
    pub hiscore_text: [u8; TEXT_LEN],
    pub icons: [u8; ICON_SLOTS],

    pub level: u8,
    pub lives: u8,
    pub demo: bool,
    pub paused: bool,
    pub game_over: bool,
    pub game_win: bool,
    pub inited: bool,
    pub actual_bonus: u8,
    pub active_bonus: bool,

    pub keys: Keys,
    pub dirty: DirtyMap,
}

impl Playfield {
    /// A fresh playfield in attract mode. Nothing is seeded until the
    /// first `step()` (or an explicit `init()`).
    pub fn new(seed: Option<u64>) -> Self {
        let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let sprites = std::array::from_fn(|i| Sprite::new(&SEEDS[i], &mut rng));
        let bonus = Sprite::new(&SEEDS[Who::Bonus.index()], &mut rng);
        Playfield {
            mazes: Mazes::bundled(),
            rng,
            sprites,
            bonus,
            dots: DotMap::empty(),
            state: GameState::Ready,
            state_timer: 0,
            sc_index: 0,
            sc_timer: 1,
            frightened_timer: 0,
            frightened_count: 0,
            bonus_inactive_timer: BONUS_INACTIVE_TIME,
            bonus_active_timer: 0,
            pacman_fallback: false,
            score: 0,
            hiscore: 0,
            lifescore: EXTRA_LIFE_EVERY,
            score_text: [0; TEXT_LEN],
            hiscore_text: [0; TEXT_LEN],
            icons: [0; ICON_SLOTS],
            level: START_LEVEL,
            lives: START_LIVES,
            demo: true,
            paused: false,
            game_over: false,
            game_win: false,
            inited: false,
            actual_bonus: 0,
            active_bonus: false,
            keys: Keys::default(),
            dirty: DirtyMap::default(),
        }
    }

    pub fn map(&self) -> &Map {
        self.mazes.for_level(self.level)
    }

    pub fn pacman(&self) -> &Sprite {
        &self.sprites[Who::Pacman.index()]
    }

    /// Odd wave indices are scatter phases.
    pub fn scatter(&self) -> bool {
        self.sc_index & 1 == 1
    }

    // ── Lifecycle ──

    /// Start a game, or the next level when `game_win` is set (score,
    /// lives and collected bonuses carry over; the caller has already
    /// advanced `level`).
    pub fn init(&mut self) {
        if self.game_win {
            self.game_win = false;
        } else {
            self.level = START_LEVEL;
            self.lives = START_LIVES;
            self.actual_bonus = 0;
            self.score = 0;
            self.lifescore = EXTRA_LIFE_EVERY;
            self.score_text = [0, 0, 0, 0, 0, b'0', b'0'];
        }
        self.dots = DotMap::from_map(self.mazes.for_level(self.level));
        self.reset_round();
    }

    /// Restart the round after a fatal collision. With no lives left the
    /// game is over and attract mode takes over. Returns true on game over.
    pub fn packman_died(&mut self) -> bool {
        if self.lives == 0 {
            info!("game over at level {} with {} points", self.level, self.score);
            self.game_over = true;
            self.game_win = false;
            self.paused = false;
            self.demo = true;
            self.init();
            true
        } else {
            self.lives -= 1;
            self.reset_round();
            false
        }
    }

    /// Everything `init` and `packman_died` share: actors, timers, waves
    /// and the icon tray. Dots, score and level are left alone.
    fn reset_round(&mut self) {
        self.inited = true;
        self.state = GameState::Ready;
        self.state_timer = FPS / 2;
        self.frightened_timer = 0;
        self.frightened_count = 0;
        for (s, seed) in self.sprites.iter_mut().zip(SEEDS.iter()) {
            s.init(seed, &mut self.rng);
        }
        self.bonus.init(&SEEDS[Who::Bonus.index()], &mut self.rng);
        self.bonus_inactive_timer = BONUS_INACTIVE_TIME;
        self.bonus_active_timer = 0;
        self.active_bonus = false;
        self.pacman_fallback = false;
        self.sc_index = 0;
        self.sc_timer = 1;
        self.keys.clear();
        self.rebuild_icons();
        self.dirty.mark_all();
    }

    // ── Score ──

    pub fn add_score(&mut self, points: u32, events: &mut Vec<GameEvent>) {
        self.score += points;
        if self.score > self.lifescore && self.score % EXTRA_LIFE_EVERY > 0 {
            self.lifescore = (self.score / EXTRA_LIFE_EVERY + 1) * EXTRA_LIFE_EVERY;
            if self.lives < MAX_LIVES {
                self.lives += 1;
                events.push(GameEvent::ExtraLife { lives: self.lives });
            }
            self.rebuild_icons();
            self.score += 100;
        }
        if !self.demo && self.score > self.hiscore {
            self.hiscore = self.score;
            let text = number_text(self.hiscore);
            if text != self.hiscore_text {
                self.hiscore_text = text;
                self.dirty.mark_row(SCORE_ROW);
            }
        }
        let text = number_text(self.score);
        if text != self.score_text {
            self.score_text = text;
            self.dirty.mark_row(SCORE_ROW);
        }
    }

    /// Pac-Man reached the active bonus item.
    pub fn collect_bonus(&mut self, events: &mut Vec<GameEvent>) {
        let points = self.actual_bonus as u32 * 50;
        self.add_score(points, events);
        events.push(GameEvent::BonusCollected { points, in_demo: self.demo });
        self.actual_bonus += 1;
        if self.actual_bonus >= BONUS_KINDS {
            self.actual_bonus = 0;
            if self.lives < MAX_LIVES {
                self.lives += 1;
                events.push(GameEvent::ExtraLife { lives: self.lives });
            }
        }
        self.rebuild_icons();
        self.active_bonus = false;
        self.bonus_inactive_timer = BONUS_INACTIVE_TIME;
    }

    /// Lives from the left, collected bonuses from the right.
    pub fn rebuild_icons(&mut self) {
        self.icons = [0; ICON_SLOTS];
        for i in 0..self.actual_bonus as usize {
            self.icons[ICON_SLOTS - 1 - i] = rom::BONUS_ICON + i as u8;
        }
        for slot in self.icons.iter_mut().take(self.lives as usize) {
            *slot = rom::PACMAN_ICON;
        }
        self.dirty.mark_row(ICON_ROW);
        self.dirty.mark_row(ICON_ROW + 1);
    }

    // ── Dirty cells ──

    pub fn mark_ready_slot(&mut self) {
        for cx in READY_FIRST..=READY_LAST {
            self.dirty.mark_cell(cx, READY_ROW);
        }
    }

    /// Hand the marked cells to the compositor and start a clean map.
    pub fn take_dirty(&mut self) -> DirtyMap {
        std::mem::take(&mut self.dirty)
    }
}

/// Right-aligned decimal, blank-padded, at least two digits.
fn number_text(value: u32) -> [u8; TEXT_LEN] {
    let mut out = [0u8; TEXT_LEN];
    let digits = format!("{value:02}");
    for (slot, ch) in out.iter_mut().rev().zip(digits.bytes().rev()) {
        *slot = ch;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::SpriteState;

    fn started() -> Playfield {
        let mut pf = Playfield::new(Some(7));
        pf.demo = false;
        pf.init();
        pf
    }

    fn text(t: &[u8; TEXT_LEN]) -> String {
        t.iter().map(|&c| if c == 0 { ' ' } else { c as char }).collect()
    }

    #[test]
    fn init_seeds_a_full_round() {
        let pf = started();
        assert!(pf.inited);
        assert_eq!(pf.state, GameState::Ready);
        assert_eq!(pf.state_timer, FPS / 2);
        assert_eq!(pf.dots.remaining(), 244);
        assert_eq!((pf.level, pf.lives, pf.score), (START_LEVEL, START_LIVES, 0));
        assert_eq!(text(&pf.score_text), "     00");
        assert_eq!((pf.sc_index, pf.sc_timer), (0, 1));
        assert_eq!(pf.dirty.count(), MAP_W * MAP_H);
        assert_eq!(pf.pacman().state, SpriteState::Run);
        assert_eq!((pf.pacman().cx, pf.pacman().cy), (14, 26));
    }

    #[test]
    fn next_level_keeps_score_and_lives() {
        let mut pf = started();
        let mut ev = vec![];
        pf.add_score(1230, &mut ev);
        pf.lives = 4;
        pf.game_win = true;
        pf.level = 2;
        pf.init();
        assert!(!pf.game_win);
        assert_eq!((pf.level, pf.lives, pf.score), (2, 4, 1230));
        assert_eq!(pf.dots.remaining(), DotMap::from_map(pf.mazes.for_level(2)).remaining());
    }

    #[test]
    fn score_text_is_right_aligned() {
        let mut pf = started();
        let mut ev = vec![];
        pf.take_dirty();
        pf.add_score(10, &mut ev);
        assert_eq!(text(&pf.score_text), "     10");
        assert_eq!(text(&pf.hiscore_text), "     10");
        assert!(pf.dirty.is_marked(0, SCORE_ROW) && pf.dirty.is_marked(27, SCORE_ROW));
        pf.add_score(12_340, &mut ev);
        assert_eq!(pf.score, 12_450); // extra-life bonus included
        assert_eq!(text(&pf.score_text), "  12450");
    }

    #[test]
    fn attract_scores_do_not_touch_hiscore() {
        let mut pf = Playfield::new(Some(1));
        pf.init();
        let mut ev = vec![];
        pf.add_score(500, &mut ev);
        assert_eq!(pf.hiscore, 0);
        assert_eq!(pf.hiscore_text, [0; TEXT_LEN]);
    }

    #[test]
    fn extra_life_once_per_ten_thousand() {
        let mut pf = started();
        let mut ev = vec![];
        pf.add_score(9_990, &mut ev);
        assert_eq!(pf.lives, START_LIVES);
        pf.add_score(20, &mut ev);
        assert_eq!(pf.lives, START_LIVES + 1);
        assert_eq!(pf.lifescore, 20_000);
        assert_eq!(pf.icons[..4], [1, 1, 1, 0]);
        pf.add_score(10, &mut ev);
        assert_eq!(pf.lives, START_LIVES + 1);
        assert_eq!(ev, vec![GameEvent::ExtraLife { lives: 3 }]);
    }

    #[test]
    fn lives_are_capped() {
        let mut pf = started();
        pf.lives = MAX_LIVES;
        let mut ev = vec![];
        pf.add_score(10_010, &mut ev);
        assert_eq!(pf.lives, MAX_LIVES);
        assert!(ev.is_empty());
    }

    #[test]
    fn bonus_fills_tray_from_the_right() {
        let mut pf = started();
        pf.actual_bonus = 3;
        pf.active_bonus = true;
        let mut ev = vec![];
        pf.collect_bonus(&mut ev);
        assert_eq!(pf.score, 150);
        assert_eq!(pf.actual_bonus, 4);
        assert!(!pf.active_bonus);
        assert_eq!(pf.bonus_inactive_timer, BONUS_INACTIVE_TIME);
        assert_eq!(pf.icons[10..], [5, 4, 3, 2]);
        assert_eq!(pf.icons[..3], [1, 1, 0]);
    }

    #[test]
    fn eighth_bonus_wraps_and_grants_a_life() {
        let mut pf = started();
        pf.actual_bonus = 7;
        let mut ev = vec![];
        pf.collect_bonus(&mut ev);
        assert_eq!(pf.actual_bonus, 0);
        assert_eq!(pf.lives, START_LIVES + 1);
        assert_eq!(pf.icons[10..], [0, 0, 0, 0]);
    }

    #[test]
    fn death_keeps_score_and_dots() {
        let mut pf = started();
        let mut ev = vec![];
        pf.add_score(300, &mut ev);
        assert!(pf.dots.eat(15, 26));
        let left = pf.dots.remaining();
        assert_eq!(left, 243);
        pf.sprites[Who::Pacman.index()].x = 40;
        assert!(!pf.packman_died());
        assert_eq!(pf.lives, START_LIVES - 1);
        assert_eq!(pf.score, 300);
        assert_eq!(pf.dots.remaining(), left);
        assert_eq!(pf.state, GameState::Ready);
        assert_eq!(pf.pacman().x, 14 * 8 - 4);
    }

    #[test]
    fn last_death_returns_to_attract() {
        let mut pf = started();
        pf.lives = 0;
        pf.level = 3;
        assert!(pf.packman_died());
        assert!(pf.game_over && pf.demo);
        assert_eq!((pf.level, pf.lives), (START_LEVEL, START_LIVES));
    }

    #[test]
    fn sprite_marks_wrap_the_tunnel() {
        let mut d = DirtyMap::default();
        d.mark_sprite(220, 136);
        assert_eq!(d.count(), 9);
        for cx in [27, 0, 1] {
            assert!(d.is_marked(cx, 16) && d.is_marked(cx, 18));
        }
        let cells: Vec<_> = d.iter().take(3).collect();
        assert_eq!(cells, vec![(0, 16), (1, 16), (27, 16)]);
    }

    #[test]
    fn take_dirty_leaves_clean_map() {
        let mut pf = started();
        let d = pf.take_dirty();
        assert_eq!(d.count(), MAP_W * MAP_H);
        assert_eq!(pf.dirty.count(), 0);
    }
}
