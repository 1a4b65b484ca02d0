/// Entities: the five actors plus the bonus item, and the latched buttons
/// the simulation consumes.
///
/// Position is tracked in pixels; the cell is derived. A sprite's 16×16
/// bitmap is anchored so that its top-left pixel sits at `(x − 4, y − 4)`.

use rand::Rng;

use super::rom::{self, Rom};

/// Playfield width in pixels; x wraps modulo this through the side tunnel.
pub const FIELD_W: i16 = 224;
/// Pixels moved per moving frame.
pub const SPEED: i16 = 2;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Who {
    Binky,
    Pinky,
    Inky,
    Clyde,
    Pacman,
    Bonus,
}

impl Who {
    pub const GHOSTS: [Who; 4] = [Who::Binky, Who::Pinky, Who::Inky, Who::Clyde];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_ghost(self) -> bool {
        self.index() < 4
    }
}

/// Motion direction. The discriminants are part of the sprite-sheet
/// layout (ghost frames are ordered Right, Down, Left, Up).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Dir {
    Stopped = 0,
    Right = 1,
    Down = 2,
    Left = 3,
    Up = 4,
}

const OPPOSITE: [Dir; 5] = [Dir::Stopped, Dir::Left, Dir::Up, Dir::Right, Dir::Down];

impl Dir {
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn opposite(self) -> Dir {
        OPPOSITE[self as usize]
    }

    /// Cell (and pixel) step for one unit of motion.
    pub fn delta(self) -> (i16, i16) {
        match self {
            Dir::Stopped => (0, 0),
            Dir::Right => (1, 0),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Up => (0, -1),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SpriteState {
    Pen,
    Run,
    Frightened,
    DeadNumber,
    DeadEyes,
    AteDot,
    DeadPacman,
}

// ── Seed table ──

/// One row of the sprite seed table.
#[derive(Clone, Copy, Debug)]
pub struct Seed {
    pub who: Who,
    pub cx: i16,
    pub cy: i16,
    pub pentimer: u8,
    pub dir: Dir,
}

pub const SEEDS: [Seed; 6] = [
    Seed { who: Who::Binky, cx: 14, cy: 14, pentimer: 31, dir: Dir::Left },
    Seed { who: Who::Pinky, cx: 12, cy: 17, pentimer: 79, dir: Dir::Left },
    Seed { who: Who::Inky, cx: 14, cy: 17, pentimer: 137, dir: Dir::Left },
    Seed { who: Who::Clyde, cx: 16, cy: 17, pentimer: 203, dir: Dir::Right },
    Seed { who: Who::Pacman, cx: 14, cy: 26, pentimer: 0, dir: Dir::Left },
    Seed { who: Who::Bonus, cx: 14, cy: 20, pentimer: 0, dir: Dir::Left },
];

/// The ghost pen interior, exclusive bounds.
pub fn in_pen(cx: i16, cy: i16) -> bool {
    cx > 10 && cx < 18 && cy > 14 && cy < 18
}

// ── Sprite ──

#[derive(Clone, Debug)]
pub struct Sprite {
    pub who: Who,
    pub x: i16,
    pub y: i16,
    pub lastx: i16,
    pub lasty: i16,
    pub cx: i16,
    pub cy: i16,
    pub tx: i16,
    pub ty: i16,
    pub state: SpriteState,
    pub dir: Dir,
    pub phase: u8,
    pub pentimer: u8,
    /// Speed accumulator: a move happens each time it reaches 100.
    pub speed: u8,

    // Renderer selection, refreshed by `setup_draw`.
    pub bits: u8,
    pub palette2: u8,
    pub sy: i8,
}

impl Sprite {
    pub fn new<R: Rng>(seed: &Seed, rng: &mut R) -> Self {
        let mut s = Sprite {
            who: seed.who,
            x: 0, y: 0, lastx: 0, lasty: 0,
            cx: 0, cy: 0, tx: 0, ty: 0,
            state: SpriteState::Run,
            dir: Dir::Stopped,
            phase: 0,
            pentimer: 0,
            speed: 0,
            bits: 0,
            palette2: 0,
            sy: 1,
        };
        s.init(seed, rng);
        s
    }

    /// Re-seed from a table row. Only ghosts seeded inside the pen start
    /// penned; everything else is live immediately.
    pub fn init<R: Rng>(&mut self, seed: &Seed, rng: &mut R) {
        self.who = seed.who;
        self.cx = seed.cx;
        self.cy = seed.cy;
        self.pentimer = seed.pentimer;
        self.dir = seed.dir;
        self.x = seed.cx * 8 - 4;
        self.y = seed.cy * 8;
        self.lastx = self.x;
        self.lasty = self.y;
        self.state = if seed.who.is_ghost() && in_pen(seed.cx, seed.cy) {
            SpriteState::Pen
        } else {
            SpriteState::Run
        };
        self.speed = 0;
        self.phase = 0;
        self.target(rng.gen_range(0..20), rng.gen_range(0..20));
    }

    pub fn target(&mut self, x: i16, y: i16) {
        self.tx = x;
        self.ty = y;
    }

    /// Squared distance in cells from this sprite's cell to `(x, y)`.
    pub fn distance(&self, x: i16, y: i16) -> i32 {
        let dx = (self.cx - x) as i32;
        let dy = (self.cy - y) as i32;
        dx * dx + dy * dy
    }

    pub fn is_aligned(&self) -> bool {
        self.x & 7 == 0 && self.y & 7 == 0
    }

    /// Recompute the cell from the pixel position.
    pub fn sync_cell(&mut self) {
        self.cx = ((self.x + 4) >> 3) % 28;
        self.cy = (self.y + 4) >> 3;
    }

    /// Pick bitmap, palette group and flip for this frame.
    pub fn setup_draw(&mut self, dead_ghost_index: u8, actual_bonus: u8) {
        self.sy = 1;
        self.palette2 = self.who.index() as u8;
        let p = self.phase >> 3;

        match self.who {
            Who::Bonus => {
                self.bits = rom::BONUS_SPRITE + actual_bonus;
                self.palette2 = rom::BONUS_PALETTE + actual_bonus;
            }
            Who::Pacman => {
                let f = ((self.phase >> 1) & 3) as usize;
                let frame = match self.dir {
                    Dir::Left => PAC_LEFT_ANIM[f],
                    Dir::Right => PAC_RIGHT_ANIM[f],
                    _ => PAC_V_ANIM[f],
                };
                if self.dir == Dir::Up {
                    self.sy = -1;
                }
                self.bits = rom::PACMAN_SPRITE + frame;
            }
            _ => {
                let facing = self.dir.index().max(1) - 1;
                self.bits = rom::GHOST_SPRITE + (facing << 1) + (p & 1);
                match self.state {
                    SpriteState::Frightened => {
                        self.bits = rom::FRIGHTENED_SPRITE + (p & 1);
                        self.palette2 = rom::FRIGHTENED_PALETTE;
                    }
                    SpriteState::DeadNumber => {
                        self.bits = rom::NUMBER_SPRITE + dead_ghost_index.min(3);
                        self.palette2 = rom::FRIGHTENED_PALETTE;
                    }
                    SpriteState::DeadEyes => {
                        self.palette2 = rom::DEADEYES_PALETTE;
                    }
                    _ => {}
                }
            }
        }
    }

    /// Composite this sprite into an 8×8 tile whose top-left world pixel
    /// is `(x, y)`. Palette index 0 and palette entries of 0 are transparent.
    pub fn draw8(&self, rom: &Rom, x: i16, y: i16, tile: &mut [u8; 64]) {
        let mut px = x - (self.x - 4);
        if px <= -8 || px >= 16 {
            return;
        }
        let mut py = y - (self.y - 4);
        if py <= -8 || py >= 16 {
            return;
        }

        // Clip rows
        let mut lines = (py + 8).min(16);
        let mut row0 = 0usize;
        if py < 0 {
            row0 = (-py) as usize;
            py = 0;
        }
        lines -= py;

        // Clip columns
        let right = (16 - px).min(8);
        let mut left = 0i16;
        if px < 0 {
            left = -px;
            px = 0;
        }

        let step: i16 = if self.sy < 0 { -1 } else { 1 };
        if step < 0 {
            py = 15 - py;
        }

        let palette = rom::palette_group(self.palette2);
        let data = rom.sprite(self.bits);
        for line in 0..lines {
            let sy = (py + line * step) as usize;
            let out = (row0 + line as usize) * 8;
            for tx in left..right {
                let sx = (px + tx - left) as usize;
                let byte = data[(sy << 2) + (sx >> 2)];
                let p = (byte >> ((sx & 3) << 1)) & 3;
                if p == 0 {
                    continue;
                }
                let c = palette[p as usize];
                if c != 0 {
                    tile[out + tx as usize] = c;
                }
            }
        }
    }
}

// Pac-Man mouth animation: frame offsets within the Pac-Man sprite range.
const PAC_LEFT_ANIM: [u8; 4] = [5, 6, 5, 4];
const PAC_RIGHT_ANIM: [u8; 4] = [2, 0, 2, 4];
const PAC_V_ANIM: [u8; 4] = [4, 3, 1, 3];

// ── Buttons ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Button {
    Up,
    Left,
    Right,
    Down,
    A,
    B,
}

impl Button {
    pub fn is_direction(self) -> bool {
        !matches!(self, Button::A | Button::B)
    }
}

/// Latched button flags. Set by the input adapters, consumed by `step`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Keys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub a: bool,
    pub b: bool,
}

impl Keys {
    pub fn clear(&mut self) {
        *self = Keys::default();
    }

    /// Accept a new press: every latch is wiped, then the button is set.
    pub fn press(&mut self, btn: Button) {
        self.clear();
        match btn {
            Button::Up => self.up = true,
            Button::Down => self.down = true,
            Button::Left => self.left = true,
            Button::Right => self.right = true,
            Button::A => self.a = true,
            Button::B => self.b = true,
        }
    }

    pub fn is_down(&self, dir: Dir) -> bool {
        match dir {
            Dir::Up => self.up,
            Dir::Down => self.down,
            Dir::Left => self.left,
            Dir::Right => self.right,
            Dir::Stopped => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(1)
    }

    #[test]
    fn opposite_is_an_involution() {
        for d in [Dir::Right, Dir::Down, Dir::Left, Dir::Up] {
            assert_ne!(d.opposite(), d);
            assert_eq!(d.opposite().opposite(), d);
        }
        assert_eq!(Dir::Stopped.opposite(), Dir::Stopped);
    }

    #[test]
    fn init_places_sprite_half_a_cell_left() {
        let s = Sprite::new(&SEEDS[4], &mut rng());
        assert_eq!((s.x, s.y), (14 * 8 - 4, 26 * 8));
        assert_eq!((s.lastx, s.lasty), (s.x, s.y));
        assert_eq!((s.cx, s.cy), (14, 26));
        assert_eq!(s.state, SpriteState::Run);
        assert!((0..20).contains(&s.tx) && (0..20).contains(&s.ty));
    }

    #[test]
    fn only_penned_ghosts_start_in_pen() {
        let mut r = rng();
        let states: Vec<SpriteState> = SEEDS.iter().map(|s| Sprite::new(s, &mut r).state).collect();
        assert_eq!(states[0], SpriteState::Run); // Binky starts above the gate
        assert_eq!(states[1], SpriteState::Pen);
        assert_eq!(states[2], SpriteState::Pen);
        assert_eq!(states[3], SpriteState::Pen);
        assert_eq!(states[4], SpriteState::Run);
    }

    #[test]
    fn distance_is_squared_cells() {
        let mut s = Sprite::new(&SEEDS[4], &mut rng());
        s.cx = 3;
        s.cy = 4;
        assert_eq!(s.distance(0, 0), 25);
        assert_eq!(s.distance(3, 4), 0);
    }

    #[test]
    fn sync_cell_wraps_tunnel_column() {
        let mut s = Sprite::new(&SEEDS[4], &mut rng());
        s.x = 220;
        s.sync_cell();
        assert_eq!(s.cx, 0);
        s.x = 216;
        s.sync_cell();
        assert_eq!(s.cx, 27);
    }

    #[test]
    fn setup_draw_selects_frames() {
        let mut r = rng();
        let mut g = Sprite::new(&SEEDS[0], &mut r);
        g.dir = Dir::Down;
        g.phase = 8;
        g.setup_draw(0, 0);
        assert_eq!(g.bits, rom::GHOST_SPRITE + 2 + 1);
        assert_eq!(g.palette2, 0);

        g.state = SpriteState::Frightened;
        g.setup_draw(0, 0);
        assert_eq!(g.bits, rom::FRIGHTENED_SPRITE + 1);
        assert_eq!(g.palette2, rom::FRIGHTENED_PALETTE);

        g.state = SpriteState::DeadNumber;
        g.setup_draw(2, 0);
        assert_eq!(g.bits, rom::NUMBER_SPRITE + 2);

        g.state = SpriteState::DeadEyes;
        g.setup_draw(0, 0);
        assert_eq!(g.palette2, rom::DEADEYES_PALETTE);
        assert_eq!(g.bits, rom::GHOST_SPRITE + 2 + 1);

        let mut p = Sprite::new(&SEEDS[4], &mut r);
        p.dir = Dir::Up;
        p.phase = 2; // f = 1
        p.setup_draw(0, 0);
        assert_eq!(p.sy, -1);
        assert_eq!(p.bits, rom::PACMAN_SPRITE + 3);

        let mut b = Sprite::new(&SEEDS[5], &mut r);
        b.setup_draw(0, 3);
        assert_eq!(b.bits, rom::BONUS_SPRITE + 3);
        assert_eq!(b.palette2, rom::BONUS_PALETTE + 3);
    }

    #[test]
    fn draw8_clips_to_sprite_extent() {
        let rom = Rom::generate();
        let mut r = rng();
        let mut g = Sprite::new(&SEEDS[0], &mut r);
        g.x = 100;
        g.y = 100;
        g.setup_draw(0, 0);

        // Fully outside on every side
        for (x, y) in [(88, 100), (112, 100), (100, 88), (100, 112)] {
            let mut tile = [0u8; 64];
            g.draw8(&rom, x, y, &mut tile);
            assert!(tile.iter().all(|&c| c == 0), "({x},{y})");
        }

        // The four cells covering the bitmap reassemble it exactly
        let pal = rom::palette_group(g.palette2);
        let data = rom.sprite(g.bits);
        for (ox, oy) in [(0, 0), (8, 0), (0, 8), (8, 8)] {
            let mut tile = [0u8; 64];
            g.draw8(&rom, 96 + ox, 96 + oy, &mut tile);
            for ty in 0..8 {
                for tx in 0..8 {
                    let (sx, sy) = ((ox + tx) as usize, (oy + ty) as usize);
                    let p = (data[(sy << 2) + (sx >> 2)] >> ((sx & 3) << 1)) & 3;
                    let want = if p == 0 { 0 } else { pal[p as usize] };
                    assert_eq!(tile[(ty * 8 + tx) as usize], want);
                }
            }
        }
    }

    #[test]
    fn draw8_partial_overlap_keeps_background() {
        let rom = Rom::generate();
        let mut g = Sprite::new(&SEEDS[0], &mut rng());
        g.x = 100;
        g.y = 100;
        g.setup_draw(0, 0);
        // Tile offset by 4 px: left half of the tile is outside the sprite
        let mut tile = [9u8; 64];
        g.draw8(&rom, 92, 96, &mut tile);
        for ty in 0..8 {
            for tx in 0..4 {
                assert_eq!(tile[ty * 8 + tx], 9);
            }
        }
    }

    #[test]
    fn draw8_flips_vertically() {
        let rom = Rom::generate();
        let mut r = rng();
        let mut up = Sprite::new(&SEEDS[4], &mut r);
        up.x = 100;
        up.y = 100;
        up.dir = Dir::Up;
        up.setup_draw(0, 0);
        let mut down = up.clone();
        down.dir = Dir::Down;
        down.setup_draw(0, 0);
        assert_eq!(up.bits, down.bits);

        let mut top_up = [0u8; 64];
        let mut bottom_down = [0u8; 64];
        up.draw8(&rom, 96, 96, &mut top_up);
        down.draw8(&rom, 96, 104, &mut bottom_down);
        for y in 0..8 {
            assert_eq!(top_up[y * 8..y * 8 + 8], bottom_down[(7 - y) * 8..(7 - y) * 8 + 8]);
        }
    }

    #[test]
    fn press_clears_other_latches() {
        let mut k = Keys::default();
        k.press(Button::Left);
        k.press(Button::Up);
        assert!(k.up && !k.left);
        assert!(k.is_down(Dir::Up));
        k.press(Button::A);
        assert!(k.a && !k.up);
    }
}
