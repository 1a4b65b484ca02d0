/// Maze AI: passability, direction choice and target selection.
///
/// Every mover steers the same way: at each cell-aligned frame it scores the
/// four neighbours by squared distance to its target and takes the best one
/// it is allowed to enter (greedy, no path search). Personalities differ only
/// in how the target is chosen.
///
/// Ghosts:
///   - scatter phase or frightened → fixed corner per ghost
///   - chase phase → per-ghost function of Pac-Man's cell and heading
///   - inside the pen → the cell above the gate
///
/// Pac-Man (attract mode): hunt frightened ghosts, flee a close attacker,
/// collect the bonus, then pills in a fixed order, then the nearest dot.

use super::entity::{in_pen, Dir, Keys, Sprite, SpriteState, Who};
use super::maze::{DotMap, Map, DOT_ROW_FIRST, DOT_ROW_LAST, MAP_H, MAP_W};
use super::tile::{self, Tile};

/// Score of a neighbour that cannot be entered.
pub const IMPASSABLE: i32 = 0x7FFF;

pub const PEN_EXIT: (i16, i16) = (14, 12);
pub const PEN_HOME: (i16, i16) = (14, 17);
pub const BONUS_TARGET: (i16, i16) = (13, 20);
pub const PILLS: [(i16, i16); 4] = [(1, 6), (26, 6), (1, 26), (26, 26)];

/// Neighbour scan order; earlier entries win ties.
const ORDER: [Dir; 4] = [Dir::Up, Dir::Left, Dir::Down, Dir::Right];

// ── Board view ──

/// The maze as movers see it this frame.
pub struct Board<'a> {
    map: &'a Map,
    /// While the READY banner is up its letters are solid.
    ready: bool,
}

impl<'a> Board<'a> {
    pub fn new(map: &'a Map, ready: bool) -> Self {
        Board { map, ready }
    }

    pub fn code(&self, cx: i16, cy: i16) -> u8 {
        if cx < 0 || cy < 0 || cx >= MAP_W as i16 || cy >= MAP_H as i16 {
            return tile::WALL_BASE;
        }
        if !self.ready && cy == 20 && cx > 10 && cx < 17 {
            return tile::EMPTY;
        }
        self.map[cy as usize * MAP_W + cx as usize]
    }
}

/// Can this sprite pass the pen gate? Pac-Man never; ghosts on their way
/// out of the pen (released) or home (eyes).
pub fn gate_open(s: &Sprite) -> bool {
    if s.who == Who::Pacman {
        return false;
    }
    s.state == SpriteState::DeadEyes || (in_pen(s.cx, s.cy) && s.state != SpriteState::Pen)
}

/// Squared distance from neighbour `(cx, cy)` to the sprite's target, or
/// `IMPASSABLE`. Columns wrap through the side tunnel.
pub fn chase(board: &Board, s: &Sprite, cx: i16, cy: i16) -> i32 {
    let cx = cx.rem_euclid(MAP_W as i16);
    let t = Tile::from_code(board.code(cx, cy));
    if !t.is_passable() {
        return IMPASSABLE;
    }
    if t == Tile::PenGate && !gate_open(s) {
        return IMPASSABLE;
    }
    let dx = (s.tx - cx) as i32;
    let dy = (s.ty - cy) as i32;
    dx * dx + dy * dy
}

/// Direction for the next move, decided on a cell-aligned frame.
///
/// A player-controlled Pac-Man takes the pressed direction if open, else
/// keeps going, else stops. Everyone else takes the closest-to-target
/// neighbour, never reversing unless `fallback` allows one U-turn.
pub fn choose_dir(board: &Board, s: &Sprite, demo: bool, keys: &Keys, fallback: &mut bool) -> Dir {
    let choice: [i32; 4] = ORDER.map(|d| {
        let (dx, dy) = d.delta();
        chase(board, s, s.cx + dx, s.cy + dy)
    });

    if !demo && s.who == Who::Pacman {
        for (i, &d) in ORDER.iter().enumerate() {
            if keys.is_down(d) && choice[i] < IMPASSABLE {
                return d;
            }
        }
        for (i, &d) in ORDER.iter().enumerate() {
            if s.dir == d && choice[i] < IMPASSABLE {
                return d;
            }
        }
        return Dir::Stopped;
    }

    let opposite = s.dir.opposite();
    let mut dir = s.dir;
    let mut dist = ORDER.iter().position(|&d| d == s.dir).map_or(IMPASSABLE, |i| choice[i]);
    for (i, &d) in ORDER.iter().enumerate() {
        let waived = s.who == Who::Pacman && *fallback;
        if choice[i] < dist && (d != opposite || waived) {
            if waived {
                *fallback = false;
            }
            dist = choice[i];
            dir = d;
        }
    }
    dir
}

/// Nominal speed in percent of a full move per frame.
pub fn speed(s: &Sprite, frightened_window: bool) -> u8 {
    if s.who == Who::Pacman {
        return if frightened_window { 90 } else { 80 };
    }
    match s.state {
        SpriteState::Frightened => 40,
        SpriteState::DeadEyes => 100,
        _ if s.cy == 17 && (s.cx <= 5 || s.cx > 20) => 40, // tunnel
        _ => 75,
    }
}

// ══════════════════════════════════════════════════════════════
// Ghost personalities
// ══════════════════════════════════════════════════════════════

/// Inputs to a chase-mode targeting rule.
pub struct ChaseView<'a> {
    pub ghost: &'a Sprite,
    pub pacman: &'a Sprite,
    pub binky: &'a Sprite,
}

pub struct Personality {
    pub scatter: (i16, i16),
    pub chase: fn(&ChaseView) -> (i16, i16),
}

/// Indexed by `Who::index()`. Inky's and Clyde's corners are swapped
/// relative to the arcade.
pub const PERSONALITIES: [Personality; 4] = [
    Personality { scatter: (2, 0), chase: chase_binky },
    Personality { scatter: (25, 0), chase: chase_pinky },
    Personality { scatter: (0, 35), chase: chase_inky },
    Personality { scatter: (27, 35), chase: chase_clyde },
];

/// Look-ahead for Pinky. The Up entry keeps the arcade overflow bug.
fn pinky_offset(dir: Dir) -> (i16, i16) {
    match dir {
        Dir::Right => (4, 0),
        Dir::Down => (0, 4),
        Dir::Left => (-4, 0),
        Dir::Up => (-4, 4),
        Dir::Stopped => (0, 0),
    }
}

fn chase_binky(v: &ChaseView) -> (i16, i16) {
    (v.pacman.cx, v.pacman.cy)
}

fn chase_pinky(v: &ChaseView) -> (i16, i16) {
    let (ox, oy) = pinky_offset(v.pacman.dir);
    (v.pacman.cx + ox, v.pacman.cy + oy)
}

fn chase_inky(v: &ChaseView) -> (i16, i16) {
    let (ox, oy) = pinky_offset(v.pacman.dir);
    let mx = v.pacman.cx + ox / 2;
    let my = v.pacman.cy + oy / 2;
    (2 * mx - v.binky.cx, 2 * my - v.binky.cy)
}

fn chase_clyde(v: &ChaseView) -> (i16, i16) {
    if v.ghost.distance(v.pacman.cx, v.pacman.cy) < 64 {
        PERSONALITIES[Who::Clyde.index()].scatter
    } else {
        (v.pacman.cx, v.pacman.cy)
    }
}

/// Target for a live ghost that is out of its pen timer.
pub fn ghost_target(ghost: &Sprite, pacman: &Sprite, binky: &Sprite, scatter: bool) -> (i16, i16) {
    let p = &PERSONALITIES[ghost.who.index() & 3];
    if in_pen(ghost.cx, ghost.cy) {
        PEN_EXIT
    } else if scatter || ghost.state == SpriteState::Frightened {
        p.scatter
    } else {
        (p.chase)(&ChaseView { ghost, pacman, binky })
    }
}

// ══════════════════════════════════════════════════════════════
// Pac-Man
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PacmanPlan {
    /// New target, if any rule produced one.
    pub target: Option<(i16, i16)>,
    /// Allow one U-turn this frame.
    pub fallback: bool,
    /// No dots left anywhere.
    pub maze_cleared: bool,
}

pub fn pacman_plan(pacman: &Sprite, ghosts: &[Sprite], demo: bool, bonus_active: bool, dots: &DotMap) -> PacmanPlan {
    let mut plan = PacmanPlan::default();
    let (px, py) = (pacman.cx, pacman.cy);

    let mut nearest = IMPASSABLE;
    let mut eyes = false;
    let mut frightened: Option<(&Sprite, i32)> = None;
    let mut attacker: Option<(&Sprite, i32)> = None;
    for g in ghosts {
        let d = g.distance(px, py);
        nearest = nearest.min(d);
        match g.state {
            SpriteState::DeadEyes => eyes = true,
            SpriteState::DeadNumber => {}
            SpriteState::Frightened => {
                if frightened.map_or(true, |(_, fd)| d < fd) {
                    frightened = Some((g, d));
                }
            }
            _ => {
                if attacker.map_or(true, |(_, ad)| d < ad) {
                    attacker = Some((g, d));
                }
            }
        }
    }

    if demo && !eyes {
        if let Some((g, _)) = frightened {
            plan.target = Some((g.cx, g.cy));
            return plan;
        }
        if let Some((g, ad)) = attacker {
            let fd = frightened.map_or(IMPASSABLE, |(_, d)| d);
            if nearest <= 32 && ad < fd {
                plan.target = Some((px * 2 - g.cx, py * 2 - g.cy));
                plan.fallback = nearest <= 16;
                return plan;
            }
        }
    }

    if bonus_active {
        plan.target = Some(BONUS_TARGET);
        return plan;
    }

    if let Some(&pill) = PILLS.iter().find(|&&(x, y)| dots.get(x, y)) {
        plan.target = Some(pill);
        return plan;
    }

    let mut best = IMPASSABLE;
    for y in DOT_ROW_FIRST..=DOT_ROW_LAST {
        for x in 0..MAP_W as i16 {
            if dots.get(x, y) {
                let d = pacman.distance(x, y);
                if d < best {
                    best = d;
                    plan.target = Some((x, y));
                }
            }
        }
    }
    plan.maze_cleared = plan.target.is_none();
    plan
}
