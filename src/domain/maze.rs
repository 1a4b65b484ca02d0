/// Bundled maze maps.
///
/// ## Legend:
///   '#' = Wall            '.' = Dot
///   'o' = Pill            '-' = Pen gate
///   ' ' = Empty           'A'-'Z', '0'-'9', '!' = Text glyph
///
/// Each map is 36 rows × 28 columns. Rows 0..2 hold the score header,
/// rows 3..33 the maze, rows 34..35 the icon tray (drawn separately).
/// Wall codes are derived from which neighbours are open, so the text
/// form carries no wall-shape information.

use super::tile::{self, Tile};

pub const MAP_W: usize = 28;
pub const MAP_H: usize = 36;
pub const MAZE_COUNT: usize = 5;

/// Maze code grid, row-major.
pub type Map = [u8; MAP_W * MAP_H];

const MAZE_1: [&str; MAP_H] = [
    "  1UP   HIGH SCORE          ",
    "                            ",
    "                            ",
    "############################",
    "#............##............#",
    "#.####.#####.##.#####.####.#",
    "#o####.#####.##.#####.####o#",
    "#.####.#####.##.#####.####.#",
    "#..........................#",
    "#.####.##.########.##.####.#",
    "#.####.##.########.##.####.#",
    "#......##....##....##......#",
    "######.##### ## #####.######",
    "     #.##### ## #####.#     ",
    "     #.##          ##.#     ",
    "     #.## ###--### ##.#     ",
    "######.## #      # ##.######",
    "      .   #      #   .      ",
    "######.## ######## ##.######",
    "     #.## ######## ##.#     ",
    "     #.##  READY!  ##.#     ",
    "     #.## ######## ##.#     ",
    "######.## ######## ##.######",
    "#............##............#",
    "#.####.#####.##.#####.####.#",
    "#.####.#####.##.#####.####.#",
    "#o..##.......  .......##..o#",
    "###.##.##.########.##.##.###",
    "###.##.##.########.##.##.###",
    "#......##....##....##......#",
    "#.##########.##.##########.#",
    "#.##########.##.##########.#",
    "#..........................#",
    "############################",
    "                            ",
    "                            ",
];

const MAZE_2: [&str; MAP_H] = [
    "  1UP   HIGH SCORE          ",
    "                            ",
    "                            ",
    "############################",
    "#......##..........##......#",
    "#.####.##.########.##.####.#",
    "#o####.##.########.##.####o#",
    "#.####.##....##....##.####.#",
    "#......#####.##.#####......#",
    "###.##.......##.......##.###",
    "###.##.#####.##.#####.##.###",
    "###....#####.##.#####....###",
    "######.##### ## #####.######",
    "     #.##### ## #####.#     ",
    "     #.##          ##.#     ",
    "     #.## ###--### ##.#     ",
    "######.## #      # ##.######",
    "      .   #      #   .      ",
    "######.## ######## ##.######",
    "     #.## ######## ##.#     ",
    "     #.##  READY!  ##.#     ",
    "     #.## ######## ##.#     ",
    "######.## ######## ##.######",
    "#......##..........##......#",
    "#.####.##.########.##.####.#",
    "#.####.##.########.##.####.#",
    "#o..##.......  .......##..o#",
    "###.##.####.####.####.##.###",
    "###.##.####.####.####.##.###",
    "#......##..........##......#",
    "#.####.##.########.##.####.#",
    "#.####.##.########.##.####.#",
    "#..........................#",
    "############################",
    "                            ",
    "                            ",
];

const MAZE_3: [&str; MAP_H] = [
    "  1UP   HIGH SCORE          ",
    "                            ",
    "                            ",
    "############################",
    "#............##............#",
    "#.##.#######.##.#######.##.#",
    "#o##.#######.##.#######.##o#",
    "#..........................#",
    "###.##.##.########.##.##.###",
    "###.##.##....##....##.##.###",
    "###....#####.##.#####....###",
    "######.#####.##.#####.######",
    "######.##### ## #####.######",
    "     #.##### ## #####.#     ",
    "     #.##          ##.#     ",
    "     #.## ###--### ##.#     ",
    "######.## #      # ##.######",
    "      .   #      #   .      ",
    "######.## ######## ##.######",
    "     #.## ######## ##.#     ",
    "     #.##  READY!  ##.#     ",
    "     #.## ######## ##.#     ",
    "######.## ######## ##.######",
    "#............##............#",
    "#.###.######.##.######.###.#",
    "#.###.######.##.######.###.#",
    "#o...........  ...........o#",
    "####.##.###.####.###.##.####",
    "####.##.###.####.###.##.####",
    "#..........................#",
    "#.##########.##.##########.#",
    "#.##########.##.##########.#",
    "#..........................#",
    "############################",
    "                            ",
    "                            ",
];

const MAZE_4: [&str; MAP_H] = [
    "  1UP   HIGH SCORE          ",
    "                            ",
    "                            ",
    "############################",
    "#.........##....##.........#",
    "#.#######.##.##.##.#######.#",
    "#o#######.##.##.##.#######o#",
    "#..........................#",
    "#.###.#####.####.#####.###.#",
    "#.###.#####.####.#####.###.#",
    "#..........................#",
    "######.#####.##.#####.######",
    "######.##### ## #####.######",
    "     #.##### ## #####.#     ",
    "     #.##          ##.#     ",
    "     #.## ###--### ##.#     ",
    "######.## #      # ##.######",
    "      .   #      #   .      ",
    "######.## ######## ##.######",
    "     #.## ######## ##.#     ",
    "     #.##  READY!  ##.#     ",
    "     #.## ######## ##.#     ",
    "######.## ######## ##.######",
    "#............##............#",
    "#.####.#####.##.#####.####.#",
    "#.####.#####.##.#####.####.#",
    "#o.....##....  ....##.....o#",
    "##.###.##.########.##.###.##",
    "##.###.##.########.##.###.##",
    "#......##....##....##......#",
    "#.##########.##.##########.#",
    "#.##########.##.##########.#",
    "#..........................#",
    "############################",
    "                            ",
    "                            ",
];

const MAZE_5: [&str; MAP_H] = [
    "  1UP   HIGH SCORE          ",
    "                            ",
    "                            ",
    "############################",
    "#............##............#",
    "#.####.#####.##.#####.####.#",
    "#o####.#####.##.#####.####o#",
    "#.####.#####.##.#####.####.#",
    "#..........................#",
    "#.####.#.##########.#.####.#",
    "#......#.....##.....#......#",
    "######.#####.##.#####.######",
    "######.##### ## #####.######",
    "     #.##### ## #####.#     ",
    "     #.##          ##.#     ",
    "     #.## ###--### ##.#     ",
    "######.## #      # ##.######",
    "      .   #      #   .      ",
    "######.## ######## ##.######",
    "     #.## ######## ##.#     ",
    "     #.##  READY!  ##.#     ",
    "     #.## ######## ##.#     ",
    "######.## ######## ##.######",
    "#............##............#",
    "#.##.#######.##.#######.##.#",
    "#.##.#######.##.#######.##.#",
    "#o...........  ...........o#",
    "###.##.##.########.##.##.###",
    "###.##.##.########.##.##.###",
    "#......##....##....##......#",
    "#.##########.##.##########.#",
    "#.##########.##.##########.#",
    "#..........................#",
    "############################",
    "                            ",
    "                            ",
];

const MAZES: [&[&str; MAP_H]; MAZE_COUNT] = [&MAZE_1, &MAZE_2, &MAZE_3, &MAZE_4, &MAZE_5];

/// All five maps, parsed once.
pub struct Mazes {
    maps: Vec<Map>,
}

impl Mazes {
    pub fn bundled() -> Self {
        Mazes { maps: MAZES.iter().map(|rows| parse_rows(&rows[..])).collect() }
    }

    /// Map for a 1-based level: `LEVEL % 5` picks maps 1..4, 0 picks map 5.
    pub fn for_level(&self, level: u8) -> &Map {
        let idx = match level % 5 {
            0 => 4,
            n => (n - 1) as usize,
        };
        &self.maps[idx]
    }
}

/// Parse text rows into tile codes. Short rows are padded with empty cells.
pub fn parse_rows(rows: &[&str]) -> Map {
    let mut map = [tile::EMPTY; MAP_W * MAP_H];
    let is_wall = |x: i32, y: i32| -> bool {
        // Outside the grid counts as wall so the border draws no outer line.
        if x < 0 || y < 0 || x >= MAP_W as i32 || y >= MAP_H as i32 {
            return true;
        }
        rows.get(y as usize)
            .and_then(|r| r.as_bytes().get(x as usize))
            .map_or(false, |&c| c == b'#')
    };

    for y in 0..MAP_H {
        let row = rows.get(y).map(|r| r.as_bytes()).unwrap_or(&[]);
        for x in 0..MAP_W {
            let ch = row.get(x).copied().unwrap_or(b' ');
            map[y * MAP_W + x] = match ch {
                b'#' => wall_code(x as i32, y as i32, &is_wall),
                b'.' => tile::DOT,
                b'o' => tile::PILL,
                b'-' => tile::PENGATE,
                c if Tile::from_code(c).is_glyph() => c,
                _ => tile::EMPTY,
            };
        }
    }
    map
}

// ── Dot map ──

/// First and last maze rows carrying dots.
pub const DOT_ROW_FIRST: i16 = 3;
pub const DOT_ROW_LAST: i16 = 32;
const DOT_ROWS: usize = (DOT_ROW_LAST - DOT_ROW_FIRST + 1) as usize;

/// One bit per cell of rows 3..=32, four bytes per row, MSB = leftmost.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DotMap {
    bits: [u8; DOT_ROWS * 4],
}

impl DotMap {
    pub fn empty() -> Self {
        DotMap { bits: [0; DOT_ROWS * 4] }
    }

    /// Seed a bit for every dot and pill of the map.
    pub fn from_map(map: &Map) -> Self {
        let mut dots = DotMap::empty();
        for cy in DOT_ROW_FIRST..=DOT_ROW_LAST {
            for cx in 0..MAP_W as i16 {
                if Tile::from_code(map[cy as usize * MAP_W + cx as usize]).is_edible() {
                    if let Some((i, mask)) = Self::slot(cx, cy) {
                        dots.bits[i] |= mask;
                    }
                }
            }
        }
        dots
    }

    fn slot(cx: i16, cy: i16) -> Option<(usize, u8)> {
        if !(DOT_ROW_FIRST..=DOT_ROW_LAST).contains(&cy) || !(0..MAP_W as i16).contains(&cx) {
            return None;
        }
        let i = (cy - DOT_ROW_FIRST) as usize * 4 + (cx >> 3) as usize;
        Some((i, 0x80 >> (cx & 7)))
    }

    pub fn get(&self, cx: i16, cy: i16) -> bool {
        Self::slot(cx, cy).map_or(false, |(i, mask)| self.bits[i] & mask != 0)
    }

    /// Clear a bit. Returns whether it was set.
    pub fn eat(&mut self, cx: i16, cy: i16) -> bool {
        match Self::slot(cx, cy) {
            Some((i, mask)) if self.bits[i] & mask != 0 => {
                self.bits[i] &= !mask;
                true
            }
            _ => false,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.bits.iter().map(|b| b.count_ones()).sum()
    }
}

fn wall_code(x: i32, y: i32, is_wall: &dyn Fn(i32, i32) -> bool) -> u8 {
    let mut mask = 0;
    if !is_wall(x, y - 1) { mask |= tile::OPEN_UP; }
    if !is_wall(x + 1, y) { mask |= tile::OPEN_RIGHT; }
    if !is_wall(x, y + 1) { mask |= tile::OPEN_DOWN; }
    if !is_wall(x - 1, y) { mask |= tile::OPEN_LEFT; }
    if mask != 0 {
        return tile::WALL_BASE + mask;
    }

    // Fully enclosed: an open diagonal makes it an inner corner.
    let diagonals = [(-1, -1), (1, -1), (-1, 1), (1, 1)];
    for (n, &(dx, dy)) in diagonals.iter().enumerate() {
        if !is_wall(x + dx, y + dy) {
            return tile::CORNER_BASE + n as u8;
        }
    }
    tile::WALL_BASE
}
