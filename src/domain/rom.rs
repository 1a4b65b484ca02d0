/// Bitmap tables: background tiles, icon tiles, sprite sheet and palettes.
///
/// The tables are generated once at startup into an immutable `Rom`.
/// Layouts:
///   - background: 8 bytes per 8×8 tile, 1 bit per pixel, MSB leftmost.
///   - icons: 16 bytes per 8×8 tile, 2 bits per pixel, 2 bytes per row,
///     MSB pair leftmost. Four tiles per icon in the order top-right,
///     top-left, bottom-right, bottom-left.
///   - sprites: 64 bytes per 16×16 sprite, 2 bits per pixel, 4 bytes per
///     row, low bit pair leftmost.

use super::tile::{self, CORNER_BASE, TILE_COUNT, WALL_BASE};

// ── Sprite sheet indices ──

pub const FRIGHTENED_SPRITE: u8 = 0;
pub const GHOST_SPRITE: u8 = 2;
pub const NUMBER_SPRITE: u8 = 10;
pub const PACMAN_SPRITE: u8 = 14;
pub const BONUS_SPRITE: u8 = 21;
pub const SPRITE_COUNT: usize = 29;

// ── Palette groups ──

pub const FRIGHTENED_PALETTE: u8 = 5;
pub const DEADEYES_PALETTE: u8 = 6;
pub const BONUS_PALETTE: u8 = 7;

// ── Icons ──

pub const PACMAN_ICON: u8 = 1;
pub const BONUS_ICON: u8 = 2;
pub const ICON_COUNT: usize = 9;

/// Colour indices used by the background.
pub const DOT_COLOR: u8 = 14;
pub const TEXT_COLOR: u8 = 15;

/// Master palette (RGB). Packed for the panel by `ui::display`.
pub const PALETTE_W: [(u8, u8, u8); 16] = [
    (0, 0, 0),
    (255, 0, 0),     // red
    (222, 151, 81),  // brown
    (255, 0, 255),   // pink
    (0, 0, 0),
    (0, 255, 255),   // cyan
    (71, 84, 255),   // mid blue
    (255, 184, 81),  // light brown
    (0, 0, 0),
    (255, 255, 0),   // yellow
    (0, 0, 0),
    (33, 33, 255),   // blue
    (0, 255, 0),     // green
    (71, 84, 174),   // aqua
    (255, 184, 174), // light pink
    (222, 222, 255), // white
];

/// Sprite palette groups, four master indices each.
const PALETTE2: [u8; 60] = [
    0, 11, 1, 15,  // binky
    0, 11, 3, 15,  // pinky
    0, 11, 5, 15,  // inky
    0, 11, 7, 15,  // clyde
    0, 11, 9, 9,   // pacman
    0, 11, 15, 15, // frightened
    0, 11, 0, 15,  // dead eyes
    0, 1, 15, 2,   // cherry
    0, 1, 15, 12,  // strawberry
    0, 7, 2, 12,   // peach
    0, 9, 15, 0,   // bell
    0, 15, 1, 2,   // apple
    0, 12, 15, 5,  // grape
    0, 11, 9, 1,   // galaxian
    0, 5, 15, 15,  // key
];

/// Icon palette groups, one per icon.
const PALETTE_ICON2: [u8; 36] = [
    0, 9, 9, 9,    // pacman
    0, 2, 15, 1,   // cherry
    0, 12, 15, 1,  // strawberry
    0, 12, 2, 7,   // peach
    0, 0, 15, 9,   // bell
    0, 2, 15, 1,   // apple
    0, 12, 15, 5,  // grape
    0, 1, 9, 11,   // galaxian
    0, 5, 15, 15,  // key
];

pub fn palette_group(group: u8) -> &'static [u8] {
    let start = (group as usize % 15) * 4;
    &PALETTE2[start..start + 4]
}

/// Palette for a 1-based icon id.
pub fn icon_palette(icon: u8) -> &'static [u8] {
    let start = (icon.saturating_sub(1) as usize % ICON_COUNT) * 4;
    &PALETTE_ICON2[start..start + 4]
}

/// Wall colour per `LEVEL % 8`.
pub fn wall_color(level: u8) -> u8 {
    const WALL_COLORS: [u8; 8] = [15, 11, 12, 1, 9, 2, 5, 3];
    WALL_COLORS[(level % 8) as usize]
}

// ══════════════════════════════════════════════════════════════
// Rom
// ══════════════════════════════════════════════════════════════

pub struct Rom {
    play_tiles: Vec<u8>,
    icon_tiles: Vec<u8>,
    sprite_tiles: Vec<u8>,
}

impl Rom {
    pub fn generate() -> Self {
        let sheets = sprite_sheet();
        let mut sprite_tiles = Vec::with_capacity(SPRITE_COUNT * 64);
        for c in &sheets {
            sprite_tiles.extend_from_slice(&c.pack_sprite());
        }

        let mut icon_tiles = Vec::with_capacity(ICON_COUNT * 64);
        for icon in 1..=ICON_COUNT as u8 {
            let (source, group) = if icon == PACMAN_ICON {
                (PACMAN_SPRITE as usize + 6, 4)
            } else {
                let k = icon - BONUS_ICON;
                ((BONUS_SPRITE + k) as usize, BONUS_PALETTE + k)
            };
            let art = sheets[source].recolor(palette_group(group), icon_palette(icon));
            for t in art.pack_icon() {
                icon_tiles.extend_from_slice(&t);
            }
        }

        Rom { play_tiles: play_tiles(), icon_tiles, sprite_tiles }
    }

    /// 8 rows of the background tile for `code`.
    pub fn tile(&self, code: u8) -> &[u8] {
        let start = (code as usize % TILE_COUNT) * 8;
        &self.play_tiles[start..start + 8]
    }

    /// 16 bytes of icon tile `b` (0..4) for a 1-based icon id.
    pub fn icon_tile(&self, icon: u8, b: u8) -> &[u8] {
        let idx = (icon.saturating_sub(1) as usize % ICON_COUNT) * 4 + (b as usize & 3);
        &self.icon_tiles[idx * 16..idx * 16 + 16]
    }

    /// 64 bytes of sprite `bits`.
    pub fn sprite(&self, bits: u8) -> &[u8] {
        let start = (bits as usize % SPRITE_COUNT) * 64;
        &self.sprite_tiles[start..start + 64]
    }
}

// ══════════════════════════════════════════════════════════════
// Background tiles
// ══════════════════════════════════════════════════════════════

/// 5×7 font, one byte per row, bits 4..0 = columns left to right.
const FONT: [(u8, [u8; 7]); 37] = [
    (b'0', [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E]),
    (b'1', [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E]),
    (b'2', [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F]),
    (b'3', [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E]),
    (b'4', [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02]),
    (b'5', [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E]),
    (b'6', [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E]),
    (b'7', [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08]),
    (b'8', [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E]),
    (b'9', [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C]),
    (b'A', [0x0E, 0x11, 0x11, 0x11, 0x1F, 0x11, 0x11]),
    (b'B', [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E]),
    (b'C', [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E]),
    (b'D', [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C]),
    (b'E', [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F]),
    (b'F', [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10]),
    (b'G', [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F]),
    (b'H', [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11]),
    (b'I', [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E]),
    (b'J', [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C]),
    (b'K', [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11]),
    (b'L', [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F]),
    (b'M', [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11]),
    (b'N', [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11]),
    (b'O', [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E]),
    (b'P', [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10]),
    (b'Q', [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D]),
    (b'R', [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11]),
    (b'S', [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E]),
    (b'T', [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04]),
    (b'U', [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E]),
    (b'V', [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04]),
    (b'W', [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A]),
    (b'X', [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11]),
    (b'Y', [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04]),
    (b'Z', [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F]),
    (b'!', [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04]),
];

fn play_tiles() -> Vec<u8> {
    let mut out = vec![0u8; TILE_COUNT * 8];
    let mut put = |code: u8, rows: [u8; 8]| {
        let at = code as usize * 8;
        out[at..at + 8].copy_from_slice(&rows);
    };

    put(tile::DOT, [0, 0, 0, 0x18, 0x18, 0, 0, 0]);
    put(tile::PILL, [0x3C, 0x7E, 0xFF, 0xFF, 0xFF, 0xFF, 0x7E, 0x3C]);
    put(tile::PENGATE, [0, 0, 0, 0, 0xFF, 0, 0, 0]);

    for (ch, glyph) in FONT.iter() {
        let mut rows = [0u8; 8];
        for (r, g) in glyph.iter().enumerate() {
            rows[r] = g << 2;
        }
        put(*ch, rows);
    }

    for mask in 0..16u8 {
        put(WALL_BASE + mask, wall_tile(mask));
    }
    for n in 0..4u8 {
        put(CORNER_BASE + n, corner_tile(n));
    }
    out
}

/// Single-line wall outline, inset toward the wall interior.
fn wall_tile(mask: u8) -> [u8; 8] {
    let mut rows = [0u8; 8];
    let up = mask & tile::OPEN_UP != 0;
    let right = mask & tile::OPEN_RIGHT != 0;
    let down = mask & tile::OPEN_DOWN != 0;
    let left = mask & tile::OPEN_LEFT != 0;

    let x0 = if left { 2 } else { 0 };
    let x1 = if right { 5 } else { 7 };
    let y0 = if up { 2 } else { 0 };
    let y1 = if down { 5 } else { 7 };

    if up { hline(&mut rows, 2, x0, x1); }
    if down { hline(&mut rows, 5, x0, x1); }
    if left { vline(&mut rows, 2, y0, y1); }
    if right { vline(&mut rows, 5, y0, y1); }
    rows
}

/// Concave corner: n = open diagonal (0 up-left, 1 up-right, 2 down-left, 3 down-right).
fn corner_tile(n: u8) -> [u8; 8] {
    let mut rows = [0u8; 8];
    match n {
        0 => { vline(&mut rows, 2, 0, 2); hline(&mut rows, 2, 0, 2); }
        1 => { vline(&mut rows, 5, 0, 2); hline(&mut rows, 2, 5, 7); }
        2 => { vline(&mut rows, 2, 5, 7); hline(&mut rows, 5, 0, 2); }
        _ => { vline(&mut rows, 5, 5, 7); hline(&mut rows, 5, 5, 7); }
    }
    rows
}

fn hline(rows: &mut [u8; 8], y: usize, x0: u8, x1: u8) {
    for x in x0..=x1 {
        rows[y] |= 0x80 >> x;
    }
}

fn vline(rows: &mut [u8; 8], x: u8, y0: usize, y1: usize) {
    for row in rows.iter_mut().take(y1 + 1).skip(y0) {
        *row |= 0x80 >> x;
    }
}

// ══════════════════════════════════════════════════════════════
// Sprite art
// ══════════════════════════════════════════════════════════════

/// 16×16 canvas of 2-bit palette indices.
#[derive(Clone)]
struct Canvas {
    px: [[u8; 16]; 16],
}

impl Canvas {
    fn new() -> Self {
        Canvas { px: [[0; 16]; 16] }
    }

    /// Build from text rows: ' ' transparent, '1'..'3' palette index.
    fn from_rows(rows: &[&str]) -> Self {
        let mut c = Canvas::new();
        for (y, row) in rows.iter().take(16).enumerate() {
            for (x, ch) in row.bytes().take(16).enumerate() {
                c.px[y][x] = match ch {
                    b'1' => 1,
                    b'2' => 2,
                    b'3' => 3,
                    _ => 0,
                };
            }
        }
        c
    }

    fn plot(&mut self, x: i32, y: i32, p: u8) {
        if (0..16).contains(&x) && (0..16).contains(&y) {
            self.px[y as usize][x as usize] = p;
        }
    }

    fn rect(&mut self, x: i32, y: i32, w: i32, h: i32, p: u8) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.plot(xx, yy, p);
            }
        }
    }

    fn pack_sprite(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        for (y, row) in self.px.iter().enumerate() {
            for (x, &p) in row.iter().enumerate() {
                out[(y << 2) + (x >> 2)] |= (p & 3) << ((x & 3) << 1);
            }
        }
        out
    }

    /// Split into the four icon tiles, ordered top-right, top-left,
    /// bottom-right, bottom-left.
    fn pack_icon(&self) -> [[u8; 16]; 4] {
        let mut out = [[0u8; 16]; 4];
        for (b, tile) in out.iter_mut().enumerate() {
            let ox = if b & 1 == 0 { 8 } else { 0 };
            let oy = if b & 2 == 0 { 0 } else { 8 };
            for y in 0..8 {
                for x in 0..8 {
                    let p = self.px[oy + y][ox + x] & 3;
                    tile[y * 2 + x / 4] |= p << ((3 - (x & 3)) << 1);
                }
            }
        }
        out
    }

    /// Re-index through master colours: each pixel keeps its colour under
    /// the target palette (first match); unmatched colours go transparent.
    fn recolor(&self, from: &[u8], to: &[u8]) -> Canvas {
        let mut c = Canvas::new();
        for y in 0..16 {
            for x in 0..16 {
                let p = self.px[y][x] as usize;
                let color = from[p];
                if p == 0 || color == 0 {
                    continue;
                }
                c.px[y][x] = (1..4).find(|&q| to[q] == color).unwrap_or(0) as u8;
            }
        }
        c
    }
}

fn sprite_sheet() -> Vec<Canvas> {
    let mut sheet = Vec::with_capacity(SPRITE_COUNT);

    // 0..1 frightened ghost
    for skirt in 0..2 {
        sheet.push(frightened(skirt));
    }
    // 2..9 ghosts: Right, Down, Left, Up × two skirt phases
    for (dx, dy) in [(1, 0), (0, 1), (-1, 0), (0, -1)] {
        for skirt in 0..2 {
            sheet.push(ghost(dx, dy, skirt));
        }
    }
    // 10..13 points for eaten ghosts
    for label in ["200", "400", "800", "1600"] {
        sheet.push(number(label));
    }
    // 14..20 pac-man mouth frames
    const WIDE: f32 = 0.64; // cos 50°
    const HALF: f32 = 0.90; // cos 25°
    sheet.push(pacman(1.0, 0.0, WIDE));
    sheet.push(pacman(0.0, 1.0, WIDE));
    sheet.push(pacman(1.0, 0.0, HALF));
    sheet.push(pacman(0.0, 1.0, HALF));
    sheet.push(pacman(0.0, 0.0, 1.0));
    sheet.push(pacman(-1.0, 0.0, HALF));
    sheet.push(pacman(-1.0, 0.0, WIDE));
    // 21..28 bonus items
    for art in BONUS_ART.iter() {
        sheet.push(Canvas::from_rows(art));
    }
    sheet
}

const GHOST_BODY: [&str; 14] = [
    "                ",
    "      2222      ",
    "    22222222    ",
    "   2222222222   ",
    "  222222222222  ",
    "  222222222222  ",
    "  222222222222  ",
    " 22222222222222 ",
    " 22222222222222 ",
    " 22222222222222 ",
    " 22222222222222 ",
    " 22222222222222 ",
    " 22222222222222 ",
    " 22222222222222 ",
];

const SKIRTS: [[&str; 2]; 2] = [
    [" 22 222  222 22 ", " 2   22  22   2 "],
    [" 2222 2222 2222 ", "  22   22   22  "],
];

fn body(p: u8, skirt: usize) -> Canvas {
    let mut rows: Vec<&str> = GHOST_BODY.to_vec();
    rows.extend_from_slice(&SKIRTS[skirt & 1]);
    let mut c = Canvas::from_rows(&rows);
    if p != 2 {
        for row in c.px.iter_mut() {
            for v in row.iter_mut() {
                if *v == 2 { *v = p; }
            }
        }
    }
    c
}

/// Body p2, eye whites p3, pupils p1; eyes look toward `(dx, dy)`.
fn ghost(dx: i32, dy: i32, skirt: usize) -> Canvas {
    let mut c = body(2, skirt);
    for wx in [3, 9] {
        let (ex, ey) = (wx + dx, 4 + dy);
        c.rect(ex, ey + 1, 4, 3, 3);
        c.rect(ex + 1, ey, 2, 5, 3);
        c.rect(ex + 1 + dx, ey + 2 + dy, 2, 2, 1);
    }
    c
}

/// Body p1, face p2.
fn frightened(skirt: usize) -> Canvas {
    let mut c = body(1, skirt);
    c.rect(5, 6, 2, 2, 2);
    c.rect(9, 6, 2, 2, 2);
    for x in 3..13 {
        let y = if x % 2 == 0 { 10 } else { 11 };
        c.plot(x, y, 2);
    }
    c
}

/// 3×5 digits for the points popup.
fn tiny_digit(d: u8) -> [u8; 5] {
    match d {
        b'1' => [2, 6, 2, 2, 7],
        b'2' => [7, 1, 7, 4, 7],
        b'4' => [5, 5, 7, 1, 1],
        b'6' => [7, 4, 7, 5, 7],
        b'8' => [7, 5, 7, 5, 7],
        _ => [7, 5, 5, 5, 7],
    }
}

fn number(label: &str) -> Canvas {
    let mut c = Canvas::new();
    let width = label.len() as i32 * 4 - 1;
    let mut x = (16 - width) / 2;
    for d in label.bytes() {
        for (row, bits) in tiny_digit(d).iter().enumerate() {
            for col in 0..3 {
                if (*bits >> (2 - col)) & 1 != 0 {
                    c.plot(x + col, 6 + row as i32, 2);
                }
            }
        }
        x += 4;
    }
    c
}

/// Disc with a wedge removed around `(dx, dy)`; `cos_half` is the cosine
/// of the mouth half-angle (1.0 = closed).
fn pacman(dx: f32, dy: f32, cos_half: f32) -> Canvas {
    let mut c = Canvas::new();
    for y in 0..16 {
        for x in 0..16 {
            let vx = x as f32 + 0.5 - 8.0;
            let vy = y as f32 + 0.5 - 8.0;
            let r = (vx * vx + vy * vy).sqrt();
            if r > 6.5 {
                continue;
            }
            let open = r > 0.0 && (vx * dx + vy * dy) / r > cos_half;
            if !open {
                c.px[y][x] = 2;
            }
        }
    }
    c
}

const BONUS_ART: [[&str; 16]; 8] = [
    // cherry: red, white shine, brown stem
    [
        "                ",
        "           33   ",
        "         333    ",
        "        3  3    ",
        "       3   3    ",
        "      3    3    ",
        "     3     3    ",
        "   113    3     ",
        "  11113  3      ",
        " 12111111       ",
        " 12111111111    ",
        " 1111111121111  ",
        "  111111 211111 ",
        "   1111  111111 ",
        "          1111  ",
        "                ",
    ],
    // strawberry: red, white seeds, green leaves
    [
        "                ",
        "      3333      ",
        "    33333333    ",
        "   1113333111   ",
        "  111121111211  ",
        "  121111111111  ",
        "  111112112111  ",
        "  111111111121  ",
        "   12111211111  ",
        "   11111111211  ",
        "    111211111   ",
        "    11111121    ",
        "     1211111    ",
        "      11111     ",
        "       111      ",
        "                ",
    ],
    // peach: orange, brown crease, green leaf
    [
        "                ",
        "       2  33    ",
        "       2 3333   ",
        "    11123331    ",
        "   111112111111 ",
        "  1111112111111 ",
        "  1111111211111 ",
        "  1111111211111 ",
        "  111111121111  ",
        "  11111111211   ",
        "   11111111111  ",
        "   111111111111 ",
        "    1111111111  ",
        "     11111111   ",
        "       1111     ",
        "                ",
    ],
    // bell: yellow, white clapper
    [
        "                ",
        "       11       ",
        "      1111      ",
        "     111111     ",
        "    11211111    ",
        "    12111111    ",
        "    12111111    ",
        "   1211111111   ",
        "   1211111111   ",
        "   1211111111   ",
        "  121111111111  ",
        "  111111111111  ",
        "  222222222222  ",
        "       22       ",
        "      2222      ",
        "                ",
    ],
    // apple: white shine, red body, brown stem
    [
        "                ",
        "        3       ",
        "       3        ",
        "   2222322222   ",
        "  222222222222  ",
        " 21222222222222 ",
        " 21222222222222 ",
        " 12222222222222 ",
        " 22222222222222 ",
        " 22222222222222 ",
        " 22222222222222 ",
        "  222222222222  ",
        "  222222222222  ",
        "   2222  2222   ",
        "                ",
        "                ",
    ],
    // grape: green berries, white shine, cyan stem
    [
        "                ",
        "       33       ",
        "     333333     ",
        "       33       ",
        "    11 11 11    ",
        "   1211211211   ",
        "   1111111111   ",
        "    11 11 11    ",
        "   1211211211   ",
        "   1111111111   ",
        "    11 11 11    ",
        "     121211     ",
        "     111111     ",
        "      1111      ",
        "       11       ",
        "                ",
    ],
    // galaxian: blue wings, yellow body, red trim
    [
        "                ",
        "       22       ",
        "      2222      ",
        "      2222      ",
        "  1  322223  1  ",
        "  1 33222233 1  ",
        "  113322223311  ",
        "  111322223111  ",
        "  11 222222 11  ",
        "  1  222222  1  ",
        "  1   2222   1  ",
        "       22       ",
        "       22       ",
        "                ",
        "                ",
        "                ",
    ],
    // key: cyan head, white shaft
    [
        "                ",
        "     111111     ",
        "    11111111    ",
        "    11    11    ",
        "    11111111    ",
        "     111111     ",
        "       22       ",
        "       22       ",
        "       2222     ",
        "       22       ",
        "       222      ",
        "       22       ",
        "       2222     ",
        "       22       ",
        "        2       ",
        "                ",
    ],
];
