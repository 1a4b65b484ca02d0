/// Background tile codes and their properties.
/// Maze maps store raw codes (one byte per cell, indexing the 1-bit tile
/// table); properties are queried through `Tile`, so tile semantics are
/// centralized here.

pub const EMPTY: u8 = 0;
pub const DOT: u8 = 7;
pub const PILL: u8 = 14;
pub const PENGATE: u8 = 0x1B;

/// Walls: `WALL_BASE + mask`, mask bit set where the neighbour is open.
pub const WALL_BASE: u8 = 0x60;
pub const OPEN_UP: u8 = 1;
pub const OPEN_RIGHT: u8 = 2;
pub const OPEN_DOWN: u8 = 4;
pub const OPEN_LEFT: u8 = 8;

/// Concave wall corners: `CORNER_BASE + n`, n = which diagonal is open
/// (0 up-left, 1 up-right, 2 down-left, 3 down-right).
pub const CORNER_BASE: u8 = 0x70;

/// Number of codes in the tile table.
pub const TILE_COUNT: usize = 128;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tile {
    Empty,
    Dot,
    Pill,
    PenGate,
    Wall(u8),
    Corner(u8),
    Glyph(u8),
    Unknown(u8),
}

impl Tile {
    pub fn from_code(code: u8) -> Tile {
        match code {
            EMPTY => Tile::Empty,
            DOT => Tile::Dot,
            PILL => Tile::Pill,
            PENGATE => Tile::PenGate,
            0x60..=0x6F => Tile::Wall(code - WALL_BASE),
            0x70..=0x73 => Tile::Corner(code - CORNER_BASE),
            b'!' | b'0'..=b'9' | b'A'..=b'Z' => Tile::Glyph(code),
            other => Tile::Unknown(other),
        }
    }

    /// Can a sprite occupy this cell? The pen gate is passable only under
    /// the rules applied in `ai::gate_open`.
    pub fn is_passable(self) -> bool {
        matches!(self, Tile::Empty | Tile::Dot | Tile::Pill | Tile::PenGate)
    }

    /// Does the maze seed a dot bit for this cell?
    pub fn is_edible(self) -> bool {
        matches!(self, Tile::Dot | Tile::Pill)
    }

    /// Letters and digits always draw in the text colour.
    pub fn is_glyph(self) -> bool {
        matches!(self, Tile::Glyph(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_codes() {
        assert_eq!(Tile::from_code(0), Tile::Empty);
        assert_eq!(Tile::from_code(DOT), Tile::Dot);
        assert_eq!(Tile::from_code(PILL), Tile::Pill);
        assert_eq!(Tile::from_code(PENGATE), Tile::PenGate);
        assert_eq!(Tile::from_code(WALL_BASE + 5), Tile::Wall(5));
        assert_eq!(Tile::from_code(CORNER_BASE + 3), Tile::Corner(3));
        assert_eq!(Tile::from_code(b'R'), Tile::Glyph(b'R'));
        assert_eq!(Tile::from_code(b'!'), Tile::Glyph(b'!'));
    }

    #[test]
    fn passability() {
        for code in [EMPTY, DOT, PILL, PENGATE] {
            assert!(Tile::from_code(code).is_passable(), "code {code}");
        }
        assert!(!Tile::from_code(WALL_BASE).is_passable());
        assert!(!Tile::from_code(b'A').is_passable());
    }

    #[test]
    fn walls_are_not_text() {
        // Wall codes sit above '0' numerically but must not use the text colour.
        for mask in 0..16 {
            assert!(!Tile::from_code(WALL_BASE + mask).is_glyph());
        }
    }
}
