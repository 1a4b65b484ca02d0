pub mod ai;
pub mod entity;
pub mod maze;
pub mod rom;
pub mod tile;
