pub mod compositor;
pub mod display;
pub mod gamepad;
pub mod input;
pub mod renderer;
pub mod sound;
