// SPDX: CC0-1.0

//! Plot up to eight expressions in `x` onto a raster canvas.
//!
//! A redraw ([`frame::redraw`]) clears the canvas, draws the axis grid, then
//! samples every non-empty expression slot at [`sample::SAMPLE_COUNT`] evenly
//! spaced points and draws each as a polyline in the slot's palette color.
//!
//! [`roots`] solves polynomials given by their coefficients, for the shell's
//! `roots` command.

pub mod eval;
pub mod frame;
pub mod lex;
pub mod parse;
pub mod render;
pub mod roots;
pub mod sample;
pub mod shell;
pub mod stdlib;

pub type Number = f64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}
