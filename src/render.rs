// SPDX: CC0-1.0

use crate::{
    frame::SLOT_COUNT,
    sample::{VertexBuffer, COMPONENTS, X, Y},
    Number,
};
use core::fmt;
use std::{collections::VecDeque, path::Path};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    pub const RED: Self = Self::new(1.0, 0.0, 0.0, 1.0);
    pub const BLUE: Self = Self::new(0.0, 0.0, 1.0, 1.0);
    pub const YELLOW: Self = Self::new(1.0, 1.0, 0.0, 1.0);
    pub const GREEN: Self = Self::new(0.0, 1.0, 0.0, 1.0);
    pub const MAGENTA: Self = Self::new(1.0, 0.0, 1.0, 1.0);
    pub const CYAN: Self = Self::new(0.0, 1.0, 1.0, 1.0);
    pub const ORANGE: Self = Self::new(1.0, 0.5, 0.0, 1.0);
    pub const INDIGO: Self = Self::new(0.294, 0.0, 0.51, 1.0);

    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    fn from_rgba8([r, g, b, a]: [u8; 4]) -> Self {
        let f = |c: u8| f32::from(c) / 255.0;
        Self::new(f(r), f(g), f(b), f(a))
    }

    /// `src * src.a + dst * (1 - src.a)`, applied to every channel.
    fn blend_over(self, dst: Self) -> Self {
        let a = self.a;
        let mix = |s: f32, d: f32| s * a + d * (1.0 - a);
        Self::new(
            mix(self.r, dst.r),
            mix(self.g, dst.g),
            mix(self.b, dst.b),
            mix(self.a, dst.a),
        )
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_rgba8();
        write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

/// Slot colors by position, slot 1 first.
pub const PALETTE: [Rgba; SLOT_COUNT] = [
    Rgba::RED,
    Rgba::BLUE,
    Rgba::YELLOW,
    Rgba::GREEN,
    Rgba::MAGENTA,
    Rgba::CYAN,
    Rgba::ORANGE,
    Rgba::INDIGO,
];

pub const PALETTE_NAMES: [&str; SLOT_COUNT] = [
    "red", "blue", "yellow", "green", "magenta", "cyan", "orange", "indigo",
];

pub const AXIS_COLOR: Rgba = Rgba::WHITE;

/// x axis then y axis, as pairs of `[x, y, z, w]` endpoints in clip space.
/// Does not scale with magnification.
pub const AXES: [[Number; COMPONENTS]; 4] = [
    [-1.0, 0.0, 0.0, 1.0],
    [1.0, 0.0, 0.0, 1.0],
    [0.0, -1.0, 0.0, 1.0],
    [0.0, 1.0, 0.0, 1.0],
];

/// Backend status codes, numbered like their OpenGL counterparts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    NoError,
    InvalidValue,
}

impl ErrorStatus {
    pub const fn code(&self) -> u32 {
        match self {
            Self::NoError => 0,
            Self::InvalidValue => 0x0501,
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoError => "no error",
            Self::InvalidValue => "invalid value",
        };
        write!(f, "{name} ({:#06x})", self.code())
    }
}

/// Immediate-mode drawing target.
///
/// Draw calls never fail; problems are queued and read back one at a time
/// with [`Renderer::error_status`].
pub trait Renderer {
    /// Reset to transparent black and enable source-over alpha blending.
    fn clear_frame(&mut self);

    /// Draw the fixed axis grid in [`AXES`].
    fn draw_axes(&mut self);

    /// Draw a line strip through the first `count` vertices of `buf`.
    fn draw_polyline(&mut self, buf: &VertexBuffer, count: usize, color: Rgba);

    /// Pop the oldest queued error, or [`ErrorStatus::NoError`].
    fn error_status(&mut self) -> ErrorStatus;
}

#[derive(Error, Debug)]
pub enum CanvasErr {
    #[error("canvas size {width}x{height} has no pixels")]
    Empty { width: u32, height: u32 },
    #[error("canvas size {width}x{height} exceeds the limit of {max}x{max}")]
    TooLarge { width: u32, height: u32, max: u32 },
    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),
}

/// Software RGBA8 render target. Clip space `[-1, 1]` covers the whole
/// canvas with +y pointing up.
#[derive(Clone, Debug)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    blend: bool,
    errors: VecDeque<ErrorStatus>,
}

impl Canvas {
    pub const MAX_SIZE: u32 = 1 << 14;

    pub fn new(width: u32, height: u32) -> Result<Self, CanvasErr> {
        if width == 0 || height == 0 {
            return Err(CanvasErr::Empty { width, height });
        }
        if width > Self::MAX_SIZE || height > Self::MAX_SIZE {
            return Err(CanvasErr::TooLarge {
                width,
                height,
                max: Self::MAX_SIZE,
            });
        }
        Ok(Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
            blend: false,
            errors: VecDeque::new(),
        })
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    pub fn as_rgba(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    pub fn to_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_fn(self.width, self.height, |x, y| {
            image::Rgba(self.pixel(x, y))
        })
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), CanvasErr> {
        self.to_image().save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    fn to_window(&self, [x, y]: [Number; 2]) -> [Number; 2] {
        [
            (x + 1.0) * 0.5 * Number::from(self.width),
            (1.0 - y) * 0.5 * Number::from(self.height),
        ]
    }

    fn plot(&mut self, x: Number, y: Number, color: Rgba) {
        let inside = (0.0..Number::from(self.width)).contains(&x)
            && (0.0..Number::from(self.height)).contains(&y);
        if !inside {
            return;
        }
        let i = self.offset(x as u32, y as u32);
        let px = &mut self.pixels[i..i + 4];
        let out = if self.blend {
            let dst = Rgba::from_rgba8([px[0], px[1], px[2], px[3]]);
            color.blend_over(dst)
        } else {
            color
        };
        px.copy_from_slice(&out.to_rgba8());
    }

    fn line(&mut self, a: [Number; 2], b: [Number; 2], color: Rgba) {
        let Some((a, b)) = clip_segment(a, b) else {
            return;
        };
        let [x0, y0] = self.to_window(a);
        let [x1, y1] = self.to_window(b);
        let (dx, dy) = (x1 - x0, y1 - y0);
        // clipped, so bounded by the canvas diagonal
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
        for s in 0..=steps {
            let t = s as Number / steps as Number;
            self.plot((x0 + dx * t).floor(), (y0 + dy * t).floor(), color);
        }
    }
}

impl Renderer for Canvas {
    fn clear_frame(&mut self) {
        self.blend = true;
        let clear = Rgba::TRANSPARENT.to_rgba8();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&clear);
        }
    }

    fn draw_axes(&mut self) {
        for pair in AXES.chunks_exact(2) {
            let a = [pair[0][X], pair[0][Y]];
            let b = [pair[1][X], pair[1][Y]];
            self.line(a, b, AXIS_COLOR);
        }
    }

    fn draw_polyline(&mut self, buf: &VertexBuffer, count: usize, color: Rgba) {
        if count > buf.capacity() {
            self.errors.push_back(ErrorStatus::InvalidValue);
            return;
        }
        let points: Vec<_> = buf.points(count).collect();
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            // non-finite samples leave a gap
            if [a.x, a.y, b.x, b.y].iter().all(|c| c.is_finite()) {
                self.line([a.x, a.y], [b.x, b.y], color);
            }
        }
    }

    fn error_status(&mut self) -> ErrorStatus {
        self.errors.pop_front().unwrap_or(ErrorStatus::NoError)
    }
}

/// Liang-Barsky clip of segment `a`-`b` against the `[-1, 1]` square.
fn clip_segment(a: [Number; 2], b: [Number; 2]) -> Option<([Number; 2], [Number; 2])> {
    let d = [b[0] - a[0], b[1] - a[1]];
    let (mut t0, mut t1): (Number, Number) = (0.0, 1.0);
    for axis in 0..2 {
        for (p, q) in [(-d[axis], a[axis] + 1.0), (d[axis], 1.0 - a[axis])] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
            } else {
                let r = q / p;
                if p < 0.0 {
                    t0 = t0.max(r);
                } else {
                    t1 = t1.min(r);
                }
            }
        }
    }
    (t0 <= t1).then(|| {
        (
            [a[0] + t0 * d[0], a[1] + t0 * d[1]],
            [a[0] + t1 * d[0], a[1] + t1 * d[1]],
        )
    })
}
