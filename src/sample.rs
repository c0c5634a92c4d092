// SPDX: CC0-1.0

use crate::{
    eval::{self, EvalErr, Idents, Program},
    parse::{self, ParseErr},
    stdlib, Number, Point,
};
use core::{fmt, num::ParseFloatError, str::FromStr};
use std::sync::Arc;

/// Points sampled per expression, independent of magnification.
pub const SAMPLE_COUNT: usize = 512;

/// Components per vertex: x, y, z, magnification.
pub const COMPONENTS: usize = 4;

pub const X: usize = 0;
pub const Y: usize = 1;
pub const Z: usize = 2;
pub const W: usize = 3;

/// Zoom factor; the visible domain is `[-1/m, +1/m]`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Magnification(Number);

impl Magnification {
    pub const ONE: Self = Self(1.0);

    /// `None` unless `m` is finite and strictly positive.
    pub fn new(m: Number) -> Option<Self> {
        (m.is_finite() && m > 0.0).then_some(Self(m))
    }

    #[inline]
    pub const fn get(self) -> Number {
        self.0
    }
}

impl Default for Magnification {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Magnification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MagnificationErr {
    NotANumber(String),
    OutOfRange,
}

impl fmt::Display for MagnificationErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber(err) => write!(f, "invalid number: {err}"),
            Self::OutOfRange => write!(f, "magnification must be finite and greater than zero"),
        }
    }
}

impl std::error::Error for MagnificationErr {}

impl FromStr for Magnification {
    type Err = MagnificationErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let m: Number = s
            .trim()
            .parse()
            .map_err(|err: ParseFloatError| MagnificationErr::NotANumber(err.to_string()))?;
        Self::new(m).ok_or(MagnificationErr::OutOfRange)
    }
}

/// Evenly spaced sample grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Domain {
    pub start: Number,
    pub step: Number,
    pub count: usize,
}

impl Domain {
    /// `count` points starting at `-1/m`, spaced `(2/m)/count` apart. The last
    /// point lands one step short of `+1/m`.
    pub fn symmetric(mag: Magnification, count: usize) -> Self {
        let half = mag.get().recip();
        Self {
            start: -half,
            step: 2.0 * half / count as Number,
            count,
        }
    }

    #[inline]
    pub fn x(&self, i: usize) -> Number {
        // multiply rather than accumulate so every slot sees identical x
        self.start + i as Number * self.step
    }

    pub fn xs(&self) -> impl Iterator<Item = Number> + '_ {
        (0..self.count).map(move |i| self.x(i))
    }
}

/// Flat `[x, y, z, w]` vertex array consumed directly by the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexBuffer {
    data: Vec<Number>,
}

impl VertexBuffer {
    pub fn new() -> Self {
        Self {
            data: vec![0.0; SAMPLE_COUNT * COMPONENTS],
        }
    }

    /// Number of vertices the buffer holds.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len() / COMPONENTS
    }

    #[inline]
    pub fn as_slice(&self) -> &[Number] {
        &self.data
    }

    #[inline]
    pub fn vertex(&self, i: usize) -> [Number; COMPONENTS] {
        let v = &self.data[COMPONENTS * i..COMPONENTS * (i + 1)];
        [v[X], v[Y], v[Z], v[W]]
    }

    /// The `(x, y)` components of the first `count` vertices.
    pub fn points(&self, count: usize) -> impl Iterator<Item = Point<Number>> + '_ {
        self.data
            .chunks_exact(COMPONENTS)
            .take(count)
            .map(|v| Point { x: v[X], y: v[Y] })
    }

    /// Write the shared x, z and w columns for `domain`. Returns the number
    /// of vertices written.
    pub fn set_grid(&mut self, domain: &Domain, mag: Magnification) -> usize {
        let count = domain.count.min(self.capacity());
        for (i, v) in self.data.chunks_exact_mut(COMPONENTS).take(count).enumerate() {
            v[X] = domain.x(i);
            v[Z] = 0.0;
            v[W] = mag.get();
        }
        count
    }

    #[inline]
    pub fn set_y(&mut self, i: usize, y: Number) {
        self.data[COMPONENTS * i + Y] = y;
    }

    #[inline]
    pub fn x(&self, i: usize) -> Number {
        self.data[COMPONENTS * i + X]
    }
}

impl Default for VertexBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluates compiled expressions with `x` bound to successive grid values.
#[derive(Debug)]
pub struct Sampler {
    idents: Idents,
    stack: Vec<Number>,
}

impl Sampler {
    pub fn new(idents: Idents) -> Self {
        Self {
            idents,
            stack: Vec::new(),
        }
    }

    pub fn idents(&self) -> &Idents {
        &self.idents
    }

    pub fn eval_at(&mut self, prog: &Program, x: Number) -> Result<Number, EvalErr> {
        stdlib::bind_x(&mut self.idents, x);
        eval::eval(prog, &self.idents, &mut self.stack)
    }

    /// Write y values for the first `count` grid points of `buf`. Samples that
    /// fail to evaluate, and every sample when `prog` is `None`, become NaN.
    /// Returns the first evaluation error and how many samples failed.
    pub fn fill(
        &mut self,
        prog: Option<&Program>,
        buf: &mut VertexBuffer,
        count: usize,
    ) -> (usize, Option<EvalErr>) {
        let mut failed = 0;
        let mut first_err = None;
        for i in 0..count {
            let y = match prog.map(|prog| self.eval_at(prog, buf.x(i))) {
                Some(Ok(y)) => y,
                Some(Err(err)) => {
                    failed += 1;
                    first_err.get_or_insert(err);
                    Number::NAN
                }
                None => {
                    failed += 1;
                    Number::NAN
                }
            };
            buf.set_y(i, y);
        }
        (failed, first_err)
    }
}

#[derive(Debug)]
pub enum ExprErr {
    Parse(ParseErr),
    Eval(EvalErr),
}

impl fmt::Display for ExprErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "parse error: {err}"),
            Self::Eval(err) => write!(f, "evaluation error: {err}"),
        }
    }
}

impl std::error::Error for ExprErr {}

/// Evaluate `expr` once with `x` bound.
pub fn evaluate(expr: &str, x: Number, idents: &Idents) -> Result<Number, ExprErr> {
    let src = Arc::new(expr.to_string());
    let prog = parse::compile(&src, idents).map_err(ExprErr::Parse)?;
    let mut sampler = Sampler::new(idents.clone());
    sampler.eval_at(&prog, x).map_err(ExprErr::Eval)
}

/// Sample `expr` at `count` points `start + i*step`. Points where the
/// expression cannot be evaluated, or all of them when it does not parse,
/// have a NaN y.
pub fn sample(
    expr: &str,
    start: Number,
    step: Number,
    count: usize,
    idents: &Idents,
) -> Vec<Point<Number>> {
    let src = Arc::new(expr.to_string());
    let prog = parse::compile(&src, idents).ok();
    let mut sampler = Sampler::new(idents.clone());
    let domain = Domain { start, step, count };
    domain
        .xs()
        .map(|x| {
            let y = prog
                .as_ref()
                .and_then(|prog| sampler.eval_at(prog, x).ok())
                .unwrap_or(Number::NAN);
            Point { x, y }
        })
        .collect()
}
