// SPDX: CC0-1.0

use crate::{
    eval::{EvalErr, Idents},
    parse::{self, ParseErr},
    render::{ErrorStatus, Renderer, Rgba, PALETTE, PALETTE_NAMES},
    sample::{Domain, Magnification, Sampler, VertexBuffer, SAMPLE_COUNT},
};
use core::{fmt, num::ParseIntError, str::FromStr};
use log::{debug, info, warn};
use std::sync::Arc;

pub const SLOT_COUNT: usize = 8;

// keeps a renderer that never reports `NoError` from hanging startup
const MAX_STATUS_POLLS: usize = 1024;

/// Position of an expression slot. Stored 0-based, written 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotIdx(usize);

impl SlotIdx {
    pub const fn new(idx: usize) -> Option<Self> {
        if idx < SLOT_COUNT {
            Some(Self(idx))
        } else {
            None
        }
    }

    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..SLOT_COUNT).map(Self)
    }

    #[inline]
    pub const fn color(self) -> Rgba {
        PALETTE[self.0]
    }

    #[inline]
    pub const fn color_name(self) -> &'static str {
        PALETTE_NAMES[self.0]
    }
}

impl fmt::Display for SlotIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0 + 1)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotIdxErr {
    ParseInt(ParseIntError),
    OutOfRange(usize),
}

impl fmt::Display for SlotIdxErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseInt(err) => write!(f, "invalid slot: {err}"),
            Self::OutOfRange(n) => write!(f, "slot {n} is not between 1 and {SLOT_COUNT}"),
        }
    }
}

impl std::error::Error for SlotIdxErr {}

impl FromStr for SlotIdx {
    type Err = SlotIdxErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: usize = s.trim().parse().map_err(SlotIdxErr::ParseInt)?;
        n.checked_sub(1)
            .and_then(Self::new)
            .ok_or(SlotIdxErr::OutOfRange(n))
    }
}

/// Everything one redraw reads.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameConfig {
    pub magnification: Magnification,
    pub exprs: [Arc<String>; SLOT_COUNT],
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self::new(Magnification::ONE)
    }
}

impl FrameConfig {
    pub fn new(magnification: Magnification) -> Self {
        Self {
            magnification,
            exprs: core::array::from_fn(|_| Arc::new(String::new())),
        }
    }

    pub fn with_expr(mut self, slot: SlotIdx, expr: impl Into<String>) -> Self {
        self.set_expr(slot, expr);
        self
    }

    pub fn set_expr(&mut self, slot: SlotIdx, expr: impl Into<String>) {
        self.exprs[slot.get()] = Arc::new(expr.into());
    }

    pub fn expr(&self, slot: SlotIdx) -> &Arc<String> {
        &self.exprs[slot.get()]
    }

    /// A slot is active when its expression has any non-whitespace text.
    pub fn is_active(&self, slot: SlotIdx) -> bool {
        !self.expr(slot).trim().is_empty()
    }

    pub fn active(&self) -> impl Iterator<Item = SlotIdx> + '_ {
        SlotIdx::all().filter(|slot| self.is_active(*slot))
    }
}

#[derive(Debug)]
pub enum SlotOutcome {
    Inactive,
    /// Sampled and drawn; `failed` samples were NaN because evaluation failed.
    Plotted {
        failed: usize,
        first_err: Option<EvalErr>,
    },
    /// Did not parse; drawn as an all-NaN strip, which leaves nothing visible.
    Invalid(ParseErr),
}

#[derive(Debug)]
pub struct FrameReport {
    outcomes: Vec<SlotOutcome>,
}

impl FrameReport {
    pub fn outcome(&self, slot: SlotIdx) -> &SlotOutcome {
        &self.outcomes[slot.get()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotIdx, &SlotOutcome)> {
        SlotIdx::all().zip(self.outcomes.iter())
    }

    pub fn draw_calls(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !matches!(o, SlotOutcome::Inactive))
            .count()
    }
}

/// Clear, draw the axes, then sample and draw every active slot in order so
/// that later slots land on top.
pub fn redraw<R: Renderer + ?Sized>(
    renderer: &mut R,
    config: &FrameConfig,
    idents: &Idents,
) -> FrameReport {
    renderer.clear_frame();
    renderer.draw_axes();

    let mag = config.magnification;
    let domain = Domain::symmetric(mag, SAMPLE_COUNT);
    // x, z and w are shared by every slot; only y is rewritten per slot
    let mut buf = VertexBuffer::new();
    let count = buf.set_grid(&domain, mag);
    let mut sampler = Sampler::new(idents.clone());

    let outcomes = SlotIdx::all()
        .map(|slot| {
            if !config.is_active(slot) {
                return SlotOutcome::Inactive;
            }
            let expr = config.expr(slot);
            let outcome = match parse::compile(expr, sampler.idents()) {
                Ok(prog) => {
                    let (failed, first_err) = sampler.fill(Some(&prog), &mut buf, count);
                    debug!("slot {slot}: sampled '{expr}', {failed} of {count} samples failed");
                    SlotOutcome::Plotted { failed, first_err }
                }
                Err(err) => {
                    warn!("slot {slot}: cannot parse '{expr}': {err}");
                    sampler.fill(None, &mut buf, count);
                    SlotOutcome::Invalid(err)
                }
            };
            renderer.draw_polyline(&buf, count, slot.color());
            outcome
        })
        .collect();

    FrameReport { outcomes }
}

/// Draw the empty grid once, then poll and log the renderer's error status
/// until it is clear. Returns the errors seen.
pub fn init<R: Renderer + ?Sized>(renderer: &mut R) -> Vec<ErrorStatus> {
    renderer.clear_frame();
    renderer.draw_axes();

    let mut seen = Vec::new();
    loop {
        let status = renderer.error_status();
        info!("graphics error status: {status}");
        if status == ErrorStatus::NoError {
            break;
        }
        seen.push(status);
        if seen.len() >= MAX_STATUS_POLLS {
            warn!("graphics error status did not clear after {MAX_STATUS_POLLS} polls");
            break;
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{render::Canvas, stdlib, Number};

    #[derive(Debug, PartialEq)]
    enum Call {
        Clear,
        Axes,
        Polyline {
            color: Rgba,
            vertices: Vec<[Number; 4]>,
        },
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
        pending: Vec<ErrorStatus>,
    }

    impl Recorder {
        fn polylines(&self) -> Vec<(&Rgba, &Vec<[Number; 4]>)> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    Call::Polyline { color, vertices } => Some((color, vertices)),
                    _ => None,
                })
                .collect()
        }
    }

    impl Renderer for Recorder {
        fn clear_frame(&mut self) {
            self.calls.push(Call::Clear);
        }

        fn draw_axes(&mut self) {
            self.calls.push(Call::Axes);
        }

        fn draw_polyline(&mut self, buf: &VertexBuffer, count: usize, color: Rgba) {
            let vertices = (0..count).map(|i| buf.vertex(i)).collect();
            self.calls.push(Call::Polyline { color, vertices });
        }

        fn error_status(&mut self) -> ErrorStatus {
            self.pending.pop().unwrap_or(ErrorStatus::NoError)
        }
    }

    fn slot(n: usize) -> SlotIdx {
        SlotIdx::new(n - 1).unwrap()
    }

    #[test]
    fn empty_config_draws_only_axes() {
        let mut rec = Recorder::default();
        let report = redraw(&mut rec, &FrameConfig::default(), &stdlib::standard_idents());
        assert_eq!(rec.calls, [Call::Clear, Call::Axes]);
        assert_eq!(report.draw_calls(), 0);
        assert!(report
            .iter()
            .all(|(_, o)| matches!(o, SlotOutcome::Inactive)));
    }

    #[test]
    fn slot_colors_follow_position() {
        let config = FrameConfig::default()
            .with_expr(slot(1), "x")
            .with_expr(slot(4), "x*x");
        let mut rec = Recorder::default();
        redraw(&mut rec, &config, &stdlib::standard_idents());
        let colors: Vec<_> = rec.polylines().into_iter().map(|(c, _)| *c).collect();
        assert_eq!(colors, [Rgba::RED, Rgba::GREEN]);

        // populating other slots does not shift colors
        let config = config
            .with_expr(slot(2), "1")
            .with_expr(slot(8), "-1");
        let mut rec = Recorder::default();
        redraw(&mut rec, &config, &stdlib::standard_idents());
        let colors: Vec<_> = rec.polylines().into_iter().map(|(c, _)| *c).collect();
        assert_eq!(colors, [Rgba::RED, Rgba::BLUE, Rgba::GREEN, Rgba::INDIGO]);
    }

    #[test]
    fn empty_slot_does_not_affect_others() {
        let idents = stdlib::standard_idents();
        let alone = FrameConfig::default().with_expr(slot(3), "sin(x)");
        let mut with_gap = alone.clone().with_expr(slot(2), "x");
        with_gap.set_expr(slot(2), "   ");

        let mut a = Recorder::default();
        let mut b = Recorder::default();
        redraw(&mut a, &alone, &idents);
        redraw(&mut b, &with_gap, &idents);
        assert_eq!(a.calls, b.calls);
        assert_eq!(a.polylines().len(), 1);
    }

    #[test]
    fn shared_grid_and_vertex_layout() {
        let mag = Magnification::new(4.0).unwrap();
        let config = FrameConfig::new(mag)
            .with_expr(slot(1), "x")
            .with_expr(slot(5), "2*x");
        let mut rec = Recorder::default();
        redraw(&mut rec, &config, &stdlib::standard_idents());

        let lines = rec.polylines();
        assert_eq!(lines.len(), 2);
        let (_, first) = lines[0];
        let (_, second) = lines[1];
        assert_eq!(first.len(), SAMPLE_COUNT);
        assert_eq!(second.len(), SAMPLE_COUNT);
        assert_eq!(first[0], [-0.25, -0.25, 0.0, 4.0]);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a[0], b[0]);
            assert_eq!(a[2], 0.0);
            assert_eq!(a[3], 4.0);
            assert_eq!(b[1], 2.0 * a[0]);
        }
    }

    #[test]
    fn redraw_is_idempotent() {
        let idents = stdlib::standard_idents();
        let config = FrameConfig::default().with_expr(slot(1), "x*x");
        let mut a = Recorder::default();
        let mut b = Recorder::default();
        redraw(&mut a, &config, &idents);
        redraw(&mut b, &config, &idents);
        assert_eq!(a.calls, b.calls);
    }

    #[test]
    fn bad_slot_is_isolated() {
        let config = FrameConfig::default()
            .with_expr(slot(1), "sin(")
            .with_expr(slot(2), "sqrt(x)")
            .with_expr(slot(3), "x");
        let mut rec = Recorder::default();
        let report = redraw(&mut rec, &config, &stdlib::standard_idents());

        assert!(matches!(report.outcome(slot(1)), SlotOutcome::Invalid(_)));
        match report.outcome(slot(2)) {
            SlotOutcome::Plotted { failed, first_err } => {
                // sqrt of negative x is NaN, not an evaluation error
                assert_eq!(*failed, 0);
                assert!(first_err.is_none());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(matches!(
            report.outcome(slot(3)),
            SlotOutcome::Plotted { failed: 0, .. }
        ));

        let lines = rec.polylines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].1.iter().all(|v| v[1].is_nan()));
        assert!(lines[2].1.iter().all(|v| v[1] == v[0]));
    }

    #[test]
    fn eval_errors_are_counted() {
        let config = FrameConfig::default().with_expr(slot(6), "x + y");
        let mut rec = Recorder::default();
        let report = redraw(&mut rec, &config, &stdlib::standard_idents());
        match report.outcome(slot(6)) {
            SlotOutcome::Plotted { failed, first_err } => {
                assert_eq!(*failed, SAMPLE_COUNT);
                assert!(first_err.is_some());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(rec.polylines()[0].0, &Rgba::CYAN);
    }

    #[test]
    fn axes_ignore_magnification() {
        let idents = stdlib::standard_idents();
        let mut a = Canvas::new(32, 32).unwrap();
        let mut b = Canvas::new(32, 32).unwrap();
        redraw(&mut a, &FrameConfig::new(Magnification::ONE), &idents);
        redraw(
            &mut b,
            &FrameConfig::new(Magnification::new(4.0).unwrap()),
            &idents,
        );
        assert_eq!(a.as_rgba(), b.as_rgba());
        assert!(a.as_rgba().iter().any(|c| *c != 0));
    }

    #[test]
    fn later_slots_draw_on_top() {
        let config = FrameConfig::default()
            .with_expr(slot(1), "0.5")
            .with_expr(slot(2), "0.5");
        let mut canvas = Canvas::new(32, 32).unwrap();
        redraw(&mut canvas, &config, &stdlib::standard_idents());
        // y = 0.5 lands on row 8
        assert_eq!(canvas.pixel(4, 8), Rgba::BLUE.to_rgba8());
    }

    #[test]
    fn init_polls_until_clear() {
        let mut rec = Recorder {
            pending: vec![ErrorStatus::InvalidValue, ErrorStatus::InvalidValue],
            ..Default::default()
        };
        let seen = init(&mut rec);
        assert_eq!(seen.len(), 2);
        assert_eq!(rec.calls, [Call::Clear, Call::Axes]);
        assert_eq!(rec.error_status(), ErrorStatus::NoError);
    }

    #[test]
    fn slot_parsing() {
        assert_eq!("1".parse::<SlotIdx>().unwrap().get(), 0);
        assert_eq!(" 8 ".parse::<SlotIdx>().unwrap().get(), 7);
        assert_eq!("0".parse::<SlotIdx>(), Err(SlotIdxErr::OutOfRange(0)));
        assert_eq!("9".parse::<SlotIdx>(), Err(SlotIdxErr::OutOfRange(9)));
        assert!(matches!(
            "f".parse::<SlotIdx>(),
            Err(SlotIdxErr::ParseInt(_))
        ));
        assert_eq!(slot(4).to_string(), "4");
        assert_eq!(slot(4).color_name(), "green");
    }
}
