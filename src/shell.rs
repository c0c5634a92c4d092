// SPDX: CC0-1.0

use crate::{
    eval::{Ident, IdentKey, Idents, Program},
    frame::{FrameConfig, SlotIdx},
    lex::SubStr,
    roots::{self, Polynomial, RootsErr, MAX_CLOSED_FORM_DEGREE},
};
use anyhow::Context;
use core::fmt;
use std::{
    io::{self, BufRead, Write},
    sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    SetExpr,
    Clear,
    List,
    Zoom,
    PrintProg,
    Plot,
    Roots,
}

impl Command {
    pub const fn exhaustive() -> &'static [Command] {
        &[
            Self::Help,
            Self::Quit,
            Self::SetExpr,
            Self::Clear,
            Self::List,
            Self::Zoom,
            Self::Plot,
            Self::Roots,
            Self::PrintProg,
        ]
    }

    pub const fn help(&self) -> &'static str {
        match self {
            Self::Help => "display help for each command",
            Self::Quit => "quit the shell",
            Self::SetExpr => "set the expression of a slot (leave blank to disable it)",
            Self::Clear => "disable every slot",
            Self::List => "list slots with their colors and expressions",
            Self::Zoom => "set magnification (visible x range is -1/m to 1/m)",
            Self::PrintProg => "print program compiled from a slot (for debugging)",
            Self::Plot => "redraw all slots and write the canvas to a png file",
            Self::Roots => "find the roots of a polynomial from its coefficients",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Quit => "quit",
            Self::SetExpr => "set",
            Self::Clear => "clear",
            Self::List => "list",
            Self::Zoom => "zoom",
            Self::PrintProg => "prog",
            Self::Plot => "plot",
            Self::Roots => "roots",
        }
    }
}

impl core::str::FromStr for Command {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::exhaustive()
            .iter()
            .find(|c| c.name() == s)
            .copied()
            .ok_or(())
    }
}

/// Print `prompt` and read one trimmed line. `None` at end of input.
pub fn input<R: BufRead, W: Write>(
    mut inp: R,
    mut out: W,
    prompt: impl fmt::Display,
) -> anyhow::Result<Option<String>> {
    write!(out, "{prompt}").context("write to standard output failed")?;
    out.flush().context("write to standard output failed")?;
    let mut s = String::new();
    let n = inp
        .read_line(&mut s)
        .context("read from standard input failed")?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(s.trim().to_string()))
}

/// Read a value, reporting parse errors with the input underlined. The outer
/// `Option` is `None` at end of input; the inner one is `None` when the line
/// was blank and `ignore_empty` is set.
#[allow(clippy::type_complexity)]
pub fn read_fromstr<R: BufRead, W: Write, T: core::str::FromStr>(
    inp: R,
    mut out: W,
    prompt: impl fmt::Display,
    ignore_empty: bool,
) -> anyhow::Result<Option<Result<Option<T>, <T as core::str::FromStr>::Err>>>
where
    <T as core::str::FromStr>::Err: fmt::Display,
{
    let Some(line) = input(inp, &mut out, prompt)? else {
        return Ok(None);
    };
    let line = Arc::new(line);
    if ignore_empty && line.is_empty() {
        return Ok(Some(Ok(None)));
    }
    match line.parse::<T>() {
        Ok(new) => Ok(Some(Ok(Some(new)))),
        Err(err) => {
            writeln!(out)?;
            underline(&mut out, &SubStr::all(line))?;
            writeln!(out, "parse error: {err}")?;
            Ok(Some(Err(err)))
        }
    }
}

pub fn underline<W: Write>(mut out: W, span: &SubStr) -> io::Result<()> {
    let src = span.src();
    // spans are byte offsets; pad by characters
    let pad = src
        .get(..span.start())
        .map_or(span.start(), |before| before.chars().count());
    let width = span.get().chars().count();
    writeln!(out, "{src}")?;
    writeln!(out, "{}{}", " ".repeat(pad), "^".repeat(width.max(1)))?;
    Ok(())
}

pub fn dump_program<W: Write>(mut out: W, prog: &Program, title: fmt::Arguments) -> io::Result<()> {
    writeln!(out, "{title}: ")?;
    if prog.is_empty() {
        writeln!(out, "  (empty)")?;
    }
    for op in prog.ops() {
        writeln!(out, "  {op}")?;
    }
    Ok(())
}

pub fn list_slots<W: Write>(mut out: W, config: &FrameConfig) -> io::Result<()> {
    writeln!(out, "magnification = {}", config.magnification)?;
    for slot in SlotIdx::all() {
        let expr = config.expr(slot);
        if config.is_active(slot) {
            writeln!(out, "  {slot} ({}): {expr}", slot.color_name())?;
        } else {
            writeln!(out, "  {slot} ({}): (empty)", slot.color_name())?;
        }
    }
    Ok(())
}

pub fn expr_undefined<W: Write>(mut out: W, slot: SlotIdx) -> io::Result<()> {
    writeln!(out, "error: slot {slot} has no expression")
}

/// Print the closed-form roots of `poly`, then its rational roots when the
/// coefficients are integers.
pub fn print_roots<W: Write>(mut out: W, poly: &Polynomial) -> io::Result<()> {
    writeln!(out, "P(x) = {poly}")?;

    let form = roots::solve(poly);
    if let Some(degree) = form.truncated_from {
        writeln!(
            out,
            "warning: degree {degree} has no closed form, solving only the terms of degree {} and up",
            degree - MAX_CLOSED_FORM_DEGREE
        )?;
    }
    writeln!(out, "closed form:")?;
    for (i, root) in form.roots.iter().enumerate() {
        writeln!(out, "  x{} = {root}", i + 1)?;
    }

    match roots::rational_roots(poly) {
        Ok(found) => {
            writeln!(
                out,
                "rational roots ({} candidates tested):",
                found.candidates.len()
            )?;
            if found.roots.is_empty() {
                writeln!(out, "  (none)")?;
            }
            for root in &found.roots {
                writeln!(out, "  x = {root}")?;
            }
        }
        Err(RootsErr::NotInteger) => {
            writeln!(out, "note: rational roots are only searched for integer coefficients")?;
        }
        Err(err) => writeln!(out, "rational roots: {err}")?,
    }
    Ok(())
}

/// The defined identifier whose name is most similar to `text`, if it is
/// similar enough to be worth suggesting.
pub fn similar_ident<'a>(idents: &'a Idents, text: &str) -> Option<(&'a IdentKey, &'a Ident)> {
    let text = text.to_ascii_lowercase();
    idents
        .iter()
        .map(|kv| {
            let sim =
                strsim::normalized_damerau_levenshtein(&text, &kv.0.get().to_ascii_lowercase());
            (sim, kv)
        })
        .filter(|(sim, _)| *sim > 0.3)
        .max_by(|(a, ka), (b, kb)| {
            // break ties by name so suggestions are stable
            a.total_cmp(b).then_with(|| kb.0.get().cmp(ka.0.get()))
        })
        .map(|(_, kv)| kv)
}
