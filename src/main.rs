// SPDX: CC0-1.0

use anyhow::{bail, Context};
use chrono::{DateTime, Local};
use clap::Parser;
use env_logger::Env;
use function_plot::{
    eval::{EvalErr, EvalErrTyp, Idents},
    frame::{self, FrameConfig, SlotIdx, SlotOutcome, SLOT_COUNT},
    lex::{LexErrTyp, SubStr, TokTyp},
    parse::{self, ParseErr, ParseErrTyp},
    render::Canvas,
    roots::Polynomial,
    sample::{Magnification, SAMPLE_COUNT},
    shell::{self, Command},
    stdlib,
};
use log::info;
use std::{
    io::{stdin, stdout, BufRead, BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

/// Plot up to eight functions of x
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Canvas width in pixels
    #[clap(long, default_value_t = 512)]
    width: u32,

    /// Canvas height in pixels
    #[clap(long, default_value_t = 512)]
    height: u32,

    /// Initial magnification; the visible x range is -1/m to 1/m
    #[clap(short, long, default_value_t = Magnification::ONE)]
    zoom: Magnification,

    /// Directory that plots are written to
    #[clap(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Expression for the next slot, in slot order (up to 8)
    #[clap(short, long = "expr", value_name = "EXPR")]
    exprs: Vec<String>,

    /// Write one plot and exit instead of starting the shell
    #[clap(long)]
    once: bool,
}

fn output_png_filename(now: DateTime<Local>, n: u32) -> String {
    let stamp = now.format("%Y-%m-%d_%H-%M-%S_%3f");
    match n {
        0 => format!("{}_output-{stamp}.png", env!("CARGO_PKG_NAME")),
        n => format!("{}_output-{stamp}-{n}.png", env!("CARGO_PKG_NAME")),
    }
}

/// First output path in `dir` that is not taken yet.
fn output_png_path(dir: &Path, now: DateTime<Local>) -> PathBuf {
    (0..)
        .map(|n| dir.join(output_png_filename(now, n)))
        .find(|path| !path.exists())
        .unwrap_or_else(|| dir.join(output_png_filename(now, 0)))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    match try_main(Args::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("unexpected error: {err}");
            let chain = err.chain();
            if chain.len() > 1 {
                eprintln!();
                eprintln!("context:");
                for it in chain.skip(1) {
                    eprintln!("  {it}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
struct State {
    config: FrameConfig,
    idents: Idents,
    canvas: Canvas,
    out_dir: PathBuf,
}

fn try_main(args: Args) -> anyhow::Result<ExitCode> {
    if args.exprs.len() > SLOT_COUNT {
        bail!(
            "{} expressions given, but there are only {SLOT_COUNT} slots",
            args.exprs.len()
        );
    }

    let mut canvas = match Canvas::new(args.width, args.height) {
        Ok(canvas) => canvas,
        Err(err) => {
            // nothing can be drawn this session
            eprintln!("Failed to initialize canvas: {err}");
            return Ok(ExitCode::FAILURE);
        }
    };
    frame::init(&mut canvas);

    let mut config = FrameConfig::new(args.zoom);
    for (slot, expr) in SlotIdx::all().zip(args.exprs) {
        config.set_expr(slot, expr);
    }

    let mut state = State {
        config,
        idents: stdlib::standard_idents(),
        canvas,
        out_dir: args.out_dir,
    };

    let mut stdout = BufWriter::new(stdout());
    if args.once {
        plot(&mut stdout, &mut state)?;
        stdout.flush()?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut stdin = stdin().lock();
    writeln!(stdout, r#"try "help" for a list of commands"#)?;
    loop {
        let Some(mut try_cmd) = shell::input(&mut stdin, &mut stdout, "> ")? else {
            break;
        };
        try_cmd.make_ascii_lowercase();
        writeln!(stdout)?;

        if let Ok(cmd) = try_cmd.parse::<Command>() {
            match cmd {
                Command::Help => {
                    for c in Command::exhaustive() {
                        writeln!(stdout, "{name}: {help}", name = c.name(), help = c.help())?;
                    }
                }

                Command::Quit => break,

                Command::SetExpr => set_expr(&mut stdin, &mut stdout, &mut state)?,

                Command::Clear => state.config = FrameConfig::new(state.config.magnification),

                Command::List => shell::list_slots(&mut stdout, &state.config)?,

                Command::Zoom => set_zoom(&mut stdin, &mut stdout, &mut state)?,

                Command::Plot => plot(&mut stdout, &mut state)?,

                Command::PrintProg => print_prog(&mut stdin, &mut stdout, &state)?,

                Command::Roots => find_roots(&mut stdin, &mut stdout)?,
            }
        } else {
            writeln!(stdout, r#"Unknown command, try "help" for help"#)?;
        }

        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

fn read_slot<R: BufRead, W: Write>(inp: R, out: W) -> anyhow::Result<Option<SlotIdx>> {
    let slot = shell::read_fromstr::<_, _, SlotIdx>(
        inp,
        out,
        format_args!("?slot (1-{SLOT_COUNT}) = "),
        false,
    )?;
    Ok(slot.and_then(Result::ok).flatten())
}

fn set_expr<R: BufRead, W: Write>(mut inp: R, mut out: W, state: &mut State) -> anyhow::Result<()> {
    let Some(slot) = read_slot(&mut inp, &mut out)? else {
        return Ok(());
    };
    writeln!(out, "note: leave blank to disable slot {slot}")?;
    let Some(input) = shell::input(&mut inp, &mut out, format_args!("f{slot}(x) = "))? else {
        return Ok(());
    };
    state.config.set_expr(slot, input);

    // report parse errors now rather than at the next plot
    if state.config.is_active(slot) {
        if let Err(err) = parse::compile(state.config.expr(slot), &state.idents) {
            report_parse_err(&mut out, &err)?;
        }
    }
    Ok(())
}

fn set_zoom<R: BufRead, W: Write>(inp: R, mut out: W, state: &mut State) -> anyhow::Result<()> {
    writeln!(out, "note: leave blank to skip")?;
    let cur = state.config.magnification;
    if let Some(Ok(Some(mag))) = shell::read_fromstr::<_, _, Magnification>(
        inp,
        &mut out,
        format_args!("?magnification (is {cur}) = "),
        true,
    )? {
        state.config.magnification = mag;
    }
    Ok(())
}

fn print_prog<R: BufRead, W: Write>(mut inp: R, mut out: W, state: &State) -> anyhow::Result<()> {
    let Some(slot) = read_slot(&mut inp, &mut out)? else {
        return Ok(());
    };
    if !state.config.is_active(slot) {
        shell::expr_undefined(&mut out, slot)?;
        return Ok(());
    }
    match parse::compile(state.config.expr(slot), &state.idents) {
        Ok(prog) => shell::dump_program(&mut out, &prog, format_args!("f{slot}"))?,
        Err(err) => report_parse_err(&mut out, &err)?,
    }
    Ok(())
}

fn find_roots<R: BufRead, W: Write>(inp: R, mut out: W) -> anyhow::Result<()> {
    writeln!(out, "note: enter coefficients from the highest degree down, e.g. '1 -3 2'")?;
    if let Some(Ok(Some(poly))) = shell::read_fromstr::<_, _, Polynomial>(
        inp,
        &mut out,
        "?coefficients = ",
        true,
    )? {
        shell::print_roots(&mut out, &poly)?;
    }
    Ok(())
}

fn plot<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let report = frame::redraw(&mut state.canvas, &state.config, &state.idents);

    for (slot, outcome) in report.iter() {
        match outcome {
            SlotOutcome::Inactive => {}
            SlotOutcome::Plotted { failed: 0, .. } => {
                writeln!(out, "f{slot} ({}): ok", slot.color_name())?;
            }
            SlotOutcome::Plotted { failed, first_err } => {
                writeln!(
                    out,
                    "f{slot} ({}): {failed} of {SAMPLE_COUNT} samples could not be evaluated",
                    slot.color_name()
                )?;
                if let Some(err) = first_err {
                    report_eval_err(&mut out, state.config.expr(slot), err, &state.idents)?;
                }
            }
            SlotOutcome::Invalid(err) => {
                writeln!(out, "f{slot} ({}): not plotted", slot.color_name())?;
                report_parse_err(&mut out, err)?;
            }
        }
    }
    if report.draw_calls() == 0 {
        writeln!(out, "note: every slot is empty, only the axes were drawn")?;
    }

    let path = write_png(&state.canvas, &state.out_dir)?;
    writeln!(out, "wrote {}", path.display())?;
    Ok(())
}

fn write_png(canvas: &Canvas, dir: &Path) -> anyhow::Result<PathBuf> {
    let path = output_png_path(dir, Local::now());
    canvas
        .save_png(&path)
        .with_context(|| format!("failed to write plot to {}", path.display()))?;
    info!("wrote {}x{} plot to {}", canvas.width(), canvas.height(), path.display());
    Ok(path)
}

fn report_eval_err<W: Write>(
    mut out: W,
    expr: &Arc<String>,
    err: &EvalErr,
    idents: &Idents,
) -> anyhow::Result<()> {
    let loc = err.op.as_ref().map(|op| op.loc.clone());
    shell::underline(
        &mut out,
        // NOTE(unicode)
        &loc.unwrap_or_else(|| SubStr::end_of(Arc::clone(expr))),
    )?;
    writeln!(out, "evaluation error: {err}")?;

    match &err.typ {
        EvalErrTyp::StackMismatch { .. } if err.op.is_none() => {
            writeln!(out, "note: a function was given more arguments than it takes")?;
        }
        EvalErrTyp::UndefinedIdent { text } => {
            if let Some((key, ident)) = shell::similar_ident(idents, text.get()) {
                writeln!(out, "note: {} '{key}' has a similar name", ident.kind())?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn report_parse_err<W: Write>(mut out: W, err: &ParseErr) -> anyhow::Result<()> {
    writeln!(out)?;
    shell::underline(&mut out, &err.loc)?;
    writeln!(out, "parse error: {}", err.typ)?;
    match err.typ {
        ParseErrTyp::LexErr(LexErrTyp::InvalidChar) => {
            writeln!(
                out,
                "note: available tokens are numbers, alphabetic identifiers, and symbols +-*/^,()"
            )?;
        }
        ParseErrTyp::LexErr(LexErrTyp::Unsupported(typ)) => match typ {
            TokTyp::XGreater | TokTyp::XLess => {
                writeln!(out, "note: expected an expression but found an inequality")?;
            }
            TokTyp::XEqual => {
                writeln!(
                    out,
                    "note: expected an expression but found an equation, enter only the right-hand side"
                )?;
            }
            TokTyp::XPipe => {
                writeln!(out, "note: use the 'abs' function to compute absolute value")?;
            }
            TokTyp::XOpenSquareBracket
            | TokTyp::XCloseSquareBracket
            | TokTyp::XOpenCurly
            | TokTyp::XCloseCurly => {
                writeln!(out, "note: group with parentheses instead")?;
            }
            TokTyp::Ident
            | TokTyp::Number
            | TokTyp::Op(_)
            | TokTyp::Comma
            | TokTyp::OpenParen
            | TokTyp::CloseParen => {}
        },
        ParseErrTyp::ParseNum(_) => writeln!(out, "note: parsing as floating point number")?,
        ParseErrTyp::ExpectedOperator => {
            writeln!(out, "note: use '*' to multiply, e.g. '2*x' rather than '2x'")?;
        }
        ParseErrTyp::ExpectedOperand | ParseErrTyp::ParenMismatch | ParseErrTyp::StrayComma => {}
    }
    Ok(())
}
