// SPDX: CC0-1.0

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn plotter() -> Command {
    let mut cmd = Command::cargo_bin("function_plot").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn pngs(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
        .collect()
}

#[test]
fn once_writes_png() {
    let dir = tempfile::tempdir().unwrap();
    plotter()
        .args(["--once", "--width", "64", "--height", "48", "-e", "x*x", "-e", "sin(x)"])
        .arg("--out-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("f1 (red): ok"))
        .stdout(predicate::str::contains("f2 (blue): ok"))
        .stdout(predicate::str::contains("wrote "));

    let written = pngs(dir.path());
    assert_eq!(written.len(), 1);
    let img = image::open(&written[0]).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (64, 48));
}

#[test]
fn bad_expression_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    plotter()
        .args(["--once", "-e", "x + ", "-e", "", "-e", "sine(x)"])
        .arg("--out-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("f1 (red): not plotted"))
        .stdout(predicate::str::contains("expected a value"))
        .stdout(predicate::str::contains("f2 (blue)").not())
        .stdout(predicate::str::contains("f3 (yellow): 512 of 512 samples"))
        .stdout(predicate::str::contains("function 'sin' has a similar name"));
}

#[test]
fn empty_canvas_is_fatal() {
    plotter()
        .args(["--once", "--width", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to initialize canvas").count(1))
        .stderr(predicate::str::contains("unexpected error").not());
}

#[test]
fn too_many_expressions() {
    let mut cmd = plotter();
    cmd.arg("--once");
    for _ in 0..9 {
        cmd.args(["-e", "x"]);
    }
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("only 8 slots"));
}

#[test]
fn rejects_bad_zoom() {
    plotter().args(["--zoom", "0"]).assert().failure();
}

#[test]
fn shell_session() {
    let dir = tempfile::tempdir().unwrap();
    plotter()
        .arg("--out-dir")
        .arg(dir.path())
        .write_stdin("set\n4\nabs(x)\nzoom\n2\nlist\nprog\n4\nplot\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("magnification = 2"))
        .stdout(predicate::str::contains("4 (green): abs(x)"))
        .stdout(predicate::str::contains("load 'abs'"))
        .stdout(predicate::str::contains("f4 (green): ok"));
    assert_eq!(pngs(dir.path()).len(), 1);
}

#[test]
fn shell_reports_parse_errors() {
    plotter()
        .write_stdin("set\n1\ny = x\nset\n2\n2x\nbogus\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("found an equation"))
        .stdout(predicate::str::contains("parse error: expected an operator"))
        .stdout(predicate::str::contains("use '*' to multiply"))
        .stdout(predicate::str::contains("Unknown command"));
}

#[test]
fn repeated_plots_keep_every_file() {
    let dir = tempfile::tempdir().unwrap();
    plotter()
        .args(["--width", "16", "--height", "16", "-e", "x"])
        .arg("--out-dir")
        .arg(dir.path())
        .write_stdin("plot\nplot\nplot\n")
        .assert()
        .success();
    assert_eq!(pngs(dir.path()).len(), 3);
}

#[test]
fn shell_finds_roots() {
    plotter()
        .write_stdin("roots\n1 -6 11 -6\nroots\n1 x\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("P(x) = x^3 - 6x^2 + 11x - 6"))
        .stdout(predicate::str::contains("rational roots (8 candidates tested):\n  x = 1\n  x = 2\n  x = 3\n"))
        .stdout(predicate::str::contains("invalid coefficient 'x'"));
}
