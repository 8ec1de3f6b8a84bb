use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const SUM: &str = include_str!("../../demos/sum.pap");

#[test]
fn writes_listing_next_to_source() {
    let dir = tempdir().expect("tempdir");
    let source = dir.path().join("sum.pap");
    fs::write(&source, SUM).expect("write source");

    Command::cargo_bin("paprikac")
        .expect("binary exists")
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let listing = fs::read_to_string(dir.path().join("sum.pasm")).expect("read listing");
    assert!(listing.contains(".func Main params=0"));
    assert!(listing.contains(".func Execute params=0"));
    assert!(listing.contains("iter.release 0"));
}

#[test]
fn runs_program() {
    let dir = tempdir().expect("tempdir");
    let source = dir.path().join("sum.pap");
    fs::write(&source, SUM).expect("write source");
    let output = dir.path().join("out").join("sum.listing");

    Command::cargo_bin("paprikac")
        .expect("binary exists")
        .arg(&source)
        .arg("-o")
        .arg(&output)
        .arg("--run")
        .assert()
        .success()
        .stdout("sum=23\n");

    assert!(output.exists(), "listing was not created");
}

#[test]
fn dumps_typed_tree() {
    let dir = tempdir().expect("tempdir");
    let source = dir.path().join("sum.pap");
    fs::write(&source, SUM).expect("write source");

    Command::cargo_bin("paprikac")
        .expect("binary exists")
        .arg(&source)
        .arg("--dump-ast")
        .assert()
        .success()
        .stdout(predicate::str::contains("func Main() -> String"))
        .stdout(predicate::str::contains("foreach i: Number"));
}

#[test]
fn reports_compile_errors_with_location() {
    let dir = tempdir().expect("tempdir");
    let source = dir.path().join("bad.pap");
    fs::write(&source, "func Main() -> Number {\n    1 +\n}\n").expect("write source");

    Command::cargo_bin("paprikac")
        .expect("binary exists")
        .arg(&source)
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.pap:3:1"))
        .stderr(predicate::str::contains("unexpected token RBrace in expression"));

    assert!(!dir.path().join("bad.pasm").exists());
}

#[test]
fn reports_missing_source() {
    let dir = tempdir().expect("tempdir");

    Command::cargo_bin("paprikac")
        .expect("binary exists")
        .arg(dir.path().join("missing.pap"))
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error: failed to read source file"));
}

#[test]
fn limits_call_depth() {
    let dir = tempdir().expect("tempdir");
    let source = dir.path().join("loop.pap");
    fs::write(
        &source,
        "func down(n Number) -> Number { down(n + 1) }\nfunc Main() -> Number { down(0) }\n",
    )
    .expect("write source");

    Command::cargo_bin("paprikac")
        .expect("binary exists")
        .arg(&source)
        .arg("--run")
        .arg("--max-call-depth")
        .arg("8")
        .assert()
        .failure()
        .stderr(predicate::str::contains("program failed: call depth exceeded 8"));
}
