use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

const GRID_CELLS: usize = 200;

fn run_cbmerge(cwd: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_cbmerge"))
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("cbmerge command should run")
}

fn fixture_json(color: &str) -> String {
    let cells = vec![format!("\"{color}\""); GRID_CELLS].join(", ");
    let led = |index: usize| {
        format!(
            r#"{{ "zeta_extra": true, "valid": 1, "page_index": {index}, "speed_ms": 150,
                 "frames": {{ "valid": 1, "frame_num": 1,
                              "frame_data": [{{ "frame_index": 0, "frame_RGB": [{cells}] }}] }} }}"#
        )
    };
    let word = |index: usize| {
        format!(r#"{{ "valid": 1, "page_index": {index}, "word_page": {{ "valid": 1 }} }}"#)
    };
    format!(
        r#"{{
  "zeta": "listed first on purpose",
  "product_info": {{ "product_id": "CYBERBOARD_R4" }},
  "page_num": 8,
  "page_data": [{}, {}, {}, {}, {}, {}, {}, {}],
  "alpha": "listed last on purpose"
}}"#,
        word(0),
        word(1),
        word(2),
        word(3),
        word(4),
        led(5),
        led(6),
        led(7)
    )
}

#[test]
fn merged_output_is_byte_identical_across_runs() {
    let dir = tempdir().expect("tempdir should create");
    fs::write(dir.path().join("base.json"), fixture_json("#111111")).expect("fixture");
    fs::write(dir.path().join("other.json"), fixture_json("#222222")).expect("fixture");

    let first = run_cbmerge(
        dir.path(),
        &[
            "merge",
            "--base",
            "base.json",
            "--led",
            "6=other.json:7",
            "--output",
            "first.json",
        ],
    );
    assert!(
        first.status.success(),
        "merge should succeed: {}",
        String::from_utf8_lossy(&first.stderr)
    );

    let second = run_cbmerge(
        dir.path(),
        &[
            "merge",
            "--base",
            "base.json",
            "--led",
            "6=other.json:7",
            "--output",
            "second.json",
        ],
    );
    assert!(second.status.success(), "repeat merge should succeed");

    let first_bytes = fs::read(dir.path().join("first.json")).expect("first output");
    let second_bytes = fs::read(dir.path().join("second.json")).expect("second output");
    assert_eq!(
        first_bytes, second_bytes,
        "identical inputs should merge to identical bytes"
    );
}

#[test]
fn remerging_a_merged_file_changes_nothing() {
    let dir = tempdir().expect("tempdir should create");
    fs::write(dir.path().join("base.json"), fixture_json("#111111")).expect("fixture");
    fs::write(dir.path().join("other.json"), fixture_json("#222222")).expect("fixture");

    let first = run_cbmerge(
        dir.path(),
        &[
            "merge",
            "--base",
            "base.json",
            "--led",
            "5=other.json:5",
            "--output",
            "merged.json",
        ],
    );
    assert!(
        first.status.success(),
        "merge should succeed: {}",
        String::from_utf8_lossy(&first.stderr)
    );

    let again = run_cbmerge(
        dir.path(),
        &[
            "merge",
            "--base",
            "merged.json",
            "--output",
            "again.json",
        ],
    );
    assert!(again.status.success(), "keep-all remerge should succeed");

    let merged = fs::read(dir.path().join("merged.json")).expect("merged output");
    let again_bytes = fs::read(dir.path().join("again.json")).expect("remerged output");
    assert_eq!(merged, again_bytes, "a keep-all merge should be idempotent");
}

#[test]
fn unknown_fields_and_key_order_survive_the_merge() {
    let dir = tempdir().expect("tempdir should create");
    fs::write(dir.path().join("base.json"), fixture_json("#111111")).expect("fixture");
    fs::write(dir.path().join("other.json"), fixture_json("#222222")).expect("fixture");

    let output = run_cbmerge(
        dir.path(),
        &[
            "merge",
            "--base",
            "base.json",
            "--led",
            "7=other.json:6",
            "--output",
            "result.json",
        ],
    );
    assert!(
        output.status.success(),
        "merge should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let result = fs::read_to_string(dir.path().join("result.json")).expect("result should read");
    let zeta = result.find("\"zeta\"").expect("zeta should survive");
    let product = result.find("\"product_info\"").expect("product_info survives");
    let alpha = result.find("\"alpha\"").expect("alpha should survive");
    assert!(
        zeta < product && product < alpha,
        "top-level key order should be preserved"
    );

    assert!(
        result.contains("\"zeta_extra\""),
        "unknown page fields should ride along with a replaced page"
    );
}
