use std::{env, fs, path::PathBuf, process::Command};

fn run_bin(bin: &str, args: &[&str]) -> (bool, String, String) {
    let output = Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command");

    let stdout = String::from_utf8(output.stdout).expect("failed to convert stdout to string");
    let stderr = String::from_utf8(output.stderr).expect("failed to convert stderr to string");
    (output.status.success(), stdout, stderr)
}

#[test]
fn generate_then_summarize() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("generate_then_summarize");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir_all(&test_dir).expect("failed to create test directory");

    let csv_path = test_dir.join("tau.csv");
    let csv_str = csv_path.to_str().expect("failed to convert path to string");

    let (ok, stdout, stderr) = run_bin(
        env!("CARGO_BIN_EXE_generate_sample"),
        &["--output", csv_str, "--start", "2019-11-20", "--days", "60", "--cadence", "60"],
    );
    assert!(ok, "generate_sample failed\nstdout:\n{stdout}\nstderr:\n{stderr}");

    let text = fs::read_to_string(&csv_path).expect("failed to read generated file");
    assert_eq!(text.lines().count(), 60 * 24);
    assert!(text.starts_with("2019-11-20,00:00:00,"));

    let stats = env!("CARGO_BIN_EXE_tau-stats");

    let (ok, stdout, stderr) = run_bin(stats, &["--file", csv_str, "--group", "-mn 1"]);
    assert!(ok, "text run failed\nstdout:\n{stdout}\nstderr:\n{stderr}");
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines[0].starts_with("start"));
    assert_eq!(lines.len(), 1 + 3);

    let (ok, stdout, stderr) = run_bin(
        stats,
        &[
            "--file", csv_str,
            "--filter", "-ng -yr 2019",
            "--group", "-dy 7",
            "--format", "json",
        ],
    );
    assert!(ok, "json run failed\nstdout:\n{stdout}\nstderr:\n{stderr}");
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("stdout is not JSON");
    let table = report["table"].as_array().expect("table is not an array");
    assert!(!table.is_empty());
    let counted: u64 = table.iter().map(|b| b["count"].as_u64().unwrap()).sum();
    assert_eq!(counted, 12 * 42);
    assert_eq!(
        report["boxplot"]["boxes"].as_array().unwrap().len(),
        table.len()
    );

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn errors_exit_with_failure() {
    let stats = env!("CARGO_BIN_EXE_tau-stats");

    let (ok, _, stderr) = run_bin(stats, &["--file", "/nonexistent/tau.csv"]);
    assert!(!ok);
    assert!(stderr.contains("failed to load"), "stderr:\n{stderr}");

    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("errors_exit_with_failure");
    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir_all(&test_dir).expect("failed to create test directory");
    let csv_path = test_dir.join("tau.csv");
    fs::write(&csv_path, "2020-01-01,00:00:00,0.1\n2020-01-01,01:00:00,0.2\n")
        .expect("failed to write fixture");
    let csv_str = csv_path.to_str().unwrap();

    let (ok, _, _) = run_bin(stats, &["--file", csv_str, "--group", "-wk 1"]);
    assert!(!ok);

    let (ok, _, _) = run_bin(
        stats,
        &["--file", csv_str, "--from", "2020-02-01", "--to", "2020-01-01"],
    );
    assert!(!ok);

    let (ok, _, _) = run_bin(stats, &["--file", csv_str, "--filter", "-yr 1999"]);
    assert!(!ok);

    fs::remove_dir_all(&test_dir).ok();
}
