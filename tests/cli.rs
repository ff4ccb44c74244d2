use assert_cmd::Command;
use predicates::prelude::*;

fn reelfluent() -> Command {
    let mut cmd = Command::cargo_bin("reelfluent").unwrap();
    // Keep config and session files inside the test sandbox
    let home = tempfile::tempdir().unwrap().into_path();
    cmd.env("HOME", &home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_DATA_HOME", home.join(".local/share"));
    cmd
}

#[test]
fn clips_from_plain_duration() {
    reelfluent()
        .args(["clips", "95", "--segment-length", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0:00-0:30"))
        .stdout(predicate::str::contains("1:30-1:35"));
}

#[test]
fn clips_json_output() {
    reelfluent()
        .args(["clips", "60", "--segment-length", "30", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"start_time\": 0.0"))
        .stdout(predicate::str::contains("\"end_time\": 60.0"));
}

#[test]
fn clips_zero_duration_prints_notice() {
    reelfluent()
        .args(["clips", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No clips could be generated"));
}

#[test]
fn compare_reports_accuracy() {
    reelfluent()
        .args(["compare", "hello wrld", "hello world"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Accuracy: 50%"));
}

#[test]
fn compare_json_lists_verdicts() {
    reelfluent()
        .args(["compare", "hello world", "hello world", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"verdict\": \"correct\""))
        .stdout(predicate::str::contains("\"accuracy\": 1.0"));
}

#[test]
fn session_list_starts_empty() {
    reelfluent()
        .args(["session", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(none)"))
        .stdout(predicate::str::contains("Session usage: 0s of 30m 0s"));
}

#[test]
fn session_add_rejects_unknown_source() {
    reelfluent()
        .args([
            "session", "add", "no-such-source", "--start", "0", "--end", "30",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown media source"));
}

#[test]
fn transcribe_rejects_start_without_end() {
    reelfluent()
        .args(["transcribe", "lesson.mp3", "--start", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--end"));
}

#[test]
fn transcribe_rejects_clip_with_custom_range() {
    reelfluent()
        .args([
            "transcribe", "lesson.mp3", "--clip", "2", "--start", "5", "--end", "10",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used"));
}

#[test]
fn clips_rejects_subtitle_formats_at_parse_time() {
    reelfluent()
        .args(["clips", "95", "--format", "srt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn session_list_rejects_subtitle_formats_at_parse_time() {
    reelfluent()
        .args(["session", "list", "--format", "vtt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn help_lists_subcommands() {
    reelfluent()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("clips"))
        .stdout(predicate::str::contains("transcribe"))
        .stdout(predicate::str::contains("session"));
}
