use assert_cmd::Command;
use predicates::str::{contains, starts_with};
use tempfile::tempdir;

fn visitbot() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("visitbot"));
    cmd.env_remove("VISITBOT_CONFIG")
        .env_remove("VISIT_LOCK")
        .env_remove("WEBDRIVER_URL")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    visitbot()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("visitbot"));
}

#[test]
fn test_cli_version() {
    visitbot().arg("--version").assert().success();
}

#[test]
fn test_cli_completions() {
    visitbot()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(starts_with("_visitbot"));
}

#[test]
fn test_status_without_booking() {
    let temp = tempdir().unwrap();
    let lock = temp.path().join("visit.txt");
    visitbot()
        .args(["status", "--lock-file"])
        .arg(&lock)
        .assert()
        .success()
        .stdout(contains("No booking recorded"));
}

#[test]
fn test_status_shows_recorded_booking() {
    let temp = tempdir().unwrap();
    let lock = temp.path().join("visit.txt");
    std::fs::write(&lock, "Booked in enel-med!\n\nUSG 2 stawów kolanowych").unwrap();
    visitbot()
        .args(["status", "--lock-file"])
        .arg(&lock)
        .assert()
        .success()
        .stdout(contains("USG 2 stawów kolanowych"));
}

#[test]
fn test_book_refuses_when_locked() {
    let temp = tempdir().unwrap();
    let lock = temp.path().join("visit.txt");
    let config = temp.path().join("config.toml");
    std::fs::write(&lock, "Booked in enel-med!\n\nDr. Nowak, 12.03 10:15").unwrap();
    std::fs::write(&config, "[retry]\ndelay_secs = 1\n").unwrap();

    // The driver endpoint is unreachable; a held lock must stop the run first.
    visitbot()
        .arg("--config")
        .arg(&config)
        .args([
            "book",
            "--login",
            "alice",
            "--password",
            "s3cret",
            "--city",
            "Kraków",
            "--service-type",
            "USG",
            "--service",
            "USG 2 stawów kolanowych",
            "--email-to",
            "ops@example.com",
            "--webdriver-url",
            "http://127.0.0.1:9",
            "--lock-file",
        ])
        .arg(&lock)
        .assert()
        .code(1)
        .stderr(contains("already exists"))
        .stderr(contains("Dr. Nowak, 12.03 10:15"));
}

#[test]
fn test_book_requires_recipients() {
    visitbot()
        .env_remove("EMAIL_TO")
        .args([
            "book",
            "--login",
            "alice",
            "--password",
            "s3cret",
            "--city",
            "Kraków",
            "--service-type",
            "USG",
            "--service",
            "USG",
        ])
        .assert()
        .failure()
        .stderr(contains("--email-to"));
}
