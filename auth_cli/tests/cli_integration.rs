//! Integration tests for the auth_cli binary.
//!
//! Only commands that need no database are exercised here.

use std::process::{Command, Output};

const JWT_SECRET: &str = "cli_integration_secret_32_bytes_long";

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_auth_cli"))
        .args(args)
        .env("JWT_SECRET", JWT_SECRET)
        .env_remove("DATABASE_URL")
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to run auth_cli")
}

#[test]
fn test_help_lists_commands() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["migrate", "register", "login", "oauth", "refresh", "verify"] {
        assert!(stdout.contains(command), "Help should mention {command}");
    }
}

#[test]
fn test_verify_rejects_garbage_token() {
    let output = run_cli(&["verify", "--access-token", "not.a.jwt"]);
    assert!(!output.status.success(), "Garbage token must not verify");
    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid token"));
}

#[test]
fn test_login_without_database_reports_missing_url() {
    let output = run_cli(&[
        "login",
        "--email",
        "ada@example.com",
        "--password",
        "Analyt1cal!",
    ]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("DATABASE_URL"));
}

#[test]
fn test_unknown_command_fails() {
    let output = run_cli(&["logout"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown command"));
}
