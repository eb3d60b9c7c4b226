//! Startup failures run the real binary.

use std::process::Command;

fn relay() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_upstream-relay"));
    cmd.env("RUST_LOG", "error").env("PORT", "0");
    cmd
}

#[test]
fn unparsable_target_exits_non_zero() {
    let output = relay().env("TARGET", "not a url").output().unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid TARGET URL"), "stderr: {}", stderr);
    assert!(!stderr.contains("Proxy running"));
}

#[test]
fn positional_target_is_validated() {
    let output = relay()
        .env_remove("TARGET")
        .arg("ftp://example.com")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unsupported scheme"), "stderr: {}", stderr);
}

#[test]
fn invalid_port_exits_non_zero() {
    let output = relay()
        .env("TARGET", "http://127.0.0.1:1")
        .env("PORT", "not-a-port")
        .output()
        .unwrap();

    assert!(!output.status.success());
}
