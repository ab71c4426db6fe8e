//! Tests for shell completion generation and color flags.
// Test module - relaxed lint rules
#![allow(clippy::expect_used)]

use std::process::Command;

fn aiclip_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_aiclip"))
}

#[test]
fn completions_generate_for_each_shell() {
    for (shell, marker) in [("bash", "_aiclip"), ("zsh", "#compdef"), ("fish", "complete -c aiclip")] {
        let output = aiclip_bin()
            .args(["completions", shell])
            .output()
            .expect("failed to execute");

        assert!(
            output.status.success(),
            "completions {shell} should succeed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains(marker), "{shell} completions should contain {marker}");
    }
}

#[test]
fn completions_reject_unknown_shell() {
    let output = aiclip_bin()
        .args(["completions", "tcsh"])
        .output()
        .expect("failed to execute");

    assert!(!output.status.success());
}

#[test]
fn color_flag_accepts_known_modes() {
    for mode in ["auto", "always", "never"] {
        let output = aiclip_bin()
            .arg(format!("--color={mode}"))
            .arg("--help")
            .output()
            .expect("failed to execute");

        assert!(
            output.status.success(),
            "--color={mode} should be accepted: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

#[test]
fn color_flag_rejects_invalid() {
    let output = aiclip_bin()
        .arg("--color=sometimes")
        .arg("--help")
        .output()
        .expect("failed to execute");

    assert!(!output.status.success(), "--color=sometimes should be rejected");
}
