//! System diagnostics and dependency checking.
//!
//! Verifies that the external collaborators jimaku depends on are present
//! and plausibly configured.

use crate::config::Config;
use crate::models::download::is_model_installed;
use owo_colors::OwoColorize;
use std::process::Command;

/// Result of a dependency check.
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Collaborator is available
    Ok,
    /// Collaborator is not found
    NotFound,
    /// Collaborator is found but has issues
    Warning(String),
}

/// Check if a command exists and is executable.
fn check_command(command: &str) -> CheckResult {
    match Command::new(command).arg("--version").output() {
        Ok(output) if output.status.success() => CheckResult::Ok,
        Ok(_) => CheckResult::Warning(format!("'{}' found but --version failed", command)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::NotFound,
        Err(e) => CheckResult::Warning(format!("Error checking '{}': {}", command, e)),
    }
}

/// Check that the configured translation endpoint looks like a usable URL.
fn check_endpoint(endpoint: &str) -> CheckResult {
    match reqwest::Url::parse(endpoint) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => CheckResult::Ok,
        Ok(url) => CheckResult::Warning(format!("unexpected scheme '{}'", url.scheme())),
        Err(e) => CheckResult::Warning(format!("not a valid URL: {}", e)),
    }
}

fn print_check(name: &str, result: &CheckResult, hint: &str) {
    match result {
        CheckResult::Ok => eprintln!("  {} {}", "✓".green(), name),
        CheckResult::NotFound => {
            eprintln!("  {} {} — not found", "✗".red(), name);
            if !hint.is_empty() {
                eprintln!("      {}", hint.dimmed());
            }
        }
        CheckResult::Warning(message) => {
            eprintln!("  {} {} — {}", "!".yellow(), name, message);
        }
    }
}

/// Check external dependencies and report to stderr.
///
/// Returns true when every hard requirement is satisfied.
pub fn check_dependencies(config: &Config) -> bool {
    eprintln!("Checking dependencies:");

    let extractor = check_command(&config.extraction.tool);
    print_check(
        &format!("extraction tool ({})", config.extraction.tool),
        &extractor,
        "install: pip install yt-dlp (requires ffmpeg for WAV extraction)",
    );

    let ffmpeg = check_command("ffmpeg");
    print_check(
        "ffmpeg (audio conversion for the extractor)",
        &ffmpeg,
        "install: sudo apt install ffmpeg",
    );

    let model = if is_model_installed(&config.stt.model) {
        CheckResult::Ok
    } else {
        CheckResult::Warning(format!(
            "model '{}' not installed (run: jimaku models install {})",
            config.stt.model, config.stt.model
        ))
    };
    print_check(
        &format!("recognition model ({})", config.stt.model),
        &model,
        "",
    );

    let endpoint = check_endpoint(&config.translation.endpoint);
    print_check(
        &format!("translation endpoint ({})", config.translation.endpoint),
        &endpoint,
        "",
    );

    extractor == CheckResult::Ok && ffmpeg == CheckResult::Ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_command_missing_binary() {
        assert_eq!(
            check_command("jimaku-test-no-such-binary"),
            CheckResult::NotFound
        );
    }

    #[test]
    fn check_endpoint_accepts_http() {
        assert_eq!(check_endpoint("http://127.0.0.1:11434"), CheckResult::Ok);
        assert_eq!(check_endpoint("https://ollama.local"), CheckResult::Ok);
    }

    #[test]
    fn check_endpoint_rejects_garbage() {
        assert!(matches!(
            check_endpoint("not a url"),
            CheckResult::Warning(_)
        ));
        assert!(matches!(
            check_endpoint("ftp://x"),
            CheckResult::Warning(_)
        ));
    }
}
