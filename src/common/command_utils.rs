use std::io;
use std::process::{Command, Output};

/// Execute a command and capture its output.
///
/// The exit status is not inspected here; callers decide what a failure means.
pub fn execute_command<S: AsRef<str>>(cmd: &str, args: &[S]) -> io::Result<Output> {
    log::debug!(
        "Running: {} {}",
        cmd,
        args.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ")
    );
    Command::new(cmd)
        .args(args.iter().map(AsRef::as_ref))
        .output()
}

/// Captured stdout as (lossy) UTF-8
pub fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Captured stderr as (lossy) UTF-8, trimmed
pub fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
