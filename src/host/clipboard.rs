use std::io::Write;
use std::process::{Command, Stdio};

use super::Clipboard;
use crate::error::ClipboardError;

/// Clipboard backed by the platform's command line tools
/// (`pbcopy`/`pbpaste`, `xclip`/`xsel`, `clip`/PowerShell).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn read_text(&self) -> Result<String, ClipboardError> {
        for (program, args) in read_commands() {
            match Command::new(program).args(*args).stderr(Stdio::null()).output() {
                Ok(output) if output.status.success() => {
                    return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
                }
                Ok(output) => {
                    return Err(ClipboardError::Denied(format!(
                        "{program} exited with {}",
                        output.status
                    )));
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(ClipboardError::Unavailable)
    }

    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        for (program, args) in write_commands() {
            match pipe_into(program, args, text) {
                Err(ClipboardError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                    continue
                }
                outcome => return outcome,
            }
        }
        Err(ClipboardError::Unavailable)
    }
}

/// Feeds `text` to the tool's stdin. The child is always reaped, also when
/// the write fails.
fn pipe_into(program: &str, args: &[&str], text: &str) -> Result<(), ClipboardError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(text.as_bytes()),
        None => Ok(()),
    };
    if let Err(err) = written {
        let _ = child.kill();
        let _ = child.wait();
        return Err(err.into());
    }
    let status = child.wait()?;
    if status.success() {
        Ok(())
    } else {
        Err(ClipboardError::Denied(format!("{program} exited with {status}")))
    }
}

#[cfg(target_os = "macos")]
fn read_commands() -> &'static [(&'static str, &'static [&'static str])] {
    &[("pbpaste", &[])]
}

#[cfg(target_os = "macos")]
fn write_commands() -> &'static [(&'static str, &'static [&'static str])] {
    &[("pbcopy", &[])]
}

#[cfg(target_os = "windows")]
fn read_commands() -> &'static [(&'static str, &'static [&'static str])] {
    &[("powershell", &["-NoProfile", "-Command", "Get-Clipboard -Raw"])]
}

#[cfg(target_os = "windows")]
fn write_commands() -> &'static [(&'static str, &'static [&'static str])] {
    &[("clip", &[])]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn read_commands() -> &'static [(&'static str, &'static [&'static str])] {
    &[
        ("wl-paste", &["--no-newline"]),
        ("xclip", &["-selection", "clipboard", "-o"]),
        ("xsel", &["--clipboard", "--output"]),
    ]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn write_commands() -> &'static [(&'static str, &'static [&'static str])] {
    &[
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
        ("xsel", &["--clipboard", "--input"]),
    ]
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn failed_write_to_exited_tool_is_an_io_error() {
        // `true` exits without reading, so a payload larger than the pipe
        // buffer hits a broken pipe.
        let payload = "x".repeat(1 << 20);
        assert_matches!(
            pipe_into("true", &[], &payload),
            Err(ClipboardError::Io(err)) if err.kind() == std::io::ErrorKind::BrokenPipe
        );
    }

    #[test]
    fn missing_tool_reports_not_found() {
        assert_matches!(
            pipe_into("promptdeck-no-such-clipboard-tool", &[], "x"),
            Err(ClipboardError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound
        );
    }
}
