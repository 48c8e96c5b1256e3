//! Injection backend implementations (C10). Each backend writes `text` plus a
//! trailing space, grounded on the original's `typer/backends.py`.

use std::collections::HashSet;
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;

/// PRIMARY-selection/paste chunk size: 801 chars stays just under the
/// threshold where some terminal UIs collapse pasted text to `[Pasted text]`.
const CHUNK_SIZE: usize = 801;

#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("failed to spawn `{tool}`: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("`{tool}` exited with a non-zero status")]
    NonZeroExit { tool: &'static str },
    #[error("no output injection backend is available")]
    NoBackendAvailable,
}

fn run_with_stdin(tool: &'static str, args: &[&str], input: &[u8], timeout: Duration) -> Result<(), InjectError> {
    let mut child = Command::new(tool)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| InjectError::Spawn { tool, source })?;

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(input);
    }

    wait_with_timeout(tool, child, timeout)
}

fn run(tool: &'static str, args: &[&str], timeout: Duration) -> Result<(), InjectError> {
    let child = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| InjectError::Spawn { tool, source })?;

    wait_with_timeout(tool, child, timeout)
}

/// `std::process::Command` has no built-in timeout; poll for exit instead of
/// blocking indefinitely on a wedged subprocess (ydotoold down, etc).
fn wait_with_timeout(tool: &'static str, mut child: std::process::Child, timeout: Duration) -> Result<(), InjectError> {
    let start = std::time::Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return if status.success() {
                    Ok(())
                } else {
                    Err(InjectError::NonZeroExit { tool })
                };
            }
            Ok(None) => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    return Err(InjectError::NonZeroExit { tool });
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(source) => return Err(InjectError::Spawn { tool, source }),
        }
    }
}

fn chunks(text_with_space: &str) -> Vec<String> {
    text_with_space
        .as_bytes()
        .chunks(CHUNK_SIZE)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect()
}

/// Paste-via-PRIMARY-selection, pasted by a middle-click event (works in
/// terminals and browsers that ignore Shift+Insert).
pub fn type_with_middle_click(text: &str) -> Result<(), InjectError> {
    for chunk in chunks(&format!("{text} ")) {
        run_with_stdin("wl-copy", &["--primary", "--trim-newline"], chunk.as_bytes(), Duration::from_secs(2))?;
        run("wlrctl", &["pointer", "click", "middle"], Duration::from_secs(5))?;
    }
    Ok(())
}

/// Paste-via-PRIMARY-selection, pasted by a synthesised Shift+Insert.
/// ~70x faster than keystroke synthesis and avoids crashing terminal TUIs
/// that wtype's raw keystroke stream can upset.
pub fn type_with_shift_insert(text: &str) -> Result<(), InjectError> {
    for chunk in chunks(&format!("{text} ")) {
        run_with_stdin("wl-copy", &["--primary"], chunk.as_bytes(), Duration::from_secs(2))?;
        run("wtype", &["-M", "shift", "-k", "Insert", "-m", "shift"], Duration::from_secs(5))?;
    }
    Ok(())
}

/// Adaptive: kitty gets Shift+Insert (fast, keyboard-focused PRIMARY paste),
/// everything else gets wtype keystroke synthesis.
pub fn type_with_adaptive(text: &str, focused_window_class: &str) -> Result<(), InjectError> {
    if focused_window_class.eq_ignore_ascii_case("kitty") {
        type_with_shift_insert(text)
    } else {
        type_with_wtype(text)
    }
}

/// Characters that, landing as the 14th distinct character of a wtype run,
/// trigger wtype's keycode-22 BackSpace misinterpretation bug.
const UNSAFE_AT_POSITION_14: &str = " !\"#$'()*+,-./:;=>?@[\\]^_";

/// Split `text` so that the 14th distinct character of any chunk is never one
/// of [`UNSAFE_AT_POSITION_14`]; the split point is the last alphanumeric
/// character seen before that 14th-distinct-character index, so each new
/// chunk begins on an alphanumeric.
fn split_for_wtype_keycode22(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let mut seen = HashSet::new();
        let mut pos14_index = None;
        let mut last_alnum_before_14 = None;

        for i in start..chars.len() {
            let c = chars[i];
            if seen.insert(c) && seen.len() == 14 {
                pos14_index = Some(i);
                break;
            }
            if c.is_alphanumeric() {
                last_alnum_before_14 = Some(i);
            }
        }

        if let Some(pos14) = pos14_index
            && UNSAFE_AT_POSITION_14.contains(chars[pos14])
            && let Some(split_at) = last_alnum_before_14
            && split_at > start
        {
            out.push(chars[start..split_at].iter().collect());
            start = split_at;
            continue;
        }

        out.push(chars[start..].iter().collect());
        break;
    }

    out
}

/// wtype keystroke synthesis, with the keycode-22 workaround applied.
pub fn type_with_wtype(text: &str) -> Result<(), InjectError> {
    for chunk in split_for_wtype_keycode22(&format!("{text} ")) {
        run("wtype", &[&chunk], Duration::from_secs(5))?;
    }
    Ok(())
}

pub fn type_with_ydotool(text: &str) -> Result<(), InjectError> {
    run("ydotool", &["type", &format!("{text} ")], Duration::from_secs(5))
}

pub fn type_with_xdotool(text: &str) -> Result<(), InjectError> {
    run("xdotool", &["type", "--clearmodifiers", "--", &format!("{text} ")], Duration::from_secs(5))
}

/// Language-runtime keystroke library fallback, the idiomatic Rust analogue
/// of the original's `pynput`-based `type_with_pynput`.
pub fn type_with_enigo(text: &str) -> Result<(), InjectError> {
    use enigo::{Enigo, Keyboard, Settings};

    let mut enigo = Enigo::new(&Settings::default())
        .map_err(|e| InjectError::Spawn { tool: "enigo", source: std::io::Error::other(e.to_string()) })?;
    enigo
        .text(&format!("{text} "))
        .map_err(|e| InjectError::Spawn { tool: "enigo", source: std::io::Error::other(e.to_string()) })?;
    Ok(())
}

/// Last-resort clipboard-only backend; the caller is responsible for
/// surfacing the "typing not available, copied instead" notice.
pub fn type_with_clipboard(text: &str, wayland: bool) -> Result<(), InjectError> {
    let payload = format!("{text} ");
    if wayland {
        run_with_stdin("wl-copy", &[], payload.as_bytes(), Duration::from_secs(2))
    } else {
        run_with_stdin("xclip", &["-selection", "clipboard"], payload.as_bytes(), Duration::from_secs(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keycode22_split_keeps_unsafe_char_off_position_14() {
        // 13 distinct alnum chars then an unsafe char as the 14th-distinct.
        let text = "abcdefghijklm!";
        let chunks = split_for_wtype_keycode22(text);
        assert!(chunks.len() >= 1);
        for chunk in &chunks {
            let mut seen = HashSet::new();
            for (idx, c) in chunk.chars().enumerate() {
                seen.insert(c);
                if seen.len() == 14 {
                    assert!(
                        !UNSAFE_AT_POSITION_14.contains(c),
                        "char {:?} at distinct-index 14 (char idx {}) is unsafe",
                        c,
                        idx
                    );
                    break;
                }
            }
        }
    }

    #[test]
    fn keycode22_split_is_noop_for_short_text() {
        assert_eq!(split_for_wtype_keycode22("hello world"), vec!["hello world"]);
    }

    #[test]
    fn keycode22_split_handles_empty_text() {
        assert!(split_for_wtype_keycode22("").is_empty());
    }

    #[test]
    fn chunks_respects_chunk_size() {
        let text = "a".repeat(2000);
        let parts = chunks(&text);
        assert!(parts.iter().all(|c| c.len() <= CHUNK_SIZE));
        assert_eq!(parts.concat().len(), text.len());
    }
}
