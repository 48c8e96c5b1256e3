//! Backend availability probes, focused-window-class lookup, and the
//! hot-reloaded typing-rule file, grounded on the original's `typer/detection.py`.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use serde::Deserialize;

/// `shutil.which` equivalent: true if `tool` resolves to an executable file
/// somewhere on `PATH`. No new dependency: a manual scan mirrors exactly what
/// the original's availability checks rely on.
fn command_exists(tool: &str) -> bool {
    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path_var).any(|dir| is_executable_file(&dir.join(tool)))
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

fn run_probe(tool: &str, args: &[&str], timeout: Duration) -> Option<bool> {
    let mut child = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .ok()?;

    let start = std::time::Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status.success()),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    return Some(false);
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(_) => return None,
        }
    }
}

pub fn test_middle_click() -> bool {
    command_exists("wl-copy") && command_exists("wlrctl")
}

pub fn test_adaptive() -> bool {
    command_exists("wl-copy") && command_exists("wtype") && command_exists("hyprctl")
}

pub fn test_shift_insert() -> bool {
    command_exists("wl-copy") && command_exists("wtype")
}

pub fn test_ydotool() -> bool {
    command_exists("ydotool") && run_probe("ydotool", &["type", "--help"], Duration::from_secs(2)).unwrap_or(false)
}

/// wtype returns non-zero for `-h`, but that is fine: a clean spawn already
/// proves the binary exists and runs.
pub fn test_wtype() -> bool {
    if !command_exists("wtype") {
        return false;
    }
    run_probe("wtype", &["-h"], Duration::from_secs(2)).is_some()
}

/// `xdotool` may be installed but nonfunctional under Wayland; only trust it
/// on an X11 session.
pub fn test_xdotool(wayland: bool) -> bool {
    if wayland || !command_exists("xdotool") {
        return false;
    }
    run_probe("xdotool", &["version"], Duration::from_secs(2)).unwrap_or(false)
}

pub fn test_clipboard(wayland: bool) -> bool {
    if wayland { command_exists("wl-copy") } else { command_exists("xclip") }
}

/// Focused window's class, queried through `hyprctl activewindow -j`. Empty
/// string if hyprctl is unavailable, errors, or the compositor isn't Hyprland.
pub fn get_focused_window_class() -> String {
    let Ok(output) = Command::new("hyprctl").args(["activewindow", "-j"]).output() else {
        return String::new();
    };
    if !output.status.success() {
        return String::new();
    }

    #[derive(Deserialize)]
    struct ActiveWindow {
        #[serde(default)]
        class: String,
    }
    serde_json::from_slice::<ActiveWindow>(&output.stdout)
        .map(|w| w.class.to_lowercase())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Deserialize, Default)]
struct Rule {
    #[serde(rename = "match")]
    match_substring: String,
    method: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RulesFile {
    #[serde(default)]
    rules: Vec<Rule>,
    default: Option<String>,
}

struct Loaded {
    rules: Vec<Rule>,
    default: String,
}

/// `(window_class_substring -> method)` rule list plus a default, hot-reloaded
/// by mtime polling (§4.10, §9). Mirrors the original's `TyperRules`.
pub struct TyperRules {
    path: Option<PathBuf>,
    state: Mutex<(Option<SystemTime>, Loaded)>,
}

impl TyperRules {
    pub fn new(path: Option<PathBuf>, default_method: &str) -> Self {
        let loaded = Loaded { rules: Vec::new(), default: default_method.to_string() };
        let this = Self { path, state: Mutex::new((None, loaded)) };
        this.reload_if_changed();
        this
    }

    fn reload_if_changed(&self) {
        let Some(path) = &self.path else { return };
        let Ok(metadata) = std::fs::metadata(path) else { return };
        let Ok(mtime) = metadata.modified() else { return };

        let mut state = self.state.lock().unwrap();
        if state.0.is_some_and(|prev| mtime <= prev) {
            return;
        }

        let Ok(contents) = std::fs::read_to_string(path) else { return };
        let Ok(parsed) = serde_yaml::from_str::<RulesFile>(&contents) else { return };

        state.1.rules = parsed.rules;
        if let Some(default) = parsed.default {
            state.1.default = default;
        }
        state.0 = Some(mtime);
    }

    /// Method name for the given window class, reloading the rule file first
    /// if it changed on disk.
    pub fn method_for_window(&self, window_class: &str) -> String {
        self.reload_if_changed();
        let window_lower = window_class.to_lowercase();
        let state = self.state.lock().unwrap();
        for rule in &state.1.rules {
            let m = rule.match_substring.to_lowercase();
            if !m.is_empty() && window_lower.contains(&m) {
                return rule.method.clone();
            }
        }
        state.1.default.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_exists_finds_a_real_binary() {
        assert!(command_exists("sh"));
    }

    #[test]
    fn command_exists_rejects_a_bogus_name() {
        assert!(!command_exists("definitely-not-a-real-binary-xyz"));
    }

    #[test]
    fn rules_fall_back_to_default_with_no_file() {
        let rules = TyperRules::new(None, "wtype");
        assert_eq!(rules.method_for_window("anything"), "wtype");
    }

    #[test]
    fn rules_match_on_substring() {
        let path = std::env::temp_dir().join(format!("dictate-typer-rules-test-{}.yaml", std::process::id()));
        std::fs::write(&path, "rules:\n  - match: kitty\n    method: shift_insert\ndefault: wtype\n").unwrap();

        let rules = TyperRules::new(Some(path.clone()), "wtype");
        assert_eq!(rules.method_for_window("Kitty"), "shift_insert");
        assert_eq!(rules.method_for_window("firefox"), "wtype");

        let _ = std::fs::remove_file(&path);
    }
}
