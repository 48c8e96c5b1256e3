//! Output injector (C10): routes a finished transcript to the active window.
//!
//! Backend choice happens twice: an optional per-window-class rule (from an
//! externally hot-reloaded YAML file, grounded on the original's `TyperRules`)
//! picks a named method, and absent a matching rule the constructor's
//! once-at-startup availability cascade (grounded on `typer.py`'s
//! `KeyboardTyper._detect_method`) picks one for the whole session.

mod backends;
mod detection;

use std::path::PathBuf;

pub use backends::InjectError;
use detection::TyperRules;

/// One of the six injection methods (§4.10), named the way the rule file and
/// the original's `TyperRules.default` name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    MiddleClick,
    ShiftInsert,
    Adaptive,
    Wtype,
    Ydotool,
    Xdotool,
    Enigo,
    Clipboard,
}

impl Method {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "middle_click" => Method::MiddleClick,
            "shift_insert" => Method::ShiftInsert,
            "adaptive" => Method::Adaptive,
            "wtype" => Method::Wtype,
            "ydotool" => Method::Ydotool,
            "xdotool" => Method::Xdotool,
            "enigo" => Method::Enigo,
            "clipboard" => Method::Clipboard,
            _ => return None,
        })
    }

    fn label(self) -> &'static str {
        match self {
            Method::MiddleClick => "middle-click paste (Wayland)",
            Method::ShiftInsert => "Shift+Insert paste (Wayland)",
            Method::Adaptive => "adaptive (wtype / Shift+Insert for kitty)",
            Method::Wtype => "wtype (Wayland)",
            Method::Ydotool => "ydotool (Wayland)",
            Method::Xdotool => "xdotool (X11)",
            Method::Enigo => "keystroke library (enigo)",
            Method::Clipboard => "clipboard (fallback)",
        }
    }
}

fn session_is_wayland() -> bool {
    std::env::var("XDG_SESSION_TYPE").map(|s| s.eq_ignore_ascii_case("wayland")).unwrap_or(false)
}

/// Availability cascade run once at startup, mirroring `typer.py::_detect_method`.
fn detect_default_method() -> Option<Method> {
    let session_type = std::env::var("XDG_SESSION_TYPE").unwrap_or_else(|_| "unknown".to_string());
    let wayland = session_type.eq_ignore_ascii_case("wayland");
    let x11 = session_type.eq_ignore_ascii_case("x11");

    if wayland {
        if detection::test_adaptive() {
            return Some(Method::Adaptive);
        }
        if detection::test_middle_click() {
            return Some(Method::MiddleClick);
        }
        if detection::test_shift_insert() {
            return Some(Method::ShiftInsert);
        }
        if detection::test_wtype() {
            return Some(Method::Wtype);
        }
        if detection::test_ydotool() {
            return Some(Method::Ydotool);
        }
    } else if x11 {
        if detection::test_xdotool(false) {
            return Some(Method::Xdotool);
        }
    } else {
        if detection::test_adaptive() {
            return Some(Method::Adaptive);
        }
        if detection::test_middle_click() {
            return Some(Method::MiddleClick);
        }
        if detection::test_shift_insert() {
            return Some(Method::ShiftInsert);
        }
        if detection::test_wtype() {
            return Some(Method::Wtype);
        }
        if detection::test_xdotool(false) {
            return Some(Method::Xdotool);
        }
        if detection::test_ydotool() {
            return Some(Method::Ydotool);
        }
    }

    #[cfg(feature = "typing")]
    return Some(Method::Enigo);

    #[cfg(not(feature = "typing"))]
    if detection::test_clipboard(wayland) {
        return Some(Method::Clipboard);
    }

    #[cfg(not(feature = "typing"))]
    None
}

/// Routes finished transcripts to the focused window (§4.10). Construction
/// runs the availability cascade once; per-call rule matching layers on top
/// when a rule file is configured.
pub struct OutputInjector {
    rules: Option<TyperRules>,
    fallback_method: Option<Method>,
}

impl OutputInjector {
    /// `rules_path`: optional YAML file of `{match, method}` rules plus a
    /// `default`, polled by mtime (§4.10). Absent a rule file (or absent a
    /// rule match at call time), falls back to the startup availability
    /// cascade exactly as the teacher's `typing::type_auto` does.
    pub fn new(rules_path: Option<PathBuf>) -> Self {
        let fallback_method = detect_default_method();
        let rules = rules_path.map(|path| {
            let default_name = fallback_method.map(|m| method_config_name(m)).unwrap_or("wtype");
            TyperRules::new(Some(path), default_name)
        });

        match fallback_method {
            Some(m) => crate::info!("Output injection backend: {}", m.label()),
            None => crate::warn!("No output injection backend available; transcripts will only be logged"),
        }

        Self { rules, fallback_method }
    }

    /// `type_text(text) -> ok/fail` (§4.10). Appends a single trailing space
    /// internally via the chosen backend. Returns `false` on any backend
    /// failure or if no backend is available, so C11 can record that the
    /// text was logged but not injected.
    pub fn type_text(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return true;
        }

        let Some(method) = self.resolve_method() else {
            crate::error!("No typing method available; text was only logged");
            return false;
        };

        let wayland = session_is_wayland();
        let result = match method {
            Method::MiddleClick => backends::type_with_middle_click(text),
            Method::ShiftInsert => backends::type_with_shift_insert(text),
            Method::Adaptive => {
                let class = detection::get_focused_window_class();
                backends::type_with_adaptive(text, &class)
            }
            Method::Wtype => backends::type_with_wtype(text),
            Method::Ydotool => backends::type_with_ydotool(text),
            Method::Xdotool => backends::type_with_xdotool(text),
            Method::Enigo => backends::type_with_enigo(text),
            Method::Clipboard => backends::type_with_clipboard(text, wayland),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                crate::error!("Typing failed with {}: {}", method.label(), e);
                false
            }
        }
    }

    fn resolve_method(&self) -> Option<Method> {
        if let Some(rules) = &self.rules {
            let class = detection::get_focused_window_class();
            let name = rules.method_for_window(&class);
            if let Some(m) = Method::parse(&name) {
                return Some(m);
            }
        }
        self.fallback_method
    }
}

fn method_config_name(m: Method) -> &'static str {
    match m {
        Method::MiddleClick => "middle_click",
        Method::ShiftInsert => "shift_insert",
        Method::Adaptive => "adaptive",
        Method::Wtype => "wtype",
        Method::Ydotool => "ydotool",
        Method::Xdotool => "xdotool",
        Method::Enigo => "enigo",
        Method::Clipboard => "clipboard",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_a_trivial_success() {
        let injector = OutputInjector { rules: None, fallback_method: None };
        assert!(injector.type_text("   "));
    }

    #[test]
    fn no_backend_fails_closed() {
        let injector = OutputInjector { rules: None, fallback_method: None };
        assert!(!injector.type_text("hello"));
    }

    #[test]
    fn method_name_round_trips_through_config_name() {
        for m in [
            Method::MiddleClick,
            Method::ShiftInsert,
            Method::Adaptive,
            Method::Wtype,
            Method::Ydotool,
            Method::Xdotool,
            Method::Enigo,
            Method::Clipboard,
        ] {
            assert_eq!(Method::parse(method_config_name(m)), Some(m));
        }
    }
}
