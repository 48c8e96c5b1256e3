//! Filter + dedup stage (C9).
//!
//! `filter_text` strips hallucinations, fillers, and non-ASCII characters
//! before a transcript reaches C10, then a fuzzy-duplicate check rejects
//! near-repeats of recently emitted text. Patterns are grounded verbatim on
//! the original's `transcript.py::filter_text`; the enable/disable flags and
//! hot-reload mechanism are this expansion's ambient addition, mirroring
//! §9's "dynamic re-exec of compiled patterns" note.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Instant, SystemTime};

use regex::Regex;
use serde::Deserialize;

/// Up to this many of the most-recently-emitted texts are kept for fuzzy
/// dedup, pruned back down once the backlog grows past twice that (§4.9).
const DEDUP_WINDOW_LEN: usize = 7;
const DEDUP_WINDOW_PRUNE_AT: usize = DEDUP_WINDOW_LEN * 2;
const DEDUP_WINDOW_AGE: std::time::Duration = std::time::Duration::from_secs(7);
const DEDUP_SIMILARITY_THRESHOLD: f64 = 0.85;

/// User-controlled toggles and custom additions, reloadable from a YAML file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FilterConfig {
    /// `--allow-bye-thank-you`: skip only the leading `Bye.`/`Thank you.`
    /// hallucination substitutions; other hallucination patterns stay active.
    #[serde(default)]
    pub allow_bye_thank_you: bool,
    /// `--allow-fillers`: skip the filler-word pass entirely.
    #[serde(default)]
    pub allow_fillers: bool,
    /// `--allow-non-ascii`: skip the non-ASCII pass entirely.
    #[serde(default)]
    pub allow_non_ascii: bool,
    /// Additional hallucination patterns layered on top of the built-in set.
    #[serde(default)]
    pub extra_hallucination_patterns: Vec<String>,
}

struct Compiled {
    config: FilterConfig,
    bye_thank_you: Regex,
    hallucinations: Vec<Regex>,
    extra_hallucinations: Vec<Regex>,
    fillers: Vec<Regex>,
    non_ascii: Regex,
}

fn compile(config: FilterConfig) -> Result<Compiled, regex::Error> {
    let extra_hallucinations = config
        .extra_hallucination_patterns
        .iter()
        .map(|p| Regex::new(p))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Compiled {
        bye_thank_you: Regex::new(r"(?i)^\s*(?:Bye|Thank you)\.\s*")?,
        hallucinations: vec![
            Regex::new(r"(?i)\bMBC\b\.?\s*")?,
            Regex::new(r"(?i)\bAmen\b\.?\s*")?,
            Regex::new(r"(?i)\bHehe\b\.?\s*")?,
            Regex::new(r"(?i)\bphew\b\.?\s*")?,
            Regex::new(r"(?i)\bHuh\b\.?\s*")?,
            Regex::new(r"(?i)\bHmph\b\.?\s*")?,
            Regex::new(r"(?i)\b[Oo]m+\s*[Nn]om+(?:\s*[Nn]om+)*\b\.?\s*")?,
            Regex::new(r"(?i)\b[Aa]+[Hh]+\b\.?\s*")?,
            Regex::new(r"(?i)\b[Aa]+[Rr]{4,}\b\.?\s*")?,
            Regex::new(r"\b([A-Za-z])\1{4,}\b\.?\s*")?,
        ],
        extra_hallucinations,
        fillers: vec![
            Regex::new(r"(?i)\b(?:u[hm]+|er+m*|hm+|mhm+|uh-huh|mm+|ahem)\b[.,!?\s]*")?,
            Regex::new(r"(?i)\b[oa]h+[.,!?]+\s*")?,
            Regex::new(r"(?m)^\s*\.{2,}\s*$")?,
            Regex::new(r"(?m)^\s*,\s*")?,
        ],
        non_ascii: Regex::new(r"[^\x20-\x7E]")?,
        config,
    })
}

impl Compiled {
    fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();

        if !self.config.allow_bye_thank_you {
            out = self.bye_thank_you.replace_all(&out, "").into_owned();
        }
        for pattern in self.hallucinations.iter().chain(&self.extra_hallucinations) {
            out = pattern.replace_all(&out, "").into_owned();
        }

        if !self.config.allow_fillers {
            for pattern in &self.fillers {
                out = pattern.replace_all(&out, "").into_owned();
            }
        }

        if !self.config.allow_non_ascii {
            out = self.non_ascii.replace_all(&out, "").into_owned();
        }

        collapse_whitespace(&out)
    }
}

fn collapse_whitespace(text: &str) -> String {
    let collapsed: String = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed.trim().to_string()
}

/// Whitespace-normalized form of `text` with no hallucination/filler/non-ASCII
/// passes applied. Callers use this (rather than `text.trim()`) to tell
/// whether `FilterEngine::filter_text`'s output differs only by whitespace
/// collapsing, so a plain-content_filtered counter isn't tripped by spacing
/// alone.
pub fn normalize_whitespace(text: &str) -> String {
    collapse_whitespace(text)
}

struct RecentTranscript {
    at: Instant,
    text: String,
}

/// Hallucination/filler/non-ASCII filtering plus fuzzy-duplicate rejection.
/// `RecentTranscript` window survives reconnect (§3): it is owned by this
/// struct, not by the per-session state that `reset()` on reconnect clears.
pub struct FilterEngine {
    path: Option<PathBuf>,
    last_mtime: Mutex<Option<SystemTime>>,
    compiled: RwLock<Arc<Compiled>>,
    recent: Mutex<Vec<RecentTranscript>>,
}

impl FilterEngine {
    /// `initial` carries the `--allow-*` toggles resolved at startup;
    /// `path` is an optional YAML file of [`FilterConfig`], polled by mtime
    /// (§4.9, §9), which takes over entirely once present and parses cleanly.
    pub fn new(initial: FilterConfig, path: Option<PathBuf>) -> Self {
        let config = path
            .as_deref()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| serde_yaml::from_str(&s).ok())
            .unwrap_or(initial);
        let compiled = compile(config).expect("built-in filter patterns must compile");
        Self {
            path,
            last_mtime: Mutex::new(None),
            compiled: RwLock::new(Arc::new(compiled)),
            recent: Mutex::new(Vec::new()),
        }
    }

    /// Reload the filter-rule file if its mtime has advanced. A parse or
    /// regex-compile error keeps the previous rule set and logs a warning
    /// (§7: "Filter-config parse error" policy).
    pub fn maybe_reload(&self) {
        let Some(path) = &self.path else { return };
        let Ok(metadata) = std::fs::metadata(path) else {
            return;
        };
        let Ok(mtime) = metadata.modified() else {
            return;
        };

        let mut last = self.last_mtime.lock().unwrap();
        if last.is_some_and(|prev| mtime <= prev) {
            return;
        }

        match std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_yaml::from_str::<FilterConfig>(&s).map_err(|e| e.to_string()))
            .and_then(|cfg| compile(cfg).map_err(|e| e.to_string()))
        {
            Ok(new_compiled) => {
                *self.compiled.write().unwrap() = Arc::new(new_compiled);
                *last = Some(mtime);
            }
            Err(e) => {
                crate::warn!("Filter rule file reload failed ({}); keeping previous rules", e);
            }
        }
    }

    /// Apply all filtering passes. Idempotent: `filter_text(filter_text(x)) == filter_text(x)`.
    /// Reloads the rule file first if it changed on disk (§4.9, §9), mirroring
    /// `TyperRules::method_for_window`'s self-reloading pattern.
    pub fn filter_text(&self, text: &str) -> String {
        self.maybe_reload();
        self.compiled.read().unwrap().apply(text)
    }

    /// True if `text` is a near-duplicate of one of the recent window's
    /// entries (similarity >= 0.85, age <= 7s). Does not mutate the window;
    /// call [`FilterEngine::note_emitted`] once emission is decided.
    pub fn is_duplicate(&self, text: &str) -> bool {
        let recent = self.recent.lock().unwrap();
        let now = Instant::now();
        recent
            .iter()
            .rev()
            .filter(|r| now.duration_since(r.at) <= DEDUP_WINDOW_AGE)
            .take(DEDUP_WINDOW_LEN)
            .any(|r| strsim::normalized_levenshtein(text, &r.text) >= DEDUP_SIMILARITY_THRESHOLD)
    }

    /// Record that `text` was emitted, for future dedup checks. Prunes the
    /// backlog back to [`DEDUP_WINDOW_LEN`] once it grows past
    /// [`DEDUP_WINDOW_PRUNE_AT`].
    pub fn note_emitted(&self, text: String) {
        let mut recent = self.recent.lock().unwrap();
        recent.push(RecentTranscript {
            at: Instant::now(),
            text,
        });
        if recent.len() > DEDUP_WINDOW_PRUNE_AT {
            let drop = recent.len() - DEDUP_WINDOW_LEN;
            recent.drain(..drop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> FilterEngine {
        FilterEngine::new(FilterConfig::default(), None)
    }

    #[test]
    fn strips_leading_hallucination_phrase() {
        let e = engine();
        assert_eq!(e.filter_text("Thank you. Let's ship it."), "Let's ship it.");
    }

    #[test]
    fn strips_standalone_hallucination_words() {
        let e = engine();
        assert_eq!(e.filter_text("Hehe. that's funny"), "that's funny");
    }

    #[test]
    fn strips_runs_of_repeated_letters() {
        let e = engine();
        assert_eq!(e.filter_text("aaaaa test"), "test");
    }

    #[test]
    fn strips_fillers_unless_allowed() {
        let e = engine();
        assert_eq!(e.filter_text("um, so I think"), "so I think");
    }

    #[test]
    fn strips_non_ascii_by_default() {
        let e = engine();
        assert_eq!(e.filter_text("caf\u{00e9} time"), "caf time");
    }

    #[test]
    fn normalize_whitespace_matches_filter_text_when_no_pattern_fires() {
        let e = engine();
        let raw = "hello   world";
        assert_eq!(e.filter_text(raw), normalize_whitespace(raw));
    }

    #[test]
    fn idempotent() {
        let e = engine();
        let once = e.filter_text("Thank you. um hello world");
        let twice = e.filter_text(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn dedup_rejects_near_duplicate_within_window() {
        let e = engine();
        e.note_emitted("open the door".to_string());
        assert!(e.is_duplicate("open the door."));
    }

    #[test]
    fn dedup_allows_distinct_text() {
        let e = engine();
        e.note_emitted("open the door".to_string());
        assert!(!e.is_duplicate("completely different sentence"));
    }
}
