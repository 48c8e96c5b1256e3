//! Startup configuration (ambient addition, §1.1): the resolved knobs handed
//! to [`crate::session::Session::new`] once at process start. Named constants
//! plus a `Default` impl, in the spirit of the teacher's
//! `configuration::defaults` module, without reintroducing its TOML
//! settings-store/hot-reload machinery (that has no counterpart here; the
//! only hot-reloaded files are the filter-rule and typer-rule YAML files,
//! owned by `filter::FilterEngine` and `inject::OutputInjector` respectively).

pub use crate::realtime::TranscriptionModel;

pub const DEFAULT_NOISE_SUPPRESSION: u8 = 2;
pub const DEFAULT_GAIN: f32 = 1.0;
pub const MAX_NOISE_SUPPRESSION: u8 = 4;

/// Resolved startup configuration (§1.1, §4). Constructed once (via
/// [`DictateConfig::from_env`] plus CLI overrides in `dictate-cli`) and handed
/// to `Session::new`; nothing in this crate re-reads environment variables
/// after that point.
#[derive(Debug, Clone)]
pub struct DictateConfig {
    pub api_key: String,
    pub model: TranscriptionModel,
    /// `--noise-suppression 0..4`; 0 disables the noise suppressor entirely.
    pub noise_suppression: u8,
    /// `--gain <float>`; applied after noise suppression (or directly to the
    /// raw 24kHz PCM when noise suppression is off).
    pub gain: f32,
    pub allow_bye_thank_you: bool,
    pub allow_non_ascii: bool,
    pub allow_fillers: bool,
    /// `--no-log`: skip the C11 on-disk artefacts entirely.
    pub no_log: bool,
    /// Preferred capture device name hint, if any (C1's device-selection
    /// policy still falls back to the system default when unset or absent).
    pub device_hint: Option<String>,
    /// Optional hot-reloaded YAML filter-rule file (C9).
    pub filter_rules_path: Option<std::path::PathBuf>,
    /// Optional hot-reloaded YAML typer-rule file (C10).
    pub typer_rules_path: Option<std::path::PathBuf>,
    /// Directory for the C11 on-disk artefacts (`conversations/` by default).
    pub conversations_dir: std::path::PathBuf,
}

impl Default for DictateConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: TranscriptionModel::Whisper1,
            noise_suppression: DEFAULT_NOISE_SUPPRESSION,
            gain: DEFAULT_GAIN,
            allow_bye_thank_you: false,
            allow_non_ascii: false,
            allow_fillers: false,
            no_log: false,
            device_hint: None,
            filter_rules_path: None,
            typer_rules_path: None,
            conversations_dir: std::path::PathBuf::from("conversations"),
        }
    }
}

impl DictateConfig {
    /// Reads `OPENAI_API_KEY` (required) into an otherwise-default config.
    /// Numeric/boolean knobs are left at their defaults; the CLI binary
    /// overrides them from argv after this call (§1.1).
    pub fn from_env() -> crate::error::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| crate::error::DictateError::config("OPENAI_API_KEY is not set"))?;
        Ok(Self { api_key, ..Self::default() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_api_key() {
        assert!(DictateConfig::default().api_key.is_empty());
    }
}
