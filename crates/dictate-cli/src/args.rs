use std::str::FromStr;

use clap::Parser;

use dictate_core::TranscriptionModel;

fn parse_model(s: &str) -> Result<TranscriptionModel, String> {
    TranscriptionModel::from_str(s)
}

fn parse_noise_suppression(s: &str) -> Result<u8, String> {
    let level: u8 = s.parse().map_err(|_| format!("invalid noise suppression level: {s}"))?;
    if level > dictate_core::config::MAX_NOISE_SUPPRESSION {
        return Err(format!(
            "noise suppression level must be 0..{}",
            dictate_core::config::MAX_NOISE_SUPPRESSION
        ));
    }
    Ok(level)
}

/// Continuously-running voice-to-text dictation agent.
#[derive(Parser)]
#[command(name = "dictate")]
#[command(version)]
#[command(about = "Realtime voice dictation: speak, it types")]
pub struct Cli {
    /// Transcription model used by the realtime connection.
    #[arg(long, value_parser = parse_model, default_value = "whisper-1")]
    pub model: TranscriptionModel,

    /// Noise suppression level, 0 disables it entirely.
    #[arg(long, value_parser = parse_noise_suppression, default_value_t = dictate_core::config::DEFAULT_NOISE_SUPPRESSION)]
    pub noise_suppression: u8,

    /// Linear gain applied after noise suppression.
    #[arg(long, default_value_t = dictate_core::config::DEFAULT_GAIN)]
    pub gain: f32,

    /// Skip C2 entirely: forward raw captured audio unmodified.
    #[arg(long)]
    pub no_audio_processing: bool,

    /// Don't filter out the "Bye." / "Thank you." end-of-video hallucination.
    #[arg(long)]
    pub allow_bye_thank_you: bool,

    /// Don't strip non-ASCII transcript content.
    #[arg(long)]
    pub allow_non_ascii: bool,

    /// Don't filter filler words ("um", "uh", ...).
    #[arg(long)]
    pub allow_fillers: bool,

    /// Skip the on-disk transcript/debug/metrics artefacts.
    #[arg(long)]
    pub no_log: bool,

    /// Preferred capture device name (substring match); falls back to the
    /// system default when absent or no match is found.
    #[arg(long)]
    pub device: Option<String>,

    /// Hot-reloaded YAML filter-rule file (additional hallucination/filler patterns).
    #[arg(long)]
    pub filter_rules: Option<std::path::PathBuf>,

    /// Hot-reloaded YAML typer-rule file (per-window-class output method overrides).
    #[arg(long)]
    pub typer_rules: Option<std::path::PathBuf>,

    /// Directory for the on-disk session artefacts.
    #[arg(long, default_value = "conversations")]
    pub conversations_dir: std::path::PathBuf,

    /// Enable verbose diagnostic output.
    #[arg(short, long)]
    pub verbose: bool,
}
