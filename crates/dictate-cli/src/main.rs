mod args;
mod error;

use anyhow::Result;
use clap::Parser;
use dictate_core::{DictateConfig, Session};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(err) = run().await {
        error::display_anyhow_error(err);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = args::Cli::parse();

    dictate_core::set_verbose(cli.verbose);

    let config = DictateConfig {
        model: cli.model,
        noise_suppression: if cli.no_audio_processing { 0 } else { cli.noise_suppression },
        gain: if cli.no_audio_processing { 1.0 } else { cli.gain },
        allow_bye_thank_you: cli.allow_bye_thank_you,
        allow_non_ascii: cli.allow_non_ascii,
        allow_fillers: cli.allow_fillers,
        no_log: cli.no_log,
        device_hint: cli.device,
        filter_rules_path: cli.filter_rules,
        typer_rules_path: cli.typer_rules,
        conversations_dir: cli.conversations_dir,
        ..DictateConfig::from_env()?
    };

    Session::new(config).run().await?;
    Ok(())
}
