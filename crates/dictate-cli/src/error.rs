//! CLI error display with helpful hints for the handful of failures a user
//! is likely to hit at startup (missing API key, no audio device, ...).

use dictate_core::{AudioError, DictateError};

pub fn display_error(err: &DictateError) {
    match err {
        DictateError::Config(msg) if msg.contains("OPENAI_API_KEY") => {
            eprintln!("Error: {msg}");
            eprintln!();
            eprintln!("Hint: export OPENAI_API_KEY, or add it to a .env file in the current directory.");
        }

        DictateError::Audio(AudioError::DeviceNotFound(msg)) => {
            eprintln!("Error: no compatible input device found ({msg})");
            eprintln!();
            eprintln!("Hint: check `pactl list sources` (or your platform's equivalent) for an available microphone.");
        }

        DictateError::Audio(AudioError::InvalidConfig(msg)) => {
            eprintln!("Error: input device doesn't support the required format");
            eprintln!("{msg}");
        }

        DictateError::Realtime(e) => {
            eprintln!("Error: realtime connection failed: {e}");
            eprintln!();
            eprintln!("Hint: check your network connection and OPENAI_API_KEY.");
        }

        other => eprintln!("Error: {other}"),
    }
}

pub fn display_anyhow_error(err: anyhow::Error) {
    match err.downcast::<DictateError>() {
        Ok(dictate_err) => display_error(&dictate_err),
        Err(err) => eprintln!("Error: {err}"),
    }
}
