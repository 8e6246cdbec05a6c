use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use thiserror::Error;

use std::path::PathBuf;
use std::time::Duration;

use crate::{MAX_MODELS, ONNX};

// os
#[cfg(not(windows))]
const TICK_SETTINGS: (&str, u64) = ("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ", 80);
#[cfg(windows)]
const TICK_SETTINGS: (&str, u64) = (r"+-x| ", 200);

/// return a pre-configured progress bar drawing to stderr
///
/// stdout carries classification rows, so the bar must never
/// touch it.
pub fn get_progress_bar(length: u64, msg: &str) -> ProgressBar {
    let progressbar_style = ProgressStyle::default_spinner()
        .tick_chars(TICK_SETTINGS.0)
        .template(" {spinner} {msg:<30} {wide_bar} {pos}/{len} ETA {eta_precise} ")
        .expect("no template error");

    let progress_bar = ProgressBar::with_draw_target(Some(length), ProgressDrawTarget::stderr());

    progress_bar.set_style(progressbar_style);
    progress_bar.enable_steady_tick(Duration::from_millis(TICK_SETTINGS.1));
    progress_bar.set_message(msg.to_owned());

    progress_bar
}

/// argument checker for all demultiplexing subcommands
pub trait ArgCheck {
    fn check(&self) -> Result<(), CliError> {
        self.validate_args()
    }

    fn validate_args(&self) -> Result<(), CliError> {
        self.check_models()?;
        self.check_input()?;

        if self.get_batch_size() == 0 {
            return Err(CliError::InvalidInput(
                "--batch-size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn check_models(&self) -> Result<(), CliError> {
        let models = self.get_models();
        if models.is_empty() || models.len() > MAX_MODELS {
            return Err(CliError::InvalidInput(format!(
                "expected 1 or {} model files, got {}",
                MAX_MODELS,
                models.len()
            )));
        }

        for model in models {
            validate(model)?;

            match model.extension() {
                Some(ext) if ext == ONNX => (),
                _ => log::warn!("{:?} does not have an .{} extension", model, ONNX),
            }
        }

        Ok(())
    }

    fn check_input(&self) -> Result<(), CliError> {
        let input = self.get_input();
        if !input.exists() {
            return Err(CliError::InvalidInput(format!(
                "{:?} is neither a file nor a directory",
                input
            )));
        }

        Ok(())
    }

    fn get_models(&self) -> &Vec<PathBuf>;
    fn get_input(&self) -> &PathBuf;
    fn get_batch_size(&self) -> usize;
}

/// error handling for CLI
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid scan: scan size {scan_size} is not a positive multiple of step size {step_size}")]
    InvalidScan { scan_size: usize, step_size: usize },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// model file validation
pub fn validate(arg: &PathBuf) -> Result<(), CliError> {
    if !arg.exists() {
        return Err(CliError::InvalidInput(format!("{:?} does not exist", arg)));
    }

    if !arg.is_file() {
        return Err(CliError::InvalidInput(format!("{:?} is not a file", arg)));
    }

    match std::fs::metadata(arg) {
        Ok(metadata) if metadata.len() == 0 => {
            Err(CliError::InvalidInput(format!("file {:?} is empty", arg)))
        }
        Ok(_) => Ok(()),
        Err(e) => Err(CliError::IoError(e)),
    }
}
