use clap::{ArgAction, Parser};
use config::{ArgCheck, DEFAULT_BATCH_SIZE, DEFAULT_SCAN_SIZE, DEFAULT_SCORE_DIFF, MIN_THREADS};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about = "Demultiplex nanopore reads from raw signal", long_about = None)]
pub struct Args {
    #[arg(
        short = 'm',
        long = "model",
        required = true,
        value_name = "PATHS",
        value_delimiter = ',',
        num_args = 1..=2,
        help = "Trained model file(s): one for read starts, optionally a second for read ends"
    )]
    pub model: Vec<PathBuf>,

    #[arg(
        short = 'i',
        long = "input",
        required = true,
        value_name = "PATH",
        help = "A directory of fast5 files, a single fast5 file or a training-data dump"
    )]
    pub input: PathBuf,

    #[arg(
        short = 'b',
        long = "batch-size",
        value_name = "READS",
        help = "Number of reads classified per batch",
        default_value_t = DEFAULT_BATCH_SIZE
    )]
    pub batch_size: usize,

    #[arg(
        short = 's',
        long = "scan-size",
        value_name = "SAMPLES",
        help = "Samples scanned on each end of a read [must be a multiple of half the model window]",
        default_value_t = DEFAULT_SCAN_SIZE
    )]
    pub scan_size: usize,

    #[arg(
        short = 'd',
        long = "score-diff",
        value_name = "FLOAT",
        help = "Minimum gap between the best and second-best barcode scores",
        default_value_t = DEFAULT_SCORE_DIFF
    )]
    pub score_diff: f64,

    #[arg(
        long = "require-both",
        help = "With two models, only call reads whose start and end agree",
        action = ArgAction::SetTrue
    )]
    pub require_both: bool,

    #[arg(
        short = 'v',
        long = "verbose",
        help = "Also print per-class probabilities and per-side calls",
        action = ArgAction::SetTrue
    )]
    pub verbose: bool,

    #[arg(
        short = 't',
        long = "threads",
        help = "Number of threads",
        value_name = "THREADS",
        default_value_t = num_cpus::get().max(MIN_THREADS)
    )]
    pub threads: usize,
}

impl Args {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        Args::parse_from(full_args)
    }
}

impl ArgCheck for Args {
    fn get_models(&self) -> &Vec<PathBuf> {
        &self.model
    }

    fn get_input(&self) -> &PathBuf {
        &self.input
    }

    fn get_batch_size(&self) -> usize {
        self.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::from(vec![
            "--model".to_string(),
            "start.onnx".to_string(),
            "--input".to_string(),
            "reads".to_string(),
        ]);

        assert_eq!(args.model, vec![PathBuf::from("start.onnx")]);
        assert_eq!(args.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(args.scan_size, DEFAULT_SCAN_SIZE);
        assert_eq!(args.score_diff, DEFAULT_SCORE_DIFF);
        assert!(!args.require_both);
        assert!(!args.verbose);
    }

    #[test]
    fn test_two_models_comma_delimited() {
        let args = Args::from(
            "-m start.onnx,end.onnx -i reads --require-both -v -s 2048 -d 0.2"
                .split_whitespace()
                .map(String::from)
                .collect(),
        );

        assert_eq!(
            args.model,
            vec![PathBuf::from("start.onnx"), PathBuf::from("end.onnx")]
        );
        assert!(args.require_both);
        assert!(args.verbose);
        assert_eq!(args.scan_size, 2048);
        assert!((args.score_diff - 0.2).abs() < f64::EPSILON);
    }
}
