//! Core module for barcode demultiplexing
//! demuxtools developers, 2026
//!
//! Reads are pulled from a signal source in fixed-size batches. For
//! every batch, each configured side (start always, end when a second
//! model is given) is scanned window by window: the windows of all
//! reads at one scan step go to the classifier together, the per-class
//! maxima are kept per read and renormalised, and a margin rule turns
//! them into a call. Start and end calls are then reconciled and one
//! row per read is written, in input order.

pub mod aggregate;
pub mod call;
pub mod scan;
pub mod signal;

use std::io::{BufWriter, Write};

use anyhow::{bail, Result};
use config::get_progress_bar;
use demux_pack::{detect_input_type, fetch_batch, open_source, InputType, ReadSource, SignalRead};
use log::{info, warn};

use crate::cli::Args;
use crate::model::{check_pair, load_classifier, Classifier};
use crate::utils::{header, write_fields, ClassificationRow, SideCall, Summary};
use aggregate::MaxAccumulator;
use call::{call_barcode, combine_calls};
use scan::ScanPlan;
use signal::Side;

/// Run-wide knobs shared by every batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub batch_size: usize,
    pub scan_size: usize,
    pub score_diff: f64,
    pub require_both: bool,
    pub verbose: bool,
}

impl From<&Args> for Settings {
    fn from(args: &Args) -> Self {
        Self {
            batch_size: args.batch_size,
            scan_size: args.scan_size,
            score_diff: args.score_diff,
            require_both: args.require_both,
            verbose: args.verbose,
        }
    }
}

/// A classifier bound to the end of the read it scans
pub struct SideModel<'a> {
    pub classifier: &'a dyn Classifier,
    pub plan: ScanPlan,
    pub side: Side,
}

impl<'a> SideModel<'a> {
    fn new(classifier: &'a dyn Classifier, scan_size: usize, side: Side) -> Result<Self> {
        let plan = ScanPlan::new(scan_size, classifier.input_size())?;
        info!(
            "{} model: window {} samples, step {}, {} steps",
            side, plan.input_size, plan.step_size, plan.steps
        );

        Ok(Self {
            classifier,
            plan,
            side,
        })
    }
}

/// Drives one or two classifiers over batches of reads
pub struct Demultiplexer<'a> {
    start: SideModel<'a>,
    end: Option<SideModel<'a>>,
    settings: Settings,
}

impl<'a> Demultiplexer<'a> {
    /// Bind the models and validate the scan layout
    ///
    /// Every configuration problem surfaces here, before a single
    /// read is loaded or a single window is classified.
    pub fn new(
        start: &'a dyn Classifier,
        end: Option<&'a dyn Classifier>,
        settings: Settings,
    ) -> Result<Self> {
        if settings.batch_size == 0 {
            bail!("batch size must be greater than 0");
        }
        if let Some(end) = end {
            check_pair(start, end)?;
        }

        let start = SideModel::new(start, settings.scan_size, Side::Start)?;
        let end = end
            .map(|end| SideModel::new(end, settings.scan_size, Side::End))
            .transpose()?;

        Ok(Self {
            start,
            end,
            settings,
        })
    }

    pub fn output_size(&self) -> usize {
        self.start.classifier.output_size()
    }

    pub fn is_dual(&self) -> bool {
        self.end.is_some()
    }

    pub fn header(&self) -> Vec<String> {
        header(self.settings.verbose, self.output_size(), self.is_dual())
    }

    /// Scan one side of every read in the batch
    fn call_side(&self, reads: &[SignalRead], model: &SideModel<'_>) -> Result<Vec<SideCall>> {
        let signals = reads.iter().map(|r| r.signal.as_slice()).collect::<Vec<_>>();
        let mut accumulator = MaxAccumulator::new(reads.len(), self.output_size());

        for step in 0..model.plan.steps {
            let windows = model.plan.batch(&signals, step, model.side);
            let scores = model
                .classifier
                .predict(windows.view(), self.settings.batch_size)?;
            accumulator.update(scores.view())?;
        }

        Ok(accumulator
            .finish()
            .into_iter()
            .map(|probabilities| {
                let call = call_barcode(&probabilities, self.settings.score_diff);
                SideCall {
                    probabilities,
                    call,
                }
            })
            .collect())
    }

    /// Classify one batch, keeping read order
    pub fn classify_batch(&self, reads: &[SignalRead]) -> Result<Vec<ClassificationRow>> {
        if reads.is_empty() {
            return Ok(Vec::new());
        }

        let starts = self.call_side(reads, &self.start)?;
        let ends = match &self.end {
            Some(end) => Some(self.call_side(reads, end)?),
            None => None,
        };

        let rows = match ends {
            Some(ends) => reads
                .iter()
                .zip(starts)
                .zip(ends)
                .map(|((read, start), end)| ClassificationRow {
                    read_id: read.read_id.clone(),
                    call: combine_calls(start.call, end.call, self.settings.require_both),
                    start,
                    end: Some(end),
                })
                .collect(),
            None => reads
                .iter()
                .zip(starts)
                .map(|(read, start)| ClassificationRow {
                    read_id: read.read_id.clone(),
                    call: start.call,
                    start,
                    end: None,
                })
                .collect(),
        };

        Ok(rows)
    }

    /// Stream every read of `source` through the models into `writer`
    ///
    /// Writes the header first, then one flushed block of rows per
    /// batch. Batches never overlap in memory.
    ///
    /// # Arguments
    ///
    /// * `source` - Reads to classify, fetched by index
    /// * `writer` - Destination of the tab-separated rows
    ///
    /// # Returns
    ///
    /// * `Result<Summary>` - Number of reads per final call
    pub fn run<S, W>(&self, source: &S, writer: &mut W) -> Result<Summary>
    where
        S: ReadSource + ?Sized,
        W: Write,
    {
        let mut summary = Summary::default();
        let batch_size = self.settings.batch_size;
        let total = source.len();

        write_fields(writer, &self.header())?;

        let pb = get_progress_bar(total.div_ceil(batch_size) as u64, "Classifying reads");
        for first in (0..total).step_by(batch_size) {
            let last = (first + batch_size).min(total);
            let reads = fetch_batch(source, first..last)?;

            for row in self.classify_batch(&reads)? {
                write_fields(writer, &row.fields(self.settings.verbose))?;
                summary.add(row.call);
            }

            writer.flush()?;
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(summary)
    }
}

/// Detects the input, loads the models and classifies every read
///
/// Rows go to stdout in input order. Training data is detected but
/// not classified: two models are an error, one model stops early.
///
/// # Arguments
///
/// * `args` - The command line arguments
///
/// # Returns
///
/// * `Result<Summary>` - Number of reads per final call
///
/// # Example
///
/// ```rust, no_run
/// use demux_classify::{cli::Args, core::classify_reads};
///
/// let args = Args::from(vec![
///     "--model".to_string(),
///     "start.onnx".to_string(),
///     "--input".to_string(),
///     "reads/".to_string(),
/// ]);
/// let summary = classify_reads(args).unwrap();
/// summary.log();
/// ```
pub fn classify_reads(args: Args) -> Result<Summary> {
    let input = detect_input_type(&args.input)?;
    info!("Input {:?} detected as {}", input.path(), input.name());

    if let InputType::TrainingDump(path) = &input {
        if args.model.len() == 2 {
            bail!("training data can only be classified using a single model");
        }

        warn!(
            "Classification of training data ({:?}) is not supported, nothing to do",
            path
        );
        return Ok(Summary::default());
    }

    let start = load_classifier(&args.model[0])?;
    let end = args.model.get(1).map(load_classifier).transpose()?;

    let demux = Demultiplexer::new(start.as_ref(), end.as_deref(), Settings::from(&args))?;
    let source = open_source(&input)?;

    if source.is_empty() {
        warn!("No reads found in {:?}", input.path());
    }

    let stdout = std::io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    let summary = demux.run(source.as_ref(), &mut writer)?;

    summary.log();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::call::BarcodeCall;
    use crate::model::ModelError;
    use ndarray::{Array2, ArrayView2};
    use std::cell::Cell;

    const WINDOW: usize = 20;

    /// Calls class `p + 1` where `p` is the position of the window's
    /// peak; a flat window is background
    struct PeakClassifier {
        input_size: usize,
        output_size: usize,
        calls: Cell<usize>,
    }

    impl PeakClassifier {
        fn new(input_size: usize, output_size: usize) -> Self {
            Self {
                input_size,
                output_size,
                calls: Cell::new(0),
            }
        }
    }

    impl Classifier for PeakClassifier {
        fn input_size(&self) -> usize {
            self.input_size
        }

        fn output_size(&self) -> usize {
            self.output_size
        }

        fn predict(
            &self,
            windows: ArrayView2<'_, f32>,
            _batch_size: usize,
        ) -> Result<Array2<f32>, ModelError> {
            self.calls.set(self.calls.get() + 1);
            assert_eq!(windows.ncols(), self.input_size);

            let mut scores = Array2::zeros((windows.nrows(), self.output_size));
            for (i, window) in windows.rows().into_iter().enumerate() {
                let (peak, value) = window
                    .iter()
                    .enumerate()
                    .fold((0, f32::MIN), |best, (j, &x)| if x > best.1 { (j, x) } else { best });

                let class = if value > 0.0 {
                    (peak % (self.output_size - 1)) + 1
                } else {
                    0
                };
                scores[[i, class]] = 1.0;
            }

            Ok(scores)
        }
    }

    /// Always confident in the background class
    struct BackgroundClassifier {
        output_size: usize,
    }

    impl Classifier for BackgroundClassifier {
        fn input_size(&self) -> usize {
            WINDOW
        }

        fn output_size(&self) -> usize {
            self.output_size
        }

        fn predict(
            &self,
            windows: ArrayView2<'_, f32>,
            _batch_size: usize,
        ) -> Result<Array2<f32>, ModelError> {
            let mut scores = Array2::zeros((windows.nrows(), self.output_size));
            scores.column_mut(0).fill(1.0);
            Ok(scores)
        }
    }

    fn settings(batch_size: usize, scan_size: usize) -> Settings {
        Settings {
            batch_size,
            scan_size,
            score_diff: 0.5,
            require_both: false,
            verbose: false,
        }
    }

    fn spike_read(id: &str, peak: usize) -> SignalRead {
        let mut signal = vec![0i16; WINDOW];
        signal[peak] = 100;
        SignalRead::new(id, signal)
    }

    fn output_lines(demux: &Demultiplexer<'_>, reads: &Vec<SignalRead>) -> Vec<String> {
        let mut out = Vec::new();
        demux.run(reads, &mut out).unwrap();

        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    #[test]
    fn test_rows_keep_input_order_across_batches() {
        let model = PeakClassifier::new(WINDOW, WINDOW + 1);
        let demux = Demultiplexer::new(&model, None, settings(3, WINDOW / 2)).unwrap();

        let peaks = [5, 0, 17, 3, 3, 11, 19];
        let reads = peaks
            .iter()
            .enumerate()
            .map(|(i, &p)| spike_read(&format!("read_{}", i), p))
            .collect::<Vec<_>>();

        let lines = output_lines(&demux, &reads);

        assert_eq!(lines[0], "read_ID\tbarcode_call");
        let expected = peaks
            .iter()
            .enumerate()
            .map(|(i, p)| format!("read_{}\t{}", i, p + 1))
            .collect::<Vec<_>>();
        assert_eq!(&lines[1..], &expected[..]);
    }

    #[test]
    fn test_adapter_called_once_per_step_per_batch() {
        let model = PeakClassifier::new(WINDOW, WINDOW + 1);
        let demux = Demultiplexer::new(&model, None, settings(2, 40)).unwrap();

        let reads = (0..5)
            .map(|i| spike_read(&format!("r{}", i), i))
            .collect::<Vec<_>>();
        output_lines(&demux, &reads);

        // 3 batches x 4 steps
        assert_eq!(model.calls.get(), 12);
    }

    #[test]
    fn test_uneven_scan_fails_before_inference() {
        let model = PeakClassifier::new(WINDOW, WINDOW + 1);
        let result = Demultiplexer::new(&model, None, settings(2, 25));

        assert!(result.is_err());
        assert_eq!(model.calls.get(), 0);
    }

    #[test]
    fn test_mismatched_models_are_rejected() {
        let start = PeakClassifier::new(WINDOW, WINDOW + 1);
        let end = BackgroundClassifier { output_size: 5 };

        assert!(Demultiplexer::new(&start, Some(&end), settings(2, WINDOW / 2)).is_err());
    }

    #[test]
    fn test_dual_model_reconciliation() {
        let start = PeakClassifier::new(WINDOW, WINDOW + 1);
        let end = BackgroundClassifier {
            output_size: WINDOW + 1,
        };
        let reads = vec![spike_read("a", 4)];

        let demux = Demultiplexer::new(&start, Some(&end), settings(4, WINDOW / 2)).unwrap();
        let rows = demux.classify_batch(&reads).unwrap();
        assert_eq!(rows[0].start.call, BarcodeCall::Class(5));
        assert_eq!(rows[0].end.as_ref().unwrap().call, BarcodeCall::NoCall);
        assert_eq!(rows[0].call, BarcodeCall::Class(5));

        let strict = Settings {
            require_both: true,
            ..settings(4, WINDOW / 2)
        };
        let demux = Demultiplexer::new(&start, Some(&end), strict).unwrap();
        let rows = demux.classify_batch(&reads).unwrap();
        assert_eq!(rows[0].call, BarcodeCall::NoCall);
    }

    #[test]
    fn test_dual_models_agree_on_same_window() {
        let start = PeakClassifier::new(WINDOW, WINDOW + 1);
        let end = PeakClassifier::new(WINDOW, WINDOW + 1);
        let reads = vec![spike_read("a", 9), spike_read("b", 2)];

        let demux = Demultiplexer::new(&start, Some(&end), settings(8, WINDOW / 2)).unwrap();
        let calls = demux
            .classify_batch(&reads)
            .unwrap()
            .into_iter()
            .map(|row| row.call)
            .collect::<Vec<_>>();

        assert_eq!(calls, vec![BarcodeCall::Class(10), BarcodeCall::Class(3)]);
    }

    #[test]
    fn test_verbose_dual_output_matches_header() {
        let start = PeakClassifier::new(WINDOW, 4);
        let end = PeakClassifier::new(WINDOW, 4);
        let verbose = Settings {
            verbose: true,
            ..settings(8, WINDOW / 2)
        };
        let demux = Demultiplexer::new(&start, Some(&end), verbose).unwrap();

        let lines = output_lines(&demux, &vec![spike_read("a", 1)]);
        let header = lines[0].split('\t').count();

        assert_eq!(header, 2 + 2 * (4 + 1));
        assert_eq!(lines[1].split('\t').count(), header);
        assert_eq!(lines[1], "a\t2\t0.00\t0.00\t1.00\t0.00\t2\t0.00\t0.00\t1.00\t0.00\t2");
    }

    #[test]
    fn test_empty_signal_is_no_call() {
        let model = PeakClassifier::new(WINDOW, WINDOW + 1);
        let demux = Demultiplexer::new(&model, None, settings(4, WINDOW / 2)).unwrap();

        let rows = demux
            .classify_batch(&[SignalRead::new("empty", Vec::<i16>::new())])
            .unwrap();

        assert_eq!(rows[0].call, BarcodeCall::NoCall);
    }

    fn training_dump() -> tempfile::NamedTempFile {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1\t{}", vec!["100"; 50].join(",")).unwrap();
        file
    }

    fn args_for(models: &[&str], input: &std::path::Path) -> Args {
        Args::from(vec![
            "--model".to_string(),
            models.join(","),
            "--input".to_string(),
            input.display().to_string(),
        ])
    }

    #[test]
    fn test_training_dump_with_two_models_is_fatal() {
        let dump = training_dump();
        let args = args_for(&["start.onnx", "end.onnx"], dump.path());

        let err = classify_reads(args).unwrap_err();
        assert!(err.to_string().contains("single model"));
    }

    #[test]
    fn test_training_dump_with_one_model_does_nothing() {
        let dump = training_dump();
        let args = args_for(&["start.onnx"], dump.path());

        let summary = classify_reads(args).unwrap();
        assert_eq!(summary.reads, 0);
    }

    #[test]
    fn test_missing_model_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let args = args_for(&["/no/such/start.onnx"], dir.path());

        let err = classify_reads(args).unwrap_err();
        assert!(err.downcast_ref::<ModelError>().is_some());
    }

    #[test]
    fn test_undetectable_input_is_fatal() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "definitely not reads").unwrap();
        let args = args_for(&["start.onnx"], file.path());

        assert!(classify_reads(args).is_err());
    }
}
