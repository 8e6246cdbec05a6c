use config::CliError;
use ndarray::Array2;
use rayon::prelude::*;

use super::signal::{normalise, pad, Side};

/// Sliding-window layout over one side of a read
///
/// Windows overlap by half: `step_size = input_size / 2` and
/// `steps = scan_size / step_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPlan {
    pub input_size: usize,
    pub step_size: usize,
    pub steps: usize,
}

impl ScanPlan {
    /// Validate a scan size against a model window length
    ///
    /// # Example
    ///
    /// ```rust
    /// use demux_classify::core::scan::ScanPlan;
    ///
    /// let plan = ScanPlan::new(6000, 100).unwrap();
    /// assert_eq!((plan.step_size, plan.steps), (50, 120));
    /// assert!(ScanPlan::new(6010, 100).is_err());
    /// ```
    pub fn new(scan_size: usize, input_size: usize) -> Result<Self, CliError> {
        let step_size = input_size / 2;
        if step_size == 0 {
            return Err(CliError::InvalidInput(format!(
                "model window of {} samples is too short to scan",
                input_size
            )));
        }

        if scan_size == 0 || scan_size % step_size != 0 {
            return Err(CliError::InvalidScan {
                scan_size,
                step_size,
            });
        }

        Ok(Self {
            input_size,
            step_size,
            steps: scan_size / step_size,
        })
    }

    /// Half-open signal range covered by window `step`
    ///
    /// End-anchored offsets are measured back from the end of the
    /// signal and clipped at zero, so the range may be empty.
    pub fn bounds(&self, step: usize, signal_len: usize, side: Side) -> (usize, usize) {
        let sig_start = step * self.step_size;
        let sig_end = sig_start + self.input_size;

        match side {
            Side::Start => (sig_start.min(signal_len), sig_end.min(signal_len)),
            Side::End => (
                signal_len.saturating_sub(sig_end),
                signal_len.saturating_sub(sig_start),
            ),
        }
    }

    /// Normalised, padded window `step` of one signal
    pub fn window(&self, signal: &[i16], step: usize, side: Side) -> Vec<f32> {
        let (a, b) = self.bounds(step, signal.len(), side);
        pad(normalise(&signal[a..b]), self.input_size, side)
    }

    /// Window `step` of every signal stacked as `signals x input_size`
    pub fn batch(&self, signals: &[&[i16]], step: usize, side: Side) -> Array2<f32> {
        let rows = signals
            .par_iter()
            .map(|signal| self.window(signal, step, side))
            .collect::<Vec<_>>();

        let mut batch = Array2::<f32>::zeros((signals.len(), self.input_size));
        for (mut row, window) in batch.rows_mut().into_iter().zip(rows) {
            row.assign(&ndarray::ArrayView1::from(&window[..]));
        }

        batch
    }
}
