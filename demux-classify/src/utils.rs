use std::io::Write;

use config::{BARCODE_CALL, END_PREFIX, NO_CALL, PROBABILITY_PRECISION, READ_ID, START_PREFIX};
use hashbrown::HashMap;
use log::info;

use crate::core::{aggregate::ProbabilityVector, call::BarcodeCall};

/// Class labels in output order: `none, 1, 2, ..`
fn class_labels(output_size: usize) -> impl Iterator<Item = String> {
    std::iter::once(NO_CALL.to_string()).chain((1..output_size).map(|n| n.to_string()))
}

/// Output header for the three supported layouts
///
/// # Example
///
/// ```rust
/// use demux_classify::utils::header;
///
/// assert_eq!(header(false, 13, true), vec!["read_ID", "barcode_call"]);
/// assert_eq!(header(true, 3, false), vec!["read_ID", "barcode_call", "none", "1", "2"]);
/// ```
pub fn header(verbose: bool, output_size: usize, dual: bool) -> Vec<String> {
    let mut fields = vec![READ_ID.to_string(), BARCODE_CALL.to_string()];

    if !verbose {
        return fields;
    }

    if dual {
        for prefix in [START_PREFIX, END_PREFIX] {
            fields.extend(class_labels(output_size).map(|label| format!("{prefix}_{label}")));
            fields.push(format!("{prefix}_{BARCODE_CALL}"));
        }
    } else {
        fields.extend(class_labels(output_size));
    }

    fields
}

/// What one side of a read produced
#[derive(Debug, Clone, PartialEq)]
pub struct SideCall {
    pub probabilities: ProbabilityVector,
    pub call: BarcodeCall,
}

/// One output line
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRow {
    pub read_id: String,
    pub call: BarcodeCall,
    pub start: SideCall,
    pub end: Option<SideCall>,
}

impl ClassificationRow {
    pub fn fields(&self, verbose: bool) -> Vec<String> {
        let mut fields = vec![self.read_id.clone(), self.call.to_string()];

        if !verbose {
            return fields;
        }

        fields.extend(format_probabilities(&self.start.probabilities));
        if let Some(end) = &self.end {
            fields.push(self.start.call.to_string());
            fields.extend(format_probabilities(&end.probabilities));
            fields.push(end.call.to_string());
        }

        fields
    }
}

fn format_probabilities(probabilities: &[f64]) -> impl Iterator<Item = String> + '_ {
    probabilities
        .iter()
        .map(|p| format!("{:.*}", PROBABILITY_PRECISION, p))
}

pub fn write_fields<W: Write>(writer: &mut W, fields: &[String]) -> std::io::Result<()> {
    writeln!(writer, "{}", fields.join("\t"))
}

/// Final-call tally for the run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub reads: usize,
    pub calls: HashMap<BarcodeCall, usize>,
}

impl Summary {
    pub fn add(&mut self, call: BarcodeCall) {
        self.reads += 1;
        *self.calls.entry(call).or_insert(0) += 1;
    }

    pub fn count(&self, call: BarcodeCall) -> usize {
        self.calls.get(&call).copied().unwrap_or(0)
    }

    pub fn log(&self) {
        info!("Classified reads: {}", self.reads);

        let mut calls = self.calls.iter().collect::<Vec<_>>();
        calls.sort_unstable();
        for (call, count) in calls {
            let pct = *count as f64 / self.reads.max(1) as f64 * 100.0;
            info!("  {:>6}: {} ({:.2}%)", call.to_string(), count, pct);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn side(probabilities: Vec<f64>, call: BarcodeCall) -> SideCall {
        SideCall {
            probabilities,
            call,
        }
    }

    #[test]
    fn test_header_shapes() {
        assert_eq!(header(false, 4, false), vec!["read_ID", "barcode_call"]);
        assert_eq!(
            header(true, 4, false),
            vec!["read_ID", "barcode_call", "none", "1", "2", "3"]
        );
        assert_eq!(
            header(true, 3, true),
            vec![
                "read_ID",
                "barcode_call",
                "start_none",
                "start_1",
                "start_2",
                "start_barcode_call",
                "end_none",
                "end_1",
                "end_2",
                "end_barcode_call",
            ]
        );
    }

    #[test]
    fn test_row_fields_single_model() {
        let row = ClassificationRow {
            read_id: "abc".to_string(),
            call: BarcodeCall::Class(2),
            start: side(vec![0.1, 0.234, 0.666], BarcodeCall::Class(2)),
            end: None,
        };

        assert_eq!(row.fields(false), vec!["abc", "2"]);
        assert_eq!(row.fields(true), vec!["abc", "2", "0.10", "0.23", "0.67"]);
    }

    #[test]
    fn test_row_fields_dual_model() {
        let row = ClassificationRow {
            read_id: "abc".to_string(),
            call: BarcodeCall::Class(1),
            start: side(vec![0.2, 0.8], BarcodeCall::Class(1)),
            end: Some(side(vec![0.6, 0.4], BarcodeCall::NoCall)),
        };

        assert_eq!(
            row.fields(true),
            vec!["abc", "1", "0.20", "0.80", "1", "0.60", "0.40", "none"]
        );
        assert_eq!(row.fields(true).len(), header(true, 2, true).len());
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = Summary::default();
        summary.add(BarcodeCall::Class(1));
        summary.add(BarcodeCall::NoCall);
        summary.add(BarcodeCall::Class(1));

        assert_eq!(summary.reads, 3);
        assert_eq!(summary.count(BarcodeCall::Class(1)), 2);
        assert_eq!(summary.count(BarcodeCall::Class(5)), 0);
    }
}
