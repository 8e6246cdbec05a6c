use std::fmt;
use std::str::FromStr;

use config::NO_CALL;

/// A barcode decision for one read
///
/// Class 0 of every model is the background class, so it is never
/// carried as `Class(0)`; it is `NoCall`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BarcodeCall {
    NoCall,
    Class(usize),
}

impl BarcodeCall {
    pub fn is_call(&self) -> bool {
        matches!(self, BarcodeCall::Class(_))
    }
}

impl fmt::Display for BarcodeCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarcodeCall::NoCall => write!(f, "{}", NO_CALL),
            BarcodeCall::Class(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for BarcodeCall {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            NO_CALL => Ok(BarcodeCall::NoCall),
            _ => match s.parse::<usize>() {
                Ok(0) => Ok(BarcodeCall::NoCall),
                Ok(n) => Ok(BarcodeCall::Class(n)),
                Err(_) => Err(format!("invalid barcode call: {}", s)),
            },
        }
    }
}

/// Turn an aggregated probability vector into a call
///
/// The best class wins only if it is not the background class and
/// beats the runner-up by at least `score_diff_threshold`. Ties keep
/// class order, so a tie with class 0 on top is a no-call.
///
/// # Example
///
/// ```rust
/// use demux_classify::core::call::{call_barcode, BarcodeCall};
///
/// assert_eq!(call_barcode(&[0.1, 0.9, 0.0], 0.1), BarcodeCall::Class(1));
/// assert_eq!(call_barcode(&[0.1, 0.5, 0.45], 0.1), BarcodeCall::NoCall);
/// ```
pub fn call_barcode(probabilities: &[f64], score_diff_threshold: f64) -> BarcodeCall {
    let mut ranked = probabilities.iter().copied().enumerate().collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (best, best_score) = match ranked.first() {
        Some(&top) => top,
        None => return BarcodeCall::NoCall,
    };
    if best == 0 {
        return BarcodeCall::NoCall;
    }

    let second_score = ranked.get(1).map(|&(_, score)| score).unwrap_or(0.0);
    if best_score - second_score >= score_diff_threshold {
        BarcodeCall::Class(best)
    } else {
        BarcodeCall::NoCall
    }
}

/// Merge the start-side and end-side calls of one read
///
/// Agreement wins. On disagreement `require_both` forces a no-call;
/// otherwise a single confident side wins and two different
/// confident sides cancel out.
pub fn combine_calls(start: BarcodeCall, end: BarcodeCall, require_both: bool) -> BarcodeCall {
    if start == end {
        return start;
    }
    if require_both {
        return BarcodeCall::NoCall;
    }

    match (start, end) {
        (BarcodeCall::NoCall, call) | (call, BarcodeCall::NoCall) => call,
        _ => BarcodeCall::NoCall,
    }
}
