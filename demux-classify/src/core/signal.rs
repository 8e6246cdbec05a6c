use std::fmt;

/// Which end of the read a window is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Start,
    End,
}

impl Side {
    pub fn prefix(&self) -> &'static str {
        match self {
            Side::Start => config::START_PREFIX,
            Side::End => config::END_PREFIX,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// Zero-mean, unit-variance rescaling of a raw window
///
/// Uses the population standard deviation. An empty window stays
/// empty and a flat window is only centred.
///
/// # Example
///
/// ```rust
/// use demux_classify::core::signal::normalise;
///
/// let window = normalise(&[1, 2, 3]);
/// assert!((window.iter().sum::<f32>()).abs() < 1e-6);
/// ```
pub fn normalise(raw: &[i16]) -> Vec<f32> {
    if raw.is_empty() {
        return Vec::new();
    }

    let n = raw.len() as f64;
    let mean = raw.iter().map(|&x| x as f64).sum::<f64>() / n;
    let var = raw
        .iter()
        .map(|&x| {
            let d = x as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    let stdev = var.sqrt();

    if stdev > 0.0 {
        raw.iter()
            .map(|&x| ((x as f64 - mean) / stdev) as f32)
            .collect()
    } else {
        raw.iter().map(|&x| (x as f64 - mean) as f32).collect()
    }
}

/// Zero-pad a window up to `target` samples
///
/// Start-anchored windows grow at the tail, end-anchored windows at
/// the head, so the anchored end keeps its alignment. Windows that
/// are already long enough are returned untouched.
pub fn pad(mut window: Vec<f32>, target: usize, side: Side) -> Vec<f32> {
    if window.len() >= target {
        return window;
    }

    let missing = target - window.len();
    match side {
        Side::Start => {
            window.resize(target, 0.0);
            window
        }
        Side::End => {
            let mut padded = vec![0.0; missing];
            padded.extend(window);
            padded
        }
    }
}
