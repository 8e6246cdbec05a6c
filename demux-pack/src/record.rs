use crate::PackError;

/// One read as handed over by a signal source
///
/// # Fields
///
/// * `read_id` - opaque read identifier
/// * `signal` - raw samples in acquisition order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalRead {
    pub read_id: String,
    pub signal: Vec<i16>,
}

impl SignalRead {
    pub fn new<S: Into<String>, V: Into<Vec<i16>>>(read_id: S, signal: V) -> Self {
        Self {
            read_id: read_id.into(),
            signal: signal.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.signal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }
}

/// A labelled signal from a training-data dump
///
/// Lines look like `<label>\t<s1>,<s2>,...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingRow {
    pub label: i64,
    pub signal: Vec<i32>,
}

impl TrainingRow {
    pub fn parse(line: &str) -> Result<Self, PackError> {
        let mut fields = line.trim_end_matches(['\n', '\r']).split('\t');

        let label = fields
            .next()
            .and_then(|x| x.trim().parse::<i64>().ok())
            .ok_or_else(|| PackError::Parse(format!("bad training label in {:?}", line)))?;

        let signal = fields
            .next()
            .ok_or_else(|| PackError::Parse(format!("missing training signal in {:?}", line)))?
            .split(',')
            .map(|x| x.trim().parse::<i32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PackError::Parse(format!("bad training signal value: {}", e)))?;

        Ok(Self { label, signal })
    }
}
