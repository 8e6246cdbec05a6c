//! Read-signal sources for the demultiplexer
//! demuxtools developers, 2026
//!
//! This crate hides where reads come from. It detects what kind of
//! input the user pointed at (a directory of fast5 files, a single
//! fast5 file or a training-data dump), discovers fast5 files and
//! hands reads back by index so the caller can load them batch by
//! batch without keeping the whole run in memory.

use std::fmt::Debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::Range;
use std::path::{Path, PathBuf};

use config::{FAST5, MIN_TRAINING_SIGNAL};
use log::info;
use rayon::prelude::*;
use thiserror::Error;
use walkdir::WalkDir;

pub mod fast5;
pub mod record;
pub use record::{SignalRead, TrainingRow};

#[derive(Debug, Error)]
pub enum PackError {
    #[error("{0:?} is neither a file nor a directory")]
    Missing(PathBuf),
    #[error("could not determine input type of {0:?}")]
    Undetectable(PathBuf),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("fast5 error in {path:?}: {msg}")]
    Fast5 { path: PathBuf, msg: String },
    #[error("{0}")]
    Unsupported(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the input path turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputType {
    Directory(PathBuf),
    SingleFile(PathBuf),
    TrainingDump(PathBuf),
}

impl InputType {
    pub fn path(&self) -> &Path {
        match self {
            InputType::Directory(p) | InputType::SingleFile(p) | InputType::TrainingDump(p) => p,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InputType::Directory(_) => "directory",
            InputType::SingleFile(_) => "single fast5",
            InputType::TrainingDump(_) => "training data",
        }
    }
}

/// Detect the input type
///
/// Order matters: directories first, then the HDF5 container
/// signature, then a training-data row with more than
/// `MIN_TRAINING_SIGNAL` samples on the first line.
///
/// # Arguments
///
/// * `path` - Directory or file given as input
///
/// # Returns
///
/// * `Result<InputType, PackError>` - The detected input, or
///   `Missing`/`Undetectable` when it is none of the above
///
/// # Example
///
/// ```rust, no_run
/// use demux_pack::{detect_input_type, InputType};
///
/// let input = detect_input_type("reads/").unwrap();
/// assert!(matches!(input, InputType::Directory(_)));
/// ```
pub fn detect_input_type<P: AsRef<Path>>(path: P) -> Result<InputType, PackError> {
    let path = path.as_ref();

    if path.is_dir() {
        return Ok(InputType::Directory(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(PackError::Missing(path.to_path_buf()));
    }

    if fast5::has_hdf5_signature(path)? {
        return Ok(InputType::SingleFile(path.to_path_buf()));
    }

    let mut first_line = Vec::new();
    BufReader::new(File::open(path)?).read_until(b'\n', &mut first_line)?;
    let first_line = String::from_utf8_lossy(&first_line);

    match TrainingRow::parse(&first_line) {
        Ok(row) if row.signal.len() > MIN_TRAINING_SIGNAL => {
            Ok(InputType::TrainingDump(path.to_path_buf()))
        }
        _ => Err(PackError::Undetectable(path.to_path_buf())),
    }
}

/// Recursively collect every .fast5 file below `dir`, sorted by path
///
/// Symlinked directories are not descended into, so a link pointing
/// back up the tree cannot yield the same read twice. Symlinks to
/// files are kept.
pub fn find_all_fast5s<P: AsRef<Path> + Debug>(dir: P) -> Result<Vec<PathBuf>, PackError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir.as_ref()).follow_links(false) {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();

        if path.is_file() && path.extension().is_some_and(|ext| ext == FAST5) {
            files.push(entry.into_path());
        }
    }

    files.sort_unstable();
    info!("Found {} fast5 files in {:?}", files.len(), dir);

    Ok(files)
}

/// Anything that can hand reads back by position
pub trait ReadSource: Sync {
    fn len(&self) -> usize;

    fn fetch(&self, index: usize) -> Result<SignalRead, PackError>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReadSource for Vec<SignalRead> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn fetch(&self, index: usize) -> Result<SignalRead, PackError> {
        self.get(index)
            .cloned()
            .ok_or_else(|| PackError::Parse(format!("read index {} out of range", index)))
    }
}

/// One read per fast5 file
#[derive(Debug, Clone)]
pub struct Fast5Files {
    files: Vec<PathBuf>,
}

impl Fast5Files {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }
}

impl ReadSource for Fast5Files {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn fetch(&self, index: usize) -> Result<SignalRead, PackError> {
        let path = self
            .files
            .get(index)
            .ok_or_else(|| PackError::Parse(format!("read index {} out of range", index)))?;

        fast5::read_single(path)
    }
}

/// Build the read source behind a detected input
pub fn open_source(input: &InputType) -> Result<Box<dyn ReadSource>, PackError> {
    match input {
        InputType::Directory(dir) => Ok(Box::new(Fast5Files::new(find_all_fast5s(dir)?))),
        InputType::SingleFile(file) => Ok(Box::new(Fast5Files::new(vec![file.clone()]))),
        InputType::TrainingDump(file) => Err(PackError::Unsupported(format!(
            "{:?} is training data and has no read source",
            file
        ))),
    }
}

/// Load a contiguous range of reads, in order
///
/// Reads are fetched in parallel; the returned vector keeps the
/// order of `range`.
pub fn fetch_batch<S: ReadSource + ?Sized>(
    source: &S,
    range: Range<usize>,
) -> Result<Vec<SignalRead>, PackError> {
    range
        .into_par_iter()
        .map(|index| source.fetch(index))
        .collect()
}
