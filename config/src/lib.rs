//! Shared constants and argument plumbing for demuxtools
//! demuxtools developers, 2026
//!
//! Every tool in the workspace pulls its defaults, output labels and
//! argument validation from here so that the binaries agree on what
//! a valid run looks like.

pub mod fns;
pub use fns::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// numeric values
pub const DEFAULT_BATCH_SIZE: usize = 256;
pub const DEFAULT_SCAN_SIZE: usize = 6144;
pub const DEFAULT_SCORE_DIFF: f64 = 0.5;
pub const MIN_THREADS: usize = 1;
pub const MIN_MODEL_INPUT_SIZE: usize = 10;
pub const MIN_TRAINING_SIGNAL: usize = 10;
pub const MAX_MODELS: usize = 2;
pub const PROBABILITY_PRECISION: usize = 2;

// file signatures and extensions
pub const HDF5_SIGNATURE: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1a, b'\n'];
pub const HDF5_MIN_USER_BLOCK: u64 = 512;
pub const FAST5: &str = "fast5";
pub const ONNX: &str = "onnx";

// output labels
pub const READ_ID: &str = "read_ID";
pub const BARCODE_CALL: &str = "barcode_call";
pub const NO_CALL: &str = "none";
pub const START_PREFIX: &str = "start";
pub const END_PREFIX: &str = "end";
