//! Core module for barcode demultiplexing of nanopore reads
//! demuxtools developers, 2026
//!
//! This crate classifies reads into barcode classes straight from
//! their raw signal. One classifier scans the start of each read and,
//! optionally, a second one scans the end; their window-level scores
//! are folded into one call per read.

use anyhow::Result;

pub mod cli;
pub mod core;
pub mod model;
pub mod utils;

pub fn lib_demux_classify(args: Vec<String>) -> Result<utils::Summary> {
    let args = cli::Args::from(args);
    core::classify_reads(args)
}
