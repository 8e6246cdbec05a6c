//! Core module for barcode demultiplexing of nanopore reads
//! demuxtools developers, 2026
//!
//! Reads the raw signal of every read, scans its start (and, with a
//! second model, its end) with a pretrained classifier and prints one
//! tab-separated barcode call per read to stdout. Logging and the
//! progress bar go to stderr.

use clap::Parser;
use config::ArgCheck;
use log::{error, info, Level};
use simple_logger::init_with_level;

use demux_classify::{cli::Args, core::classify_reads};

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();

    let args: Args = Args::parse();
    args.check().unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .unwrap_or_else(|e| {
            error!("{}", e);
            std::process::exit(1);
        });

    classify_reads(args).unwrap_or_else(|e| {
        error!("{:#}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
