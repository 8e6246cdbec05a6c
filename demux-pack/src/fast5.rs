//! Single-read fast5 access
//!
//! A single-read fast5 file is an HDF5 container holding one
//! `Raw/Reads/Read_<n>` group with a `Signal` dataset and a
//! `read_id` attribute. Reading it needs the `fast5` feature;
//! sniffing the container signature does not.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use config::{HDF5_MIN_USER_BLOCK, HDF5_SIGNATURE};

use crate::{PackError, SignalRead};

#[cfg(feature = "fast5")]
const RAW_READS: &str = "Raw/Reads";
#[cfg(feature = "fast5")]
const SIGNAL: &str = "Signal";
#[cfg(feature = "fast5")]
const READ_ID_ATTR: &str = "read_id";

/// true when the file carries the HDF5 superblock signature
///
/// The superblock sits at offset 0, or after a user block at 512,
/// 1024, 2048 and further powers of two.
pub fn has_hdf5_signature<P: AsRef<Path>>(path: P) -> Result<bool, PackError> {
    let mut file = File::open(path.as_ref())?;
    let len = file.metadata()?.len();
    let mut magic = [0u8; 8];
    let mut offset = 0u64;

    while offset + magic.len() as u64 <= len {
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut magic)?;
        if magic == HDF5_SIGNATURE {
            return Ok(true);
        }

        offset = if offset == 0 {
            HDF5_MIN_USER_BLOCK
        } else {
            offset * 2
        };
    }

    Ok(false)
}

#[cfg(feature = "fast5")]
pub fn read_single<P: AsRef<Path>>(path: P) -> Result<SignalRead, PackError> {
    use hdf5::types::{FixedAscii, VarLenAscii, VarLenUnicode};

    let path = path.as_ref();
    let fast5_err = |e: hdf5::Error| PackError::Fast5 {
        path: path.to_path_buf(),
        msg: e.to_string(),
    };

    let file = hdf5::File::open(path).map_err(fast5_err)?;
    let reads = file.group(RAW_READS).map_err(fast5_err)?;
    let name = reads
        .member_names()
        .map_err(fast5_err)?
        .into_iter()
        .next()
        .ok_or_else(|| PackError::Fast5 {
            path: path.to_path_buf(),
            msg: format!("no reads under {}", RAW_READS),
        })?;

    let read = reads.group(&name).map_err(fast5_err)?;
    let signal = read
        .dataset(SIGNAL)
        .and_then(|ds| ds.read_raw::<i16>())
        .map_err(fast5_err)?;

    let attr = read.attr(READ_ID_ATTR).map_err(fast5_err)?;
    let read_id = attr
        .read_scalar::<VarLenUnicode>()
        .map(|s| s.as_str().to_string())
        .or_else(|_| attr.read_scalar::<VarLenAscii>().map(|s| s.as_str().to_string()))
        .or_else(|_| {
            attr.read_scalar::<FixedAscii<64>>()
                .map(|s| s.as_str().to_string())
        })
        .map_err(fast5_err)?;

    Ok(SignalRead::new(read_id, signal))
}

#[cfg(not(feature = "fast5"))]
pub fn read_single<P: AsRef<Path>>(path: P) -> Result<SignalRead, PackError> {
    Err(PackError::Unsupported(format!(
        "cannot read {:?}: built without fast5 support (enable the `fast5` feature)",
        path.as_ref()
    )))
}
