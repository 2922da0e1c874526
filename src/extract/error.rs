// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with extracting modulation-corrected scans.

use std::path::PathBuf;

use thiserror::Error;

use crate::container::ContainerError;

/// None of these are clamped or skipped; every one names the bound that was
/// violated.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("'{label}' isn't an array in this container; available arrays: {available}")]
    UnknownArray { label: String, available: String },

    #[error("Can't bin {num_channels} channels by {binning}; the binning factor must be a non-zero divisor of the channel count")]
    BadBinning { binning: usize, num_channels: usize },

    #[error("Can't cut {cutedge} channels from each edge of {num_channels} binned channels")]
    BadCutedge { cutedge: usize, num_channels: usize },

    #[error("Array {label} has {got} Tsys values, but {expected} channels")]
    TsysLength {
        label: String,
        expected: usize,
        got: usize,
    },

    #[error("Array {label} stores {stored} channels, but the configuration says {configured}")]
    ChannelMismatch {
        label: String,
        configured: usize,
        stored: usize,
    },

    #[error("A time offset of {time_offset} needs FMLO log rows up to {needed} ({scan_len} scan rows after 3 calibration rows), but the log only has {num_rows}")]
    OffsetOutOfRange {
        time_offset: usize,
        scan_len: usize,
        needed: usize,
        num_rows: usize,
    },

    #[error("Don't know how to write '{path}'; use a .fits or .json extension")]
    UnknownOutputFormat { path: PathBuf },

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
