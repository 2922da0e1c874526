// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with ingesting the raw SAM45 log.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::{ParseError, SchemaError};

/// Something went wrong turning the raw spectrometer log into streams. These
/// are fatal for an ingestion run; scratch files are removed before the error
/// is returned.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Couldn't start the dump utility '{tool}': {err}")]
    DumpSpawn {
        tool: PathBuf,
        err: std::io::Error,
    },

    #[error("The dump utility '{tool}' failed ({status}); its stderr was:\n{stderr}")]
    DumpFailed {
        tool: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("The dump utility said it succeeded, but its output '{path}' doesn't exist")]
    DumpOutputMissing { path: PathBuf },

    #[error("The dump utility '{tool}' didn't finish within {secs} s and was killed")]
    DumpTimeout { tool: PathBuf, secs: f64 },

    #[error("Dumped SAM45 log line {line}: expected {expected} channel values, but found {got}")]
    LineWidth {
        line: usize,
        expected: usize,
        got: usize,
    },

    #[error("Couldn't make a scratch directory under '{root}': {err}")]
    Scratch {
        root: PathBuf,
        err: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
