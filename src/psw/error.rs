// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading position-switch spectra.

use std::path::PathBuf;

use thiserror::Error;

use crate::io::fits::FitsError;

#[derive(Error, Debug)]
pub enum PswError {
    #[error("{path} has no binary table holding a spectrum")]
    NoTable { path: PathBuf },

    #[error("The spectrum table of {path} has no rows")]
    NoRows { path: PathBuf },

    #[error("The spectrum table of {path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("The frequency axis has {expected} channels, but the spectrum has {got}")]
    DataLength { expected: usize, got: usize },

    #[error(transparent)]
    Fits(#[from] FitsError),
}
