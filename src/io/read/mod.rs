// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to read the raw logs of an observation.
//!
//! The SAM45 spectrometer log is binary; it is first turned into text by an
//! external dump utility ([`DumpTool`]) and then demultiplexed into
//! calibration and on-source streams ([`RawStreams`]). The FMLO and antenna
//! logs are plain text and are parsed independently of everything else.

mod antlog;
mod demux;
mod dump;
mod error;
mod fmlolog;

pub use antlog::{AntLog, AntLogRow};
pub use demux::RawStreams;
pub use dump::{DumpTool, DumpedLog};
pub use error::IngestError;
pub use fmlolog::{FmloLog, FmloLogRow};

use crate::config::ParseError;

/// Parse a whitespace-separated numeric token from line `line` (1-based) of
/// `file`.
fn parse_number(token: &str, file: &str, line: usize) -> Result<f64, ParseError> {
    token.parse().map_err(|_| ParseError::BadNumber {
        file: file.to_string(),
        line,
        token: token.to_string(),
    })
}
