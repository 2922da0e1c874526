// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to read the FMLO (frequency-modulated local oscillator) log.
//!
//! After a one-line header, each line has the columns
//!
//! `YYYYMMDDhhmmss.ffffff STATUS FREQFM[Hz] FREQLO[Hz] VRAD[km/s]`

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use hifitime::Epoch;
use log::debug;

use super::parse_number;
use crate::{
    config::ParseError,
    time::{format_iso_timestamp, parse_log_timestamp, LogTimeFormat},
};

const NUM_HEADER_LINES: usize = 1;
const NUM_COLUMNS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct FmloLogRow {
    pub time: Epoch,
    pub status: String,

    /// The modulation frequency offset [Hz].
    pub freq_fm: f64,

    /// The local-oscillator frequency [Hz].
    pub freq_lo: f64,

    /// Radial velocity [km/s].
    pub v_rad: f64,
}

/// One row per control-loop tick, strictly increasing in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FmloLog {
    pub filename: String,
    pub rows: Vec<FmloLogRow>,
}

impl FmloLog {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<FmloLog, ParseError> {
        let path = path.as_ref();
        debug!("Reading FMLO log {}", path.display());
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(BufReader::new(File::open(path)?), filename)
    }

    pub fn parse<R: BufRead>(reader: R, filename: String) -> Result<FmloLog, ParseError> {
        let mut rows: Vec<FmloLogRow> = vec![];
        for (i, line) in reader.lines().enumerate().skip(NUM_HEADER_LINES) {
            let line = line?;
            let line_num = i + 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            if tokens.len() < NUM_COLUMNS {
                return Err(ParseError::MissingFields {
                    file: filename,
                    line: line_num,
                    expected: NUM_COLUMNS,
                    got: tokens.len(),
                });
            }

            let time = parse_log_timestamp(tokens[0], LogTimeFormat::FullYear).map_err(|_| {
                ParseError::LogTimestamp {
                    file: filename.clone(),
                    line: line_num,
                    input: tokens[0].to_string(),
                }
            })?;
            if let Some(previous) = rows.last() {
                if time <= previous.time {
                    return Err(ParseError::NonIncreasingTime {
                        file: filename,
                        line: line_num,
                        time: format_iso_timestamp(time),
                        previous: format_iso_timestamp(previous.time),
                    });
                }
            }

            rows.push(FmloLogRow {
                time,
                status: tokens[1].to_string(),
                freq_fm: parse_number(tokens[2], &filename, line_num)?,
                freq_lo: parse_number(tokens[3], &filename, line_num)?,
                v_rad: parse_number(tokens[4], &filename, line_num)?,
            });
        }
        debug!("Read {} FMLO log rows", rows.len());

        Ok(FmloLog { filename, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
