// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to read the antenna (pointing) log.
//!
//! After a one-line header, each line has the columns
//!
//! `yymmddhhmmss.ffffff RA DEC AZ1 EL1 AZ2 EL2 OFF1 OFF2`
//!
//! with all angles in degrees. The antenna log is usually sampled at a
//! different rate than the FMLO log.

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
    time::{parse_log_timestamp, LogTimeFormat},
};

const NUM_HEADER_LINES: usize = 1;
const NUM_COLUMNS: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct AntLogRow {
    pub time: Epoch,
    pub radec: [f64; 2],
    pub azel1: [f64; 2],
    pub azel2: [f64; 2],
    pub offset: [f64; 2],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AntLog {
    pub filename: String,
    pub rows: Vec<AntLogRow>,
}

impl AntLog {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<AntLog, ParseError> {
        let path = path.as_ref();
        debug!("Reading antenna log {}", path.display());
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(BufReader::new(File::open(path)?), filename)
    }

    pub fn parse<R: BufRead>(reader: R, filename: String) -> Result<AntLog, ParseError> {
        let mut rows = vec![];
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

            let time = parse_log_timestamp(tokens[0], LogTimeFormat::ShortYear).map_err(|_| {
                ParseError::LogTimestamp {
                    file: filename.clone(),
                    line: line_num,
                    input: tokens[0].to_string(),
                }
            })?;
            let mut values = [0.0; NUM_COLUMNS - 1];
            for (v, token) in values.iter_mut().zip(&tokens[1..NUM_COLUMNS]) {
                *v = parse_number(token, &filename, line_num)?;
            }

            rows.push(AntLogRow {
                time,
                radec: [values[0], values[1]],
                azel1: [values[2], values[3]],
                azel2: [values[4], values[5]],
                offset: [values[6], values[7]],
            });
        }
        debug!("Read {} antenna log rows", rows.len());

        Ok(AntLog { filename, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
