// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Demultiplexing dumped SAM45 text.
//!
//! Line `i` of the dump belongs to temporal row `i / M` and array slot
//! `i % M`, where `M` is the number of in-use arrays. Rows 0, 1 and 2 are the
//! zero, reference-load and sky-reference calibration rows; the rest are
//! on-source integrations. Each line has three leading tokens followed by `W`
//! channel values, which fill slot `j`'s slice `[W*j, W*(j+1))`.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, warn};
use ndarray::prelude::*;

use super::{parse_number, IngestError};
use crate::{
    config::SchemaError,
    constants::{NUM_CAL_ROWS, NUM_DUMP_LEADING_TOKENS},
    PROGRESS_BARS,
};

/// The four streams of a SAM45 log. Buffers are zero-initialised, so if the
/// dump was short, trailing entries are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStreams {
    /// `M*W` zero-offset readings.
    pub zero: Array1<f64>,

    /// `M*W` reference-load (hot) readings.
    pub reference: Array1<f64>,

    /// `M*W` sky-reference readings.
    pub sky: Array1<f64>,

    /// `L × M*W` on-source readings.
    pub on: Array2<f64>,

    /// The number of in-use arrays (`M`).
    pub num_arrays: usize,

    /// The number of channels per array (`W`).
    pub scan_width: usize,

    /// The number of lines that went into the buffers.
    pub num_lines_consumed: usize,
}

impl RawStreams {
    pub fn new(num_arrays: usize, scan_width: usize, scan_length: usize) -> RawStreams {
        let n = num_arrays * scan_width;
        RawStreams {
            zero: Array1::zeros(n),
            reference: Array1::zeros(n),
            sky: Array1::zeros(n),
            on: Array2::zeros((scan_length, n)),
            num_arrays,
            scan_width,
            num_lines_consumed: 0,
        }
    }

    /// The number of on-source rows (`L`).
    pub fn scan_length(&self) -> usize {
        self.on.len_of(Axis(0))
    }

    /// `M*(L+3)`
    pub fn num_expected_lines(&self) -> usize {
        self.num_arrays * (self.scan_length() + NUM_CAL_ROWS)
    }

    /// Read dumped text from a file.
    pub fn read_file(
        path: &Path,
        num_arrays: usize,
        scan_width: usize,
        scan_length: usize,
    ) -> Result<RawStreams, IngestError> {
        debug!("Loading dumped SAM45 log {}", path.display());
        let f = BufReader::new(File::open(path)?);
        Self::read(f, num_arrays, scan_width, scan_length)
    }

    /// Demultiplex dumped text. Lines past `M*(L+3)` are ignored; a short
    /// dump is not an error, but it is warned about.
    pub fn read<R: BufRead>(
        reader: R,
        num_arrays: usize,
        scan_width: usize,
        scan_length: usize,
    ) -> Result<RawStreams, IngestError> {
        if num_arrays == 0 {
            return Err(SchemaError::InvalidValue {
                key: "ARRAY".to_string(),
                reason: "no arrays are in use".to_string(),
            }
            .into());
        }

        let mut streams = RawStreams::new(num_arrays, scan_width, scan_length);
        let num_expected = streams.num_expected_lines();

        let progress = ProgressBar::with_draw_target(
            Some(num_expected as _),
            if PROGRESS_BARS.load() {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:17}: [{wide_bar:.blue}] {pos:4}/{len:4} lines ({elapsed_precise}<{eta_precise})").unwrap()
                .progress_chars("=> "),
        )
        .with_position(0)
        .with_message("Demultiplexing");

        let mut num_ignored = 0;
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if i >= num_expected {
                num_ignored += 1;
                continue;
            }
            streams.insert_line(i, &line)?;
            streams.num_lines_consumed += 1;
            progress.inc(1);
        }
        progress.finish_and_clear();

        if num_ignored > 0 {
            debug!("Ignored {num_ignored} lines past the end of the scan");
        }
        if streams.num_lines_consumed < num_expected {
            warn!(
                "The dumped SAM45 log has {} lines, but {} were expected ({} arrays × ({} on-source + {} calibration rows)); the remaining samples are zero",
                streams.num_lines_consumed,
                num_expected,
                num_arrays,
                scan_length,
                NUM_CAL_ROWS
            );
        }

        Ok(streams)
    }

    fn insert_line(&mut self, i: usize, line: &str) -> Result<(), IngestError> {
        let (w, m) = (self.scan_width, self.num_arrays);
        let (row, slot) = (i / m, i % m);

        let data: Vec<&str> = line
            .split_whitespace()
            .skip(NUM_DUMP_LEADING_TOKENS)
            .collect();
        if data.len() != w {
            return Err(IngestError::LineWidth {
                line: i + 1,
                expected: w,
                got: data.len(),
            });
        }

        let mut target = match row {
            0 => self.zero.view_mut(),
            1 => self.reference.view_mut(),
            2 => self.sky.view_mut(),
            r => self.on.row_mut(r - NUM_CAL_ROWS),
        };
        let mut slice = target.slice_mut(s![w * slot..w * (slot + 1)]);
        for (out, token) in slice.iter_mut().zip(data) {
            *out = parse_number(token, "dumped SAM45 log", i + 1)?;
        }

        Ok(())
    }

    /// The streams of the `j`th in-use array: zero, reference, sky and
    /// on-source.
    pub fn slot(
        &self,
        j: usize,
    ) -> (
        ArrayView1<f64>,
        ArrayView1<f64>,
        ArrayView1<f64>,
        ArrayView2<f64>,
    ) {
        let (start, end) = (self.scan_width * j, self.scan_width * (j + 1));
        (
            self.zero.slice(s![start..end]),
            self.reference.slice(s![start..end]),
            self.sky.slice(s![start..end]),
            self.on.slice(s![.., start..end]),
        )
    }
}
