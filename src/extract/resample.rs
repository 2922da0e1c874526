// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Aligning the antenna log with scan rows.
//!
//! The antenna log is first restricted to the time span of the scan rows. It
//! is then put onto a regular grid (100 ms bins anchored at the first scan
//! row's time, floored to 100 ms), and each scan row takes the value of the
//! bin containing it.

use hifitime::Epoch;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{constants::RESAMPLE_INTERVAL_MS, io::read::AntLog, time::floor_to_millis};

lazy_static::lazy_static! {
    pub(crate) static ref RESAMPLE_METHODS: String = {
        use strum::IntoEnumIterator;
        ResampleMethod::iter().join(", ")
    };
}

const BIN_NS: i128 = RESAMPLE_INTERVAL_MS as i128 * 1_000_000;

/// How antenna-log samples are turned into one value per grid bin.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleMethod {
    /// The component-wise maximum of the samples in the bin; NaN for empty
    /// bins.
    #[default]
    #[strum(serialize = "max")]
    Max,

    /// Linear interpolation in time at the start of the bin; NaN outside the
    /// sampled span.
    #[strum(serialize = "interpolate")]
    Interpolate,

    /// The sample nearest to the start of the bin.
    #[strum(serialize = "nearest")]
    Nearest,
}

/// An antenna-log sample, with its time relative to the grid origin.
struct Sample {
    ns: i128,
    radec: [f64; 2],
}

/// One RA/Dec pair per entry of `times`, which must be non-decreasing.
pub(crate) fn pointing_for_rows(
    antlog: &AntLog,
    times: &[Epoch],
    method: ResampleMethod,
) -> Vec<[f64; 2]> {
    let (t_min, t_max) = match (times.first(), times.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return vec![],
    };
    let origin = floor_to_millis(t_min, RESAMPLE_INTERVAL_MS);
    let samples = antlog
        .rows
        .iter()
        .filter(|r| r.time >= t_min && r.time <= t_max)
        .map(|r| Sample {
            ns: (r.time - origin).total_nanoseconds(),
            radec: r.radec,
        })
        .sorted_by_key(|s| s.ns)
        .collect::<Vec<_>>();

    times
        .iter()
        .map(|&t| {
            let ns = (t - origin).total_nanoseconds();
            let bin_start = ns.div_euclid(BIN_NS) * BIN_NS;
            match method {
                ResampleMethod::Max => bin_max(&samples, bin_start),
                ResampleMethod::Interpolate => interpolate(&samples, bin_start),
                ResampleMethod::Nearest => nearest(&samples, bin_start),
            }
        })
        .collect()
}

fn bin_max(samples: &[Sample], bin_start: i128) -> [f64; 2] {
    samples
        .iter()
        .filter(|s| s.ns >= bin_start && s.ns < bin_start + BIN_NS)
        .fold([f64::NAN; 2], |acc, s| {
            // f64::max ignores NaN, so the first sample replaces the seed.
            [acc[0].max(s.radec[0]), acc[1].max(s.radec[1])]
        })
}

fn interpolate(samples: &[Sample], at: i128) -> [f64; 2] {
    let after = samples.partition_point(|s| s.ns < at);
    if let Some(s) = samples.get(after) {
        if s.ns == at {
            return s.radec;
        }
    }
    if after == 0 || after == samples.len() {
        return [f64::NAN; 2];
    }
    let (a, b) = (&samples[after - 1], &samples[after]);
    let frac = (at - a.ns) as f64 / (b.ns - a.ns) as f64;
    [
        a.radec[0] + frac * (b.radec[0] - a.radec[0]),
        a.radec[1] + frac * (b.radec[1] - a.radec[1]),
    ]
}

fn nearest(samples: &[Sample], at: i128) -> [f64; 2] {
    samples
        .iter()
        .min_by_key(|s| (s.ns - at).abs())
        .map(|s| s.radec)
        .unwrap_or([f64::NAN; 2])
}
