// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Chopper-wheel calibration of SAM45 streams.
//!
//! For every channel, the system noise temperature is
//!
//! `Tsys = Tamb / (10^(0.1 att) (ref - zero) / (sky - zero) - 1)`
//!
//! where `att` is the IF attenuation of the channel's array [dB]. How the
//! on-source counts are treated is selected with a [`CalibrationStrategy`].

#[cfg(test)]
mod tests;

use itertools::Itertools;
use log::debug;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    config::{ArrayElement, ArraySelection, SchemaError, Sideband},
    io::read::RawStreams,
};

lazy_static::lazy_static! {
    pub(crate) static ref CALIBRATION_STRATEGIES: String = {
        use strum::IntoEnumIterator;
        CalibrationStrategy::iter().join(", ")
    };
}

/// What to do with the on-source counts.
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
pub enum CalibrationStrategy {
    /// Counts are stored as they are.
    #[default]
    #[strum(serialize = "raw")]
    Raw,

    /// `on - zero`
    #[strum(serialize = "zero-subtracted")]
    ZeroSubtracted,

    /// `Tamb (on - median_t(on)) / (10^(0.1 att) (ref - zero) - (sky - zero))`,
    /// where the median is taken over time for each channel.
    #[strum(serialize = "chopper-wheel")]
    ChopperWheel,
}

/// The calibrated scan of one array element. Channels of lower-sideband
/// elements have been reversed.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedScan {
    pub element: ArrayElement,

    /// `[time][channel]`
    pub scan: Array2<f64>,

    /// One system temperature per channel [K].
    pub tsys: Array1<f64>,

    /// The ambient temperature used [K].
    pub tamb: f64,

    pub strategy: CalibrationStrategy,
}

/// The attenuation factor `10^(0.1 att)`.
fn attenuation_factor(att_db: f64) -> f64 {
    10f64.powf(0.1 * att_db)
}

/// Per-channel system noise temperature [K].
pub fn tsys(
    zero: ArrayView1<f64>,
    reference: ArrayView1<f64>,
    sky: ArrayView1<f64>,
    att_db: f64,
    tamb: f64,
) -> Array1<f64> {
    let factor = attenuation_factor(att_db);
    let mut out = Array1::zeros(zero.len());
    azip!((o in &mut out, &z in &zero, &r in &reference, &s in &sky) {
        *o = tamb / (factor * (r - z) / (s - z) - 1.0);
    });
    out
}

/// Apply a [`CalibrationStrategy`] to on-source counts (`[time][channel]`).
pub fn calibrate_on_source(
    on: ArrayView2<f64>,
    zero: ArrayView1<f64>,
    reference: ArrayView1<f64>,
    sky: ArrayView1<f64>,
    att_db: f64,
    tamb: f64,
    strategy: CalibrationStrategy,
) -> Array2<f64> {
    match strategy {
        CalibrationStrategy::Raw => on.to_owned(),

        CalibrationStrategy::ZeroSubtracted => &on - &zero,

        CalibrationStrategy::ChopperWheel => {
            let factor = attenuation_factor(att_db);
            let median = median_over_time(on);
            let mut out = on.to_owned();
            for mut row in out.rows_mut() {
                azip!((o in &mut row, &m in &median, &z in &zero, &r in &reference, &s in &sky) {
                    *o = tamb * (*o - m) / (factor * (r - z) - (s - z));
                });
            }
            out
        }
    }
}

/// The median of every column. Columns of an empty array are NaN.
fn median_over_time(on: ArrayView2<f64>) -> Array1<f64> {
    on.columns()
        .into_iter()
        .map(|col| {
            let sorted = col.iter().copied().sorted_by(f64::total_cmp).collect::<Vec<_>>();
            let n = sorted.len();
            match n {
                0 => f64::NAN,
                _ if n % 2 == 1 => sorted[n / 2],
                _ => 0.5 * (sorted[n / 2 - 1] + sorted[n / 2]),
            }
        })
        .collect()
}

/// Calibrate the selected arrays.
///
/// `arrays` are all of the physical arrays of the configuration; the `j`th
/// in-use array (in physical order) owns slot `j` of `streams`. Everything
/// about an array (attenuation, sideband) is taken from its physical entry.
pub fn calibrate(
    streams: &RawStreams,
    arrays: &[ArrayElement],
    selection: &ArraySelection,
    tamb: f64,
    strategy: CalibrationStrategy,
) -> Result<Vec<CalibratedScan>, SchemaError> {
    let in_use = arrays.iter().filter(|a| a.in_use).collect::<Vec<_>>();
    if in_use.len() != streams.num_arrays {
        return Err(SchemaError::InvalidValue {
            key: "ARRAY".to_string(),
            reason: format!(
                "{} arrays are in use, but the streams have {} slots",
                in_use.len(),
                streams.num_arrays
            ),
        });
    }
    let selected = selection.select(arrays);

    let mut scans = vec![];
    for (slot, element) in in_use.into_iter().enumerate() {
        if !selected.iter().any(|s| s.id == element.id) {
            continue;
        }
        debug!(
            "Calibrating {} (slot {slot}, {}, {} dB)",
            element.id, element.sideband, element.ifatt
        );

        let (zero, reference, sky, on) = streams.slot(slot);
        let mut tsys = tsys(zero, reference, sky, element.ifatt, tamb);
        let mut scan =
            calibrate_on_source(on, zero, reference, sky, element.ifatt, tamb, strategy);
        if element.sideband == Sideband::Lsb {
            let w = tsys.len();
            tsys = tsys.iter().rev().copied().collect();
            scan = Array2::from_shape_fn(scan.dim(), |(t, c)| scan[[t, w - 1 - c]]);
        }

        scans.push(CalibratedScan {
            element: element.clone(),
            scan,
            tsys,
            tamb,
            strategy,
        });
    }

    Ok(scans)
}
