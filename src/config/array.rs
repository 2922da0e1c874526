// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! SAM45 array elements ("arrays").

use std::{fmt, str::FromStr};

use log::warn;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};

use super::{InstrumentConfig, SchemaError};
use crate::constants::MAX_NUM_ARRAYS;

/// The physical (0-based) index of an array element. Displayed as `A{n+1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArrayId(usize);

impl ArrayId {
    pub fn from_index(index: usize) -> Result<ArrayId, SchemaError> {
        if index >= MAX_NUM_ARRAYS {
            return Err(SchemaError::BadArrayLabel {
                label: format!("A{}", index + 1),
                max: MAX_NUM_ARRAYS,
            });
        }
        Ok(ArrayId(index))
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ArrayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}", self.0 + 1)
    }
}

impl FromStr for ArrayId {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || SchemaError::BadArrayLabel {
            label: s.to_string(),
            max: MAX_NUM_ARRAYS,
        };
        let s = s.trim();
        let n: usize = s
            .strip_prefix('A')
            .or_else(|| s.strip_prefix('a'))
            .ok_or_else(bad)?
            .parse()
            .map_err(|_| bad())?;
        if n == 0 || n > MAX_NUM_ARRAYS {
            return Err(bad());
        }
        Ok(ArrayId(n - 1))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
pub enum Sideband {
    #[strum(serialize = "USB")]
    #[serde(rename = "USB")]
    Usb,

    #[strum(serialize = "LSB")]
    #[serde(rename = "LSB")]
    Lsb,
}

/// Everything the pipeline needs to know about one physical array element.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayElement {
    pub id: ArrayId,

    pub in_use: bool,

    /// The first and last channels of this element, as configured in
    /// `CH_RANGE`.
    pub ch_range: [i64; 2],

    /// IF attenuation [dB].
    pub ifatt: f64,

    pub sideband: Sideband,

    /// [Hz]
    pub rest_freq: f64,

    /// [Hz]
    pub bandwidth: f64,
}

/// Which array elements should be used.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ArraySelection {
    /// Every in-use element.
    #[default]
    All,

    Ids(Vec<ArrayId>),
}

impl ArraySelection {
    /// Parse user input. "all" (case insensitive) or an empty list selects
    /// everything.
    pub fn parse<S: AsRef<str>>(labels: &[S]) -> Result<ArraySelection, SchemaError> {
        if labels.is_empty()
            || (labels.len() == 1 && labels[0].as_ref().trim().eq_ignore_ascii_case("all"))
        {
            return Ok(ArraySelection::All);
        }
        let mut ids = labels
            .iter()
            .map(|l| l.as_ref().parse())
            .collect::<Result<Vec<ArrayId>, _>>()?;
        ids.sort_unstable();
        ids.dedup();
        Ok(ArraySelection::Ids(ids))
    }

    /// Select from the given elements. The result is in physical order and
    /// only contains in-use elements; requested elements that aren't in use
    /// are skipped with a warning.
    pub fn select<'a>(&self, elements: &'a [ArrayElement]) -> Vec<&'a ArrayElement> {
        match self {
            ArraySelection::All => elements.iter().filter(|e| e.in_use).collect(),
            ArraySelection::Ids(ids) => {
                for id in ids {
                    if !elements.iter().any(|e| e.id == *id && e.in_use) {
                        warn!("Array {id} was requested but isn't in use; skipping it");
                    }
                }
                elements
                    .iter()
                    .filter(|e| e.in_use && ids.contains(&e.id))
                    .collect()
            }
        }
    }
}

/// Get a per-element value, complaining if the key has fewer values than
/// there are elements.
fn per_element<T: Clone>(key: &str, values: &[T], n: usize) -> Result<Vec<T>, SchemaError> {
    if values.len() < n {
        return Err(SchemaError::TooShort {
            key: key.to_string(),
            expected: n,
            got: values.len(),
        });
    }
    Ok(values[..n].to_vec())
}

pub(crate) fn arrays_from_config(
    config: &InstrumentConfig,
) -> Result<Vec<ArrayElement>, SchemaError> {
    let array = config.get_int_vec("ARRAY")?;
    let n = array.len();
    if n > MAX_NUM_ARRAYS {
        return Err(SchemaError::InvalidValue {
            key: "ARRAY".to_string(),
            reason: format!("{n} elements were given, but there are only {MAX_NUM_ARRAYS}"),
        });
    }

    let ch_range = config.get_int_vec("CH_RANGE")?;
    let ch_range = per_element("CH_RANGE", &ch_range, 2 * n)?;
    let ifatt = per_element("IFATT", &config.get_float_vec("IFATT")?, n)?;
    let sidebands = per_element("SIDBD_TYP", &config.get_text_vec("SIDBD_TYP")?, n)?;
    let rest_freq = per_element("REST_FREQ", &config.get_float_vec("REST_FREQ")?, n)?;
    let bandwidth = per_element("OBS_BAND", &config.get_float_vec("OBS_BAND")?, n)?;

    let mut elements = Vec::with_capacity(n);
    for (i, &flag) in array.iter().enumerate() {
        let id = ArrayId(i);
        let in_use = flag == 1;
        let sideband = match sidebands[i].trim().parse() {
            Ok(sb) => sb,
            // Nothing reads the sideband of an unused element.
            Err(_) if !in_use => Sideband::Usb,
            Err(_) => {
                return Err(SchemaError::BadSideband {
                    label: id.to_string(),
                    sideband: sidebands[i].clone(),
                })
            }
        };
        elements.push(ArrayElement {
            id,
            in_use,
            ch_range: [ch_range[2 * i], ch_range[2 * i + 1]],
            ifatt: ifatt[i],
            sideband,
            rest_freq: rest_freq[i],
            bandwidth: bandwidth[i],
        });
    }

    Ok(elements)
}
