// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Instrument configuration.
//!
//! The SAM45 initialisation parameters arrive as `KEY=value1,value2,...`
//! strings (see [`ObsTable`]). Each key is decoded according to a fixed
//! table of element types and shapes; keys not in the table are skipped.

mod array;
mod error;
mod obstable;

pub use array::{ArrayElement, ArrayId, ArraySelection, Sideband};
pub use error::{ParseError, SchemaError};
pub use obstable::{KeyCategory, ObsTable, ObsTableEntry};

use std::collections::HashMap;

use indexmap::IndexMap;
use itertools::Itertools;
use log::trace;
use ndarray::{ArrayD, IxDyn};

/// The element type of a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Int,
    Float,
    Text,
}

/// The shape of a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// As many values as were given.
    Free,

    /// Exactly this shape.
    Fixed(&'static [usize]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySchema {
    pub dtype: ElementType,
    pub shape: Shape,
}

const CH_TABLE_SHAPE: &[usize] = &[32, 2];

lazy_static::lazy_static! {
    static ref SCHEMA: HashMap<&'static str, KeySchema> = {
        use ElementType::*;

        let free = |dtype| KeySchema { dtype, shape: Shape::Free };
        let table = |dtype| KeySchema { dtype, shape: Shape::Fixed(CH_TABLE_SHAPE) };
        [
            ("INTEG_TIME", free(Int)),
            ("CALB_INT", free(Int)),
            ("IPTIM", free(Float)),
            ("FREQ_INTVAL", free(Int)),
            ("VELO", free(Float)),
            ("MAP_POS", free(Int)),
            ("FREQ_SW", free(Int)),
            ("MULT_OFF", free(Float)),
            ("MULT_NUM", free(Int)),
            ("REF_NUM", free(Int)),
            ("REST_FREQ", free(Float)),
            ("OBS_FREQ", free(Float)),
            ("FREQ_IF1", free(Float)),
            ("OBS_BAND", free(Float)),
            ("ARRAY", free(Int)),
            ("IFATT", free(Int)),
            ("FQDAT_F0", free(Float)),
            ("FQDAT_FQ", free(Float)),
            ("FQDAT_CH", table(Int)),
            ("SRC_NAME", free(Text)),
            ("SRC_POS", free(Float)),
            ("SIDBD_TYP", free(Text)),
            ("CH_BAND", free(Int)),
            ("CH_RANGE", table(Int)),
            ("QL_RMSLIMIT", free(Float)),
            ("QL_POINTNUM", free(Int)),
            ("BIN_NUM", free(Int)),
            ("N_SPEC_WINDOW_SUB1", free(Int)),
            ("START_CHAN_SUB1", free(Int)),
            ("END_CHAN_SUB1", free(Int)),
            ("CHAN_AVG_SUB1", free(Int)),
            ("N_SPEC_WINDOW_SUB2", free(Int)),
            ("START_CHAN_SUB2", free(Int)),
            ("END_CHAN_SUB2", free(Int)),
            ("CHAN_AVG_SUB2", free(Int)),
        ]
        .into_iter()
        .collect()
    };
}

/// Get the type and shape of a configuration key, if it's known.
pub fn schema_lookup(key: &str) -> Option<KeySchema> {
    SCHEMA.get(key).copied()
}

/// A decoded configuration value. Values with exactly one element are always
/// stored as scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Int(i64),
    Float(f64),
    Text(String),
    IntArray(ArrayD<i64>),
    FloatArray(ArrayD<f64>),
    TextArray(Vec<String>),
}

impl ConfigValue {
    /// Decode the comma-separated value part of a configuration entry.
    pub fn decode(key: &str, raw: &str, schema: KeySchema) -> Result<ConfigValue, ParseError> {
        let tokens: Vec<&str> = raw.split(',').map(str::trim).collect();

        let shape: Vec<usize> = match schema.shape {
            Shape::Free => vec![tokens.len()],
            Shape::Fixed(shape) => {
                let expected = shape.iter().product();
                if tokens.len() != expected {
                    return Err(ParseError::BadShape {
                        key: key.to_string(),
                        shape: shape.to_vec(),
                        expected,
                        got: tokens.len(),
                    });
                }
                shape.to_vec()
            }
        };

        let value = match schema.dtype {
            ElementType::Int => {
                let values = tokens
                    .iter()
                    .map(|t| {
                        t.parse::<i64>().map_err(|_| ParseError::BadValue {
                            key: key.to_string(),
                            token: t.to_string(),
                            expected: "an integer",
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if values.len() == 1 {
                    ConfigValue::Int(values[0])
                } else {
                    ConfigValue::IntArray(reshape(key, values, &shape)?)
                }
            }

            ElementType::Float => {
                let values = tokens
                    .iter()
                    .map(|t| {
                        t.parse::<f64>().map_err(|_| ParseError::BadValue {
                            key: key.to_string(),
                            token: t.to_string(),
                            expected: "a float",
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if values.len() == 1 {
                    ConfigValue::Float(values[0])
                } else {
                    ConfigValue::FloatArray(reshape(key, values, &shape)?)
                }
            }

            ElementType::Text => {
                let mut values: Vec<String> = tokens
                    .iter()
                    .map(|t| t.trim_matches(|c| c == '\'' || c == '"').to_string())
                    .collect();
                if values.len() == 1 {
                    ConfigValue::Text(values.remove(0))
                } else {
                    ConfigValue::TextArray(values)
                }
            }
        };

        Ok(value)
    }

    /// The inverse of [`ConfigValue::decode`]; values are joined with commas
    /// in row-major order.
    pub fn to_raw_string(&self) -> String {
        match self {
            ConfigValue::Int(v) => v.to_string(),
            ConfigValue::Float(v) => v.to_string(),
            ConfigValue::Text(v) => v.clone(),
            ConfigValue::IntArray(a) => a.iter().join(","),
            ConfigValue::FloatArray(a) => a.iter().join(","),
            ConfigValue::TextArray(v) => v.join(","),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Int(_) => "an integer",
            ConfigValue::Float(_) => "a float",
            ConfigValue::Text(_) => "text",
            ConfigValue::IntArray(_) => "an integer array",
            ConfigValue::FloatArray(_) => "a float array",
            ConfigValue::TextArray(_) => "a text array",
        }
    }
}

fn reshape<T>(key: &str, values: Vec<T>, shape: &[usize]) -> Result<ArrayD<T>, ParseError> {
    let got = values.len();
    ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|_| ParseError::BadShape {
        key: key.to_string(),
        shape: shape.to_vec(),
        expected: shape.iter().product(),
        got,
    })
}

/// The decoded SAM45 configuration. Created once, immutable thereafter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstrumentConfig {
    values: IndexMap<String, ConfigValue>,
}

impl InstrumentConfig {
    /// Decode `KEY=value1,value2,...` entries. Keys that aren't in the schema
    /// table are skipped.
    pub fn decode<I, S>(entries: I) -> Result<InstrumentConfig, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values = IndexMap::new();
        for entry in entries {
            let entry = entry.as_ref();
            let (key, raw) = entry.split_once('=').ok_or_else(|| ParseError::BadEntry {
                entry: entry.to_string(),
            })?;
            let key = key.trim();
            match schema_lookup(key) {
                Some(schema) => {
                    let value = ConfigValue::decode(key, raw, schema)?;
                    values.insert(key.to_string(), value);
                }
                None => trace!("Skipping unknown configuration key {key}"),
            }
        }

        Ok(InstrumentConfig { values })
    }

    /// Decode the SAM45 entries of an obstable.
    pub fn from_obstable(obstable: &ObsTable) -> Result<InstrumentConfig, ParseError> {
        Self::decode(
            obstable
                .entries
                .iter()
                .filter(|e| e.category == KeyCategory::Sam)
                .map(|e| e.item()),
        )
    }

    /// Serialise back into `KEY=value1,value2,...` entries.
    pub fn to_entries(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|(k, v)| format!("{k}={}", v.to_raw_string()))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn require(&self, key: &str) -> Result<&ConfigValue, SchemaError> {
        self.values.get(key).ok_or_else(|| SchemaError::MissingKey {
            key: key.to_string(),
        })
    }

    pub fn get_int(&self, key: &str) -> Result<i64, SchemaError> {
        match self.require(key)? {
            ConfigValue::Int(v) => Ok(*v),
            other => Err(SchemaError::WrongType {
                key: key.to_string(),
                expected: "an integer",
                got: other.type_name(),
            }),
        }
    }

    /// Integers are promoted.
    pub fn get_float(&self, key: &str) -> Result<f64, SchemaError> {
        match self.require(key)? {
            ConfigValue::Float(v) => Ok(*v),
            ConfigValue::Int(v) => Ok(*v as f64),
            other => Err(SchemaError::WrongType {
                key: key.to_string(),
                expected: "a float",
                got: other.type_name(),
            }),
        }
    }

    pub fn get_text(&self, key: &str) -> Result<&str, SchemaError> {
        match self.require(key)? {
            ConfigValue::Text(v) => Ok(v),
            other => Err(SchemaError::WrongType {
                key: key.to_string(),
                expected: "text",
                got: other.type_name(),
            }),
        }
    }

    /// Get all values of an integer key in row-major order. Scalars become
    /// single-element vectors.
    pub fn get_int_vec(&self, key: &str) -> Result<Vec<i64>, SchemaError> {
        match self.require(key)? {
            ConfigValue::Int(v) => Ok(vec![*v]),
            ConfigValue::IntArray(a) => Ok(a.iter().copied().collect()),
            other => Err(SchemaError::WrongType {
                key: key.to_string(),
                expected: "integers",
                got: other.type_name(),
            }),
        }
    }

    /// Get all values of a numeric key in row-major order. Scalars become
    /// single-element vectors and integers are promoted.
    pub fn get_float_vec(&self, key: &str) -> Result<Vec<f64>, SchemaError> {
        match self.require(key)? {
            ConfigValue::Float(v) => Ok(vec![*v]),
            ConfigValue::Int(v) => Ok(vec![*v as f64]),
            ConfigValue::FloatArray(a) => Ok(a.iter().copied().collect()),
            ConfigValue::IntArray(a) => Ok(a.iter().map(|&v| v as f64).collect()),
            other => Err(SchemaError::WrongType {
                key: key.to_string(),
                expected: "floats",
                got: other.type_name(),
            }),
        }
    }

    pub fn get_text_vec(&self, key: &str) -> Result<Vec<String>, SchemaError> {
        match self.require(key)? {
            ConfigValue::Text(v) => Ok(vec![v.clone()]),
            ConfigValue::TextArray(v) => Ok(v.clone()),
            other => Err(SchemaError::WrongType {
                key: key.to_string(),
                expected: "text",
                got: other.type_name(),
            }),
        }
    }

    /// The number of channels reserved per array in the spectrometer dump;
    /// the largest value in `CH_RANGE`.
    pub fn scan_width(&self) -> Result<usize, SchemaError> {
        let max = self
            .get_int_vec("CH_RANGE")?
            .into_iter()
            .max()
            .unwrap_or(0);
        if max <= 0 {
            return Err(SchemaError::InvalidValue {
                key: "CH_RANGE".to_string(),
                reason: format!("the largest channel is {max}"),
            });
        }
        Ok(max as usize)
    }

    /// The number of on-source integrations; `INTEG_TIME / IPTIM`, truncated.
    pub fn scan_length(&self) -> Result<usize, SchemaError> {
        let integ_time = self.get_float("INTEG_TIME")?;
        let iptim = self.get_float("IPTIM")?;
        if iptim <= 0.0 || !iptim.is_finite() {
            return Err(SchemaError::InvalidValue {
                key: "IPTIM".to_string(),
                reason: format!("{iptim} isn't a positive period"),
            });
        }
        // Plain truncation; e.g. 33 / 1.1 = 29.999999999999996 gives 29.
        let len = (integ_time / iptim).trunc();
        if integ_time < 0.0 {
            return Err(SchemaError::InvalidValue {
                key: "INTEG_TIME".to_string(),
                reason: format!("{integ_time} is negative"),
            });
        }
        Ok(len as usize)
    }

    /// The integration period of one on-source row [s].
    pub fn iptim(&self) -> Result<f64, SchemaError> {
        self.get_float("IPTIM")
    }

    /// The geometry of every physical array described by `ARRAY`.
    pub fn arrays(&self) -> Result<Vec<ArrayElement>, SchemaError> {
        array::arrays_from_config(self)
    }
}
