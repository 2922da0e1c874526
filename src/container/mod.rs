// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The archival container of an observation.
//!
//! A container is an ordered list of named extensions, each with a header of
//! key-value cards and an (optional) payload. An ingested observation has, in
//! order:
//!
//! * `PRIMARY`: provenance (`ORGFILE`, `VERSION`) and every obstable entry as
//!   a `TAG-NNN` card;
//! * one image per array (`A1` to `A32`), `[time][channel]`;
//! * `FMLOLOG`: the FMLO log table;
//! * `ANTLOG`: the antenna log table.
//!
//! The pipeline works against this in-memory model; [`Container::read`] and
//! [`Container::write`] persist it as FITS.

mod assemble;
mod error;
mod fits;
#[cfg(test)]
mod tests;

pub use assemble::AssembleInputs;
pub(crate) use assemble::parse_tsys;
pub use error::ContainerError;

use indexmap::IndexMap;
use log::info;
use ndarray::prelude::*;

use crate::{
    config::{InstrumentConfig, ObsTable},
    constants::PRIMARY_EXTNAME,
    io::read::{AntLog, FmloLog},
};

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        HeaderValue::Text(s.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self {
        HeaderValue::Text(s)
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        HeaderValue::Int(v)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Float(v)
    }
}

impl std::fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeaderValue::Text(s) => write!(f, "'{s}'"),
            HeaderValue::Int(v) => write!(f, "{v}"),
            HeaderValue::Float(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCard {
    pub value: HeaderValue,
    pub comment: String,
}

/// Ordered header cards. Inserting an existing key replaces its value but
/// keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: IndexMap<String, HeaderCard>,
}

impl Header {
    pub fn insert<K, V>(&mut self, key: K, value: V, comment: &str)
    where
        K: Into<String>,
        V: Into<HeaderValue>,
    {
        self.cards.insert(
            key.into(),
            HeaderCard {
                value: value.into(),
                comment: comment.to_string(),
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<&HeaderCard> {
        self.cards.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HeaderCard)> {
        self.cards.iter()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Cells of a table column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Fixed-width text.
    Text { width: usize, values: Vec<String> },

    Float(Vec<f64>),

    FloatPair(Vec<[f64; 2]>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Text { values, .. } => values.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::FloatPair(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub unit: Option<String>,
    pub data: ColumnData,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Header-only.
    Empty,

    /// `[row][column]`, i.e. `[NAXIS2][NAXIS1]`.
    Image(Array2<f64>),

    Table(Table),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extension {
    pub name: String,
    pub header: Header,
    pub payload: Payload,
}

impl Extension {
    pub fn new(name: &str, payload: Payload) -> Extension {
        Extension {
            name: name.to_string(),
            header: Header::default(),
            payload,
        }
    }

    fn card(&self, key: &str) -> Result<&HeaderCard, ContainerError> {
        self.header
            .get(key)
            .ok_or_else(|| ContainerError::MissingCard {
                extension: self.name.clone(),
                key: key.to_string(),
            })
    }

    pub fn get_text(&self, key: &str) -> Result<&str, ContainerError> {
        match &self.card(key)?.value {
            HeaderValue::Text(s) => Ok(s),
            _ => Err(ContainerError::CardType {
                extension: self.name.clone(),
                key: key.to_string(),
                expected: "text",
            }),
        }
    }

    /// Integers are promoted.
    pub fn get_float(&self, key: &str) -> Result<f64, ContainerError> {
        match &self.card(key)?.value {
            HeaderValue::Float(v) => Ok(*v),
            HeaderValue::Int(v) => Ok(*v as f64),
            _ => Err(ContainerError::CardType {
                extension: self.name.clone(),
                key: key.to_string(),
                expected: "a number",
            }),
        }
    }

    pub fn image(&self) -> Result<&Array2<f64>, ContainerError> {
        match &self.payload {
            Payload::Image(a) => Ok(a),
            _ => Err(ContainerError::NotImage {
                name: self.name.clone(),
            }),
        }
    }

    pub fn table(&self) -> Result<&Table, ContainerError> {
        match &self.payload {
            Payload::Table(t) => Ok(t),
            _ => Err(ContainerError::NotTable {
                name: self.name.clone(),
            }),
        }
    }

    /// The data of a table column.
    pub fn column(&self, name: &str) -> Result<&ColumnData, ContainerError> {
        self.table()?
            .column(name)
            .map(|c| &c.data)
            .ok_or_else(|| ContainerError::MissingColumn {
                extension: self.name.clone(),
                column: name.to_string(),
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    pub extensions: Vec<Extension>,
}

impl Container {
    /// Add an extension to the end. Names must be unique.
    pub fn push(&mut self, extension: Extension) -> Result<(), ContainerError> {
        if self.get(&extension.name).is_some() {
            return Err(ContainerError::DuplicateExtension {
                name: extension.name,
            });
        }
        self.extensions.push(extension);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Extension> {
        self.extensions.iter().find(|e| e.name == name)
    }

    pub fn extension(&self, name: &str) -> Result<&Extension, ContainerError> {
        self.get(name)
            .ok_or_else(|| ContainerError::MissingExtension {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(|e| e.name.as_str())
    }

    pub fn primary(&self) -> Result<&Extension, ContainerError> {
        self.extension(PRIMARY_EXTNAME)
    }

    /// The layout version this container was written with.
    pub fn version(&self) -> Result<&str, ContainerError> {
        self.primary()?.get_text("VERSION")
    }

    /// Rebuild the obstable from the `TAG-NNN` cards of the primary segment.
    pub fn obstable(&self) -> Result<ObsTable, ContainerError> {
        let primary = self.primary()?;
        let filename = primary.get_text("ORGFILE").unwrap_or_default().to_string();
        let mut cards = vec![];
        for (key, card) in primary.header.iter() {
            if !ObsTable::is_label(key) {
                continue;
            }
            match &card.value {
                HeaderValue::Text(item) => cards.push((key.as_str(), item.as_str())),
                _ => {
                    return Err(ContainerError::CardType {
                        extension: primary.name.clone(),
                        key: key.clone(),
                        expected: "text",
                    })
                }
            }
        }
        Ok(ObsTable::from_labelled(filename, cards)?)
    }

    /// Decode the instrument configuration stored in the primary segment.
    pub fn config(&self) -> Result<InstrumentConfig, ContainerError> {
        Ok(InstrumentConfig::from_obstable(&self.obstable()?)?)
    }

    /// Read the FMLO log back out of its table.
    pub fn fmlolog(&self) -> Result<FmloLog, ContainerError> {
        assemble::fmlolog_from_extension(self.extension(crate::constants::FMLOLOG_EXTNAME)?)
    }

    /// Read the antenna log back out of its table.
    pub fn antlog(&self) -> Result<AntLog, ContainerError> {
        assemble::antlog_from_extension(self.extension(crate::constants::ANTLOG_EXTNAME)?)
    }

    /// Log a summary of every extension.
    pub fn info(&self) {
        info!("No.  Name      Type    Cards  Dimensions");
        for (i, ext) in self.extensions.iter().enumerate() {
            let (kind, dims) = match &ext.payload {
                Payload::Empty => ("Header", String::new()),
                Payload::Image(a) => ("Image", format!("{} × {} (time × channel)", a.nrows(), a.ncols())),
                Payload::Table(t) => (
                    "Table",
                    format!("{} rows × {} columns", t.num_rows(), t.columns.len()),
                ),
            };
            info!(
                "{i:<4} {:<9} {kind:<7} {:<6} {dims}",
                ext.name,
                ext.header.len()
            );
        }
    }
}
