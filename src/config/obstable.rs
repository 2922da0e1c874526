// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to read the observation table ("obstable"), the raw initialisation
//! log of an observation.
//!
//! Only `SET` lines for a handful of subsystems are kept, and only up to the
//! first line mentioning "Initialize". Each kept line is labelled
//! `TAG-NNN`, where `NNN` counts kept lines across all subsystems.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use log::debug;
use regex::Regex;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use super::ParseError;

lazy_static::lazy_static! {
    static ref LABEL_REGEX: Regex = Regex::new(r"^([A-Z]{3})-(\d{3,})$").unwrap();
}

/// The subsystem a `SET` line configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, IntoStaticStr)]
pub enum KeyCategory {
    #[strum(serialize = "SAM")]
    Sam,

    #[strum(serialize = "ANT")]
    Ant,

    #[strum(serialize = "MRG")]
    Mrg,

    #[strum(serialize = "RXT")]
    Rxt,

    #[strum(serialize = "ATT")]
    Att,

    #[strum(serialize = "GRP")]
    Grp,

    #[strum(serialize = "SYH")]
    Syh,

    #[strum(serialize = "SYE")]
    Sye,
}

impl KeyCategory {
    fn line_prefix(self) -> &'static str {
        match self {
            KeyCategory::Sam => "SET SAM45",
            KeyCategory::Ant => "SET ANT",
            KeyCategory::Mrg => "SET MRG",
            KeyCategory::Rxt => "SET RXT",
            KeyCategory::Att => "SET IFATT",
            KeyCategory::Grp => "SET GRPTRK",
            KeyCategory::Syh => "SET SYNTHE_H",
            KeyCategory::Sye => "SET SYNTHE_E",
        }
    }

    fn from_line(line: &str) -> Option<KeyCategory> {
        KeyCategory::iter().find(|c| line.starts_with(c.line_prefix()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObsTableEntry {
    pub category: KeyCategory,
    pub index: usize,
    pub key: String,
    pub value: String,
}

impl ObsTableEntry {
    /// e.g. "SAM-012"
    pub fn label(&self) -> String {
        format!("{}-{:03}", self.category, self.index)
    }

    /// e.g. "INTEG_TIME=20"
    pub fn item(&self) -> String {
        format!("{}={}", self.key, self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObsTable {
    /// The name of the file this table came from (without directories).
    pub filename: String,

    pub entries: Vec<ObsTableEntry>,
}

impl ObsTable {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<ObsTable, ParseError> {
        let path = path.as_ref();
        debug!("Reading obstable {}", path.display());
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let f = BufReader::new(File::open(path)?);
        Self::parse(f, filename)
    }

    pub fn parse<R: BufRead>(reader: R, filename: String) -> Result<ObsTable, ParseError> {
        let mut entries = vec![];
        for (i_line, line) in reader.lines().enumerate() {
            let line = line?;
            if line.contains("Initialize") {
                break;
            }
            let category = match KeyCategory::from_line(&line) {
                Some(c) => c,
                None => continue,
            };

            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 4 {
                return Err(ParseError::MissingFields {
                    file: filename,
                    line: i_line + 1,
                    expected: 4,
                    got: tokens.len(),
                });
            }
            entries.push(ObsTableEntry {
                category,
                index: entries.len(),
                key: tokens[2].to_string(),
                value: tokens[3]
                    .trim_matches(|c| c == '(' || c == '\'' || c == ')')
                    .to_string(),
            });
        }
        debug!("Kept {} obstable entries", entries.len());

        Ok(ObsTable { filename, entries })
    }

    /// Rebuild a table from `(label, "KEY=value")` pairs, e.g. the cards of a
    /// container's primary segment.
    pub fn from_labelled<I, L, S>(filename: String, cards: I) -> Result<ObsTable, ParseError>
    where
        I: IntoIterator<Item = (L, S)>,
        L: AsRef<str>,
        S: AsRef<str>,
    {
        let mut entries = vec![];
        for (label, item) in cards {
            let (label, item) = (label.as_ref(), item.as_ref());
            let bad_label = || ParseError::BadLabel {
                label: label.to_string(),
            };
            let caps = LABEL_REGEX.captures(label).ok_or_else(bad_label)?;
            let category: KeyCategory = caps[1].parse().map_err(|_| bad_label())?;
            let index: usize = caps[2].parse().map_err(|_| bad_label())?;
            let (key, value) = item.split_once('=').ok_or_else(|| ParseError::BadEntry {
                entry: item.to_string(),
            })?;
            entries.push(ObsTableEntry {
                category,
                index,
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        entries.sort_by_key(|e| e.index);

        Ok(ObsTable { filename, entries })
    }

    /// Is this header card name one that an obstable entry would use?
    pub fn is_label(name: &str) -> bool {
        LABEL_REGEX
            .captures(name)
            .map(|caps| caps[1].parse::<KeyCategory>().is_ok())
            .unwrap_or(false)
    }
}
