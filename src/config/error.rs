// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with decoding instrument configuration and parsing raw
//! log text.

use thiserror::Error;

/// A malformed token somewhere in a log or configuration entry. The affected
/// component is aborted; no partial record is kept.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Configuration entry '{entry}' isn't of the form KEY=value")]
    BadEntry { entry: String },

    #[error("Couldn't parse '{token}' as {expected} for configuration key {key}")]
    BadValue {
        key: String,
        token: String,
        expected: &'static str,
    },

    #[error("Configuration key {key} should have shape {shape:?} ({expected} values), but {got} values were given")]
    BadShape {
        key: String,
        shape: Vec<usize>,
        expected: usize,
        got: usize,
    },

    #[error("{file} line {line}: expected at least {expected} fields, but found {got}")]
    MissingFields {
        file: String,
        line: usize,
        expected: usize,
        got: usize,
    },

    #[error("{file} line {line}: couldn't parse '{token}' as a number")]
    BadNumber {
        file: String,
        line: usize,
        token: String,
    },

    #[error("Couldn't parse '{input}' as a timestamp")]
    Timestamp { input: String },

    #[error("{file} line {line}: couldn't parse '{input}' as a timestamp")]
    LogTimestamp {
        file: String,
        line: usize,
        input: String,
    },

    #[error("{file} line {line}: timestamp {time} doesn't come after the previous timestamp {previous}")]
    NonIncreasingTime {
        file: String,
        line: usize,
        time: String,
        previous: String,
    },

    #[error("Header card '{label}' isn't a recognised configuration label")]
    BadLabel { label: String },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

/// Something the pipeline needs from the configuration (or a container) isn't
/// there, or isn't the right kind of thing.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Configuration key {key} is required but wasn't found")]
    MissingKey { key: String },

    #[error("Configuration key {key} was expected to be {expected}, but it is {got}")]
    WrongType {
        key: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("Configuration key {key} has {got} values, but at least {expected} are needed")]
    TooShort {
        key: String,
        expected: usize,
        got: usize,
    },

    #[error("Configuration key {key} has an invalid value: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("'{label}' isn't a valid array label; expected A1 to A{max}")]
    BadArrayLabel { label: String, max: usize },

    #[error("Array {label} has an unrecognised sideband '{sideband}'; expected USB or LSB")]
    BadSideband { label: String, sideband: String },
}
