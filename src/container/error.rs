// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with building, reading and writing containers.

use thiserror::Error;

use crate::{
    config::{ParseError, SchemaError},
    io::fits::FitsError,
};

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("The container has no extension named {name}")]
    MissingExtension { name: String },

    #[error("The container already has an extension named {name}")]
    DuplicateExtension { name: String },

    #[error("Extension {extension} has no header card {key}")]
    MissingCard { extension: String, key: String },

    #[error("Header card {key} of extension {extension} should be {expected}")]
    CardType {
        extension: String,
        key: String,
        expected: &'static str,
    },

    #[error("Extension {name} isn't an image")]
    NotImage { name: String },

    #[error("Extension {name} isn't a table")]
    NotTable { name: String },

    #[error("Table {extension} has no column {column}")]
    MissingColumn { extension: String, column: String },

    #[error("Column {column} of table {extension} should be {expected}")]
    ColumnType {
        extension: String,
        column: String,
        expected: &'static str,
    },

    #[error("Column {column} of table {extension} has {got} rows, but the table has {expected}")]
    ColumnLength {
        extension: String,
        column: String,
        expected: usize,
        got: usize,
    },

    #[error("Text column {column} of table {extension} can hold {width} characters, but '{value}' is longer")]
    TextTooWide {
        extension: String,
        column: String,
        width: usize,
        value: String,
    },

    #[error("The primary extension can only hold header cards")]
    PrimaryPayload,

    #[error("Only the primary extension may be header-only, but {name} is")]
    HeaderOnly { name: String },

    #[error("Extension {name} has a {ndim}-dimensional image; only 2D images are supported")]
    ImageDimensions { name: String, ndim: usize },

    #[error(transparent)]
    Fits(#[from] FitsError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
