// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all errors coming out of the binary. This should be the
//! *only* error enum that is publicly visible from `cli`.

use thiserror::Error;

use super::{extract::ExtractArgsError, ingest::IngestArgsError, psw::PswArgsError};
use crate::{
    config::{ParseError, SchemaError},
    container::ContainerError,
    extract::ExtractionError,
    io::{fits::FitsError, read::IngestError},
    params::{ExtractError, IngestRunError},
    psw::PswError,
};

/// Every error is categorised, so the user has some idea of where to look.
#[derive(Error, Debug)]
pub enum FmloError {
    /// A problem with the observation's configuration (the obstable and what
    /// was decoded from it).
    #[error("{0}\n\nThe observation table couldn't be used; check that it belongs to this observation.")]
    Config(String),

    /// A problem reading the raw logs.
    #[error("{0}")]
    Ingest(String),

    /// A problem with the assembled container.
    #[error("{0}\n\nWas this container written by nro-fmlo ingest?")]
    Container(String),

    /// A problem extracting a scan.
    #[error("{0}")]
    Extract(String),

    /// A problem with a position-switch spectrum.
    #[error("{0}")]
    Psw(String),

    /// An error related to argument files.
    #[error("{0}\n\nArgument files use the same names as the long command-line flags, with underscores instead of dashes.")]
    ArgFile(String),

    /// A cfitsio error. Because these are usually quite spartan, some
    /// suggestions are provided here.
    #[error("cfitsio error: {0}\n\nIf you don't know what this means, try turning up verbosity (-v or -vv) and maybe disabling progress bars.")]
    Cfitsio(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

// Binary sub-command errors.

impl From<IngestArgsError> for FmloError {
    fn from(e: IngestArgsError) -> Self {
        let s = e.to_string();
        match e {
            IngestArgsError::NoInput { .. }
            | IngestArgsError::DoesntExist { .. }
            | IngestArgsError::BadCalibration { .. }
            | IngestArgsError::BadTamb { .. }
            | IngestArgsError::BadTimeout { .. } => Self::Ingest(s),
            IngestArgsError::Schema(e) => Self::from(e),
        }
    }
}

impl From<ExtractArgsError> for FmloError {
    fn from(e: ExtractArgsError) -> Self {
        let s = e.to_string();
        match e {
            ExtractArgsError::NoContainer
            | ExtractArgsError::BadResample { .. }
            | ExtractArgsError::BadOutputType { .. } => Self::Extract(s),
        }
    }
}

impl From<PswArgsError> for FmloError {
    fn from(e: PswArgsError) -> Self {
        let s = e.to_string();
        match e {
            PswArgsError::NoInput | PswArgsError::BadSideband { .. } => Self::Psw(s),
        }
    }
}

impl From<IngestRunError> for FmloError {
    fn from(e: IngestRunError) -> Self {
        match e {
            IngestRunError::Ingest(e) => Self::from(e),
            IngestRunError::Parse(e) => Self::from(e),
            IngestRunError::Schema(e) => Self::from(e),
            IngestRunError::Container(e) => Self::from(e),
        }
    }
}

impl From<ExtractError> for FmloError {
    fn from(e: ExtractError) -> Self {
        let s = e.to_string();
        match e {
            ExtractError::NoArrays { .. } => Self::Extract(s),
            ExtractError::Extraction(e) => Self::from(e),
            ExtractError::Container(e) => Self::from(e),
            ExtractError::IO(e) => Self::from(e),
        }
    }
}

// Library code errors.

impl From<ParseError> for FmloError {
    fn from(e: ParseError) -> Self {
        let s = e.to_string();
        match e {
            ParseError::BadEntry { .. }
            | ParseError::BadValue { .. }
            | ParseError::BadShape { .. }
            | ParseError::BadLabel { .. } => Self::Config(s),
            ParseError::MissingFields { .. }
            | ParseError::BadNumber { .. }
            | ParseError::Timestamp { .. }
            | ParseError::LogTimestamp { .. }
            | ParseError::NonIncreasingTime { .. } => Self::Ingest(s),
            ParseError::IO(e) => Self::from(e),
        }
    }
}

impl From<SchemaError> for FmloError {
    fn from(e: SchemaError) -> Self {
        let s = e.to_string();
        match e {
            SchemaError::MissingKey { .. }
            | SchemaError::WrongType { .. }
            | SchemaError::TooShort { .. }
            | SchemaError::InvalidValue { .. }
            | SchemaError::BadSideband { .. } => Self::Config(s),
            SchemaError::BadArrayLabel { .. } => Self::Generic(s),
        }
    }
}

impl From<IngestError> for FmloError {
    fn from(e: IngestError) -> Self {
        let s = e.to_string();
        match e {
            IngestError::DumpSpawn { .. }
            | IngestError::DumpFailed { .. }
            | IngestError::DumpOutputMissing { .. }
            | IngestError::DumpTimeout { .. }
            | IngestError::LineWidth { .. }
            | IngestError::Scratch { .. } => Self::Ingest(s),
            IngestError::Parse(e) => Self::from(e),
            IngestError::Schema(e) => Self::from(e),
            IngestError::IO(e) => Self::from(e),
        }
    }
}

impl From<ContainerError> for FmloError {
    fn from(e: ContainerError) -> Self {
        let s = e.to_string();
        match e {
            ContainerError::MissingExtension { .. }
            | ContainerError::DuplicateExtension { .. }
            | ContainerError::MissingCard { .. }
            | ContainerError::CardType { .. }
            | ContainerError::NotImage { .. }
            | ContainerError::NotTable { .. }
            | ContainerError::MissingColumn { .. }
            | ContainerError::ColumnType { .. }
            | ContainerError::ColumnLength { .. }
            | ContainerError::TextTooWide { .. }
            | ContainerError::PrimaryPayload
            | ContainerError::HeaderOnly { .. }
            | ContainerError::ImageDimensions { .. } => Self::Container(s),
            ContainerError::Fits(e) => Self::from(e),
            ContainerError::Parse(e) => Self::from(e),
            ContainerError::Schema(e) => Self::from(e),
        }
    }
}

impl From<ExtractionError> for FmloError {
    fn from(e: ExtractionError) -> Self {
        let s = e.to_string();
        match e {
            ExtractionError::UnknownArray { .. }
            | ExtractionError::BadBinning { .. }
            | ExtractionError::BadCutedge { .. }
            | ExtractionError::TsysLength { .. }
            | ExtractionError::ChannelMismatch { .. }
            | ExtractionError::OffsetOutOfRange { .. }
            | ExtractionError::UnknownOutputFormat { .. } => Self::Extract(s),
            ExtractionError::Container(e) => Self::from(e),
            ExtractionError::Json(_) => Self::Generic(s),
            ExtractionError::IO(e) => Self::from(e),
        }
    }
}

impl From<PswError> for FmloError {
    fn from(e: PswError) -> Self {
        let s = e.to_string();
        match e {
            PswError::NoTable { .. }
            | PswError::NoRows { .. }
            | PswError::MissingColumn { .. }
            | PswError::DataLength { .. } => Self::Psw(s),
            PswError::Fits(e) => Self::from(e),
        }
    }
}

impl From<FitsError> for FmloError {
    fn from(e: FitsError) -> Self {
        Self::Cfitsio(e.to_string())
    }
}

impl From<std::io::Error> for FmloError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
