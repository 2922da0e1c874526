// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#[cfg(test)]
mod tests;

use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use itertools::Itertools;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vec1::Vec1;

use super::common::{display_warnings, InfoPrinter, Warn, ARG_FILE_HELP};
use crate::{
    extract::{ExtractOptions, ResampleMethod, RESAMPLE_METHODS},
    params::{all_labels, ExtractParams, ScanOutputType, SCAN_OUTPUT_EXTENSIONS},
    Container, FmloError,
};

lazy_static::lazy_static! {
    static ref RESAMPLE_HELP: String =
        format!("How the antenna log is resampled onto scan rows. Supported: {}. Default: {}", *RESAMPLE_METHODS, ResampleMethod::default());

    static ref OUTPUT_TYPE_HELP: String =
        format!("The file type of extracted scans. Supported: {}. Default: {}", *SCAN_OUTPUT_EXTENSIONS, ScanOutputType::default());
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct ExtractArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// The container written by "nro-fmlo ingest".
    #[clap(short, long, help_heading = "INPUT FILES")]
    pub(super) container: Option<PathBuf>,

    /// The arrays to extract, e.g. A1 A5. Default: every array in the
    /// container.
    #[clap(short, long, multiple_values(true), help_heading = "EXTRACTION")]
    pub(super) arrays: Option<Vec<String>>,

    /// Average this many adjacent channels together. Default: 1
    #[clap(long, help_heading = "EXTRACTION")]
    pub(super) binning: Option<usize>,

    /// Drop this many (binned) channels from each edge. Default: 0
    #[clap(long, help_heading = "EXTRACTION")]
    pub(super) cutedge: Option<usize>,

    /// The FMLO log row (after the calibration rows) that lines up with the
    /// first scan row. Default: 0
    #[clap(long, help_heading = "EXTRACTION")]
    pub(super) time_offset: Option<usize>,

    #[clap(long, help = RESAMPLE_HELP.as_str(), help_heading = "EXTRACTION")]
    pub(super) resample: Option<String>,

    /// The directory extracted scans are written to. Default: the current
    /// directory.
    #[clap(short = 'd', long, help_heading = "OUTPUT FILES")]
    pub(super) output_dir: Option<PathBuf>,

    #[clap(long, help = OUTPUT_TYPE_HELP.as_str(), help_heading = "OUTPUT FILES")]
    pub(super) output_type: Option<String>,
}

impl ExtractArgs {
    /// Merge the command-line arguments with those of an argument file,
    /// preferring the command line.
    pub(super) fn merge(self) -> Result<ExtractArgs, FmloError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            let ExtractArgs {
                args_file: _,
                container,
                arrays,
                binning,
                cutedge,
                time_offset,
                resample,
                output_dir,
                output_type,
            } = unpack_arg_file!(arg_file);

            Ok(ExtractArgs {
                args_file: None,
                container: cli_args.container.or(container),
                arrays: cli_args.arrays.or(arrays),
                binning: cli_args.binning.or(binning),
                cutedge: cli_args.cutedge.or(cutedge),
                time_offset: cli_args.time_offset.or(time_offset),
                resample: cli_args.resample.or(resample),
                output_dir: cli_args.output_dir.or(output_dir),
                output_type: cli_args.output_type.or(output_type),
            })
        } else {
            Ok(cli_args)
        }
    }

    /// Make parameters out of the arguments. The container has to be read to
    /// know which arrays it has, so it's handed back too.
    pub(super) fn parse(self) -> Result<(ExtractParams, Container), FmloError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            container: container_path,
            arrays,
            binning,
            cutedge,
            time_offset,
            resample,
            output_dir,
            output_type,
        } = self;

        let container_path = container_path.ok_or(ExtractArgsError::NoContainer)?;
        let defaults = ExtractOptions::default();
        let options = ExtractOptions {
            binning: binning.unwrap_or(defaults.binning),
            cutedge: cutedge.unwrap_or(defaults.cutedge),
            time_offset: time_offset.unwrap_or(defaults.time_offset),
            resample: match resample {
                Some(s) => ResampleMethod::from_str(&s)
                    .map_err(|_| ExtractArgsError::BadResample { got: s })?,
                None => defaults.resample,
            },
        };
        let output_type = match output_type {
            Some(s) => ScanOutputType::from_str(&s.to_lowercase())
                .map_err(|_| ExtractArgsError::BadOutputType { got: s })?,
            None => ScanOutputType::default(),
        };

        let container = Container::read(&container_path)?;
        let arrays = arrays.unwrap_or_default();
        let requested = arrays
            .iter()
            .map(|a| a.trim().to_uppercase())
            .unique()
            .collect::<Vec<_>>();
        if requested.len() != arrays.len() {
            "Some arrays were requested more than once; each is only extracted once".warn();
        }
        let labels = match Vec1::try_from_vec(requested) {
            Ok(labels) => labels,
            Err(_) => all_labels(&container, &container_path)?,
        };

        let params = ExtractParams {
            container: container_path,
            labels,
            options,
            output_dir: output_dir.unwrap_or_else(|| PathBuf::from(".")),
            output_type,
        };

        let mut printer = InfoPrinter::new("Extraction".into());
        printer.push_line(format!("Container: {}", params.container.display()).into());
        printer.push_line(format!("Arrays: {}", params.labels.iter().join(" ")).into());
        printer.push_block(vec![
            format!("Binning: {}", options.binning).into(),
            format!("Edge channels cut: {}", options.cutedge).into(),
            format!("Time offset: {} rows", options.time_offset).into(),
            format!("Pointing resampled with: {}", options.resample).into(),
        ]);
        printer.push_line(
            format!(
                "Writing {} files to {}",
                params.output_type,
                params.output_dir.display()
            )
            .into(),
        );
        printer.display();
        display_warnings();

        Ok((params, container))
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), FmloError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let (params, container) = self.parse()?;

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        params.run_with(&container)?;
        Ok(())
    }
}

#[derive(Error, Debug)]
pub(super) enum ExtractArgsError {
    #[error("No container was supplied")]
    NoContainer,

    #[error("Unrecognised resample method '{got}'; supported: {}", *RESAMPLE_METHODS)]
    BadResample { got: String },

    #[error("Unrecognised output type '{got}'; supported: {}", *SCAN_OUTPUT_EXTENSIONS)]
    BadOutputType { got: String },
}
