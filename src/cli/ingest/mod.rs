// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#[cfg(test)]
mod tests;

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use itertools::Itertools;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::common::{display_warnings, InfoPrinter, Warn, ARG_FILE_HELP};
use crate::{
    calibrate::{CalibrationStrategy, CALIBRATION_STRATEGIES},
    config::{ArraySelection, SchemaError},
    constants::{DEFAULT_DUMP_TOOL, DEFAULT_TAMB},
    io::read::DumpTool,
    params::IngestParams,
    FmloError,
};

const DEFAULT_OUTPUT: &str = "fmlo.fits";

lazy_static::lazy_static! {
    static ref CALIBRATION_HELP: String =
        format!("How on-source counts are calibrated. Supported: {}. Default: {}", *CALIBRATION_STRATEGIES, CalibrationStrategy::default());

    static ref TAMB_HELP: String =
        format!("The ambient (hot-load) temperature [K]. Default: {DEFAULT_TAMB}");

    static ref DUMP_TOOL_HELP: String =
        format!("The utility that dumps the binary SAM45 log into text. Default: {DEFAULT_DUMP_TOOL}");

    static ref OUTPUT_HELP: String =
        format!("Where the container is written. Default: {DEFAULT_OUTPUT}");
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct IngestArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// The observation table (raw configuration log).
    #[clap(long, help_heading = "INPUT FILES")]
    pub(super) obstable: Option<PathBuf>,

    /// The SAM45 spectrometer log.
    #[clap(long, help_heading = "INPUT FILES")]
    pub(super) sam45log: Option<PathBuf>,

    /// The FMLO (modulation) log.
    #[clap(long, help_heading = "INPUT FILES")]
    pub(super) fmlolog: Option<PathBuf>,

    /// The antenna (pointing) log.
    #[clap(long, help_heading = "INPUT FILES")]
    pub(super) antlog: Option<PathBuf>,

    /// The arrays to ingest, e.g. A1 A5. Arrays that aren't in use are
    /// skipped. Default: all arrays in use.
    #[clap(short, long, multiple_values(true), help_heading = "CALIBRATION")]
    pub(super) arrays: Option<Vec<String>>,

    #[clap(long, help = TAMB_HELP.as_str(), help_heading = "CALIBRATION")]
    pub(super) tamb: Option<f64>,

    #[clap(long, help = CALIBRATION_HELP.as_str(), help_heading = "CALIBRATION")]
    pub(super) calibration: Option<String>,

    #[clap(long, help = DUMP_TOOL_HELP.as_str(), help_heading = "DUMP UTILITY")]
    pub(super) dump_tool: Option<PathBuf>,

    /// The directory under which scratch space for the dump is made. Default:
    /// the system temporary directory.
    #[clap(long, help_heading = "DUMP UTILITY")]
    pub(super) scratch_dir: Option<PathBuf>,

    /// Kill the dump utility if it runs longer than this [seconds]. Default:
    /// no limit.
    #[clap(long, help_heading = "DUMP UTILITY")]
    pub(super) dump_timeout: Option<f64>,

    /// The SAM45 log has already been dumped into text; don't run the dump
    /// utility.
    #[clap(long, help_heading = "DUMP UTILITY")]
    #[serde(default)]
    pub(super) predumped: bool,

    #[clap(short, long, help = OUTPUT_HELP.as_str(), help_heading = "OUTPUT FILES")]
    pub(super) output: Option<PathBuf>,
}

impl IngestArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<IngestArgs, FmloError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Read in the file arguments. Ensure all of the file args are
            // accounted for by pattern matching.
            let IngestArgs {
                args_file: _,
                obstable,
                sam45log,
                fmlolog,
                antlog,
                arrays,
                tamb,
                calibration,
                dump_tool,
                scratch_dir,
                dump_timeout,
                predumped,
                output,
            } = unpack_arg_file!(arg_file);

            // Merge all the arguments, preferring the CLI args when available.
            Ok(IngestArgs {
                args_file: None,
                obstable: cli_args.obstable.or(obstable),
                sam45log: cli_args.sam45log.or(sam45log),
                fmlolog: cli_args.fmlolog.or(fmlolog),
                antlog: cli_args.antlog.or(antlog),
                arrays: cli_args.arrays.or(arrays),
                tamb: cli_args.tamb.or(tamb),
                calibration: cli_args.calibration.or(calibration),
                dump_tool: cli_args.dump_tool.or(dump_tool),
                scratch_dir: cli_args.scratch_dir.or(scratch_dir),
                dump_timeout: cli_args.dump_timeout.or(dump_timeout),
                predumped: cli_args.predumped || predumped,
                output: cli_args.output.or(output),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<IngestParams, IngestArgsError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            obstable,
            sam45log,
            fmlolog,
            antlog,
            arrays,
            tamb,
            calibration,
            dump_tool,
            scratch_dir,
            dump_timeout,
            predumped,
            output,
        } = self;

        let obstable = existing_input(obstable, "observation table")?;
        let sam45log = existing_input(sam45log, "SAM45 log")?;
        let fmlolog = existing_input(fmlolog, "FMLO log")?;
        let antlog = existing_input(antlog, "antenna log")?;

        let selection = ArraySelection::parse(arrays.as_deref().unwrap_or_default())?;

        let tamb = tamb.unwrap_or(DEFAULT_TAMB);
        if !tamb.is_finite() || tamb <= 0.0 {
            return Err(IngestArgsError::BadTamb { tamb });
        }

        let strategy = match calibration {
            Some(s) => CalibrationStrategy::from_str(&s)
                .map_err(|_| IngestArgsError::BadCalibration { got: s })?,
            None => CalibrationStrategy::default(),
        };

        let dump_tool = if predumped {
            if dump_tool.is_some() || dump_timeout.is_some() || scratch_dir.is_some() {
                "The SAM45 log is already dumped; ignoring the dump utility options".warn();
            }
            None
        } else {
            let timeout = match dump_timeout {
                Some(secs) if secs.is_finite() && secs > 0.0 => {
                    Some(Duration::from_secs_f64(secs))
                }
                Some(secs) => return Err(IngestArgsError::BadTimeout { secs }),
                None => None,
            };
            let defaults = DumpTool::default();
            Some(DumpTool {
                program: dump_tool.unwrap_or(defaults.program),
                scratch_root: scratch_dir.unwrap_or(defaults.scratch_root),
                timeout,
            })
        };

        let output = output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        if output.exists() {
            format!("{} already exists and will be overwritten", output.display()).warn();
        }

        let mut printer = InfoPrinter::new("Ingestion".into());
        printer.push_block(vec![
            format!("Observation table: {}", obstable.display()).into(),
            format!("SAM45 log:         {}", sam45log.display()).into(),
            format!("FMLO log:          {}", fmlolog.display()).into(),
            format!("Antenna log:       {}", antlog.display()).into(),
        ]);
        printer.push_line(
            match &selection {
                ArraySelection::All => "Arrays: all in use".to_string(),
                ArraySelection::Ids(ids) => format!("Arrays: {}", ids.iter().join(" ")),
            }
            .into(),
        );
        printer.push_line(format!("Calibration: {strategy}, Tamb = {tamb} K").into());
        match &dump_tool {
            Some(t) => printer.push_line(format!("Dump utility: {}", t.program.display()).into()),
            None => printer.push_line("SAM45 log is already dumped".into()),
        }
        printer.push_line(format!("Writing to: {}", output.display()).into());
        printer.display();
        display_warnings();

        Ok(IngestParams {
            obstable,
            sam45log,
            fmlolog,
            antlog,
            selection,
            tamb,
            strategy,
            dump_tool,
            output,
        })
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), FmloError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let params = self.parse()?;

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        params.run()?;
        Ok(())
    }
}

fn existing_input(file: Option<PathBuf>, what: &'static str) -> Result<PathBuf, IngestArgsError> {
    let file = file.ok_or(IngestArgsError::NoInput { what })?;
    if !Path::new(&file).exists() {
        return Err(IngestArgsError::DoesntExist { what, file });
    }
    Ok(file)
}

#[derive(Error, Debug)]
pub(super) enum IngestArgsError {
    #[error("No {what} was supplied")]
    NoInput { what: &'static str },

    #[error("The {what} '{file}' doesn't exist")]
    DoesntExist { what: &'static str, file: PathBuf },

    #[error("Unrecognised calibration strategy '{got}'; supported: {}", *CALIBRATION_STRATEGIES)]
    BadCalibration { got: String },

    #[error("The ambient temperature must be positive, but got {tamb} K")]
    BadTamb { tamb: f64 },

    #[error("The dump timeout must be positive, but got {secs} s")]
    BadTimeout { secs: f64 },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
