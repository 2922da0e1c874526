// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#[cfg(test)]
mod tests;

use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::common::{display_warnings, InfoPrinter, ARG_FILE_HELP};
use crate::{
    config::Sideband,
    psw::{PswOptions, PswSpectrum},
    FmloError,
};

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct PswArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// The position-switch FITS file.
    #[clap(short, long, help_heading = "INPUT FILES")]
    pub(super) file: Option<PathBuf>,

    /// The sideband of the spectrum (USB or LSB). LSB spectra are reversed so
    /// that frequency increases. Default: USB
    #[clap(short, long)]
    pub(super) sideband: Option<String>,

    /// The number of channels zeroed at each end of the spectrum; 0 disables
    /// masking. Default: 1
    #[clap(short, long)]
    pub(super) maskedge: Option<usize>,

    /// Report frequencies in Hz instead of GHz.
    #[clap(long)]
    #[serde(default)]
    pub(super) hz: bool,
}

impl PswArgs {
    pub(super) fn merge(self) -> Result<PswArgs, FmloError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            let PswArgs {
                args_file: _,
                file,
                sideband,
                maskedge,
                hz,
            } = unpack_arg_file!(arg_file);

            Ok(PswArgs {
                args_file: None,
                file: cli_args.file.or(file),
                sideband: cli_args.sideband.or(sideband),
                maskedge: cli_args.maskedge.or(maskedge),
                hz: cli_args.hz || hz,
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<(PathBuf, PswOptions), PswArgsError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            file,
            sideband,
            maskedge,
            hz,
        } = self;

        let file = file.ok_or(PswArgsError::NoInput)?;
        let defaults = PswOptions::default();
        let options = PswOptions {
            sideband: match sideband {
                Some(s) => Sideband::from_str(&s.to_uppercase())
                    .map_err(|_| PswArgsError::BadSideband { got: s })?,
                None => defaults.sideband,
            },
            maskedge: maskedge.unwrap_or(defaults.maskedge),
            use_ghz: !hz,
        };

        let mut printer = InfoPrinter::new("Position-switch spectrum".into());
        printer.push_line(format!("File: {}", file.display()).into());
        printer.push_block(vec![
            format!("Sideband: {}", options.sideband).into(),
            match options.maskedge {
                0 => "Edge masking disabled".into(),
                n => format!("Masking {n} channels at each edge").into(),
            },
        ]);
        printer.display();
        display_warnings();

        Ok((file, options))
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), FmloError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let (file, options) = self.parse()?;

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        let spectrum = PswSpectrum::read(&file, options)?;
        let unit = if options.use_ghz { "GHz" } else { "Hz" };
        info!("{} channels", spectrum.len());
        match spectrum.span() {
            Some((lo, hi)) => info!("Frequencies: {lo} to {hi} {unit}"),
            None => info!("Frequencies: none"),
        }
        info!("RMS (unmasked channels): {}", spectrum.rms());
        Ok(())
    }
}

#[derive(Error, Debug)]
pub(super) enum PswArgsError {
    #[error("No position-switch file was supplied")]
    NoInput,

    #[error("Unrecognised sideband '{got}'; expected USB or LSB")]
    BadSideband { got: String },
}
