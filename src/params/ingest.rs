// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::{
    calibrate::{calibrate, CalibrationStrategy},
    config::{ArraySelection, InstrumentConfig, ObsTable, ParseError, SchemaError},
    container::{AssembleInputs, Container, ContainerError},
    io::read::{AntLog, DumpTool, FmloLog, IngestError, RawStreams},
};

/// Everything needed to turn the raw logs of one observation into a
/// container.
#[derive(Debug, Clone)]
pub struct IngestParams {
    /// The raw configuration log ("obstable").
    pub obstable: PathBuf,

    /// The SAM45 spectrometer log.
    pub sam45log: PathBuf,

    pub fmlolog: PathBuf,

    pub antlog: PathBuf,

    pub selection: ArraySelection,

    /// [K]
    pub tamb: f64,

    pub strategy: CalibrationStrategy,

    /// How to dump the SAM45 log into text. `None` means the log has already
    /// been dumped.
    pub dump_tool: Option<DumpTool>,

    /// Where the container is written.
    pub output: PathBuf,
}

impl IngestParams {
    /// Build the container and write it out. The container is also returned.
    pub fn run(&self) -> Result<Container, IngestRunError> {
        // The configuration must be decoded before anything else, because it
        // says how to demultiplex the spectrometer log.
        let obstable = ObsTable::read(&self.obstable)?;
        let config = InstrumentConfig::from_obstable(&obstable)?;
        let arrays = config.arrays()?;
        let num_in_use = arrays.iter().filter(|a| a.in_use).count();
        let scan_width = config.scan_width()?;
        let scan_length = config.scan_length()?;
        info!(
            "{} of {} arrays in use; {scan_width} channels, {scan_length} on-source rows",
            num_in_use,
            arrays.len()
        );

        let fmlolog = FmloLog::read(&self.fmlolog)?;
        let antlog = AntLog::read(&self.antlog)?;
        debug!(
            "{} FMLO log rows, {} antenna log rows",
            fmlolog.len(),
            antlog.len()
        );

        let streams = match &self.dump_tool {
            Some(tool) => {
                // The scratch directory goes away with `dumped`.
                let dumped = tool.dump(&self.sam45log)?;
                RawStreams::read_file(dumped.path(), num_in_use, scan_width, scan_length)?
            }
            None => RawStreams::read_file(&self.sam45log, num_in_use, scan_width, scan_length)?,
        };

        let scans = calibrate(
            &streams,
            &arrays,
            &self.selection,
            self.tamb,
            self.strategy,
        )?;
        info!("Calibrated {} arrays with '{}'", scans.len(), self.strategy);

        let sam45log_name = file_name(&self.sam45log);
        let container = Container::assemble(AssembleInputs {
            obstable: &obstable,
            config: &config,
            sam45log_name: &sam45log_name,
            scans: &scans,
            fmlolog: &fmlolog,
            antlog: &antlog,
        })?;
        container.info();

        container.write(&self.output)?;
        info!("Wrote {}", self.output.display());
        Ok(container)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Error, Debug)]
pub enum IngestRunError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Container(#[from] ContainerError),
}
