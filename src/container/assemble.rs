// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turning parsed logs and calibrated scans into container extensions (and
//! tables back into logs).

use itertools::Itertools;
use log::debug;

use super::{
    Column, ColumnData, Container, ContainerError, Extension, Payload, Table,
};
use crate::{
    calibrate::CalibratedScan,
    config::{InstrumentConfig, ObsTable, SchemaError},
    constants::{
        ANTLOG_EXTNAME, CONTAINER_VERSION, FMLOLOG_EXTNAME, PRIMARY_EXTNAME, TIMESTAMP_UNIT,
        TIMESTAMP_WIDTH,
    },
    io::read::{AntLog, AntLogRow, FmloLog, FmloLogRow},
    time::{format_iso_timestamp, parse_iso_timestamp},
};

/// Everything that goes into a container.
pub struct AssembleInputs<'a> {
    pub obstable: &'a ObsTable,
    pub config: &'a InstrumentConfig,

    /// The file name of the raw SAM45 log the scans came from.
    pub sam45log_name: &'a str,

    /// Calibrated scans of the selected elements, in physical order.
    pub scans: &'a [CalibratedScan],

    pub fmlolog: &'a FmloLog,
    pub antlog: &'a AntLog,
}

impl Container {
    /// Build a container out of already-parsed and calibrated inputs.
    pub fn assemble(inputs: AssembleInputs) -> Result<Container, ContainerError> {
        let mut container = Container::default();
        container.push(primary_extension(inputs.obstable))?;
        for scan in inputs.scans {
            container.push(scan_extension(scan, inputs.config, inputs.sam45log_name)?)?;
        }
        container.push(fmlolog_extension(inputs.fmlolog))?;
        container.push(antlog_extension(inputs.antlog))?;
        debug!(
            "Assembled a container with extensions {}",
            container.names().join(", ")
        );
        Ok(container)
    }
}

fn primary_extension(obstable: &ObsTable) -> Extension {
    let mut ext = Extension::new(PRIMARY_EXTNAME, Payload::Empty);
    ext.header
        .insert("ORGFILE", obstable.filename.as_str(), "Original file");
    ext.header
        .insert("VERSION", CONTAINER_VERSION, "Container layout version");
    for entry in &obstable.entries {
        ext.header.insert(entry.label(), entry.item(), "");
    }
    ext
}

fn scan_extension(
    scan: &CalibratedScan,
    config: &InstrumentConfig,
    sam45log_name: &str,
) -> Result<Extension, ContainerError> {
    let element = &scan.element;
    let src_pos = config.get_float_vec("SRC_POS")?;
    if src_pos.len() < 2 {
        return Err(SchemaError::TooShort {
            key: "SRC_POS".to_string(),
            expected: 2,
            got: src_pos.len(),
        }
        .into());
    }
    let iptim = config.iptim()?;
    let num_channels = scan.scan.ncols();

    let mut ext = Extension::new(&element.id.to_string(), Payload::Image(scan.scan.clone()));
    let h = &mut ext.header;
    h.insert("ORGFILE", sam45log_name, "Original file");
    h.insert("OBJECT", config.get_text("SRC_NAME")?, "");
    h.insert("RA", src_pos[0], "Right Ascension (deg)");
    h.insert("DEC", src_pos[1], "Declination (deg)");
    h.insert("BANDWID", element.bandwidth, "Band width (Hz)");
    h.insert("RESTFREQ", element.rest_freq, "Rest frequency (Hz)");
    h.insert("SIDEBAND", element.sideband.to_string(), "USB or LSB");
    h.insert("CTYPE1", "Spectral", "");
    h.insert("CUNIT1", "ch", "");
    h.insert(
        "CDELT1",
        element.bandwidth / num_channels as f64,
        "Channel width (Hz)",
    );
    h.insert("CTYPE2", "Time", "");
    h.insert("CDELT2", iptim, "Integration period (s)");
    h.insert("CUNIT2", format!("{iptim:?} sec"), "");
    h.insert("BSCALE", 1.0, "PHYSICAL = PIXEL*BSCALE + BZERO");
    h.insert("BZERO", 0.0, "");
    h.insert("BUNIT", "K", "");
    h.insert("BTYPE", "Intensity", "");
    h.insert("TAMB", scan.tamb, "Ambient temperature (K)");
    h.insert(
        "TSYS",
        scan.tsys.iter().join(","),
        "System noise temperature (K)",
    );
    h.insert("CALIB", scan.strategy.to_string(), "Calibration strategy");
    Ok(ext)
}

fn text_column(name: &str, unit: Option<&str>, values: Vec<String>, min_width: usize) -> Column {
    let width = values
        .iter()
        .map(|v| v.len())
        .max()
        .unwrap_or(0)
        .max(min_width)
        .max(1);
    Column {
        name: name.to_string(),
        unit: unit.map(|u| u.to_string()),
        data: ColumnData::Text { width, values },
    }
}

fn float_column(name: &str, unit: &str, values: Vec<f64>) -> Column {
    Column {
        name: name.to_string(),
        unit: Some(unit.to_string()),
        data: ColumnData::Float(values),
    }
}

fn pair_column(name: &str, unit: &str, values: Vec<[f64; 2]>) -> Column {
    Column {
        name: name.to_string(),
        unit: Some(unit.to_string()),
        data: ColumnData::FloatPair(values),
    }
}

fn fmlolog_extension(log: &FmloLog) -> Extension {
    let rows = &log.rows;
    let table = Table {
        columns: vec![
            text_column(
                "TIME",
                Some(TIMESTAMP_UNIT),
                rows.iter().map(|r| format_iso_timestamp(r.time)).collect(),
                TIMESTAMP_WIDTH,
            ),
            text_column(
                "STATUS",
                None,
                rows.iter().map(|r| r.status.clone()).collect(),
                0,
            ),
            float_column("FREQFM", "Hz", rows.iter().map(|r| r.freq_fm).collect()),
            float_column("FREQLO", "Hz", rows.iter().map(|r| r.freq_lo).collect()),
            float_column("VRAD", "km/s", rows.iter().map(|r| r.v_rad).collect()),
        ],
    };
    let mut ext = Extension::new(FMLOLOG_EXTNAME, Payload::Table(table));
    ext.header
        .insert("ORGFILE", log.filename.as_str(), "Original file");
    ext
}

fn antlog_extension(log: &AntLog) -> Extension {
    let rows = &log.rows;
    let table = Table {
        columns: vec![
            text_column(
                "TIME",
                Some(TIMESTAMP_UNIT),
                rows.iter().map(|r| format_iso_timestamp(r.time)).collect(),
                TIMESTAMP_WIDTH,
            ),
            pair_column("RADEC", "deg", rows.iter().map(|r| r.radec).collect()),
            pair_column("AZEL1", "deg", rows.iter().map(|r| r.azel1).collect()),
            pair_column("AZEL2", "deg", rows.iter().map(|r| r.azel2).collect()),
            pair_column("OFFSET", "deg", rows.iter().map(|r| r.offset).collect()),
        ],
    };
    let mut ext = Extension::new(ANTLOG_EXTNAME, Payload::Table(table));
    ext.header
        .insert("ORGFILE", log.filename.as_str(), "Original file");
    ext
}

/// Typed access to the columns of a table extension. Every column is checked
/// to have as many rows as the table.
struct TableReader<'a> {
    ext: &'a Extension,
    num_rows: usize,
}

impl<'a> TableReader<'a> {
    fn new(ext: &'a Extension) -> Result<TableReader<'a>, ContainerError> {
        let num_rows = ext.table()?.num_rows();
        Ok(TableReader { ext, num_rows })
    }

    fn check_len(&self, column: &str, got: usize) -> Result<(), ContainerError> {
        if got != self.num_rows {
            return Err(ContainerError::ColumnLength {
                extension: self.ext.name.clone(),
                column: column.to_string(),
                expected: self.num_rows,
                got,
            });
        }
        Ok(())
    }

    fn wrong_type(&self, column: &str, expected: &'static str) -> ContainerError {
        ContainerError::ColumnType {
            extension: self.ext.name.clone(),
            column: column.to_string(),
            expected,
        }
    }

    fn text(&self, column: &str) -> Result<&'a [String], ContainerError> {
        match self.ext.column(column)? {
            ColumnData::Text { values, .. } => {
                self.check_len(column, values.len())?;
                Ok(values)
            }
            _ => Err(self.wrong_type(column, "text")),
        }
    }

    fn float(&self, column: &str) -> Result<&'a [f64], ContainerError> {
        match self.ext.column(column)? {
            ColumnData::Float(values) => {
                self.check_len(column, values.len())?;
                Ok(values)
            }
            _ => Err(self.wrong_type(column, "one number per row")),
        }
    }

    fn pair(&self, column: &str) -> Result<&'a [[f64; 2]], ContainerError> {
        match self.ext.column(column)? {
            ColumnData::FloatPair(values) => {
                self.check_len(column, values.len())?;
                Ok(values)
            }
            _ => Err(self.wrong_type(column, "two numbers per row")),
        }
    }

    fn times(&self) -> Result<Vec<hifitime::Epoch>, ContainerError> {
        self.text("TIME")?
            .iter()
            .map(|t| parse_iso_timestamp(t).map_err(ContainerError::from))
            .collect()
    }

    fn orgfile(&self) -> String {
        self.ext
            .get_text("ORGFILE")
            .map(|s| s.to_string())
            .unwrap_or_default()
    }
}

pub(super) fn fmlolog_from_extension(ext: &Extension) -> Result<FmloLog, ContainerError> {
    let reader = TableReader::new(ext)?;
    let times = reader.times()?;
    // Containers written by other tools may not carry the status.
    let status = match ext.column("STATUS") {
        Ok(_) => Some(reader.text("STATUS")?),
        Err(ContainerError::MissingColumn { .. }) => None,
        Err(e) => return Err(e),
    };
    let freq_fm = reader.float("FREQFM")?;
    let freq_lo = reader.float("FREQLO")?;
    let v_rad = reader.float("VRAD")?;

    let rows = times
        .into_iter()
        .enumerate()
        .map(|(i, time)| FmloLogRow {
            time,
            status: status.map(|s| s[i].trim().to_string()).unwrap_or_default(),
            freq_fm: freq_fm[i],
            freq_lo: freq_lo[i],
            v_rad: v_rad[i],
        })
        .collect();
    Ok(FmloLog {
        filename: reader.orgfile(),
        rows,
    })
}

pub(super) fn antlog_from_extension(ext: &Extension) -> Result<AntLog, ContainerError> {
    let reader = TableReader::new(ext)?;
    let times = reader.times()?;
    let radec = reader.pair("RADEC")?;
    let azel1 = reader.pair("AZEL1")?;
    let azel2 = reader.pair("AZEL2")?;
    let offset = reader.pair("OFFSET")?;

    let rows = times
        .into_iter()
        .enumerate()
        .map(|(i, time)| AntLogRow {
            time,
            radec: radec[i],
            azel1: azel1[i],
            azel2: azel2[i],
            offset: offset[i],
        })
        .collect();
    Ok(AntLog {
        filename: reader.orgfile(),
        rows,
    })
}

/// Parse the comma-separated Tsys card of a scan extension.
pub(crate) fn parse_tsys(ext: &Extension) -> Result<Vec<f64>, ContainerError> {
    let raw = ext.get_text("TSYS")?;
    if raw.trim().is_empty() {
        return Ok(vec![]);
    }
    raw.split(',')
        .map(|v| {
            v.trim().parse::<f64>().map_err(|_| ContainerError::CardType {
                extension: ext.name.clone(),
                key: "TSYS".to_string(),
                expected: "comma-separated numbers",
            })
        })
        .collect()
}

