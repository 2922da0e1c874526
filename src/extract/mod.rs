// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Extracting modulation-corrected scans from an assembled container.
//!
//! For one array, the stored scan (and its Tsys) is binned and edge-trimmed,
//! and every scan row is paired with the FMLO log row taken at the same time:
//! the modulation offset in channels, the frequency range covered by the
//! trimmed channels, the integration period, the time, and the pointing.
//!
//! The FMLO log starts 3 rows before the scan, because the first three
//! spectrometer rows of an observation are calibration rows and were consumed
//! during ingestion.

mod error;
mod resample;
#[cfg(test)]
mod tests;

pub use error::ExtractionError;
pub(crate) use resample::RESAMPLE_METHODS;
pub use resample::ResampleMethod;

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use hifitime::Epoch;
use log::{debug, info, trace};
use ndarray::prelude::*;
use serde::{Deserialize, Serialize, Serializer};
use strum_macros::{Display, EnumString, IntoStaticStr};

use crate::{
    config::ArrayId,
    constants::{NUM_CAL_ROWS, PRIMARY_EXTNAME, TIMESTAMP_UNIT, TIMESTAMP_WIDTH},
    container::{
        Column, ColumnData, Container, ContainerError, Extension, Payload, Table,
    },
    time::format_iso_timestamp,
};

/// How a scan should be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// The number of adjacent channels averaged together.
    pub binning: usize,

    /// The number of binned channels dropped from each edge.
    pub cutedge: usize,

    /// The FMLO log row (after the calibration rows) that lines up with the
    /// first scan row.
    pub time_offset: usize,

    pub resample: ResampleMethod,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            binning: 1,
            cutedge: 0,
            time_offset: 0,
            resample: ResampleMethod::default(),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum FmStatus {
    #[strum(serialize = "modulated")]
    Modulated,
}

fn serialize_epoch<S: Serializer>(e: &Epoch, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_iso_timestamp(*e))
}

/// Everything known about one scan row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FmRecord {
    /// The modulation offset in (binned) channels, truncated towards zero.
    pub chan_fm: i64,

    /// The lowest and highest frequencies of the trimmed channels [Hz].
    pub freq_range: [f64; 2],

    /// The integration period [s].
    pub interval: f64,

    #[serde(serialize_with = "serialize_epoch")]
    pub time: Epoch,

    /// [deg]
    pub radec: [f64; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub struct FmScan {
    pub array: ArrayId,

    /// `[time][channel]`, binned and trimmed.
    pub scan: Array2<f64>,

    /// Binned and trimmed like the scan's channels.
    pub tsys: Array1<f64>,

    /// One per scan row.
    pub records: Vec<FmRecord>,

    pub status: FmStatus,

    /// How the pointing was resampled onto the scan rows.
    pub resample: ResampleMethod,
}

impl Container {
    /// The labels of the array extensions in this container, in order.
    pub fn array_labels(&self) -> Vec<String> {
        self.names()
            .filter(|n| n.parse::<ArrayId>().is_ok())
            .map(|n| n.to_string())
            .collect()
    }

    /// Extract the modulation-corrected scan of an array, e.g. "A5".
    pub fn fmscan(&self, label: &str, options: &ExtractOptions) -> Result<FmScan, ExtractionError> {
        let unknown = || ExtractionError::UnknownArray {
            label: label.to_string(),
            available: self.array_labels().join(", "),
        };
        let array: ArrayId = label.trim().parse().map_err(|_| unknown())?;
        let label = array.to_string();
        let ext = self.get(&label).ok_or_else(unknown)?;
        debug!("Extracting {label} with {options:?}");

        let image = ext.image()?;
        let (scan_len, num_channels) = image.dim();
        let ExtractOptions {
            binning,
            cutedge,
            time_offset,
            resample,
        } = *options;

        if binning == 0 || num_channels % binning != 0 {
            return Err(ExtractionError::BadBinning {
                binning,
                num_channels,
            });
        }
        let tsys = crate::container::parse_tsys(ext)?;
        if tsys.len() != num_channels {
            return Err(ExtractionError::TsysLength {
                label,
                expected: num_channels,
                got: tsys.len(),
            });
        }
        self.check_configured_width(&label, num_channels)?;

        let scan_wid = num_channels / binning;
        if 2 * cutedge >= scan_wid {
            return Err(ExtractionError::BadCutedge {
                cutedge,
                num_channels: scan_wid,
            });
        }

        // Bin, then trim.
        let scan = Array2::from_shape_fn((scan_len, scan_wid), |(t, c)| {
            image
                .slice(s![t, c * binning..(c + 1) * binning])
                .mean()
                .unwrap_or(f64::NAN)
        });
        let tsys = Array1::from_shape_fn(scan_wid, |c| {
            tsys[c * binning..(c + 1) * binning].iter().sum::<f64>() / binning as f64
        });
        let scan = scan.slice(s![.., cutedge..scan_wid - cutedge]).to_owned();
        let tsys = tsys.slice(s![cutedge..scan_wid - cutedge]).to_owned();

        // The FMLO log rows lining up with the scan.
        let fmlolog = self.fmlolog()?;
        let first = time_offset + NUM_CAL_ROWS;
        let needed = first + scan_len;
        if needed > fmlolog.len() {
            return Err(ExtractionError::OffsetOutOfRange {
                time_offset,
                scan_len,
                needed,
                num_rows: fmlolog.len(),
            });
        }
        let rows = &fmlolog.rows[first..needed];

        let bandwidth = ext.get_float("BANDWID")?;
        let rest_freq = ext.get_float("RESTFREQ")?;
        let interval = ext.get_float("CDELT2")?;
        let chan_wid = bandwidth / scan_wid as f64;
        let half_span = 0.5 * (scan_wid as f64 - 2.0 * cutedge as f64 - 1.0) * chan_wid;

        let times = rows.iter().map(|r| r.time).collect::<Vec<_>>();
        let antlog = self.antlog()?;
        let radec = resample::pointing_for_rows(&antlog, &times, resample);
        info!("{label}: pointing resampled with method '{resample}'");

        let records = rows
            .iter()
            .zip(radec)
            .map(|(row, radec)| {
                let chan_fm = row.freq_fm / chan_wid;
                let shift = chan_fm * chan_wid;
                FmRecord {
                    chan_fm: chan_fm as i64,
                    freq_range: [rest_freq - half_span + shift, rest_freq + half_span + shift],
                    interval,
                    time: row.time,
                    radec,
                }
            })
            .collect::<Vec<_>>();
        trace!("{label}: {} records", records.len());

        Ok(FmScan {
            array,
            scan,
            tsys,
            records,
            status: FmStatus::Modulated,
            resample,
        })
    }

    /// The configured channel count must match what is stored. Containers
    /// without a decodable configuration aren't checked.
    fn check_configured_width(&self, label: &str, stored: usize) -> Result<(), ExtractionError> {
        let configured = match self
            .config()
            .and_then(|c| c.scan_width().map_err(ContainerError::from))
        {
            Ok(w) => w,
            Err(e) => {
                debug!("Not checking the channel count of {label}: {e}");
                return Ok(());
            }
        };
        if configured != stored {
            return Err(ExtractionError::ChannelMismatch {
                label: label.to_string(),
                configured,
                stored,
            });
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct FmScanJson<'a> {
    array: String,
    status: FmStatus,
    resample: ResampleMethod,
    tsys: Vec<f64>,
    scan: Vec<Vec<f64>>,
    records: &'a [FmRecord],
}

impl FmScan {
    /// Put the scan into its own container: the status and resample method
    /// in the primary segment, then a `SCAN` image and `TSYS` and `FMRECORD`
    /// tables.
    pub fn to_container(&self) -> Result<Container, ContainerError> {
        let mut primary = Extension::new(PRIMARY_EXTNAME, Payload::Empty);
        primary
            .header
            .insert("ARRAY", self.array.to_string(), "Array the scan came from");
        primary
            .header
            .insert("FMSTATUS", self.status.to_string(), "");
        primary.header.insert(
            "RESAMPLE",
            self.resample.to_string(),
            "How the pointing was resampled",
        );

        let scan = Extension::new("SCAN", Payload::Image(self.scan.clone()));
        let tsys = Extension::new(
            "TSYS",
            Payload::Table(Table {
                columns: vec![Column {
                    name: "TSYS".to_string(),
                    unit: Some("K".to_string()),
                    data: ColumnData::Float(self.tsys.to_vec()),
                }],
            }),
        );

        let r = &self.records;
        let column = |name: &str, unit: &str, data: ColumnData| Column {
            name: name.to_string(),
            unit: Some(unit.to_string()),
            data,
        };
        let records = Extension::new(
            "FMRECORD",
            Payload::Table(Table {
                columns: vec![
                    column(
                        "CHANFM",
                        "ch",
                        ColumnData::Float(r.iter().map(|r| r.chan_fm as f64).collect()),
                    ),
                    column(
                        "FREQRANGE",
                        "Hz",
                        ColumnData::FloatPair(r.iter().map(|r| r.freq_range).collect()),
                    ),
                    column(
                        "INTERVAL",
                        "s",
                        ColumnData::Float(r.iter().map(|r| r.interval).collect()),
                    ),
                    column(
                        "DATETIME",
                        TIMESTAMP_UNIT,
                        ColumnData::Text {
                            width: TIMESTAMP_WIDTH,
                            values: r.iter().map(|r| format_iso_timestamp(r.time)).collect(),
                        },
                    ),
                    column(
                        "RADEC",
                        "deg",
                        ColumnData::FloatPair(r.iter().map(|r| r.radec).collect()),
                    ),
                ],
            }),
        );

        let mut container = Container::default();
        for ext in [primary, scan, tsys, records] {
            container.push(ext)?;
        }
        Ok(container)
    }

    /// Write the scan out. The format is chosen by the file extension:
    /// `.fits` (or `.fit`, `.fts`) or `.json`.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), ExtractionError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("fits" | "fit" | "fts") => self.to_container()?.write(path)?,
            Some("json") => {
                let json = FmScanJson {
                    array: self.array.to_string(),
                    status: self.status,
                    resample: self.resample,
                    tsys: self.tsys.to_vec(),
                    scan: self.scan.outer_iter().map(|row| row.to_vec()).collect(),
                    records: &self.records,
                };
                let mut f = BufWriter::new(File::create(path)?);
                serde_json::to_writer_pretty(&mut f, &json)?;
                f.flush()?;
            }
            _ => {
                return Err(ExtractionError::UnknownOutputFormat {
                    path: path.to_path_buf(),
                })
            }
        }
        debug!("Wrote {} to {}", self.array, path.display());
        Ok(())
    }
}
