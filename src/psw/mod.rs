// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Position-switch (PSW) spectra.
//!
//! A PSW FITS file holds one reduced spectrum in the first row of a binary
//! table (`CRVAL2`, `CDELT2` and a vector `DATA` column). The reference pixel
//! `CRPIX2` and channel count `NAXIS2` are header keys; they are looked for in
//! the primary header first. The channel count falls back to the length of
//! `DATA` and the reference pixel to the table's header.

mod error;

pub use error::PswError;

use std::path::Path;

use fitsio::hdu::{FitsHdu, HduInfo};
use itertools::Itertools;
use log::{debug, trace};
use ndarray::prelude::*;

use crate::{config::Sideband, io::fits::*};

/// How a PSW spectrum should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PswOptions {
    pub sideband: Sideband,

    /// The number of channels zeroed at each end of the spectrum. 0 disables
    /// masking.
    pub maskedge: usize,

    /// Frequencies in GHz rather than Hz.
    pub use_ghz: bool,
}

impl Default for PswOptions {
    fn default() -> Self {
        PswOptions {
            sideband: Sideband::Usb,
            maskedge: 1,
            use_ghz: true,
        }
    }
}

/// The linear frequency axis of a spectrum, in pixel terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyAxis {
    pub naxis: usize,
    pub crpix: f64,
    /// [Hz]
    pub crval: f64,
    /// [Hz]
    pub cdelt: f64,
}

impl FrequencyAxis {
    /// Channel frequencies, in Hz or GHz. Channel `i` is centred half a
    /// channel away from pixel `i`: up for USB and down for LSB.
    pub fn frequencies(&self, sideband: Sideband, use_ghz: bool) -> Array1<f64> {
        let f = if use_ghz { 1e-9 } else { 1.0 };
        let f_sb = match sideband {
            Sideband::Usb => -0.5,
            Sideband::Lsb => 0.5,
        };
        Array1::from_shape_fn(self.naxis, |i| {
            f * (self.crval + self.cdelt * (i as f64 - self.crpix + f_sb))
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PswSpectrum {
    pub options: PswOptions,

    /// Ascending in channel order for USB; reversed for LSB.
    pub frequency: Array1<f64>,

    /// Edge-masked, and in the same order as `frequency`.
    pub spectrum: Array1<f64>,
}

impl PswSpectrum {
    pub fn new(
        axis: FrequencyAxis,
        data: Vec<f64>,
        options: PswOptions,
    ) -> Result<PswSpectrum, PswError> {
        if data.len() != axis.naxis {
            return Err(PswError::DataLength {
                expected: axis.naxis,
                got: data.len(),
            });
        }
        let mut frequency = axis.frequencies(options.sideband, options.use_ghz);
        let mut spectrum = Array1::from(data);

        let n = spectrum.len();
        let m = options.maskedge.min(n);
        spectrum.slice_mut(s![..m]).fill(0.0);
        spectrum.slice_mut(s![n - m..]).fill(0.0);

        if options.sideband == Sideband::Lsb {
            frequency.invert_axis(Axis(0));
            spectrum.invert_axis(Axis(0));
        }

        Ok(PswSpectrum {
            options,
            frequency,
            spectrum,
        })
    }

    /// Read the spectrum held by a PSW FITS file.
    pub fn read<P: AsRef<Path>>(path: P, options: PswOptions) -> Result<PswSpectrum, PswError> {
        let path = path.as_ref();
        debug!("Reading PSW spectrum from {}", path.display());
        let mut fptr = fits_open(path)?;
        let primary = fits_open_hdu(&mut fptr, 0usize)?;
        let naxis: Option<usize> = fits_get_optional_key(&mut fptr, &primary, "NAXIS2")?;
        let crpix: Option<f64> = fits_get_optional_key(&mut fptr, &primary, "CRPIX2")?;

        let table = first_table(&mut fptr)?.ok_or_else(|| PswError::NoTable {
            path: path.to_path_buf(),
        })?;
        let (columns, num_rows) = fits_get_table_info(&fptr, &table)?;
        if num_rows == 0 {
            return Err(PswError::NoRows {
                path: path.to_path_buf(),
            });
        }
        let data_len = columns
            .iter()
            .find(|c| c.name == "DATA")
            .map(|c| c.data_type.repeat)
            .ok_or_else(|| PswError::MissingColumn {
                path: path.to_path_buf(),
                column: "DATA",
            })?;

        let naxis = naxis.unwrap_or(data_len);
        let crpix = match crpix {
            Some(c) => c,
            None => fits_get_required_key(&mut fptr, &table, "CRPIX2")?,
        };
        let crval = first_value(&mut fptr, &table, "CRVAL2")?;
        let cdelt = first_value(&mut fptr, &table, "CDELT2")?;
        let data = fits_get_col_values(&mut fptr, &table, "DATA", 0, data_len)?;
        trace!("PSW axis: naxis {naxis}, crpix {crpix}, crval {crval}, cdelt {cdelt}");

        PswSpectrum::new(
            FrequencyAxis {
                naxis,
                crpix,
                crval,
                cdelt,
            },
            data,
            options,
        )
    }

    pub fn len(&self) -> usize {
        self.spectrum.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectrum.is_empty()
    }

    /// Linearly interpolate the spectrum onto other frequencies (in the same
    /// unit as `self.frequency`). Frequencies outside the spectrum's span are
    /// NaN.
    pub fn interpolate(&self, frequencies: &[f64]) -> Array1<f64> {
        let points = self
            .frequency
            .iter()
            .zip(self.spectrum.iter())
            .map(|(&f, &s)| (f, s))
            .sorted_by(|a, b| a.0.total_cmp(&b.0))
            .collect::<Vec<_>>();
        frequencies
            .iter()
            .map(|&f| interpolate_sorted(&points, f))
            .collect()
    }

    /// The root-mean-square of the spectrum, ignoring the masked edges.
    pub fn rms(&self) -> f64 {
        let n = self.len();
        let m = self.options.maskedge.min(n);
        if 2 * m >= n {
            return f64::NAN;
        }
        let inner = self.spectrum.slice(s![m..n - m]);
        (inner.iter().map(|v| v * v).sum::<f64>() / inner.len() as f64).sqrt()
    }

    /// The lowest and highest frequencies.
    pub fn span(&self) -> Option<(f64, f64)> {
        self.frequency
            .iter()
            .copied()
            .minmax_by(|a, b| a.total_cmp(b))
            .into_option()
    }
}

fn first_table(fptr: &mut fitsio::FitsFile) -> Result<Option<FitsHdu>, FitsError> {
    let num_hdus = fits_num_hdus(fptr)?;
    for i in 1..num_hdus {
        let hdu = fits_open_hdu(fptr, i)?;
        if matches!(hdu.info, HduInfo::TableInfo { .. }) {
            return Ok(Some(hdu));
        }
    }
    Ok(None)
}

fn first_value(
    fptr: &mut fitsio::FitsFile,
    hdu: &FitsHdu,
    column: &str,
) -> Result<f64, FitsError> {
    Ok(fits_get_col_values(fptr, hdu, column, 0, 1)?[0])
}

/// `points` must be sorted by frequency.
fn interpolate_sorted(points: &[(f64, f64)], f: f64) -> f64 {
    let after = points.partition_point(|p| p.0 < f);
    match points.get(after) {
        Some(&(pf, ps)) if pf == f => return ps,
        _ => (),
    }
    if after == 0 || after == points.len() {
        return f64::NAN;
    }
    let (f0, s0) = points[after - 1];
    let (f1, s1) = points[after];
    s0 + (f - f0) / (f1 - f0) * (s1 - s0)
}
