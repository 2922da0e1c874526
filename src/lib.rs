// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Ingestion, calibration and scan extraction for frequency-modulated local
oscillator (FMLO) observations taken with the SAM45 spectrometer on the
Nobeyama 45m telescope.

Raw logs (the SAM45 dump, the FMLO log and the antenna log) are assembled into
a single FITS container with [`params::IngestParams`]. Calibrated,
modulation-corrected scans are later pulled out of such a container with
[`Container::fmscan`].
 */

pub mod calibrate;
mod cli;
pub mod config;
pub mod constants;
pub mod container;
pub mod extract;
pub mod io;
pub mod params;
pub mod psw;
pub(crate) mod time;

#[cfg(test)]
mod tests;

// Re-exports.
pub use calibrate::{CalibratedScan, CalibrationStrategy};
pub use cli::{Fmlo, FmloError};
pub use config::{ArrayElement, ArrayId, ArraySelection, InstrumentConfig, Sideband};
pub use container::Container;
pub use extract::{FmRecord, FmScan, FmStatus, ResampleMethod};

use crossbeam_utils::atomic::AtomicCell;

/// Should we draw progress bars? Off by default; the CLI turns them on unless
/// asked not to.
pub(crate) static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
