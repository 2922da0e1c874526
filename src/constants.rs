// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All physical constants *must* be double precision.
 */

/// The version of the container layout written by this crate. This goes into
/// the `VERSION` card of the primary segment.
pub const CONTAINER_VERSION: &str = "1.0";

/// The default ambient (hot-load) temperature used in chopper-wheel
/// calibration [K].
pub const DEFAULT_TAMB: f64 = 293.0;

/// The number of physical SAM45 arrays (A1 to A32).
pub const MAX_NUM_ARRAYS: usize = 32;

/// The first three temporal rows of a SAM45 dump are the zero, reference-load
/// and sky-reference calibration rows.
pub const NUM_CAL_ROWS: usize = 3;

/// The number of leading, non-data tokens on every line of dumped SAM45 text.
pub const NUM_DUMP_LEADING_TOKENS: usize = 3;

/// The executable used to dump a raw SAM45 log into text if the user doesn't
/// specify one.
pub const DEFAULT_DUMP_TOOL: &str = "sldump";

/// The fixed trailing arguments handed to the dump tool.
pub const DUMP_TOOL_ARGS: [&str; 2] = ["1", "4096"];

/// The name of the dumped text file inside the scratch directory.
pub const DUMP_FILENAME: &str = "dump.txt";

/// The width of the pointing-log resampling grid [milliseconds].
pub const RESAMPLE_INTERVAL_MS: i64 = 100;

/// The number of characters in an ISO-8601 timestamp with microseconds, e.g.
/// "2015-05-20T12:34:56.123456".
pub const TIMESTAMP_WIDTH: usize = 26;

/// The unit string written for timestamp columns.
pub const TIMESTAMP_UNIT: &str = "YYYY-MM-DDThh:mm:ss.ssssss";

/// The name of the modulation-log table.
pub const FMLOLOG_EXTNAME: &str = "FMLOLOG";

/// The name of the pointing-log table.
pub const ANTLOG_EXTNAME: &str = "ANTLOG";

/// The name of the metadata-only segment.
pub const PRIMARY_EXTNAME: &str = "PRIMARY";
