// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests and helpful functions.
//!
//! The synthetic observation used throughout has two arrays: A1 (LSB, unused)
//! and A2 (USB, in use), each with 4 channels. The scan is one second long
//! with 0.5 s integrations, so there are 2 on-source rows.


use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use indoc::{formatdoc, indoc};
use itertools::Itertools;
use tempfile::TempDir;

use crate::{
    calibrate::{calibrate, CalibrationStrategy},
    config::{ArraySelection, InstrumentConfig, ObsTable},
    constants::DEFAULT_TAMB,
    container::{AssembleInputs, Container},
    io::read::{AntLog, FmloLog, RawStreams},
};

pub(crate) const NUM_CHANNELS: usize = 4;
pub(crate) const NUM_ON_ROWS: usize = 2;

pub(crate) fn obstable_text() -> String {
    let ch_range = (0..32)
        .map(|i| if i < 2 { "1,4" } else { "0,0" })
        .join(",");
    formatdoc! {"
        # SAM45 observation table
        SET ANT ANT_MODE 'TRACK'
        SET SAM45 INTEG_TIME 1
        SET SAM45 IPTIM 0.5
        SET SAM45 ARRAY (0,1)
        SET SAM45 IFATT (5,0)
        SET SAM45 SIDBD_TYP ('LSB','USB')
        SET SAM45 SRC_NAME 'ORION-KL'
        SET SAM45 SRC_POS (83.8221,-5.3911)
        SET SAM45 REST_FREQ (115271202000.0,115271202000.0)
        SET SAM45 OBS_BAND (32000000.0,16000000.0)
        SET SAM45 CH_RANGE ({ch_range})
        SET SAM45 OBS_USER 'someone'
        SET IFATT IF1 3
        SET SYNTHE_H FREQ 10.5
        Initialize
        SET SAM45 INTEG_TIME 99
    "}
}

/// Three calibration rows (zero = 0, reference = 1, sky = 2) and then two
/// on-source rows, for one in-use array.
pub(crate) fn dump_text() -> String {
    let rows: [[f64; NUM_CHANNELS]; 3 + NUM_ON_ROWS] = [
        [0.0, 0.0, 0.0, 0.0],
        [1.0, 1.0, 1.0, 1.0],
        [2.0, 2.0, 2.0, 2.0],
        [10.0, 11.0, 12.0, 13.0],
        [20.0, 21.0, 22.0, 23.0],
    ];
    rows.iter()
        .enumerate()
        .map(|(i, row)| format!("{i} 0 A2 {}\n", row.iter().join(" ")))
        .collect()
}

pub(crate) const FMLOLOG_TEXT: &str = indoc! {"
    TIME STATUS FREQFM FREQLO VRAD
    20150520123456.000000 ON 0.0 110000000000.0 0.0
    20150520123456.500000 ON 1000000.0 110000000000.0 0.0
    20150520123457.000000 ON 2000000.0 110000000000.0 0.0
    20150520123457.500000 ON 4000000.0 110000000000.0 0.5
    20150520123458.000000 ON 8000000.0 110000000000.0 0.5
"};

pub(crate) const ANTLOG_TEXT: &str = indoc! {"
    TIME RA DEC AZ1 EL1 AZ2 EL2 OFF1 OFF2
    150520123457.450000 83.80 -5.40 180.0 45.0 180.1 45.1 0.0 0.0
    150520123457.550000 83.81 -5.41 180.0 45.0 180.1 45.1 0.0 0.0
    150520123457.950000 83.82 -5.42 180.0 45.0 180.1 45.1 0.0 0.0
    150520123458.000000 83.83 -5.43 180.0 45.0 180.1 45.1 0.0 0.0
"};

pub(crate) fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// A stand-in for the dump utility: it copies its first argument to its
/// second.
#[cfg(unix)]
pub(crate) fn fake_dump_tool(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = write_file(dir, "fake_sldump.sh", "#!/bin/sh\ncp \"$1\" \"$2\"\n");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// All the input files of the synthetic observation, written into a
/// temporary directory. The "raw" SAM45 log is already dumped text.
pub(crate) struct Fixture {
    pub(crate) dir: TempDir,
    pub(crate) obstable: PathBuf,
    pub(crate) sam45log: PathBuf,
    pub(crate) fmlolog: PathBuf,
    pub(crate) antlog: PathBuf,
}

pub(crate) fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let obstable = write_file(dir.path(), "obstable.txt", &obstable_text());
    let sam45log = write_file(dir.path(), "sam45.log", &dump_text());
    let fmlolog = write_file(dir.path(), "fmlo.log", FMLOLOG_TEXT);
    let antlog = write_file(dir.path(), "ant.log", ANTLOG_TEXT);
    Fixture {
        dir,
        obstable,
        sam45log,
        fmlolog,
        antlog,
    }
}

/// The synthetic observation, assembled in memory without touching the disk.
pub(crate) fn synthetic_container() -> Container {
    let obstable =
        ObsTable::parse(Cursor::new(obstable_text()), "obstable.txt".to_string()).unwrap();
    let config = InstrumentConfig::from_obstable(&obstable).unwrap();
    let arrays = config.arrays().unwrap();
    let streams =
        RawStreams::read(Cursor::new(dump_text()), 1, NUM_CHANNELS, NUM_ON_ROWS).unwrap();
    let scans = calibrate(
        &streams,
        &arrays,
        &ArraySelection::All,
        DEFAULT_TAMB,
        CalibrationStrategy::Raw,
    )
    .unwrap();
    let fmlolog = FmloLog::parse(Cursor::new(FMLOLOG_TEXT), "fmlo.log".to_string()).unwrap();
    let antlog = AntLog::parse(Cursor::new(ANTLOG_TEXT), "ant.log".to_string()).unwrap();
    Container::assemble(AssembleInputs {
        obstable: &obstable,
        config: &config,
        sam45log_name: "sam45.log",
        scans: &scans,
        fmlolog: &fmlolog,
        antlog: &antlog,
    })
    .unwrap()
}
