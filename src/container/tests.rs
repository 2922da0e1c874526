// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use itertools::Itertools;
use ndarray::prelude::*;
use tempfile::TempDir;

use super::*;
use crate::{
    constants::{ANTLOG_EXTNAME, CONTAINER_VERSION, FMLOLOG_EXTNAME},
    tests::{synthetic_container, NUM_CHANNELS, NUM_ON_ROWS},
    time::format_iso_timestamp,
};

#[test]
fn test_assembled_layout() {
    let container = synthetic_container();
    assert_eq!(
        container.names().collect::<Vec<_>>(),
        ["PRIMARY", "A2", "FMLOLOG", "ANTLOG"]
    );
    assert_eq!(container.version().unwrap(), CONTAINER_VERSION);

    let primary = container.primary().unwrap();
    assert_eq!(primary.get_text("ORGFILE").unwrap(), "obstable.txt");
    // ORGFILE, VERSION and the 14 obstable entries.
    assert_eq!(primary.header.len(), 16);
    assert_eq!(primary.get_text("ANT-000").unwrap(), "ANT_MODE=TRACK");
    assert_eq!(primary.get_text("SAM-006").unwrap(), "SRC_NAME=ORION-KL");
    assert_eq!(primary.get_text("SYH-013").unwrap(), "FREQ=10.5");
}

#[test]
fn test_scan_extension_cards() {
    let container = synthetic_container();
    let a2 = container.extension("A2").unwrap();
    assert_eq!(a2.image().unwrap().dim(), (NUM_ON_ROWS, NUM_CHANNELS));
    assert_abs_diff_eq!(
        a2.image().unwrap(),
        &array![[10.0, 11.0, 12.0, 13.0], [20.0, 21.0, 22.0, 23.0]]
    );

    assert_eq!(a2.get_text("ORGFILE").unwrap(), "sam45.log");
    assert_eq!(a2.get_text("OBJECT").unwrap(), "ORION-KL");
    assert_abs_diff_eq!(a2.get_float("RA").unwrap(), 83.8221);
    assert_abs_diff_eq!(a2.get_float("DEC").unwrap(), -5.3911);
    // The second array's bandwidth, not the first's.
    assert_abs_diff_eq!(a2.get_float("BANDWID").unwrap(), 16e6);
    assert_abs_diff_eq!(a2.get_float("RESTFREQ").unwrap(), 115271202000.0);
    assert_eq!(a2.get_text("SIDEBAND").unwrap(), "USB");
    assert_abs_diff_eq!(a2.get_float("CDELT1").unwrap(), 4e6);
    assert_abs_diff_eq!(a2.get_float("CDELT2").unwrap(), 0.5);
    assert_eq!(a2.get_text("CUNIT2").unwrap(), "0.5 sec");
    assert_eq!(a2.get_text("BUNIT").unwrap(), "K");
    assert_abs_diff_eq!(a2.get_float("TAMB").unwrap(), 293.0);
    assert_eq!(a2.get_text("CALIB").unwrap(), "raw");
    assert_eq!(
        assemble::parse_tsys(a2).unwrap(),
        vec![-586.0; NUM_CHANNELS]
    );

    assert!(matches!(
        a2.get_text("RA"),
        Err(ContainerError::CardType { .. })
    ));
    assert!(matches!(
        a2.get_float("NOPE"),
        Err(ContainerError::MissingCard { .. })
    ));
    assert!(matches!(a2.table(), Err(ContainerError::NotTable { .. })));
}

#[test]
fn test_config_and_logs_come_back_out() {
    let container = synthetic_container();

    let obstable = container.obstable().unwrap();
    assert_eq!(obstable.entries.len(), 14);
    let config = container.config().unwrap();
    assert_eq!(config.scan_width().unwrap(), NUM_CHANNELS);
    assert_eq!(config.scan_length().unwrap(), NUM_ON_ROWS);

    let fmlolog = container.fmlolog().unwrap();
    assert_eq!(fmlolog.filename, "fmlo.log");
    assert_eq!(fmlolog.len(), 5);
    assert_eq!(
        format_iso_timestamp(fmlolog.rows[1].time),
        "2015-05-20T12:34:56.500000"
    );
    assert_eq!(fmlolog.rows[1].status, "ON");
    assert_abs_diff_eq!(fmlolog.rows[4].freq_fm, 8e6);
    assert_abs_diff_eq!(fmlolog.rows[3].v_rad, 0.5);

    let antlog = container.antlog().unwrap();
    assert_eq!(antlog.filename, "ant.log");
    assert_eq!(antlog.len(), 4);
    assert_eq!(
        format_iso_timestamp(antlog.rows[0].time),
        "2015-05-20T12:34:57.450000"
    );
    assert_abs_diff_eq!(antlog.rows[2].radec[0], 83.82);
    assert_abs_diff_eq!(antlog.rows[2].azel2[1], 45.1);
}

#[test]
fn test_log_tables_have_units() {
    let container = synthetic_container();
    let fmlolog = container.extension(FMLOLOG_EXTNAME).unwrap().table().unwrap();
    let units = fmlolog
        .columns
        .iter()
        .map(|c| c.unit.as_deref().unwrap_or(""))
        .collect::<Vec<_>>();
    assert_eq!(units, ["YYYY-MM-DDThh:mm:ss.ssssss", "", "Hz", "Hz", "km/s"]);
    match &fmlolog.column("TIME").unwrap().data {
        ColumnData::Text { width, .. } => assert_eq!(*width, 26),
        other => panic!("TIME should be text, got {other:?}"),
    }

    let antlog = container.extension(ANTLOG_EXTNAME).unwrap().table().unwrap();
    assert_eq!(
        antlog.columns.iter().map(|c| c.name.as_str()).join(" "),
        "TIME RADEC AZEL1 AZEL2 OFFSET"
    );
    assert!(antlog.columns[1..]
        .iter()
        .all(|c| c.unit.as_deref() == Some("deg")));
}

#[test]
fn test_duplicate_and_missing_extensions() {
    let mut container = synthetic_container();
    let result = container.push(Extension::new("A2", Payload::Empty));
    assert!(matches!(
        result,
        Err(ContainerError::DuplicateExtension { .. })
    ));
    assert!(matches!(
        container.extension("A7"),
        Err(ContainerError::MissingExtension { .. })
    ));
}

#[test]
fn test_malformed_log_tables() {
    let good = synthetic_container();
    let fmlolog = good.extension(FMLOLOG_EXTNAME).unwrap();

    let mut missing = fmlolog.clone();
    if let Payload::Table(t) = &mut missing.payload {
        t.columns.retain(|c| c.name != "FREQLO");
    }
    assert!(matches!(
        assemble::fmlolog_from_extension(&missing),
        Err(ContainerError::MissingColumn { column, .. }) if column == "FREQLO"
    ));

    let mut short = fmlolog.clone();
    if let Payload::Table(t) = &mut short.payload {
        for c in t.columns.iter_mut() {
            if let ColumnData::Float(v) = &mut c.data {
                if c.name == "VRAD" {
                    v.pop();
                }
            }
        }
    }
    assert!(matches!(
        assemble::fmlolog_from_extension(&short),
        Err(ContainerError::ColumnLength { expected: 5, got: 4, .. })
    ));

    let mut no_status = fmlolog.clone();
    if let Payload::Table(t) = &mut no_status.payload {
        t.columns.retain(|c| c.name != "STATUS");
    }
    let log = assemble::fmlolog_from_extension(&no_status).unwrap();
    assert_eq!(log.rows[0].status, "");

    let antlog = good.extension(ANTLOG_EXTNAME).unwrap();
    let mut wrong_type = antlog.clone();
    if let Payload::Table(t) = &mut wrong_type.payload {
        t.columns[1].data = ColumnData::Float(vec![0.0; 4]);
    }
    assert!(matches!(
        assemble::antlog_from_extension(&wrong_type),
        Err(ContainerError::ColumnType { .. })
    ));
}

#[test]
fn test_fits_round_trip() {
    let container = synthetic_container();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("obs.fits");
    container.write(&path).unwrap();

    let read = Container::read(&path).unwrap();
    assert_eq!(
        read.names().collect::<Vec<_>>(),
        container.names().collect::<Vec<_>>()
    );
    assert_eq!(read.version().unwrap(), CONTAINER_VERSION);
    assert_eq!(
        read.obstable().unwrap().entries,
        container.obstable().unwrap().entries
    );

    let a2 = read.extension("A2").unwrap();
    assert_abs_diff_eq!(a2.image().unwrap(), container.extension("A2").unwrap().image().unwrap());
    assert_eq!(a2.get_text("SIDEBAND").unwrap(), "USB");
    assert_abs_diff_eq!(a2.get_float("BANDWID").unwrap(), 16e6);
    assert_abs_diff_eq!(a2.get_float("CDELT2").unwrap(), 0.5);
    assert_eq!(
        assemble::parse_tsys(a2).unwrap(),
        vec![-586.0; NUM_CHANNELS]
    );

    let fmlolog = read.fmlolog().unwrap();
    let expected = container.fmlolog().unwrap();
    assert_eq!(fmlolog.len(), expected.len());
    for (a, b) in fmlolog.rows.iter().zip(expected.rows.iter()) {
        assert_eq!(format_iso_timestamp(a.time), format_iso_timestamp(b.time));
        assert_eq!(a.status, b.status);
        assert_abs_diff_eq!(a.freq_fm, b.freq_fm);
        assert_abs_diff_eq!(a.freq_lo, b.freq_lo);
        assert_abs_diff_eq!(a.v_rad, b.v_rad);
    }
    let units = read
        .extension(FMLOLOG_EXTNAME)
        .unwrap()
        .table()
        .unwrap()
        .columns
        .iter()
        .map(|c| c.unit.clone())
        .collect::<Vec<_>>();
    assert_eq!(units[2].as_deref(), Some("Hz"));
    assert_eq!(units[4].as_deref(), Some("km/s"));

    let antlog = read.antlog().unwrap();
    let expected = container.antlog().unwrap();
    assert_eq!(antlog.filename, "ant.log");
    for (a, b) in antlog.rows.iter().zip(expected.rows.iter()) {
        assert_eq!(format_iso_timestamp(a.time), format_iso_timestamp(b.time));
        assert_abs_diff_eq!(a.radec[0], b.radec[0]);
        assert_abs_diff_eq!(a.radec[1], b.radec[1]);
        assert_abs_diff_eq!(a.offset[1], b.offset[1]);
    }
}

#[test]
fn test_long_obstable_entries_survive_fits() {
    let mut container = Container::default();
    let mut primary = Extension::new("PRIMARY", Payload::Empty);
    let long = format!("CH_RANGE={}", (0..64).map(|i| i.to_string()).join(","));
    assert!(long.len() > 80);
    primary.header.insert("SAM-000", long.as_str(), "");
    container.push(primary).unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("long.fits");
    container.write(&path).unwrap();
    let read = Container::read(&path).unwrap();
    assert_eq!(read.primary().unwrap().get_text("SAM-000").unwrap(), long);
}

#[test]
fn test_header_only_extensions_are_rejected() {
    let mut container = synthetic_container();
    container
        .extensions
        .push(Extension::new("EMPTY", Payload::Empty));
    let dir = TempDir::new().unwrap();
    let result = container.write(dir.path().join("bad.fits"));
    assert!(matches!(result, Err(ContainerError::HeaderOnly { .. })));
}

#[test]
fn test_read_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = Container::read(dir.path().join("nope.fits"));
    assert!(matches!(result, Err(ContainerError::Fits(_))));
}
