// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::Cursor;

use approx::assert_abs_diff_eq;
use indoc::indoc;
use ndarray::prelude::*;
use tempfile::TempDir;

use super::{resample::pointing_for_rows, *};
use crate::{
    container::HeaderValue,
    io::read::AntLog,
    tests::{synthetic_container, NUM_ON_ROWS},
    time::parse_iso_timestamp,
};

const REST_FREQ: f64 = 115271202000.0;

#[test]
fn test_extract_defaults() {
    let container = synthetic_container();
    let fmscan = container.fmscan("A2", &ExtractOptions::default()).unwrap();

    assert_eq!(fmscan.array.to_string(), "A2");
    assert_eq!(fmscan.status, FmStatus::Modulated);
    assert_eq!(fmscan.resample, ResampleMethod::Max);
    assert_abs_diff_eq!(
        fmscan.scan,
        array![[10.0, 11.0, 12.0, 13.0], [20.0, 21.0, 22.0, 23.0]]
    );
    assert_abs_diff_eq!(fmscan.tsys, array![-586.0, -586.0, -586.0, -586.0]);
    assert_eq!(fmscan.records.len(), NUM_ON_ROWS);

    // The scan starts at the 4th FMLO log row: FREQFM = 4 MHz, then 8 MHz,
    // with 4 MHz channels.
    let r0 = &fmscan.records[0];
    assert_eq!(r0.chan_fm, 1);
    assert_eq!(fmscan.records[1].chan_fm, 2);
    assert_abs_diff_eq!(r0.interval, 0.5);
    assert_eq!(
        crate::time::format_iso_timestamp(r0.time),
        "2015-05-20T12:34:57.500000"
    );
    assert_abs_diff_eq!(r0.freq_range[0], REST_FREQ - 6e6 + 4e6);
    assert_abs_diff_eq!(r0.freq_range[1], REST_FREQ + 6e6 + 4e6);
    for r in &fmscan.records {
        assert!(r.freq_range[0] < r.freq_range[1]);
    }

    // The pointing bins containing 57.5 s and 58.0 s.
    assert_abs_diff_eq!(r0.radec[0], 83.81);
    assert_abs_diff_eq!(r0.radec[1], -5.41);
    assert_abs_diff_eq!(fmscan.records[1].radec[0], 83.83);
    assert_abs_diff_eq!(fmscan.records[1].radec[1], -5.43);
}

#[test]
fn test_frequency_window_is_symmetric() {
    let container = synthetic_container();
    let fmscan = container.fmscan("A2", &ExtractOptions::default()).unwrap();
    let chan_wid = 4e6;
    for r in &fmscan.records {
        let shift = r.chan_fm as f64 * chan_wid;
        assert_abs_diff_eq!(
            0.5 * (r.freq_range[0] + r.freq_range[1]) - shift,
            REST_FREQ,
            epsilon = 1e-3
        );
        assert_abs_diff_eq!(
            r.freq_range[1] - r.freq_range[0],
            3.0 * chan_wid,
            epsilon = 1e-3
        );
    }
}

#[test]
fn test_binning_and_cutedge() {
    let container = synthetic_container();
    let options = ExtractOptions {
        binning: 2,
        ..Default::default()
    };
    let fmscan = container.fmscan("A2", &options).unwrap();
    assert_abs_diff_eq!(fmscan.scan, array![[10.5, 12.5], [20.5, 22.5]]);
    assert_abs_diff_eq!(fmscan.tsys, array![-586.0, -586.0]);
    // 8 MHz channels; 4 MHz of modulation is half a channel, which truncates
    // to 0, but the frequencies still move by the full 4 MHz.
    let r0 = &fmscan.records[0];
    assert_eq!(r0.chan_fm, 0);
    assert_abs_diff_eq!(r0.freq_range[0], REST_FREQ - 4e6 + 4e6);
    assert_abs_diff_eq!(r0.freq_range[1], REST_FREQ + 4e6 + 4e6);

    let options = ExtractOptions {
        cutedge: 1,
        ..Default::default()
    };
    let fmscan = container.fmscan("A2", &options).unwrap();
    assert_abs_diff_eq!(fmscan.scan, array![[11.0, 12.0], [21.0, 22.0]]);
    assert_eq!(fmscan.tsys.len(), 2);
    let r0 = &fmscan.records[0];
    assert_abs_diff_eq!(r0.freq_range[1] - r0.freq_range[0], 4e6, epsilon = 1e-3);
}

#[test]
fn test_bad_geometry() {
    let container = synthetic_container();
    for binning in [0, 3] {
        let options = ExtractOptions {
            binning,
            ..Default::default()
        };
        assert!(matches!(
            container.fmscan("A2", &options),
            Err(ExtractionError::BadBinning { num_channels: 4, .. })
        ));
    }
    let options = ExtractOptions {
        cutedge: 2,
        ..Default::default()
    };
    assert!(matches!(
        container.fmscan("A2", &options),
        Err(ExtractionError::BadCutedge { cutedge: 2, num_channels: 4 })
    ));
}

#[test]
fn test_time_offset_bounds() {
    let container = synthetic_container();
    // 5 FMLO rows: 3 calibration rows + 2 scan rows fit exactly.
    let options = ExtractOptions {
        time_offset: 1,
        ..Default::default()
    };
    let result = container.fmscan("A2", &options);
    assert!(matches!(
        result,
        Err(ExtractionError::OffsetOutOfRange {
            time_offset: 1,
            scan_len: 2,
            needed: 6,
            num_rows: 5
        })
    ));
}

#[test]
fn test_unknown_arrays() {
    let container = synthetic_container();
    for label in ["A1", "A33", "B2", ""] {
        match container.fmscan(label, &ExtractOptions::default()) {
            Err(ExtractionError::UnknownArray { available, .. }) => assert_eq!(available, "A2"),
            other => panic!("expected an unknown-array error for '{label}', got {other:?}"),
        }
    }
    // Labels are case insensitive.
    assert!(container.fmscan("a2", &ExtractOptions::default()).is_ok());
    assert_eq!(container.array_labels(), vec!["A2".to_string()]);
}

#[test]
fn test_channel_count_must_match_config() {
    let mut container = synthetic_container();
    let ext = container
        .extensions
        .iter_mut()
        .find(|e| e.name == "A2")
        .unwrap();
    ext.payload = Payload::Image(Array2::zeros((NUM_ON_ROWS, 8)));
    ext.header.insert("TSYS", "1,1,1,1,1,1,1,1", "");
    assert!(matches!(
        container.fmscan("A2", &ExtractOptions::default()),
        Err(ExtractionError::ChannelMismatch {
            configured: 4,
            stored: 8,
            ..
        })
    ));

    let ext = container
        .extensions
        .iter_mut()
        .find(|e| e.name == "A2")
        .unwrap();
    ext.header.insert("TSYS", "1,1", "");
    assert!(matches!(
        container.fmscan("A2", &ExtractOptions::default()),
        Err(ExtractionError::TsysLength {
            expected: 8,
            got: 2,
            ..
        })
    ));
}

#[test]
fn test_missing_logs() {
    let mut container = synthetic_container();
    container.extensions.retain(|e| e.name != "ANTLOG");
    assert!(matches!(
        container.fmscan("A2", &ExtractOptions::default()),
        Err(ExtractionError::Container(
            ContainerError::MissingExtension { .. }
        ))
    ));
}

#[test]
fn test_resample_methods_on_scan() {
    let container = synthetic_container();

    let options = ExtractOptions {
        resample: ResampleMethod::Nearest,
        ..Default::default()
    };
    let fmscan = container.fmscan("A2", &options).unwrap();
    assert_eq!(fmscan.resample, ResampleMethod::Nearest);
    assert_abs_diff_eq!(fmscan.records[0].radec[0], 83.81);
    assert_abs_diff_eq!(fmscan.records[1].radec[0], 83.83);

    // Nothing was sampled before 57.55 s inside the scan's span, so the
    // first row can't be interpolated.
    let options = ExtractOptions {
        resample: ResampleMethod::Interpolate,
        ..Default::default()
    };
    let fmscan = container.fmscan("A2", &options).unwrap();
    assert!(fmscan.records[0].radec.iter().all(|v| v.is_nan()));
    assert_abs_diff_eq!(fmscan.records[1].radec[0], 83.83);
}

fn antlog(text: &str) -> AntLog {
    AntLog::parse(Cursor::new(text), "ant.log".to_string()).unwrap()
}

fn epoch(s: &str) -> hifitime::Epoch {
    parse_iso_timestamp(s).unwrap()
}

#[test]
fn test_resample_grid() {
    let log = antlog(indoc! {"
        TIME RA DEC AZ1 EL1 AZ2 EL2 OFF1 OFF2
        150520000000.000000 1.0 -1.0 0 0 0 0 0 0
        150520000000.020000 3.0 -3.0 0 0 0 0 0 0
        150520000000.250000 5.0 -5.0 0 0 0 0 0 0
        150520000000.450000 9.0 -9.0 0 0 0 0 0 0
        150520000001.000000 7.0 -7.0 0 0 0 0 0 0
    "});
    let times = [
        epoch("2015-05-20T00:00:00.030000"),
        epoch("2015-05-20T00:00:00.150000"),
        epoch("2015-05-20T00:00:00.290000"),
        epoch("2015-05-20T00:00:00.450000"),
    ];

    // The span is 0.03 s to 0.45 s, so the samples at 0 s, 0.02 s and 1 s
    // are outside it.
    let max = pointing_for_rows(&log, &times, ResampleMethod::Max);
    assert!(max[0].iter().all(|v| v.is_nan()));
    assert!(max[1].iter().all(|v| v.is_nan()));
    assert_eq!(max[2], [5.0, -5.0]);
    assert_eq!(max[3], [9.0, -9.0]);

    // Bin starts are 0.0, 0.1, 0.2 and 0.4 s.
    let nearest = pointing_for_rows(&log, &times, ResampleMethod::Nearest);
    assert_eq!(nearest[0], [5.0, -5.0]);
    assert_eq!(nearest[1], [5.0, -5.0]);
    assert_eq!(nearest[2], [5.0, -5.0]);
    assert_eq!(nearest[3], [9.0, -9.0]);

    let interpolated = pointing_for_rows(&log, &times, ResampleMethod::Interpolate);
    assert!(interpolated[0][0].is_nan());
    assert!(interpolated[1][0].is_nan());
    assert!(interpolated[2][0].is_nan());
    // 0.4 s is between 0.25 s (5) and 0.45 s (9).
    assert_abs_diff_eq!(interpolated[3][0], 8.0, epsilon = 1e-9);
    assert_abs_diff_eq!(interpolated[3][1], -8.0, epsilon = 1e-9);

    assert!(pointing_for_rows(&log, &[], ResampleMethod::Max).is_empty());
}

#[test]
fn test_write_json() {
    let container = synthetic_container();
    let fmscan = container.fmscan("A2", &ExtractOptions::default()).unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a2.json");
    fmscan.write(&path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["array"], "A2");
    assert_eq!(json["status"], "modulated");
    assert_eq!(json["resample"], "max");
    assert_eq!(json["scan"][1][3], 23.0);
    assert_eq!(json["records"][0]["chan_fm"], 1);
    assert_eq!(json["records"][1]["time"], "2015-05-20T12:34:58.000000");
}

#[test]
fn test_write_fits() {
    let container = synthetic_container();
    let fmscan = container.fmscan("A2", &ExtractOptions::default()).unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a2.fits");
    fmscan.write(&path).unwrap();

    let read = Container::read(&path).unwrap();
    assert_eq!(
        read.names().collect::<Vec<_>>(),
        ["PRIMARY", "SCAN", "TSYS", "FMRECORD"]
    );
    let primary = read.primary().unwrap();
    assert_eq!(
        primary.header.get("FMSTATUS").unwrap().value,
        HeaderValue::Text("modulated".to_string())
    );
    assert_eq!(primary.get_text("RESAMPLE").unwrap(), "max");
    assert_abs_diff_eq!(read.extension("SCAN").unwrap().image().unwrap(), &fmscan.scan);

    let records = read.extension("FMRECORD").unwrap();
    match records.column("DATETIME").unwrap() {
        ColumnData::Text { values, .. } => {
            assert_eq!(values[0], "2015-05-20T12:34:57.500000")
        }
        other => panic!("DATETIME should be text, got {other:?}"),
    }
    match records.column("CHANFM").unwrap() {
        ColumnData::Float(values) => assert_eq!(values, &vec![1.0, 2.0]),
        other => panic!("CHANFM should be numeric, got {other:?}"),
    }

    let result = fmscan.write(dir.path().join("a2.txt"));
    assert!(matches!(
        result,
        Err(ExtractionError::UnknownOutputFormat { .. })
    ));
}
