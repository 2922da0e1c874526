// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::Cursor;

use approx::assert_abs_diff_eq;
use ndarray::prelude::*;

use super::*;
use crate::{
    config::{ArrayId, InstrumentConfig, ObsTable},
    tests::{dump_text, obstable_text},
};

fn element(index: usize, in_use: bool, sideband: Sideband, ifatt: f64) -> ArrayElement {
    ArrayElement {
        id: ArrayId::from_index(index).unwrap(),
        in_use,
        ch_range: [1, 3],
        ifatt,
        sideband,
        rest_freq: 100e9,
        bandwidth: 3e6,
    }
}

/// Two in-use arrays of three channels each; the on-source values of slot `j`
/// are `100 j + 10 t + c`.
fn streams() -> RawStreams {
    let mut streams = RawStreams::new(2, 3, 2);
    streams.zero.fill(0.0);
    streams.reference.fill(1.0);
    streams.sky.fill(2.0);
    for ((t, i), v) in streams.on.indexed_iter_mut() {
        let (slot, c) = (i / 3, i % 3);
        *v = (100 * slot + 10 * t + c) as f64;
    }
    streams
}

#[test]
fn test_tsys_formula() {
    let t = tsys(
        array![0.0].view(),
        array![1.0].view(),
        array![2.0].view(),
        0.0,
        293.0,
    );
    assert_abs_diff_eq!(t[0], -586.0);

    // 10 dB of attenuation: 293 / (10 * 3 / 1 - 1)
    let t = tsys(
        array![1.0, 1.0].view(),
        array![4.0, 4.0].view(),
        array![2.0, 2.0].view(),
        10.0,
        293.0,
    );
    assert_abs_diff_eq!(t, array![293.0 / 29.0, 293.0 / 29.0], epsilon = 1e-10);
}

#[test]
fn test_strategies() {
    let on = array![[3.0, 5.0], [5.0, 9.0], [4.0, 7.0]];
    let zero = array![1.0, 2.0];
    let reference = array![3.0, 4.0];
    let sky = array![2.0, 3.0];

    let raw = calibrate_on_source(
        on.view(),
        zero.view(),
        reference.view(),
        sky.view(),
        0.0,
        293.0,
        CalibrationStrategy::Raw,
    );
    assert_abs_diff_eq!(raw, on);

    let zs = calibrate_on_source(
        on.view(),
        zero.view(),
        reference.view(),
        sky.view(),
        0.0,
        293.0,
        CalibrationStrategy::ZeroSubtracted,
    );
    assert_abs_diff_eq!(zs, array![[2.0, 3.0], [4.0, 7.0], [3.0, 5.0]]);

    // Medians are 4 and 7; denominators are (3-1)-(2-1) = 1 and (4-2)-(3-2) = 1.
    let cw = calibrate_on_source(
        on.view(),
        zero.view(),
        reference.view(),
        sky.view(),
        0.0,
        293.0,
        CalibrationStrategy::ChopperWheel,
    );
    assert_abs_diff_eq!(
        cw,
        array![[-293.0, -586.0], [293.0, 586.0], [0.0, 0.0]],
        epsilon = 1e-10
    );
}

#[test]
fn test_strategy_names() {
    assert_eq!(CalibrationStrategy::default(), CalibrationStrategy::Raw);
    assert_eq!(
        "zero-subtracted".parse::<CalibrationStrategy>().unwrap(),
        CalibrationStrategy::ZeroSubtracted
    );
    assert_eq!(CalibrationStrategy::ChopperWheel.to_string(), "chopper-wheel");
    assert_eq!(
        *CALIBRATION_STRATEGIES,
        "raw, zero-subtracted, chopper-wheel"
    );
}

#[test]
fn test_median_over_time() {
    let m = median_over_time(array![[1.0, 8.0], [3.0, 2.0], [2.0, 5.0], [9.0, 4.0]].view());
    assert_abs_diff_eq!(m, array![2.5, 4.5]);
    let m = median_over_time(Array2::<f64>::zeros((0, 2)).view());
    assert!(m.iter().all(|v| v.is_nan()));
}

#[test]
fn test_sideband_reversal() {
    let streams = streams();
    // The second array is unused, so slot 1 belongs to the third.
    let arrays = [
        element(0, true, Sideband::Usb, 0.0),
        element(1, false, Sideband::Usb, 0.0),
        element(2, true, Sideband::Lsb, 0.0),
    ];
    let mut streams = streams;
    // Make Tsys distinguishable per channel.
    streams.sky.assign(&array![2.0, 3.0, 5.0, 2.0, 3.0, 5.0]);

    let scans = calibrate(
        &streams,
        &arrays,
        &ArraySelection::All,
        293.0,
        CalibrationStrategy::Raw,
    )
    .unwrap();
    assert_eq!(scans.len(), 2);

    let usb = &scans[0];
    assert_eq!(usb.element.id.to_string(), "A1");
    let raw_tsys = tsys(
        streams.zero.slice(s![0..3]),
        streams.reference.slice(s![0..3]),
        streams.sky.slice(s![0..3]),
        0.0,
        293.0,
    );
    assert_abs_diff_eq!(usb.tsys, raw_tsys);
    assert_abs_diff_eq!(usb.scan, array![[0.0, 1.0, 2.0], [10.0, 11.0, 12.0]]);

    let lsb = &scans[1];
    assert_eq!(lsb.element.id.to_string(), "A3");
    let reversed: Array1<f64> = raw_tsys.iter().rev().copied().collect();
    assert_abs_diff_eq!(lsb.tsys, reversed);
    assert_abs_diff_eq!(
        lsb.scan,
        array![[102.0, 101.0, 100.0], [112.0, 111.0, 110.0]]
    );
}

#[test]
fn test_attenuation_uses_physical_index() {
    let streams = streams();
    let arrays = [
        element(0, false, Sideband::Usb, 10.0),
        element(1, true, Sideband::Usb, 0.0),
        element(2, true, Sideband::Usb, 10.0),
    ];
    let scans = calibrate(
        &streams,
        &arrays,
        &ArraySelection::All,
        293.0,
        CalibrationStrategy::Raw,
    )
    .unwrap();
    assert_abs_diff_eq!(scans[0].tsys[0], -586.0);
    assert_abs_diff_eq!(scans[1].tsys[0], 293.0 / 4.0, epsilon = 1e-10);
}

#[test]
fn test_selection_and_mismatch() {
    let streams = streams();
    let arrays = [
        element(0, true, Sideband::Usb, 0.0),
        element(1, true, Sideband::Lsb, 0.0),
    ];
    let selection = ArraySelection::parse(&["A2"]).unwrap();
    let scans = calibrate(&streams, &arrays, &selection, 293.0, CalibrationStrategy::Raw).unwrap();
    assert_eq!(scans.len(), 1);
    assert_eq!(scans[0].element.id.to_string(), "A2");
    assert_abs_diff_eq!(scans[0].scan[[0, 0]], 102.0);

    let result = calibrate(
        &streams,
        &arrays[..1],
        &ArraySelection::All,
        293.0,
        CalibrationStrategy::Raw,
    );
    assert!(matches!(result, Err(SchemaError::InvalidValue { .. })));
}

#[test]
fn test_fixture_calibration() {
    let obstable = ObsTable::parse(Cursor::new(obstable_text()), "obs".to_string()).unwrap();
    let config = InstrumentConfig::from_obstable(&obstable).unwrap();
    let arrays = config.arrays().unwrap();
    let streams = RawStreams::read(Cursor::new(dump_text()), 1, 4, 2).unwrap();
    let scans = calibrate(
        &streams,
        &arrays,
        &ArraySelection::All,
        293.0,
        CalibrationStrategy::Raw,
    )
    .unwrap();
    assert_eq!(scans.len(), 1);
    assert_eq!(scans[0].scan.dim(), (2, 4));
    // A2 has no attenuation; A1's 5 dB must not leak in.
    assert_abs_diff_eq!(scans[0].tsys, array![-586.0, -586.0, -586.0, -586.0]);
}
