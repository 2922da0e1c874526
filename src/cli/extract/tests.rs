// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::Parser;

use super::*;
use crate::{
    calibrate::CalibrationStrategy,
    config::ArraySelection,
    constants::DEFAULT_TAMB,
    params::IngestParams,
    tests::{fixture, write_file, Fixture},
};

fn ingest(f: &Fixture) -> PathBuf {
    let output = f.dir.path().join("obs.fits");
    IngestParams {
        obstable: f.obstable.clone(),
        sam45log: f.sam45log.clone(),
        fmlolog: f.fmlolog.clone(),
        antlog: f.antlog.clone(),
        selection: ArraySelection::All,
        tamb: DEFAULT_TAMB,
        strategy: CalibrationStrategy::Raw,
        dump_tool: None,
        output: output.clone(),
    }
    .run()
    .unwrap();
    output
}

#[test]
fn test_parse_defaults_to_every_array() {
    let f = fixture();
    let container = ingest(&f);
    let (params, read) = ExtractArgs::parse_from(["extract", "-c", &container.display().to_string()])
        .parse()
        .unwrap();
    assert_eq!(params.labels.as_slice(), ["A2"]);
    assert_eq!(read.array_labels(), ["A2"]);
    assert_eq!(params.options.binning, 1);
    assert_eq!(params.options.cutedge, 0);
    assert_eq!(params.output_type, ScanOutputType::Fits);
    assert_eq!(params.output_dir, PathBuf::from("."));
}

#[test]
fn test_parse_options() {
    let f = fixture();
    let container = ingest(&f);
    let (params, _) = ExtractArgs::parse_from([
        "extract",
        "-c",
        &container.display().to_string(),
        "-a",
        "a2",
        "A2",
        "--binning",
        "2",
        "--cutedge",
        "0",
        "--time-offset",
        "1",
        "--output-type",
        "JSON",
        "-d",
        "scans",
    ])
    .parse()
    .unwrap();
    assert_eq!(params.labels.as_slice(), ["A2"]);
    assert_eq!(params.options.binning, 2);
    assert_eq!(params.options.time_offset, 1);
    assert_eq!(params.output_type, ScanOutputType::Json);
    assert_eq!(params.output_dir, PathBuf::from("scans"));
}

#[test]
fn test_bad_arguments() {
    let result = ExtractArgs::parse_from(["extract"]).parse();
    assert!(matches!(result, Err(FmloError::Extract(_))));

    let f = fixture();
    let container = ingest(&f);
    let container = container.display().to_string();

    let result =
        ExtractArgs::parse_from(["extract", "-c", &container, "--resample", "cubic"]).parse();
    assert!(matches!(result, Err(FmloError::Extract(_))));

    let result =
        ExtractArgs::parse_from(["extract", "-c", &container, "--output-type", "csv"]).parse();
    assert!(matches!(result, Err(FmloError::Extract(_))));

    let not_a_container = write_file(f.dir.path(), "junk.fits", "not fits at all");
    let result =
        ExtractArgs::parse_from(["extract", "-c", &not_a_container.display().to_string()]).parse();
    assert!(result.is_err());
}

#[test]
fn test_run_writes_scans() {
    let f = fixture();
    let container = ingest(&f);
    let out_dir = f.dir.path().join("scans");
    let args = ExtractArgs::parse_from([
        "extract",
        "-c",
        &container.display().to_string(),
        "-d",
        &out_dir.display().to_string(),
        "--output-type",
        "json",
    ]);

    args.clone().run(true).unwrap();
    assert!(!out_dir.join("obs_A2.json").exists());

    args.run(false).unwrap();
    assert!(out_dir.join("obs_A2.json").exists());
}

#[test]
fn test_arg_file() {
    let f = fixture();
    let container = ingest(&f);
    let toml = write_file(
        f.dir.path(),
        "extract.toml",
        &format!(
            "container = \"{}\"\nbinning = 2\noutput_type = \"json\"\n",
            container.display()
        ),
    );
    let args = ExtractArgs::parse_from(["extract", &toml.display().to_string(), "--binning", "1"])
        .merge()
        .unwrap();
    assert_eq!(args.container.as_ref(), Some(&container));
    assert_eq!(args.binning, Some(1));
    assert_eq!(args.output_type.as_deref(), Some("json"));
}
