// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::Parser;
use indoc::formatdoc;

use super::*;
use crate::tests::{fixture, write_file, Fixture};

fn base_args(f: &Fixture) -> Vec<String> {
    vec![
        "ingest".to_string(),
        "--obstable".to_string(),
        f.obstable.display().to_string(),
        "--sam45log".to_string(),
        f.sam45log.display().to_string(),
        "--fmlolog".to_string(),
        f.fmlolog.display().to_string(),
        "--antlog".to_string(),
        f.antlog.display().to_string(),
        "--predumped".to_string(),
    ]
}

#[test]
fn test_dry_run_doesnt_write() {
    let f = fixture();
    let output = f.dir.path().join("obs.fits");
    let mut args = base_args(&f);
    args.extend(["-o".to_string(), output.display().to_string()]);
    let ingest_args = IngestArgs::parse_from(args);

    assert!(ingest_args.clone().run(true).is_ok());
    assert!(!output.exists());

    assert!(ingest_args.run(false).is_ok());
    assert!(output.exists());
}

#[test]
fn test_parse_defaults() {
    let f = fixture();
    let params = IngestArgs::parse_from(base_args(&f)).parse().unwrap();
    assert_eq!(params.selection, ArraySelection::All);
    assert_eq!(params.tamb, DEFAULT_TAMB);
    assert_eq!(params.strategy, CalibrationStrategy::Raw);
    assert!(params.dump_tool.is_none());
    assert_eq!(params.output, PathBuf::from(DEFAULT_OUTPUT));
}

#[test]
fn test_parse_dump_tool_options() {
    let f = fixture();
    let mut args = base_args(&f);
    args.retain(|a| a != "--predumped");
    args.extend([
        "--dump-tool".to_string(),
        "/opt/nro/bin/sldump".to_string(),
        "--scratch-dir".to_string(),
        f.dir.path().display().to_string(),
        "--dump-timeout".to_string(),
        "2.5".to_string(),
    ]);
    let params = IngestArgs::parse_from(args).parse().unwrap();
    let tool = params.dump_tool.unwrap();
    assert_eq!(tool.program, PathBuf::from("/opt/nro/bin/sldump"));
    assert_eq!(tool.scratch_root, f.dir.path());
    assert_eq!(tool.timeout, Some(Duration::from_millis(2500)));
}

#[test]
fn test_parse_arrays_and_calibration() {
    let f = fixture();
    let mut args = base_args(&f);
    args.extend(
        ["-a", "A2", "a5", "--calibration", "chopper-wheel", "--tamb", "280"]
            .map(String::from),
    );
    let params = IngestArgs::parse_from(args).parse().unwrap();
    assert_eq!(
        params.selection,
        ArraySelection::Ids(vec!["A2".parse().unwrap(), "A5".parse().unwrap()])
    );
    assert_eq!(params.strategy, CalibrationStrategy::ChopperWheel);
    assert_eq!(params.tamb, 280.0);
}

#[test]
fn test_bad_arguments() {
    let f = fixture();

    let mut args = base_args(&f);
    args.extend(["--calibration", "magic"].map(String::from));
    let result = IngestArgs::parse_from(args).parse();
    assert!(matches!(result, Err(IngestArgsError::BadCalibration { .. })));

    let mut args = base_args(&f);
    args.extend(["-a", "A33"].map(String::from));
    let result = IngestArgs::parse_from(args).parse();
    assert!(matches!(result, Err(IngestArgsError::Schema(_))));

    let mut args = base_args(&f);
    args.push("--tamb=-1".to_string());
    let result = IngestArgs::parse_from(args).parse();
    assert!(matches!(result, Err(IngestArgsError::BadTamb { .. })));

    let mut args = base_args(&f);
    args.retain(|a| a != "--predumped");
    args.extend(["--dump-timeout", "0"].map(String::from));
    let result = IngestArgs::parse_from(args).parse();
    assert!(matches!(result, Err(IngestArgsError::BadTimeout { .. })));

    let result = IngestArgs::parse_from(["ingest"]).parse();
    assert!(matches!(
        result,
        Err(IngestArgsError::NoInput {
            what: "observation table"
        })
    ));

    let mut args = base_args(&f);
    args[2] = f.dir.path().join("nope.txt").display().to_string();
    let result = IngestArgs::parse_from(args).parse();
    assert!(matches!(result, Err(IngestArgsError::DoesntExist { .. })));
}

#[test]
fn test_arg_file_is_merged_with_cli_precedence() {
    let f = fixture();
    let toml = write_file(
        f.dir.path(),
        "ingest.toml",
        &formatdoc! {r#"
            obstable = "{obstable}"
            sam45log = "{sam45log}"
            fmlolog = "{fmlolog}"
            antlog = "{antlog}"
            tamb = 280.0
            calibration = "zero-subtracted"
            predumped = true
        "#,
            obstable = f.obstable.display(),
            sam45log = f.sam45log.display(),
            fmlolog = f.fmlolog.display(),
            antlog = f.antlog.display(),
        },
    );
    let args = IngestArgs::parse_from([
        "ingest",
        &toml.display().to_string(),
        "--tamb",
        "300",
    ])
    .merge()
    .unwrap();
    assert_eq!(args.tamb, Some(300.0));
    assert_eq!(args.calibration.as_deref(), Some("zero-subtracted"));
    assert!(args.predumped);
    assert_eq!(args.obstable.as_ref(), Some(&f.obstable));

    let params = args.parse().unwrap();
    assert_eq!(params.strategy, CalibrationStrategy::ZeroSubtracted);
}

#[test]
fn test_arg_file_json_and_bad_extension() {
    let f = fixture();
    let json = write_file(
        f.dir.path(),
        "ingest.json",
        &format!(
            r#"{{"obstable": "{}", "arrays": ["A2"]}}"#,
            f.obstable.display()
        ),
    );
    let args = IngestArgs::parse_from(["ingest", &json.display().to_string()])
        .merge()
        .unwrap();
    assert_eq!(args.obstable.as_ref(), Some(&f.obstable));
    assert_eq!(args.arrays, Some(vec!["A2".to_string()]));

    let yaml = write_file(f.dir.path(), "ingest.yaml", "tamb: 1");
    let result = IngestArgs::parse_from(["ingest", &yaml.display().to_string()]).merge();
    assert!(matches!(result, Err(FmloError::ArgFile(_))));

    let bad = write_file(f.dir.path(), "bad.toml", "tamb = \"hot\"");
    let result = IngestArgs::parse_from(["ingest", &bad.display().to_string()]).merge();
    assert!(matches!(result, Err(FmloError::ArgFile(_))));
}
