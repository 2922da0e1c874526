// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::Parser;
use tempfile::TempDir;

use super::*;
use crate::{psw::tests::write_psw, tests::write_file};

#[test]
fn test_parse() {
    let (file, options) = PswArgs::parse_from(["psw", "-f", "psw.fits"])
        .parse()
        .unwrap();
    assert_eq!(file, PathBuf::from("psw.fits"));
    assert_eq!(options, PswOptions::default());

    let (_, options) =
        PswArgs::parse_from(["psw", "-f", "psw.fits", "-s", "lsb", "-m", "0", "--hz"])
            .parse()
            .unwrap();
    assert_eq!(options.sideband, Sideband::Lsb);
    assert_eq!(options.maskedge, 0);
    assert!(!options.use_ghz);
}

#[test]
fn test_bad_arguments() {
    let result = PswArgs::parse_from(["psw"]).parse();
    assert!(matches!(result, Err(PswArgsError::NoInput)));

    let result = PswArgs::parse_from(["psw", "-f", "psw.fits", "-s", "DSB"]).parse();
    assert!(matches!(result, Err(PswArgsError::BadSideband { .. })));
}

#[test]
fn test_run() {
    let dir = TempDir::new().unwrap();
    let path = write_psw(dir.path(), true);
    let path = path.display().to_string();
    PswArgs::parse_from(["psw", "-f", &path]).run(false).unwrap();

    let missing = dir.path().join("missing.fits").display().to_string();
    assert!(PswArgs::parse_from(["psw", "-f", &missing]).run(true).is_ok());
    assert!(matches!(
        PswArgs::parse_from(["psw", "-f", &missing]).run(false),
        Err(FmloError::Cfitsio(_))
    ));
}

#[test]
fn test_arg_file() {
    let dir = TempDir::new().unwrap();
    let toml = write_file(dir.path(), "psw.toml", "file = \"a.fits\"\nsideband = \"LSB\"\n");
    let args = PswArgs::parse_from(["psw", &toml.display().to_string(), "-s", "USB"])
        .merge()
        .unwrap();
    assert_eq!(args.file, Some(PathBuf::from("a.fits")));
    assert_eq!(args.sideband.as_deref(), Some("USB"));
    assert!(!args.hz);
}
