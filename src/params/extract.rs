// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use log::{debug, info};
use rayon::prelude::*;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;
use vec1::Vec1;

use crate::{
    container::{Container, ContainerError},
    extract::{ExtractOptions, ExtractionError},
    PROGRESS_BARS,
};

lazy_static::lazy_static! {
    pub static ref SCAN_OUTPUT_EXTENSIONS: String = {
        use strum::IntoEnumIterator;
        ScanOutputType::iter().join(", ")
    };
}

/// The file types extracted scans can be written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter, EnumString)]
pub enum ScanOutputType {
    #[default]
    #[strum(serialize = "fits")]
    Fits,

    #[strum(serialize = "json")]
    Json,
}

/// Extract scans of many arrays from one container.
#[derive(Debug, Clone)]
pub struct ExtractParams {
    pub container: PathBuf,

    /// Array labels, e.g. "A1".
    pub labels: Vec1<String>,

    pub options: ExtractOptions,

    pub output_dir: PathBuf,

    pub output_type: ScanOutputType,
}

impl ExtractParams {
    /// Where the scan of an array goes: `<output_dir>/<container stem>_<label>.<type>`.
    pub fn output_path(&self, label: &str) -> PathBuf {
        let stem = self
            .container
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "fmscan".to_string());
        self.output_dir
            .join(format!("{stem}_{label}.{}", self.output_type))
    }

    /// Extract and write every requested array. The written files are
    /// returned in the order of the labels.
    pub fn run(&self) -> Result<Vec<PathBuf>, ExtractError> {
        let container = Container::read(&self.container)?;
        self.run_with(&container)
    }

    /// Like [`ExtractParams::run`], but with a container that has already
    /// been read. Arrays are extracted in parallel; they only share the
    /// container.
    pub fn run_with(&self, container: &Container) -> Result<Vec<PathBuf>, ExtractError> {
        if !self.output_dir.exists() {
            debug!("Creating {}", self.output_dir.display());
            std::fs::create_dir_all(&self.output_dir)?;
        }

        let progress = ProgressBar::with_draw_target(
            Some(self.labels.len() as _),
            if PROGRESS_BARS.load() {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:18}: [{wide_bar:.blue}] {pos:2}/{len:2} arrays ({elapsed_precise})")
                .unwrap()
                .progress_chars("=> "),
        )
        .with_message("Extracting");

        let paths = self
            .labels
            .par_iter()
            .map(|label| -> Result<PathBuf, ExtractionError> {
                let scan = container.fmscan(label, &self.options)?;
                let path = self.output_path(&scan.array.to_string());
                scan.write(&path)?;
                progress.inc(1);
                Ok(path)
            })
            .collect::<Result<Vec<_>, ExtractionError>>()?;
        progress.abandon_with_message("Finished extracting");

        info!("Wrote {}", paths.iter().map(|p| p.display()).join(", "));
        Ok(paths)
    }
}

/// Every array label in a container, in order; an error if there are none.
pub(crate) fn all_labels(container: &Container, path: &Path) -> Result<Vec1<String>, ExtractError> {
    Vec1::try_from_vec(container.array_labels()).map_err(|_| ExtractError::NoArrays {
        path: path.to_path_buf(),
    })
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("{path} doesn't have any array extensions")]
    NoArrays { path: PathBuf },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
