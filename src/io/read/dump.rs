// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Running the external utility that dumps a binary SAM45 log into text.

use std::{
    io::Read,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use log::{debug, info};
use scopeguard::ScopeGuard;
use tempfile::TempDir;

use super::IngestError;
use crate::constants::{DEFAULT_DUMP_TOOL, DUMP_FILENAME, DUMP_TOOL_ARGS};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How to run the dump utility.
#[derive(Debug, Clone)]
pub struct DumpTool {
    /// The executable.
    pub program: PathBuf,

    /// Scratch directories are created in here.
    pub scratch_root: PathBuf,

    /// If set, the utility is killed if it runs longer than this.
    pub timeout: Option<Duration>,
}

impl Default for DumpTool {
    fn default() -> Self {
        DumpTool {
            program: PathBuf::from(DEFAULT_DUMP_TOOL),
            scratch_root: std::env::temp_dir(),
            timeout: None,
        }
    }
}

/// Dumped text living in a scratch directory. The directory is removed when
/// this is dropped.
#[derive(Debug)]
pub struct DumpedLog {
    dir: TempDir,
    path: PathBuf,
}

impl DumpedLog {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn scratch_dir(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for DumpedLog {
    fn drop(&mut self) {
        debug!("Removing scratch directory {}", self.dir.path().display());
    }
}

impl DumpTool {
    /// Dump the raw SAM45 log at `raw_log` into text. The child process is
    /// killed and reaped if anything goes wrong while waiting for it.
    pub fn dump(&self, raw_log: &Path) -> Result<DumpedLog, IngestError> {
        let dir = tempfile::Builder::new()
            .prefix("nro_fmlo_")
            .tempdir_in(&self.scratch_root)
            .map_err(|err| IngestError::Scratch {
                root: self.scratch_root.clone(),
                err,
            })?;
        let path = dir.path().join(DUMP_FILENAME);
        let dumped = DumpedLog { dir, path };

        info!("Dumping {}", raw_log.display());
        debug!(
            "Running {} {} {} {}",
            self.program.display(),
            raw_log.display(),
            dumped.path.display(),
            DUMP_TOOL_ARGS.join(" ")
        );
        let child = Command::new(&self.program)
            .arg(raw_log)
            .arg(&dumped.path)
            .args(DUMP_TOOL_ARGS)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| IngestError::DumpSpawn {
                tool: self.program.clone(),
                err,
            })?;
        let mut child = scopeguard::guard(child, |mut child| {
            debug!("Killing the dump utility");
            let _ = child.kill();
            let _ = child.wait();
        });

        // Drain stderr on another thread so a chatty child can't block on a
        // full pipe.
        let stderr_handle = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });

        let status = match self.timeout {
            None => child.wait()?,
            Some(timeout) => {
                let start = Instant::now();
                loop {
                    if let Some(status) = child.try_wait()? {
                        break status;
                    }
                    if start.elapsed() >= timeout {
                        // Dropping the guard kills the child.
                        return Err(IngestError::DumpTimeout {
                            tool: self.program.clone(),
                            secs: timeout.as_secs_f64(),
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        };
        // The child has been reaped; nothing left to clean up.
        let _ = ScopeGuard::into_inner(child);

        let stderr = stderr_handle
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        if !status.success() {
            return Err(IngestError::DumpFailed {
                tool: self.program.clone(),
                status: status.to_string(),
                stderr,
            });
        }
        if !stderr.trim().is_empty() {
            debug!("Dump utility stderr: {}", stderr.trim());
        }
        if !dumped.path.exists() {
            return Err(IngestError::DumpOutputMissing {
                path: dumped.path.clone(),
            });
        }

        Ok(dumped)
    }
}
