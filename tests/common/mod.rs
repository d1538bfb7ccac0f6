#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use sas_reader_step::config::StepConfig;
use tempfile::{TempDir, tempdir};

/// Three people, one of them without a score.
pub const PEOPLE_CSV: &str = "\
ID,NAME,SCORE,VISIT
1,Ann,1.5,2024-01-02
2,Bo,,2024-02-03
3,Cy,7.25,
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    /// Saves `config` as YAML under the workspace and returns the path.
    pub fn write_config(&self, name: &str, config: &StepConfig) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        config.save(&path).expect("save step config");
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.temp_dir.path().join(name)).expect("read workspace file")
    }
}
