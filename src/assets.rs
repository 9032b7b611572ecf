//! Startup check for model assets.
//!
//! Existence only; file contents are validated by whoever loads them.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetStatus {
    pub path: PathBuf,
    pub found: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetReport {
    pub entries: Vec<AssetStatus>,
}

impl AssetReport {
    pub fn check<P: AsRef<Path>>(paths: &[P]) -> Self {
        Self {
            entries: paths
                .iter()
                .map(|p| AssetStatus {
                    path: p.as_ref().to_path_buf(),
                    found: p.as_ref().exists(),
                })
                .collect(),
        }
    }

    pub fn missing(&self) -> Vec<&Path> {
        self.entries
            .iter()
            .filter(|entry| !entry.found)
            .map(|entry| entry.path.as_path())
            .collect()
    }

    pub fn all_found(&self) -> bool {
        self.entries.iter().all(|entry| entry.found)
    }

    /// One console line per asset.
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| {
                let status = if entry.found { "found" } else { "MISSING" };
                format!("{:>7}: {}", status, entry.path.display())
            })
            .collect()
    }

    /// Error listing every missing file, or Ok when all are present.
    pub fn require_all(&self) -> Result<()> {
        let missing = self.missing();
        if missing.is_empty() {
            return Ok(());
        }
        let list: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
        Err(anyhow!("missing required files: {}", list.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_each_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let present = dir.path().join("yolov4-tiny.cfg");
        std::fs::write(&present, "[net]\n")?;
        let absent = dir.path().join("yolov4-tiny.weights");

        let report = AssetReport::check(&[&present, &absent]);
        assert!(!report.all_found());
        assert_eq!(report.missing(), vec![absent.as_path()]);
        let lines = report.lines();
        assert!(lines[0].starts_with("  found"));
        assert!(lines[1].contains("MISSING"));
        let err = report.require_all().unwrap_err().to_string();
        assert!(err.contains("yolov4-tiny.weights"));
        assert!(!err.contains("yolov4-tiny.cfg"));
        Ok(())
    }

    #[test]
    fn all_present_passes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let names = dir.path().join("coco.names");
        std::fs::write(&names, "cat\n")?;
        let report = AssetReport::check(&[names]);
        assert!(report.all_found());
        report.require_all()
    }
}
