//! Class-name list handling.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

/// Ordered class names, one per line of the names file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read class names {}", path.display()))?;
        Ok(Self::parse(&raw))
    }

    /// Each line is trimmed. Blank lines still occupy an index.
    pub fn parse(raw: &str) -> Self {
        Self {
            names: raw.lines().map(|line| line.trim().to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    /// Index of the first exact match.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .ok_or_else(|| anyhow!("class '{}' not found in class list", name))
    }
}
