//! Class label files.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Class names indexed by model output position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels {
    names: Vec<String>,
}

impl Labels {
    /// Read one label per line.
    ///
    /// # File Format
    /// - Line `n` (0-based) names class `n`
    /// - Surrounding whitespace is trimmed
    /// - Blank lines are kept as unnamed classes so later indices stay aligned
    pub fn from_file(path: &Path) -> Result<Self> {
        let read_err = |source| Error::LabelsRead {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(read_err)?;

        let mut names = Vec::new();
        for line in BufReader::new(file).lines() {
            names.push(line.map_err(read_err)?.trim().to_string());
        }
        while names.last().is_some_and(String::is_empty) {
            names.pop();
        }

        Ok(Self { names })
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when no labels are loaded.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Label for `index`, if present and non-blank.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names
            .get(index)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Label for `index`, or `class <index>` when unknown.
    pub fn name_or_index(&self, index: usize) -> String {
        self.get(index)
            .map_or_else(|| format!("class {index}"), str::to_string)
    }
}
