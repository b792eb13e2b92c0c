use std::fs;
use std::path::{
    Path,
    PathBuf,
};

use anyhow::Context;
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;

use crate::settings::ECOTYPES_DIR;

/// Cell types found in one or more EcoTyper result directories, each with
/// the directories holding its results.
#[derive(Debug, Clone, Default)]
pub struct CellTypeCollection {
    cell_types: IndexMap<String, Vec<PathBuf>>,
}

impl CellTypeCollection {
    /// Every sub-directory of an EcoTyper result directory is a cell type,
    /// except the ecotype results.
    pub fn from_dirs<P: AsRef<Path>>(dirs: &[P]) -> anyhow::Result<Self> {
        let mut cell_types: IndexMap<String, Vec<PathBuf>> = IndexMap::new();
        for dir in dirs {
            let dir = dir.as_ref();
            let entries = fs::read_dir(dir)
                .with_context(|| format!("Could not list {}", dir.display()))?
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .sorted()
                .collect_vec();
            for path in entries {
                let name = match path.file_name() {
                    Some(name) => name.to_string_lossy().to_string(),
                    None => continue,
                };
                if name == ECOTYPES_DIR {
                    continue;
                }
                cell_types.entry(name).or_default().push(path);
            }
        }
        debug!("Found {} cell types", cell_types.len());
        Ok(Self { cell_types })
    }

    pub fn from_dir<P: AsRef<Path>>(dir: P) -> anyhow::Result<Self> {
        Self::from_dirs(&[dir.as_ref()])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cell_types.keys().map(String::as_str)
    }

    pub fn get(
        &self,
        cell_type: &str,
    ) -> Option<&[PathBuf]> {
        self.cell_types.get(cell_type).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<PathBuf>)> {
        self.cell_types.iter()
    }

    pub fn len(&self) -> usize {
        self.cell_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_types.is_empty()
    }
}
