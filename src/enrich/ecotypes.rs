use std::path::Path;

use anyhow::{
    ensure,
    Context,
};
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use serde::Deserialize;

use super::gene_sets::gene_set_filename;
use crate::settings::{
    ECOTYPES_DIR,
    ECOTYPES_FILE,
};

#[derive(Debug, Clone, Deserialize)]
struct EcotypeRow {
    #[serde(rename = "CellType")]
    cell_type: String,
    #[serde(rename = "State")]
    state:     String,
    #[serde(rename = "Ecotype")]
    ecotype:   String,
}

/// The cell states assigned to one ecotype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ecotype {
    label:  String,
    states: Vec<(String, String)>,
}

impl Ecotype {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// `(cell type, state)` pairs.
    pub fn states(&self) -> &[(String, String)] {
        &self.states
    }

    /// Names of the gene set files of the member states.
    pub fn gene_set_filenames(&self) -> Vec<String> {
        self.states
            .iter()
            .map(|(cell_type, state)| gene_set_filename(cell_type, state))
            .collect()
    }
}

/// Ecotypes of a single EcoTyper run, read from `Ecotypes/ecotypes.txt`.
#[derive(Debug, Clone, Default)]
pub struct EcotypeCollection {
    ecotypes: Vec<Ecotype>,
}

impl EcotypeCollection {
    pub fn from_dir<P: AsRef<Path>>(ecotyper_dir: P) -> anyhow::Result<Self> {
        let path = ecotyper_dir
            .as_ref()
            .join(ECOTYPES_DIR)
            .join(ECOTYPES_FILE);
        Self::from_file(path)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Could not open ecotype assignments {}", path.display()))?;
        let mut grouped: IndexMap<String, Vec<(String, String)>> = IndexMap::new();
        for row in reader.deserialize::<EcotypeRow>() {
            let row = row.with_context(|| format!("Malformed row in {}", path.display()))?;
            grouped
                .entry(row.ecotype)
                .or_default()
                .push((row.cell_type, row.state));
        }
        ensure!(!grouped.is_empty(), "{} assigns no ecotypes", path.display());
        debug!("Read {} ecotypes from {}", grouped.len(), path.display());
        let ecotypes = grouped
            .into_iter()
            .map(|(label, states)| Ecotype { label, states })
            .collect_vec();
        Ok(Self { ecotypes })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ecotype> {
        self.ecotypes.iter()
    }

    pub fn get(
        &self,
        label: &str,
    ) -> Option<&Ecotype> {
        self.ecotypes.iter().find(|e| e.label == label)
    }

    pub fn len(&self) -> usize {
        self.ecotypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ecotypes.is_empty()
    }
}
