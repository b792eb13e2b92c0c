//! Loading of enrichment results for downstream evaluation.
//!
//! Results are either stored as files directly in a directory (one per cell
//! type, or per cell type and state when they were not assembled) or in one
//! sub-directory per ecotype. An [`EnrichmentCollection`] holds one table per
//! cell type or per ecotype, each with a leading `CellType` column.

use std::fmt::Display;
use std::path::{
    Path,
    PathBuf,
};
use std::str::FromStr;

use anyhow::{
    anyhow,
    bail,
    Context,
};
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use polars::prelude::*;

use super::{
    list_files,
    EnrichKind,
};
use crate::io::tabular::{
    column_names,
    concat_tables,
    prepend_column,
    read_table,
    replace_column,
    text_column,
    text_series,
};
use crate::settings::CELL_TYPE_COL;

/// Separator between library and term in combined term labels.
pub const TERM_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// One table per result file.
    CellType,
    /// One table per ecotype sub-directory.
    Ecotype,
}

impl FromStr for Resolution {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "celltype" => Ok(Self::CellType),
            "ecotype" => Ok(Self::Ecotype),
            other => Err(anyhow!(
                "Resolution must be one of celltype, ecotype, got '{}'",
                other
            )),
        }
    }
}

impl Display for Resolution {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::CellType => write!(f, "celltype"),
            Self::Ecotype => write!(f, "ecotype"),
        }
    }
}

fn ecotype_dirs(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    Ok(std::fs::read_dir(dir)
        .with_context(|| format!("Could not list {}", dir.display()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy().starts_with('E'))
        })
        .sorted()
        .collect())
}

fn detect_resolution(dir: &Path) -> anyhow::Result<Resolution> {
    let has_files = !list_files(dir)?.is_empty();
    let has_ecotypes = !ecotype_dirs(dir)?.is_empty();
    match (has_files, has_ecotypes) {
        (true, true) => bail!(
            "{} holds both files and ecotype directories, specify the resolution",
            dir.display()
        ),
        (true, false) => Ok(Resolution::CellType),
        (false, true) => Ok(Resolution::Ecotype),
        (false, false) => bail!("{} holds no enrichment results", dir.display()),
    }
}

fn detect_kind(
    dir: &Path,
    resolution: Resolution,
) -> anyhow::Result<EnrichKind> {
    let probe = match resolution {
        Resolution::CellType => dir.to_path_buf(),
        Resolution::Ecotype => ecotype_dirs(dir)?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("{} holds no ecotype directories", dir.display()))?,
    };
    let names = list_files(&probe)?
        .into_iter()
        .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect_vec();
    let has = |kind: EnrichKind| names.iter().any(|name| name.ends_with(kind.suffix()));
    match (has(EnrichKind::Enrichr), has(EnrichKind::Prerank)) {
        (true, true) => bail!(
            "{} holds both enrichr and prerank results, specify which to load",
            probe.display()
        ),
        (true, false) => Ok(EnrichKind::Enrichr),
        (false, true) => Ok(EnrichKind::Prerank),
        (false, false) => bail!("{} holds no enrichment results", probe.display()),
    }
}

/// Cell type (or cell type and state) a result file belongs to.
fn cell_type_of(
    filename: &str,
    kind: EnrichKind,
) -> String {
    let stem = filename.strip_suffix(kind.suffix()).unwrap_or(filename);
    stem.split(".txt").next().unwrap_or(stem).to_string()
}

fn load_tables(
    dir: &Path,
    kind: EnrichKind,
) -> anyhow::Result<Vec<(String, DataFrame)>> {
    list_files(dir)?
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_string_lossy().to_string();
            name.ends_with(kind.suffix())
                .then(|| (cell_type_of(&name, kind), path))
        })
        .map(|(cell_type, path)| {
            let df = read_table(&path, b'\t')
                .with_context(|| format!("Could not read {}", path.display()))?;
            let labels = vec![Some(cell_type.clone()); df.height()];
            let df = prepend_column(&df, text_series(CELL_TYPE_COL, labels))?;
            Ok((cell_type, df))
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct EnrichmentCollection {
    directory:  PathBuf,
    resolution: Resolution,
    kind:       EnrichKind,
    data:       IndexMap<String, DataFrame>,
}

impl EnrichmentCollection {
    /// Loads the results in `dir`. The resolution and the kind of results
    /// are detected when not given and the directory is unambiguous.
    pub fn load<P: AsRef<Path>>(
        dir: P,
        resolution: Option<Resolution>,
        kind: Option<EnrichKind>,
    ) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let resolution = match resolution {
            Some(resolution) => resolution,
            None => detect_resolution(dir)?,
        };
        let kind = match kind {
            Some(kind) => kind,
            None => detect_kind(dir, resolution)?,
        };

        let mut data = IndexMap::new();
        match resolution {
            Resolution::CellType => {
                data.extend(load_tables(dir, kind)?);
            },
            Resolution::Ecotype => {
                for ecotype_dir in ecotype_dirs(dir)? {
                    let label = ecotype_dir
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default();
                    let tables = load_tables(&ecotype_dir, kind)?
                        .into_iter()
                        .map(|(_, df)| df)
                        .collect_vec();
                    if tables.is_empty() {
                        debug!("No {} results in {}", kind, ecotype_dir.display());
                        continue;
                    }
                    data.insert(label, concat_tables(tables)?);
                }
            },
        }
        debug!(
            "Loaded {} {} tables at {} resolution",
            data.len(),
            kind,
            resolution
        );
        Ok(Self {
            directory: dir.to_path_buf(),
            resolution,
            kind,
            data,
        })
    }

    /// Splits `Gene_set__Term` labels of the `Term` column into the library
    /// (`Gene_set`) and the term.
    pub fn split_terms(&mut self) -> anyhow::Result<()> {
        for df in self.data.values_mut() {
            let terms = text_column(df, "Term")?;
            let mut gene_sets = if column_names(df).iter().any(|c| c == "Gene_set") {
                text_column(df, "Gene_set")?
            }
            else {
                vec![None; df.height()]
            };
            let terms = terms
                .into_iter()
                .zip(gene_sets.iter_mut())
                .map(|(term, gene_set)| {
                    let term = term?;
                    match term.split_once(TERM_SEPARATOR) {
                        Some((library, rest)) => {
                            *gene_set = Some(library.to_string());
                            Some(rest.to_string())
                        },
                        None => Some(term),
                    }
                })
                .collect_vec();
            replace_column(df, text_series("Term", terms))?;
            replace_column(df, text_series("Gene_set", gene_sets))?;
        }
        Ok(())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn kind(&self) -> EnrichKind {
        self.kind
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&DataFrame> {
        self.data.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DataFrame)> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    const ENRICHR: &str = "Gene_set\tTerm\tP-value\nL\tA\t0.1\n";
    const PRERANK: &str = "Gene_set\tTerm\tNES\nL\tKEGG__Apoptosis\t1.5\nL\tPlain\t-1\n";

    #[test]
    fn celltype_resolution_is_detected() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("B.cells.enrichr.txt"), ENRICHR)?;
        fs::write(dir.path().join("T.cells_S01.txt.enrichr.txt"), ENRICHR)?;

        let collection = EnrichmentCollection::load(dir.path(), None, None)?;
        assert_eq!(collection.resolution(), Resolution::CellType);
        assert_eq!(collection.kind(), EnrichKind::Enrichr);
        assert_eq!(collection.keys().collect_vec(), vec!["B.cells", "T.cells_S01"]);
        let df = collection.get("T.cells_S01").cloned().unwrap();
        assert_eq!(column_names(&df)[0], CELL_TYPE_COL);
        Ok(())
    }

    #[test]
    fn ecotype_results_are_concatenated() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let e1 = dir.path().join("E1");
        fs::create_dir(&e1)?;
        fs::write(e1.join("B.cells_S01.txt.prerank.txt"), PRERANK)?;
        fs::write(e1.join("T.cells_S02.txt.prerank.txt"), PRERANK)?;

        let mut collection = EnrichmentCollection::load(dir.path(), None, None)?;
        assert_eq!(collection.resolution(), Resolution::Ecotype);
        assert_eq!(collection.kind(), EnrichKind::Prerank);
        assert_eq!(collection.get("E1").map(DataFrame::height), Some(4));

        collection.split_terms()?;
        let df = collection.get("E1").cloned().unwrap();
        let terms = text_column(&df, "Term")?;
        let sets = text_column(&df, "Gene_set")?;
        assert_eq!(terms[0].as_deref(), Some("Apoptosis"));
        assert_eq!(sets[0].as_deref(), Some("KEGG"));
        assert_eq!(terms[1].as_deref(), Some("Plain"));
        assert_eq!(sets[1].as_deref(), Some("L"));
        Ok(())
    }

    #[test]
    fn ambiguous_directories_need_options() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("B.cells.enrichr.txt"), ENRICHR)?;
        fs::write(dir.path().join("B.cells.prerank.txt"), PRERANK)?;
        assert!(EnrichmentCollection::load(dir.path(), None, None).is_err());

        let collection =
            EnrichmentCollection::load(dir.path(), None, Some(EnrichKind::Prerank))?;
        assert_eq!(collection.len(), 1);

        fs::create_dir(dir.path().join("E1"))?;
        assert!(EnrichmentCollection::load(dir.path(), None, Some(EnrichKind::Prerank)).is_err());
        Ok(())
    }
}
