use std::path::{
    Path,
    PathBuf,
};

use anyhow::{
    anyhow,
    bail,
    ensure,
    Context,
};
use hashbrown::HashMap;
use itertools::Itertools;
use log::{
    debug,
    info,
    warn,
};
use ndarray::{
    Array2,
    Axis,
};

use crate::io::tabular::{
    column_names,
    float_column,
    read_table,
    text_column,
    write_table,
};
use crate::io::LabeledMatrix;
use crate::utils::round_to;

const DEFAULT_INDEX_NAME: &str = "gene_id";

/// Columns of a feature lengths table. Unset fields fall back to: the first
/// column for identifiers, the first non-identifier column for names and the
/// last column for lengths.
#[derive(Debug, Clone, Default)]
pub struct LengthColumns {
    pub which:    Option<String>,
    pub id_col:   Option<String>,
    pub name_col: Option<String>,
}

/// Names and lengths of the features of a counts table, aligned with its
/// rows.
#[derive(Debug, Clone)]
pub struct FeatureLengths {
    pub names:   Vec<String>,
    pub lengths: Vec<f64>,
}

/// Raw counts of an expression matrix and their normalised values.
#[derive(Debug, Clone)]
pub struct NormTable {
    source:     PathBuf,
    index_name: String,
    ids:        Vec<String>,
    samples:    Vec<String>,
    counts:     Array2<f64>,
    lengths:    Option<FeatureLengths>,
    normalized: Option<Array2<f64>>,
}

impl NormTable {
    /// Reads a tab separated counts table. The first column holds feature
    /// identifiers, every other column one sample.
    pub fn read<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let df = read_table(path, b'\t')?;
        let matrix = LabeledMatrix::from_indexed_table(&df)
            .with_context(|| format!("Invalid counts table {}", path.display()))?;
        info!(
            "Read {} features x {} samples from {}",
            matrix.nrows(),
            matrix.ncols(),
            path.display()
        );
        Ok(Self {
            source:     path.to_path_buf(),
            index_name: matrix.index_name().to_string(),
            ids:        matrix.row_names().map(<[String]>::to_vec).unwrap_or_default(),
            samples:    matrix.col_names().to_vec(),
            counts:     matrix.data().clone(),
            lengths:    None,
            normalized: None,
        })
    }

    /// Reads feature lengths and restricts the counts to the features listed
    /// in both tables, keeping the order of the counts.
    pub fn set_lengths<P: AsRef<Path>>(
        &mut self,
        path: P,
        columns: &LengthColumns,
    ) -> anyhow::Result<&mut Self> {
        let path = path.as_ref();
        let df = read_table(path, b'\t')?;
        let names = column_names(&df);
        ensure!(
            names.len() >= 2,
            "Lengths table {} needs at least an identifier and a length column",
            path.display()
        );

        let id_col = match &columns.id_col {
            Some(col) if !names.contains(col) => {
                bail!("The column name '{}' is not in the file {}", col, path.display())
            },
            Some(col) => col.clone(),
            None => names[0].clone(),
        };
        let name_col = match &columns.name_col {
            Some(col) if !names.contains(col) => {
                bail!("The column name '{}' is not in the file {}", col, path.display())
            },
            Some(col) => col.clone(),
            None => names
                .iter()
                .find(|name| **name != id_col)
                .cloned()
                .ok_or_else(|| anyhow!("No name column in {}", path.display()))?,
        };
        let which = match &columns.which {
            Some(col) if !names.contains(col) => {
                bail!("The column name '{}' is not in the file {}", col, path.display())
            },
            Some(col) => col.clone(),
            None => names[names.len() - 1].clone(),
        };
        debug!(
            "Lengths columns: id={}, name={}, length={}",
            id_col, name_col, which
        );

        let ids = text_column(&df, &id_col)?;
        let feature_names = text_column(&df, &name_col)?;
        let lengths = float_column(&df, &which)?;

        let mut lookup: HashMap<String, (String, f64)> = HashMap::new();
        for ((id, name), length) in ids.into_iter().zip(feature_names).zip(lengths) {
            let (Some(id), Some(length)) = (id, length) else {
                continue;
            };
            if length <= 0.0 {
                warn!("Ignoring non-positive length {} of {}", length, id);
                continue;
            }
            lookup
                .entry(id)
                .or_insert_with(|| (name.unwrap_or_default(), length));
        }

        let keep = self
            .ids
            .iter()
            .enumerate()
            .filter(|(_, id)| lookup.contains_key(id.as_str()))
            .map(|(i, _)| i)
            .collect_vec();
        ensure!(
            !keep.is_empty(),
            "None of the identifiers of {} were found in {}",
            self.source.display(),
            path.display()
        );
        if keep.len() < self.ids.len() {
            warn!(
                "{} of {} features have no length and are dropped",
                self.ids.len() - keep.len(),
                self.ids.len()
            );
        }

        self.counts = self.counts.select(Axis(0), &keep);
        self.ids = keep.iter().map(|&i| self.ids[i].clone()).collect();
        let (names, lengths): (Vec<String>, Vec<f64>) = self
            .ids
            .iter()
            .filter_map(|id| lookup.get(id.as_str()).cloned())
            .unzip();
        self.lengths = Some(FeatureLengths { names, lengths });
        self.normalized = None;

        if self.index_name.is_empty() {
            self.index_name = if id_col.is_empty() {
                DEFAULT_INDEX_NAME.to_string()
            }
            else {
                id_col
            };
        }
        Ok(self)
    }

    /// Transcripts per million. Requires lengths.
    pub fn to_tpm(
        &mut self,
        digits: u32,
        log: bool,
    ) -> anyhow::Result<&mut Self> {
        let lengths = self
            .lengths
            .as_ref()
            .ok_or_else(|| anyhow!("The table does not have lengths"))?;

        let mut values = self.counts.clone();
        for (mut row, length) in values.axis_iter_mut(Axis(0)).zip(lengths.lengths.iter()) {
            row.mapv_inplace(|count| count / length);
        }
        scale_columns(&mut values);
        self.normalized = Some(finish(values, digits, log));
        info!("Normalised {} samples to TPM", self.samples.len());
        Ok(self)
    }

    /// Counts per million.
    pub fn to_cpm(
        &mut self,
        digits: u32,
        log: bool,
    ) -> anyhow::Result<&mut Self> {
        let mut values = self.counts.clone();
        scale_columns(&mut values);
        self.normalized = Some(finish(values, digits, log));
        info!("Normalised {} samples to CPM", self.samples.len());
        Ok(self)
    }

    /// Writes the normalised values as a tab separated table. With
    /// `use_names`, feature names from the lengths table replace the
    /// identifiers.
    pub fn save<P: AsRef<Path>>(
        &self,
        path: P,
        use_names: bool,
    ) -> anyhow::Result<()> {
        let values = self
            .normalized
            .as_ref()
            .ok_or_else(|| anyhow!("The table has not been normalised"))?;
        let labels = if use_names {
            self.lengths
                .as_ref()
                .map(|l| l.names.clone())
                .ok_or_else(|| anyhow!("Feature names require a lengths table"))?
        }
        else {
            self.ids.clone()
        };
        let mut matrix =
            LabeledMatrix::try_new(values.clone(), Some(labels), self.samples.clone())?;
        matrix.set_index_name(&self.index_name);
        let mut df = matrix.to_table()?;
        write_table(&mut df, path.as_ref(), b'\t')?;
        info!("Saved normalised table to {}", path.as_ref().display());
        Ok(())
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn counts(&self) -> &Array2<f64> {
        &self.counts
    }

    pub fn lengths(&self) -> Option<&FeatureLengths> {
        self.lengths.as_ref()
    }

    pub fn normalized(&self) -> Option<&Array2<f64>> {
        self.normalized.as_ref()
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }
}

/// Scales every column to sum to one million. Each sample is scaled by its
/// own library size, not by the total of the matrix. Columns summing to zero
/// are left as zeros.
fn scale_columns(values: &mut Array2<f64>) {
    for mut column in values.axis_iter_mut(Axis(1)) {
        let total: f64 = column.sum();
        if total > 0.0 {
            column.mapv_inplace(|v| v / total * 1e6);
        }
        else {
            column.fill(0.0);
        }
    }
}

fn finish(
    mut values: Array2<f64>,
    digits: u32,
    log: bool,
) -> Array2<f64> {
    if log {
        values.mapv_inplace(f64::ln_1p);
    }
    values.mapv_inplace(|v| round_to(v, digits));
    values
}
