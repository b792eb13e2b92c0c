//! Removal of entries from EcoTyper datasets.
//!
//! A dataset is a pair of tab separated tables: an annotation with one row
//! per cell or sample, indexed by its identifier, and an expression matrix
//! with one column per identifier. Dropping entries removes the matching
//! annotation rows together with their expression columns.

use std::path::{
    Path,
    PathBuf,
};

use anyhow::{
    anyhow,
    Context,
};
use hashbrown::HashSet;
use itertools::Itertools;
use log::{
    debug,
    info,
    warn,
};
use polars::prelude::*;

use crate::io::append_to_name;
use crate::io::tabular::{
    column_names,
    filter_rows,
    read_table,
    select_columns,
    text_column,
    text_column_at,
    write_table,
};
use crate::settings::{
    CELL_TYPE_COL,
    ID_COL,
    SAMPLE_COL,
};

/// Columns an annotation needs to be used by EcoTyper.
pub const ANNOTATION_COLS: [&str; 3] = [ID_COL, CELL_TYPE_COL, SAMPLE_COL];

#[derive(Debug, Clone)]
pub struct Dataset {
    annotation: DataFrame,
    expression: DataFrame,
}

impl Dataset {
    pub fn new(
        annotation: DataFrame,
        expression: DataFrame,
    ) -> Self {
        Self {
            annotation,
            expression,
        }
    }

    /// Reads both tables. Warns about EcoTyper columns missing from the
    /// annotation.
    pub fn read<P: AsRef<Path>, Q: AsRef<Path>>(
        annotation: P,
        expression: Q,
    ) -> anyhow::Result<Self> {
        let (annotation, expression) = (annotation.as_ref(), expression.as_ref());
        let annotation_df = read_table(annotation, b'\t')
            .with_context(|| format!("Could not read annotation {}", annotation.display()))?;
        let expression_df = read_table(expression, b'\t')
            .with_context(|| format!("Could not read expression {}", expression.display()))?;
        let names = column_names(&annotation_df);
        for column in ANNOTATION_COLS {
            if !names.iter().any(|name| name == column) {
                warn!(
                    "The annotation is not EcoTyper-friendly (yet): column {} not found",
                    column
                );
            }
        }
        debug!(
            "Read {} annotated entries and an expression matrix of {} columns",
            annotation_df.height(),
            expression_df.width()
        );
        Ok(Self::new(annotation_df, expression_df))
    }

    /// Drops the entries whose `column` value is one of `values`. The `ID`
    /// column falls back to the index when the annotation has no such
    /// column. Returns the dropped identifiers.
    pub fn drop_from_column(
        &mut self,
        values: &[String],
        column: &str,
    ) -> anyhow::Result<Vec<String>> {
        let names = column_names(&self.annotation);
        let index = text_column_at(&self.annotation, 0)?;
        let selected = if names.iter().skip(1).any(|name| name == column) {
            text_column(&self.annotation, column)?
        }
        else if column == ID_COL || names.first().is_some_and(|name| name == column) {
            index.clone()
        }
        else {
            return Err(anyhow!("Column {} not found in the annotation", column));
        };

        let values: HashSet<&str> = values.iter().map(String::as_str).collect();
        let drop_mask = selected
            .iter()
            .map(|value| value.as_deref().is_some_and(|v| values.contains(v)))
            .collect_vec();
        let dropped = index
            .into_iter()
            .zip(drop_mask.iter())
            .filter_map(|(id, &drop)| if drop { id } else { None })
            .collect_vec();
        let keep = drop_mask.iter().map(|drop| !drop).collect_vec();
        self.annotation = filter_rows(&self.annotation, &keep)?;

        let expression_cols = column_names(&self.expression);
        let present: HashSet<&str> = expression_cols.iter().skip(1).map(String::as_str).collect();
        let missing = dropped
            .iter()
            .filter(|id| !present.contains(id.as_str()))
            .collect_vec();
        if !missing.is_empty() {
            warn!(
                "{} dropped entries are not in the expression matrix: {}",
                missing.len(),
                missing.iter().join(", ")
            );
        }
        let keep_cols = {
            let dropped_set: HashSet<&str> = dropped.iter().map(String::as_str).collect();
            expression_cols
                .iter()
                .enumerate()
                .filter(|(i, name)| *i == 0 || !dropped_set.contains(name.as_str()))
                .map(|(_, name)| name.clone())
                .collect_vec()
        };
        self.expression = select_columns(&self.expression, &keep_cols)?;

        info!("Dropped {} entries by {}", dropped.len(), column);
        Ok(dropped)
    }

    pub fn write<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        annotation: P,
        expression: Q,
    ) -> anyhow::Result<()> {
        let mut annotation_df = self.annotation.clone();
        let mut expression_df = self.expression.clone();
        write_table(&mut annotation_df, annotation.as_ref(), b'\t')?;
        write_table(&mut expression_df, expression.as_ref(), b'\t')?;
        Ok(())
    }

    pub fn annotation(&self) -> &DataFrame {
        &self.annotation
    }

    pub fn expression(&self) -> &DataFrame {
        &self.expression
    }
}

#[derive(Debug, Clone)]
pub struct DropOptions {
    pub ids:           Vec<String>,
    pub samples:       Vec<String>,
    pub cell_types:    Vec<String>,
    pub id_col:        String,
    pub sample_col:    String,
    pub cell_type_col: String,
    /// Basename of `<basename>.annotation.tsv` and
    /// `<basename>.expression.tsv`. The inputs with a `.drop` suffix are
    /// written otherwise.
    pub output:        Option<PathBuf>,
}

impl Default for DropOptions {
    fn default() -> Self {
        Self {
            ids:           Vec::new(),
            samples:       Vec::new(),
            cell_types:    Vec::new(),
            id_col:        ID_COL.to_string(),
            sample_col:    SAMPLE_COL.to_string(),
            cell_type_col: CELL_TYPE_COL.to_string(),
            output:        None,
        }
    }
}

/// Paths the reduced annotation and expression are written to.
pub fn output_paths<P: AsRef<Path>, Q: AsRef<Path>>(
    annotation: P,
    expression: Q,
    basename: Option<&Path>,
) -> (PathBuf, PathBuf) {
    match basename {
        Some(base) => (
            append_to_name(base, ".annotation.tsv"),
            append_to_name(base, ".expression.tsv"),
        ),
        None => (
            append_to_name(annotation.as_ref(), ".drop"),
            append_to_name(expression.as_ref(), ".drop"),
        ),
    }
}

/// Drops identifiers, then samples, then cell types, and writes the reduced
/// dataset. Returns the written annotation and expression paths.
pub fn drop_entries<P: AsRef<Path>, Q: AsRef<Path>>(
    annotation: P,
    expression: Q,
    options: &DropOptions,
) -> anyhow::Result<(PathBuf, PathBuf)> {
    let (annotation, expression) = (annotation.as_ref(), expression.as_ref());
    let mut dataset = Dataset::read(annotation, expression)?;
    for (values, column) in [
        (&options.ids, &options.id_col),
        (&options.samples, &options.sample_col),
        (&options.cell_types, &options.cell_type_col),
    ] {
        if !values.is_empty() {
            dataset.drop_from_column(values, column)?;
        }
    }
    let (annotation_out, expression_out) =
        output_paths(annotation, expression, options.output.as_deref());
    dataset.write(&annotation_out, &expression_out)?;
    info!(
        "Wrote {} and {}",
        annotation_out.display(),
        expression_out.display()
    );
    Ok((annotation_out, expression_out))
}

#[cfg(test)]
mod tests;
