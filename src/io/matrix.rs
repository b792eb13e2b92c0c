use anyhow::{
    anyhow,
    bail,
    ensure,
};
use itertools::Itertools;
use log::debug;
use ndarray::Array2;
use polars::prelude::*;

use super::tabular::{
    column_names,
    float_column,
    is_numeric_column,
    text_column_at,
};
use crate::utils::format_float;

/// Dense numeric matrix with optional row labels and column labels.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMatrix {
    data:       Array2<f64>,
    row_names:  Option<Vec<String>>,
    col_names:  Vec<String>,
    index_name: String,
}

impl LabeledMatrix {
    pub fn try_new(
        data: Array2<f64>,
        row_names: Option<Vec<String>>,
        col_names: Vec<String>,
    ) -> anyhow::Result<Self> {
        ensure!(
            col_names.len() == data.ncols(),
            "Got {} column names for {} columns",
            col_names.len(),
            data.ncols()
        );
        if let Some(rows) = &row_names {
            ensure!(
                rows.len() == data.nrows(),
                "Got {} row names for {} rows",
                rows.len(),
                data.nrows()
            );
        }
        Ok(Self {
            data,
            row_names,
            col_names,
            index_name: String::new(),
        })
    }

    /// Builds a matrix from a text table.
    ///
    /// The first column is used as row labels when it is not numeric. Every
    /// other column must be numeric; empty cells become zero.
    pub fn from_table(df: &DataFrame) -> anyhow::Result<Self> {
        let first = df
            .get_column_names()
            .first()
            .map(|name| name.to_string())
            .ok_or_else(|| anyhow!("Table has no columns"))?;
        let has_labels = !is_numeric_column(df, &first)?;
        Self::build(df, has_labels)
    }

    /// Builds a matrix from a text table whose first column always holds the
    /// row labels.
    pub fn from_indexed_table(df: &DataFrame) -> anyhow::Result<Self> {
        Self::build(df, true)
    }

    fn build(
        df: &DataFrame,
        has_labels: bool,
    ) -> anyhow::Result<Self> {
        let names = column_names(df);
        ensure!(!names.is_empty(), "Table has no columns");
        let (row_names, index_name, value_cols) = if has_labels {
            let labels = text_column_at(df, 0)?
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect_vec();
            (Some(labels), names[0].clone(), &names[1..])
        }
        else {
            (None, String::new(), &names[..])
        };

        let mut data = Array2::<f64>::zeros((df.height(), value_cols.len()));
        for (j, name) in value_cols.iter().enumerate() {
            if !is_numeric_column(df, name)? {
                bail!("Column '{}' holds non-numeric values", name);
            }
            for (i, value) in float_column(df, name)?.into_iter().enumerate() {
                data[[i, j]] = value.unwrap_or(0.0);
            }
        }
        debug!(
            "Built {}x{} matrix (row labels: {})",
            data.nrows(),
            data.ncols(),
            has_labels
        );

        let mut matrix = Self::try_new(data, row_names, value_cols.to_vec())?;
        matrix.index_name = index_name;
        Ok(matrix)
    }

    /// Converts back into a text table. Row labels, when present, become the
    /// first column.
    pub fn to_table(&self) -> anyhow::Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.data.ncols() + 1);
        if let Some(rows) = &self.row_names {
            columns.push(Column::new(
                self.index_name.as_str().into(),
                rows.clone(),
            ));
        }
        for (j, name) in self.col_names.iter().enumerate() {
            let values = self
                .data
                .column(j)
                .iter()
                .map(|v| format_float(*v))
                .collect_vec();
            columns.push(Column::new(name.as_str().into(), values));
        }
        DataFrame::new(columns).map_err(|e| anyhow!(e))
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn row_names(&self) -> Option<&[String]> {
        self.row_names.as_deref()
    }

    pub fn col_names(&self) -> &[String] {
        &self.col_names
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn set_index_name(
        &mut self,
        name: &str,
    ) {
        self.index_name = name.to_string();
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }
}
