use std::path::Path;

use anyhow::{
    anyhow,
    ensure,
};
use itertools::Itertools;
use log::{
    debug,
    info,
};
use polars::prelude::*;

use super::formats::Formats;
use crate::io::tabular::{
    column_names,
    read_table,
    rename_columns,
    replace_column,
    select_columns,
    text_column,
    write_table,
};

/// Rewrites the index, the header labels or the values of selected columns
/// of a table held in memory. The first column is the index.
#[derive(Debug)]
pub struct Formatter {
    formats:   Formats,
    df:        Option<DataFrame>,
    separator: u8,
}

impl Formatter {
    pub fn new(formats: Formats) -> Self {
        Self {
            formats,
            df: None,
            separator: b'\t',
        }
    }

    pub fn read_table<P: AsRef<Path>>(
        &mut self,
        path: P,
        separator: u8,
    ) -> anyhow::Result<()> {
        let df = read_table(path, separator)?;
        ensure!(df.width() > 0, "Table has no columns");
        self.df = Some(df);
        self.separator = separator;
        Ok(())
    }

    pub fn from_frame(
        formats: Formats,
        df: DataFrame,
        separator: u8,
    ) -> Self {
        Self {
            formats,
            df: Some(df),
            separator,
        }
    }

    fn frame(&self) -> anyhow::Result<&DataFrame> {
        self.df.as_ref().ok_or_else(|| anyhow!("No table was read"))
    }

    fn index_label(&self) -> anyhow::Result<String> {
        column_names(self.frame()?)
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Table has no columns"))
    }

    /// Applies the substitutions. Columns are selected by their names in
    /// the input, before header labels are rewritten. `index` rewrites the
    /// index values and its header label.
    pub fn reformat(
        &mut self,
        index: bool,
        names: bool,
        columns: &[String],
    ) -> anyhow::Result<()> {
        if index {
            let label = self.index_label()?;
            self.reformat_column(&label)?;
        }
        for column in columns {
            self.reformat_column(column)?;
        }
        if index {
            let label = self.index_label()?;
            let formatted = self.formats.apply(&label);
            if formatted != label {
                self.set_index_name(&formatted)?;
            }
        }
        if names {
            self.reformat_names()?;
        }
        Ok(())
    }

    fn reformat_column(
        &mut self,
        name: &str,
    ) -> anyhow::Result<()> {
        let formats = &self.formats;
        let df = self.df.as_mut().ok_or_else(|| anyhow!("No table was read"))?;
        let values = text_column(df, name)
            .map_err(|_| anyhow!("Column '{}' is not in the table", name))?
            .into_iter()
            .map(|value| value.map(|v| formats.apply(&v)))
            .collect_vec();
        replace_column(df, Column::new(name.into(), values))?;
        debug!("Reformatted values of column '{}'", name);
        Ok(())
    }

    fn reformat_names(&mut self) -> anyhow::Result<()> {
        let df = self.frame()?;
        let names = column_names(df)
            .into_iter()
            .enumerate()
            .map(|(i, name)| if i == 0 { name } else { self.formats.apply(&name) })
            .collect_vec();
        let renamed = rename_columns(df, &names)?;
        self.df = Some(renamed);
        debug!("Reformatted header labels");
        Ok(())
    }

    /// Gives the index column a new header label.
    pub fn set_index_name(
        &mut self,
        name: &str,
    ) -> anyhow::Result<()> {
        let df = self.frame()?;
        let mut names = column_names(df);
        names[0] = name.to_string();
        self.df = Some(rename_columns(df, &names)?);
        Ok(())
    }

    /// Writes the table, without the index column when `write_index` is
    /// false. `separator` defaults to the one the table was read with.
    pub fn write_table<P: AsRef<Path>>(
        &self,
        path: P,
        separator: Option<u8>,
        write_index: bool,
    ) -> anyhow::Result<()> {
        let separator = separator.unwrap_or(self.separator);
        let df = self.frame()?;
        let mut out = if write_index {
            df.clone()
        }
        else {
            let keep = column_names(df).into_iter().skip(1).collect_vec();
            ensure!(!keep.is_empty(), "Nothing left to write without the index");
            select_columns(df, &keep)?
        };
        write_table(&mut out, path.as_ref(), separator)?;
        info!("Wrote reformatted table to {}", path.as_ref().display());
        Ok(())
    }

    pub fn get(&self) -> Option<&DataFrame> {
        self.df.as_ref()
    }

    pub fn formats(&self) -> &Formats {
        &self.formats
    }
}
