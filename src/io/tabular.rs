use std::fs::File;
use std::io::{
    BufRead,
    BufReader,
    BufWriter,
};
use std::path::Path;
use std::sync::Arc;

use anyhow::{
    anyhow,
    Context,
};
use itertools::Itertools;
use log::{
    debug,
    warn,
};
use polars::prelude::*;

/// Lines starting with this prefix are skipped on read.
pub const COMMENT_PREFIX: &str = "#";

pub fn is_comment(line: &str) -> bool {
    line.starts_with(COMMENT_PREFIX)
}

/// Creates CSV read options for a headed text table.
///
/// Schema inference is disabled, so every column is read as text and cells
/// that are not touched are written back unchanged.
pub fn read_options(separator: u8) -> CsvReadOptions {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(separator)
                .with_quote_char(Some(b'"'))
                .with_comment_prefix(Some(COMMENT_PREFIX))
                .with_truncate_ragged_lines(true),
        )
}

/// Reads a headed table with all columns as text.
pub fn read_table<P: AsRef<Path>>(
    path: P,
    separator: u8,
) -> anyhow::Result<DataFrame> {
    let path = path.as_ref();
    debug!(
        "Reading table {} (separator {:?})",
        path.display(),
        separator as char
    );
    let options = match short_header(path, separator)? {
        Some((skip, names)) => {
            debug!("Header of {} lacks the index label", path.display());
            let schema = Schema::from_iter(
                names
                    .into_iter()
                    .map(|name| (PlSmallStr::from(name), DataType::String)),
            );
            read_options(separator)
                .with_has_header(false)
                .with_skip_rows(skip)
                .with_schema(Some(Arc::new(schema)))
        },
        None => read_options(separator),
    };
    let df = options
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Could not open {}", path.display()))?
        .finish()
        .with_context(|| format!("Could not parse {}", path.display()))?;
    debug!("Read {} rows x {} columns", df.height(), df.width());
    Ok(df)
}

/// Tables written by R carry one header field less than data fields, the
/// index column being unnamed. Returns the number of lines up to and
/// including the header, and the completed header of such tables.
fn short_header(
    path: &Path,
    separator: u8,
) -> anyhow::Result<Option<(usize, Vec<String>)>> {
    let reader = BufReader::new(
        File::open(path).with_context(|| format!("Could not open {}", path.display()))?,
    );
    let mut lines = reader
        .lines()
        .enumerate()
        .filter(|(_, line)| !matches!(line, Ok(line) if is_comment(line)));
    let (Some((header_idx, header)), Some((_, first))) = (lines.next(), lines.next())
    else {
        return Ok(None);
    };
    let (header, first) = (header?, first?);
    if is_short_header(&header, &first, separator) {
        let mut names = vec![String::new()];
        names.extend(
            header
                .trim_end_matches('\r')
                .split(separator as char)
                .map(str::to_string),
        );
        Ok(Some((header_idx + 1, names)))
    }
    else {
        Ok(None)
    }
}

/// Whether the header line has exactly one field less than the first data
/// line.
pub fn is_short_header(
    header: &str,
    first: &str,
    separator: u8,
) -> bool {
    let sep = separator as char;
    let n_header = header.trim_end_matches('\r').split(sep).count();
    let n_data = first.trim_end_matches('\r').split(sep).count();
    n_data == n_header + 1
}

/// Writes a table with a header line.
pub fn write_table<P: AsRef<Path>>(
    df: &mut DataFrame,
    path: P,
    separator: u8,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    let handle = File::create(path)
        .with_context(|| format!("Could not create {}", path.display()))?;
    CsvWriter::new(BufWriter::new(handle))
        .include_header(true)
        .with_separator(separator)
        .finish(df)
        .map_err(|e| {
            warn!("Failed to write {}: {}", path.display(), e);
            anyhow!(e)
        })?;
    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Returns the values of a column as text.
pub fn text_column(
    df: &DataFrame,
    name: &str,
) -> anyhow::Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| anyhow!("Column '{}' not found", name))?;
    column_to_text(column)
}

/// Returns the values of the column at `idx` as text.
pub fn text_column_at(
    df: &DataFrame,
    idx: usize,
) -> anyhow::Result<Vec<Option<String>>> {
    let column = df
        .get_columns()
        .get(idx)
        .ok_or_else(|| anyhow!("Table has no column at position {}", idx))?;
    column_to_text(column)
}

fn column_to_text(column: &Column) -> anyhow::Result<Vec<Option<String>>> {
    let series = column
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_owned))
        .collect())
}

/// Returns the values of a column parsed as floats. Values that do not parse
/// are `None`.
pub fn float_column(
    df: &DataFrame,
    name: &str,
) -> anyhow::Result<Vec<Option<f64>>> {
    let series = df
        .column(name)
        .map_err(|_| anyhow!("Column '{}' not found", name))?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

/// Whether every non-empty value of the column parses as a number.
pub fn is_numeric_column(
    df: &DataFrame,
    name: &str,
) -> anyhow::Result<bool> {
    let text = text_column(df, name)?;
    let numbers = float_column(df, name)?;
    Ok(text
        .iter()
        .zip(numbers.iter())
        .all(|(t, n)| t.as_deref().map_or(true, str::is_empty) || n.is_some()))
}

pub fn text_series(
    name: &str,
    values: Vec<Option<String>>,
) -> Column {
    Column::new(name.into(), values)
}

/// Replaces (or appends) a column in place.
pub fn replace_column(
    df: &mut DataFrame,
    column: Column,
) -> anyhow::Result<()> {
    df.with_column(column)?;
    Ok(())
}

/// Returns a copy of the table with new header labels.
pub fn rename_columns(
    df: &DataFrame,
    names: &[String],
) -> anyhow::Result<DataFrame> {
    if names.len() != df.width() {
        return Err(anyhow!(
            "Cannot rename {} columns with {} names",
            df.width(),
            names.len()
        ));
    }
    if !names.iter().all_unique() {
        warn!("Renaming produces duplicated column names");
        return Err(anyhow!("Column names must be unique after renaming"));
    }
    let columns = df
        .get_columns()
        .iter()
        .zip(names.iter())
        .map(|(column, name)| {
            let mut series = column.as_materialized_series().clone();
            series.rename(name.as_str().into());
            Column::from(series)
        })
        .collect_vec();
    Ok(DataFrame::new(columns)?)
}

/// Keeps only rows where `mask` is true.
pub fn filter_rows(
    df: &DataFrame,
    mask: &[bool],
) -> anyhow::Result<DataFrame> {
    let mask = BooleanChunked::from_slice("mask".into(), mask);
    Ok(df.filter(&mask)?)
}

/// Keeps only the named columns, in the given order.
pub fn select_columns(
    df: &DataFrame,
    names: &[String],
) -> anyhow::Result<DataFrame> {
    let columns = names
        .iter()
        .map(|name| {
            df.column(name)
                .cloned()
                .map_err(|_| anyhow!("Column '{}' not found", name))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(DataFrame::new(columns)?)
}

/// Prepends a column to the table.
pub fn prepend_column(
    df: &DataFrame,
    column: Column,
) -> anyhow::Result<DataFrame> {
    let mut columns = Vec::with_capacity(df.width() + 1);
    columns.push(column);
    columns.extend(df.get_columns().iter().cloned());
    Ok(DataFrame::new(columns)?)
}

/// Concatenates tables with the same columns.
pub fn concat_tables(tables: Vec<DataFrame>) -> anyhow::Result<DataFrame> {
    let mut iter = tables.into_iter();
    let mut first = iter
        .next()
        .ok_or_else(|| anyhow!("No tables to concatenate"))?;
    let names = column_names(&first);
    for table in iter {
        let table = select_columns(&table, &names)?;
        first.vstack_mut(&table)?;
    }
    first.rechunk_mut();
    Ok(first)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn fixture(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn untouched_cells_round_trip_as_text() -> anyhow::Result<()> {
        let input = fixture("gene\ts1\ts2\nTP53\t007\t1.50\nGAPDH\t\t3\n");
        let mut df = read_table(input.path(), b'\t')?;
        assert_eq!(column_names(&df), vec!["gene", "s1", "s2"]);
        assert_eq!(
            text_column(&df, "s1")?,
            vec![Some("007".to_string()), None]
        );

        let output = NamedTempFile::new()?;
        write_table(&mut df, output.path(), b',')?;
        let written = std::fs::read_to_string(output.path())?;
        assert_eq!(written, "gene,s1,s2\nTP53,007,1.50\nGAPDH,,3\n");
        Ok(())
    }

    #[test]
    fn numeric_detection_ignores_empty_cells() -> anyhow::Result<()> {
        let input = fixture("id,a,b\nx,1,y\nz,,2\n");
        let df = read_table(input.path(), b',')?;
        assert!(is_numeric_column(&df, "a")?);
        assert!(!is_numeric_column(&df, "b")?);
        assert!(!is_numeric_column(&df, "id")?);
        assert_eq!(float_column(&df, "a")?, vec![Some(1.0), None]);
        Ok(())
    }

    #[test]
    fn unnamed_index_column_is_completed() -> anyhow::Result<()> {
        let input = fixture("s1\ts2\ngeneA\t1\t2\ngeneB\t3\t4\n");
        let df = read_table(input.path(), b'\t')?;
        assert_eq!(column_names(&df), vec!["", "s1", "s2"]);
        assert_eq!(
            text_column_at(&df, 0)?,
            vec![Some("geneA".to_string()), Some("geneB".to_string())]
        );
        Ok(())
    }

    #[test]
    fn leading_comments_are_skipped() -> anyhow::Result<()> {
        let input = fixture("# exported by pipeline\n# v2\ngene,s1\nTP53,1\n");
        let df = read_table(input.path(), b',')?;
        assert_eq!(column_names(&df), vec!["gene", "s1"]);
        assert_eq!(text_column(&df, "gene")?, vec![Some("TP53".to_string())]);

        let input = fixture("# exported by R\ns1\ts2\ngeneA\t1\t2\n");
        let df = read_table(input.path(), b'\t')?;
        assert_eq!(column_names(&df), vec!["", "s1", "s2"]);
        assert_eq!(text_column_at(&df, 0)?, vec![Some("geneA".to_string())]);
        assert_eq!(text_column(&df, "s2")?, vec![Some("2".to_string())]);
        Ok(())
    }

    #[test]
    fn rename_rejects_duplicates() -> anyhow::Result<()> {
        let input = fixture("a,b\n1,2\n");
        let df = read_table(input.path(), b',')?;
        assert!(rename_columns(&df, &["x".into(), "x".into()]).is_err());
        let renamed = rename_columns(&df, &["x".into(), "y".into()])?;
        assert_eq!(column_names(&renamed), vec!["x", "y"]);
        Ok(())
    }
}
