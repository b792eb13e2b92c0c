//! Conversion between tabular formats, MatrixMarket files and Seurat RDS
//! objects.
//!
//! | from \ to | csv/tsv/txt | mtx | rds |
//! | --------- | ----------- | --- | --- |
//! | csv/tsv/txt | yes       | yes | no  |
//! | mtx       | yes         | no  | no  |
//! | rds       | yes         | no  | no  |

use std::path::{
    Path,
    PathBuf,
};
use std::str::FromStr;

use anyhow::{
    anyhow,
    bail,
};
use log::info;

use crate::io::tabular::{
    prepend_column,
    read_table,
    write_table,
};
use crate::io::{
    file_suffix,
    read_mtx,
    seurat_to_tabular,
    with_suffix,
    write_mtx,
    DataFormat,
    LabeledMatrix,
    SeuratExtraction,
};

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Output file, or output directory when `recursive` is set.
    pub output:    Option<PathBuf>,
    /// Treat `output` as a directory.
    pub recursive: bool,
    /// Input format, if not evident from the input suffix.
    pub from:      Option<String>,
    /// Output format, if not evident from the output suffix.
    pub to:        Option<String>,
    /// Write the row positions (or row names) as the first column.
    pub index:     bool,
    /// Assay layer to extract from Seurat objects.
    pub data:      Option<String>,
    /// Metadata slots to extract from Seurat objects.
    pub metadata:  Option<Vec<String>>,
}

/// Resolves the output path and both formats of a conversion.
///
/// Creates the output directory when `recursive` is set.
pub fn resolve_target(
    input: &Path,
    options: &ConvertOptions,
) -> anyhow::Result<(PathBuf, DataFormat, DataFormat)> {
    let output = match (&options.output, &options.to, options.recursive) {
        (None, None, _) => bail!(
            "An output file is required if no output format is specified, or an output format if no output file is given"
        ),
        (None, Some(_), true) => bail!("Cannot create a non-specified output directory"),
        (Some(_), None, true) => {
            bail!("An output format is required when specifying an output directory")
        },
        (Some(dir), Some(to), true) => {
            std::fs::create_dir_all(dir)?;
            let name = input
                .file_name()
                .ok_or_else(|| anyhow!("Invalid input path {}", input.display()))?;
            dir.join(with_suffix(Path::new(name), &to.to_lowercase()))
        },
        (Some(output), _, false) => output.clone(),
        (None, Some(to), false) => with_suffix(input, &to.to_lowercase()),
    };

    let fmt_in = match &options.from {
        Some(from) => DataFormat::from_str(from)?,
        None => DataFormat::from_path(input)?,
    };
    let fmt_out = match &options.to {
        Some(to) => DataFormat::from_str(to)?,
        None => {
            let suffix = file_suffix(&output).ok_or_else(|| {
                anyhow!("No output format specified and no output file suffix found in output file name")
            })?;
            DataFormat::from_str(&suffix)?
        },
    };
    Ok((output, fmt_in, fmt_out))
}

/// Converts `input` according to `options`. Returns the path of the main
/// written file.
pub fn convert<P: AsRef<Path>>(
    input: P,
    options: &ConvertOptions,
) -> anyhow::Result<PathBuf> {
    let input = input.as_ref();
    let (output, fmt_in, fmt_out) = resolve_target(input, options)?;
    info!(
        "Converting {} ({}) to {} ({})",
        input.display(),
        fmt_in,
        output.display(),
        fmt_out
    );

    match (fmt_in, fmt_out) {
        (from, to) if from.is_tabular() && to.is_tabular() => {
            between_tabulars(input, &output, from, to, options.index)?;
        },
        (from, DataFormat::Mtx) if from.is_tabular() => {
            tabular_to_mtx(input, &output, from)?;
        },
        (DataFormat::Mtx, to) if to.is_tabular() => {
            mtx_to_tabular(input, &output, to)?;
        },
        (DataFormat::Rds, to) if to.is_tabular() => {
            let defaults = SeuratExtraction::default();
            let extraction = SeuratExtraction {
                data:     options.data.clone().unwrap_or(defaults.data),
                metadata: options.metadata.clone().unwrap_or(defaults.metadata),
                index:    options.index,
            };
            let written = seurat_to_tabular(input, &output, separator(to)?, &extraction)?;
            return written
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("Extraction produced no files"));
        },
        (from, to) => bail!("Cannot convert from {} to {}", from, to),
    }
    Ok(output)
}

fn separator(format: DataFormat) -> anyhow::Result<u8> {
    format
        .separator()
        .ok_or_else(|| anyhow!("{} is not a tabular format", format))
}

fn between_tabulars(
    input: &Path,
    output: &Path,
    from: DataFormat,
    to: DataFormat,
    index: bool,
) -> anyhow::Result<()> {
    let mut df = read_table(input, separator(from)?)?;
    if index {
        let positions = (0..df.height() as u64).map(|i| i.to_string()).collect::<Vec<_>>();
        df = prepend_column(
            &df,
            polars::prelude::Column::new("".into(), positions),
        )?;
    }
    write_table(&mut df, output, separator(to)?)
}

fn tabular_to_mtx(
    input: &Path,
    output: &Path,
    from: DataFormat,
) -> anyhow::Result<()> {
    let df = read_table(input, separator(from)?)?;
    let matrix = LabeledMatrix::from_table(&df)?;
    write_mtx(&matrix, output)
}

fn mtx_to_tabular(
    input: &Path,
    output: &Path,
    to: DataFormat,
) -> anyhow::Result<()> {
    let matrix = read_mtx(input)?;
    let mut df = matrix.to_table()?;
    write_table(&mut df, output, separator(to)?)
}
