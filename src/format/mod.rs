//! Regex based cleanup of table labels.
//!
//! The first column of a table is its index. Depending on the options the
//! index values, the header labels and the values of named columns are
//! rewritten by ordered substitution rules ([`Formats`]). Large expression
//! matrices can be processed in pseudo mode ([`pseudo`]), which streams the
//! file and only touches the header and the index.

use std::path::{
    Path,
    PathBuf,
};
use std::str::FromStr;

use anyhow::{
    anyhow,
    bail,
    ensure,
};
use log::{
    info,
    warn,
};

mod formats;
mod formatter;
pub mod pseudo;

pub use formats::{
    Formats,
    ECOTYPER_FORMAT,
};
pub use formatter::Formatter;
pub use pseudo::{
    pseudo_format,
    PseudoOptions,
};

use crate::io::{
    append_to_name,
    file_suffix,
    DataFormat,
};
use crate::settings::{
    CELL_TYPE_COL,
    ID_COL,
    SAMPLE_COL,
};

/// Option bundles for common inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Index and header labels, in pseudo mode.
    Expression,
    /// [`Preset::Expression`] with the EcoTyper rules.
    EcoExpression,
    /// Index, `CellType` and `Sample` values with the EcoTyper rules. The
    /// index is labelled `ID`.
    Annotation,
}

#[derive(Debug, Clone, Default)]
pub struct FormatOptions {
    pub output:     Option<PathBuf>,
    /// Appended to the output file name without affecting its format.
    pub suffix:     Option<String>,
    /// A rules file or the name of built-in rules.
    pub formats:    Option<String>,
    pub index:      bool,
    pub names:      bool,
    pub columns:    Vec<String>,
    pub index_name: Option<String>,
    pub no_index:   bool,
    pub pseudo:     bool,
    /// `tsv`, `csv` or `txt`; taken from the input suffix when unset.
    pub separator:  Option<String>,
    pub preset:     Option<Preset>,
}

impl FormatOptions {
    /// Expands the preset into the individual options.
    pub fn apply_preset(&mut self) {
        match self.preset {
            Some(Preset::Expression) => {
                self.index = true;
                self.names = true;
                self.pseudo = true;
            },
            Some(Preset::EcoExpression) => {
                self.index = true;
                self.names = true;
                self.pseudo = true;
                self.formats = Some(ECOTYPER_FORMAT.to_string());
            },
            Some(Preset::Annotation) => {
                self.index = true;
                self.index_name = Some(ID_COL.to_string());
                self.columns = vec![CELL_TYPE_COL.to_string(), SAMPLE_COL.to_string()];
                self.pseudo = false;
                self.formats = Some(ECOTYPER_FORMAT.to_string());
            },
            None => {},
        }
    }
}

fn tabular_separator(name: &str) -> anyhow::Result<u8> {
    DataFormat::from_str(name)?
        .separator()
        .ok_or_else(|| anyhow!("'{}' is not a tabular format", name))
}

/// Separator to read `input` with.
pub fn input_separator(
    input: &Path,
    separator: Option<&str>,
) -> anyhow::Result<u8> {
    match separator {
        Some(name) => tabular_separator(name),
        None => file_suffix(input)
            .and_then(|suffix| tabular_separator(&suffix).ok())
            .ok_or_else(|| {
                anyhow!(
                    "Could not guess the separator to use for {}, specify it manually",
                    input.display()
                )
            }),
    }
}

/// Output path of a reformatted table: the output (or the input itself)
/// with the optional suffix appended.
pub fn output_path(
    input: &Path,
    options: &FormatOptions,
) -> PathBuf {
    let base = options.output.clone().unwrap_or_else(|| input.to_path_buf());
    match &options.suffix {
        Some(suffix) => append_to_name(base, suffix),
        None => base,
    }
}

/// Reformats the table at `input`. Returns the written path.
pub fn format<P: AsRef<Path>>(
    input: P,
    options: &FormatOptions,
) -> anyhow::Result<PathBuf> {
    let input = input.as_ref();
    ensure!(
        !input.is_dir(),
        "The format command does not support directories"
    );
    let mut options = options.clone();
    options.apply_preset();

    let formats = match &options.formats {
        Some(name) => Formats::resolve(name)?,
        None => {
            info!("No substitution rules given, using {}", ECOTYPER_FORMAT);
            Formats::ecotyper()
        },
    };
    let read_sep = input_separator(input, options.separator.as_deref())?;

    let base = options.output.clone().unwrap_or_else(|| input.to_path_buf());
    let write_sep = file_suffix(&base)
        .and_then(|suffix| tabular_separator(&suffix).ok())
        .unwrap_or(read_sep);
    let output = output_path(input, &options);

    if options.pseudo {
        if !options.columns.is_empty() {
            warn!(
                "Columns {:?} are ignored when pseudo-reading",
                options.columns
            );
        }
        if write_sep != read_sep {
            warn!("Pseudo mode keeps the input separator");
        }
        let pseudo_options = PseudoOptions {
            index:      options.index,
            names:      options.names,
            index_name: options.index_name.clone(),
            no_index:   options.no_index,
        };
        pseudo_format(input, &output, read_sep, &formats, &pseudo_options)?;
        return Ok(output);
    }

    let mut formatter = Formatter::new(formats);
    formatter.read_table(input, read_sep)?;
    formatter.reformat(options.index, options.names, &options.columns)?;
    if let Some(name) = &options.index_name {
        formatter.set_index_name(name)?;
    }
    if output.is_dir() {
        bail!("Output {} is a directory", output.display());
    }
    formatter.write_table(&output, Some(write_sep), !options.no_index)?;
    Ok(output)
}

#[cfg(test)]
mod tests;
