//! Normalisation of raw counts to TPM or CPM.
//!
//! TPM needs feature lengths, either from a lengths table or computed from a
//! GTF annotation (see [`gtf`]). CPM only needs lengths when the output
//! should carry gene names instead of identifiers.

use std::fmt::Display;
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

pub mod gtf;
mod norm_table;

pub use norm_table::{
    FeatureLengths,
    LengthColumns,
    NormTable,
};

use crate::io::file_suffix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormMethod {
    Tpm,
    Cpm,
}

impl FromStr for NormMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tpm" => Ok(Self::Tpm),
            "cpm" => Ok(Self::Cpm),
            other => Err(anyhow!("Unknown normalisation '{}'", other)),
        }
    }
}

impl Display for NormMethod {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Tpm => write!(f, "tpm"),
            Self::Cpm => write!(f, "cpm"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NormaliseOptions {
    pub method:  NormMethod,
    pub output:  Option<PathBuf>,
    pub lengths: Option<PathBuf>,
    pub gtf:     Option<PathBuf>,
    /// Use gene names as identifiers of a lengths table derived from the GTF.
    pub swap:    bool,
    /// Replace identifiers by gene names in the output.
    pub names:   bool,
    pub digits:  u32,
    pub log:     bool,
    /// Columns of the lengths table to use.
    pub columns: LengthColumns,
}

impl NormaliseOptions {
    pub fn new(method: NormMethod) -> Self {
        Self {
            method,
            output: None,
            lengths: None,
            gtf: None,
            swap: false,
            names: false,
            digits: 5,
            log: false,
            columns: LengthColumns::default(),
        }
    }
}

/// Input path with `.<suffix>` replaced by `.<method>.<suffix>`.
pub fn default_output<P: AsRef<Path>>(
    input: P,
    method: NormMethod,
) -> PathBuf {
    let input = input.as_ref();
    match file_suffix(input) {
        Some(suffix) => crate::io::with_suffix(input, &format!("{}.{}", method, suffix)),
        None => crate::io::append_to_name(input, &format!(".{}", method)),
    }
}

/// Normalises the counts table at `input`. Returns the written path.
pub fn normalise<P: AsRef<Path>>(
    input: P,
    options: &NormaliseOptions,
) -> anyhow::Result<PathBuf> {
    let input = input.as_ref();
    let tpm = options.method == NormMethod::Tpm;
    let has_source = options.lengths.is_some() || options.gtf.is_some();
    if tpm && !has_source {
        bail!("Lengths file or GTF file must be provided for TPM normalisation");
    }
    if options.names && !has_source {
        bail!("Lengths file or GTF file must be provided to get gene names");
    }

    let mut lengths = options.lengths.clone();
    let need_lengths_for_tpm = tpm && lengths.is_none();
    let need_names_for_cpm = !tpm && lengths.is_none() && options.names;
    if need_lengths_for_tpm || need_names_for_cpm {
        if let Some(gtf_path) = &options.gtf {
            info!("Deriving gene lengths from {}", gtf_path.display());
            lengths = Some(gtf::prepare_lengths(gtf_path, options.swap)?);
        }
    }

    let mut table = NormTable::read(input)?;
    if let Some(lengths) = &lengths {
        table.set_lengths(lengths, &options.columns)?;
    }
    match options.method {
        NormMethod::Tpm => table.to_tpm(options.digits, options.log)?,
        NormMethod::Cpm => table.to_cpm(options.digits, options.log)?,
    };

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| default_output(input, options.method));
    table.save(&output, options.names)?;
    Ok(output)
}
