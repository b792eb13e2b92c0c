//! Extraction of tabular data from RDS files holding a `SeuratObject`.
//!
//! RDS is an R serialisation format, so the extraction is delegated to
//! `Rscript` running a bundled script. The script is written to a temporary
//! file for the duration of the call.

use std::io::Write;
use std::path::{
    Path,
    PathBuf,
};
use std::process::Command;

use anyhow::{
    bail,
    Context,
};
use log::{
    debug,
    info,
};

use super::schema::with_suffix;

const SEURAT_SCRIPT: &str = include_str!("scripts/seurat_to_tabular.R");
const RSCRIPT: &str = "Rscript";

pub const DEFAULT_DATA_SLOT: &str = "counts";
pub const DEFAULT_METADATA: &str = "meta.data";

/// What to extract from a `SeuratObject`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeuratExtraction {
    /// Assay layer accessible via `GetAssayData`.
    pub data:     String,
    /// Slots or attributes of the object.
    pub metadata: Vec<String>,
    /// Write row names of metadata tables. Data tables always have them.
    pub index:    bool,
}

impl Default for SeuratExtraction {
    fn default() -> Self {
        Self {
            data:     DEFAULT_DATA_SLOT.to_string(),
            metadata: vec![DEFAULT_METADATA.to_string()],
            index:    false,
        }
    }
}

impl SeuratExtraction {
    /// Files produced for `output`: the data table first, then one file per
    /// metadata entry.
    pub fn output_paths<P: AsRef<Path>>(
        &self,
        output: P,
    ) -> Vec<PathBuf> {
        let output = output.as_ref();
        let ext = super::schema::file_suffix(output).unwrap_or_else(|| "tsv".into());
        std::iter::once(&self.data)
            .chain(self.metadata.iter())
            .map(|name| with_suffix(output, &format!("{}.{}", name, ext)))
            .collect()
    }
}

/// Extracts data and metadata from `input` into tabular files derived from
/// `output`. Returns the written paths.
pub fn seurat_to_tabular<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    separator: u8,
    extraction: &SeuratExtraction,
) -> anyhow::Result<Vec<PathBuf>> {
    let (input, output) = (input.as_ref(), output.as_ref());

    let mut script = tempfile::Builder::new()
        .prefix("seurat_to_tabular")
        .suffix(".R")
        .tempfile()?;
    script.write_all(SEURAT_SCRIPT.as_bytes())?;
    script.flush()?;
    debug!("Wrote extraction script to {}", script.path().display());

    let result = Command::new(RSCRIPT)
        .arg(script.path())
        .arg(input)
        .arg(output)
        .arg((separator as char).to_string())
        .arg(if extraction.index { "TRUE" } else { "FALSE" })
        .arg(&extraction.data)
        .args(&extraction.metadata)
        .output()
        .with_context(|| format!("{} is required to read Seurat RDS files", RSCRIPT))?;

    if !result.status.success() {
        bail!(
            "Extraction from {} failed: {}",
            input.display(),
            String::from_utf8_lossy(&result.stderr).trim()
        );
    }

    let expected = extraction.output_paths(output);
    for path in expected.iter() {
        if !path.exists() {
            bail!(
                "Extraction from {} produced no {}",
                input.display(),
                path.display()
            );
        }
    }
    info!(
        "Extracted {} table(s) from {}",
        expected.len(),
        input.display()
    );
    Ok(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_are_named_after_slots() {
        let extraction = SeuratExtraction {
            metadata: vec!["meta.data".into(), "misc".into()],
            ..Default::default()
        };
        assert_eq!(
            extraction.output_paths("out/pbmc.csv"),
            vec![
                PathBuf::from("out/pbmc.counts.csv"),
                PathBuf::from("out/pbmc.meta.data.csv"),
                PathBuf::from("out/pbmc.misc.csv"),
            ]
        );
    }

    #[test]
    fn bundled_script_reads_the_object() {
        assert!(SEURAT_SCRIPT.contains("readRDS"));
        assert!(SEURAT_SCRIPT.contains("GetAssayData"));
    }
}
