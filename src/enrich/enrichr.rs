//! Over-representation analysis of gene lists.
//!
//! Every gene list is tested against every term of every library with the
//! hypergeometric test, as Enrichr does. The background of a library is the
//! union of the genes of its terms and only genes of the list found in the
//! background are counted.

use std::fs;
use std::path::{
    Path,
    PathBuf,
};

use anyhow::Context;
use itertools::Itertools;
use log::{
    debug,
    info,
    warn,
};
use serde::Serialize;

use super::gene_sets::read_gene_list;
use super::{
    list_files,
    result_filename,
    EnrichKind,
};
use crate::io::GeneSetLibrary;
use crate::utils::{
    bh_adjust,
    combined_score,
    hypergeometric_sf,
    odds_ratio,
};

pub const ENRICHR_HEADER: [&str; 8] = [
    "Gene_set",
    "Term",
    "Overlap",
    "P-value",
    "Adjusted P-value",
    "Odds Ratio",
    "Combined Score",
    "Genes",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichrRecord {
    pub gene_set:       String,
    pub term:           String,
    pub overlap:        String,
    pub pvalue:         f64,
    pub adjusted:       f64,
    pub odds_ratio:     f64,
    pub combined_score: f64,
    pub genes:          String,
}

/// Tests `genes` against every term of `library`. Terms without overlap are
/// not reported.
pub fn enrich_gene_list(
    genes: &[String],
    library: &GeneSetLibrary,
) -> Vec<EnrichrRecord> {
    let background = library.background();
    let query: Vec<&str> = genes
        .iter()
        .map(String::as_str)
        .filter(|gene| background.contains(gene))
        .collect();
    if query.is_empty() {
        warn!("No gene of the list is annotated in {}", library.name());
        return Vec::new();
    }
    let population = background.len() as u64;
    let draws = query.len() as u64;

    let mut records = library
        .terms()
        .iter()
        .filter_map(|(term, term_genes)| {
            let hits = query
                .iter()
                .filter(|gene| term_genes.contains(**gene))
                .collect_vec();
            if hits.is_empty() {
                return None;
            }
            let k = hits.len() as u64;
            let successes = term_genes.len() as u64;
            let pvalue = hypergeometric_sf(k, population, successes, draws);
            let odds = odds_ratio(
                k,
                draws - k,
                successes - k,
                population + k - successes - draws,
            );
            Some(EnrichrRecord {
                gene_set: library.name().to_string(),
                term: term.clone(),
                overlap: format!("{}/{}", k, successes),
                pvalue,
                adjusted: pvalue,
                odds_ratio: odds,
                combined_score: combined_score(pvalue, odds),
                genes: hits.into_iter().join(";"),
            })
        })
        .collect_vec();

    let adjusted = bh_adjust(&records.iter().map(|r| r.pvalue).collect_vec());
    for (record, adjusted) in records.iter_mut().zip(adjusted) {
        record.adjusted = adjusted;
    }
    debug!(
        "{}: {} of {} terms overlap the list",
        library.name(),
        records.len(),
        library.len()
    );
    records
}

pub fn write_enrichr_records<P: AsRef<Path>>(
    path: P,
    records: &[EnrichrRecord],
) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Could not create {}", path.display()))?;
    writer.write_record(ENRICHR_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn enrich_file(
    file: &Path,
    outdir: &Path,
    libraries: &[GeneSetLibrary],
) -> anyhow::Result<PathBuf> {
    let genes = read_gene_list(file)?;
    anyhow::ensure!(!genes.is_empty(), "{} holds no genes", file.display());
    let records = libraries
        .iter()
        .flat_map(|library| enrich_gene_list(&genes, library))
        .sorted_by(|a, b| a.pvalue.total_cmp(&b.pvalue))
        .collect_vec();
    let output = outdir.join(result_filename(file, EnrichKind::Enrichr)?);
    write_enrichr_records(&output, &records)?;
    Ok(output)
}

/// Runs the analysis on the given gene list files, writing one
/// `<file>.enrichr.txt` per list into `outdir`. Files that fail are logged
/// and skipped.
pub fn enrichr_files<P: AsRef<Path>>(
    files: &[P],
    outdir: &Path,
    libraries: &[GeneSetLibrary],
) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(outdir)
        .with_context(|| format!("Could not create {}", outdir.display()))?;
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let file = file.as_ref();
        debug!("Running enrichr on {}", file.display());
        match enrich_file(file, outdir, libraries) {
            Ok(output) => written.push(output),
            Err(e) => warn!("Enrichr failed on {}: {:#}", file.display(), e),
        }
    }
    info!("Wrote {} enrichr results to {}", written.len(), outdir.display());
    Ok(written)
}

/// Runs the analysis on every gene list in `dir`.
pub fn enrichr<P: AsRef<Path>, Q: AsRef<Path>>(
    dir: P,
    outdir: Q,
    libraries: &[GeneSetLibrary],
) -> anyhow::Result<Vec<PathBuf>> {
    let files = list_files(dir.as_ref())?;
    enrichr_files(&files, outdir.as_ref(), libraries)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use indexmap::{
        IndexMap,
        IndexSet,
    };
    use tempfile::tempdir;

    use super::*;

    fn library() -> GeneSetLibrary {
        let terms: IndexMap<String, IndexSet<String>> = [
            ("Pathway_A", vec!["G1", "G2", "G3"]),
            ("Pathway_B", vec!["G4", "G5", "G6", "G7"]),
            ("Pathway_C", vec!["G8", "G9", "G10"]),
        ]
        .into_iter()
        .map(|(term, genes)| {
            (
                term.to_string(),
                genes.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();
        GeneSetLibrary::new("Toy", terms)
    }

    #[test]
    fn hypergeometric_enrichment() {
        let genes = ["G1", "G2", "G4", "unknown"].map(str::to_string);
        let records = enrich_gene_list(&genes, &library());
        assert_eq!(records.len(), 2);

        let a = &records[0];
        assert_eq!(a.term, "Pathway_A");
        assert_eq!(a.overlap, "2/3");
        assert_eq!(a.genes, "G1;G2");
        // N = 10, K = 3, n = 3: P(X >= 2) = (3 * 7 + 1) / 120
        assert_approx_eq!(a.pvalue, 22.0 / 120.0, 1e-10);
        // (2.5 * 6.5) / (1.5 * 1.5)
        assert_approx_eq!(a.odds_ratio, 16.25 / 2.25, 1e-10);
        assert_approx_eq!(a.combined_score, -(22.0f64 / 120.0).ln() * 16.25 / 2.25, 1e-10);

        let b = &records[1];
        assert_eq!(b.overlap, "1/4");
        assert!(b.adjusted >= b.pvalue);
        assert!(a.adjusted >= a.pvalue);
    }

    #[test]
    fn unannotated_list_yields_nothing() {
        let genes = ["X", "Y"].map(str::to_string);
        assert!(enrich_gene_list(&genes, &library()).is_empty());
    }

    #[test]
    fn results_are_written_per_list() -> anyhow::Result<()> {
        let input = tempdir()?;
        let out = tempdir()?;
        fs::write(input.path().join("B.cells_S01.txt"), "G1\nG2\nG8\n")?;
        fs::write(input.path().join("B.cells_S02.txt"), "")?;

        let written = enrichr(input.path(), out.path(), &[library()])?;
        assert_eq!(written, vec![out.path().join("B.cells_S01.txt.enrichr.txt")]);

        let content = fs::read_to_string(&written[0])?;
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some(ENRICHR_HEADER.join("\t").as_str()));
        let first = lines.next().unwrap_or_default();
        assert!(first.starts_with("Toy\tPathway_A\t2/3\t"));
        assert!(first.ends_with("\tG1;G2"));
        assert_eq!(lines.count(), 1);
        Ok(())
    }
}
