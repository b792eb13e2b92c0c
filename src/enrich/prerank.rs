//! Gene set enrichment analysis of pre-ranked gene lists.
//!
//! The enrichment score of a gene set is the maximal deviation from zero of
//! a weighted Kolmogorov-Smirnov running sum walked down the ranked list.
//! Significance is estimated with gene set permutations: random sets of the
//! same size are scored on the same list. Scores are normalised by the mean
//! null score of the same sign, and the FDR is computed across all terms of a
//! library from the normalised null distribution.

use std::fs;
use std::path::{
    Path,
    PathBuf,
};

use anyhow::{
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
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;

use super::gene_sets::read_ranked_list;
use super::{
    list_files,
    result_filename,
    EnrichKind,
};
use crate::io::GeneSetLibrary;
use crate::utils::{
    mean,
    n_threads,
    THREAD_POOL,
};

pub const PRERANK_HEADER: [&str; 8] = [
    "Gene_set",
    "Term",
    "ES",
    "NES",
    "NOM p-val",
    "FDR q-val",
    "Matched_size",
    "Lead_genes",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrerankParams {
    /// Smallest number of genes of a set found in the list.
    pub min_size:     usize,
    /// Largest number of genes of a set found in the list.
    pub max_size:     usize,
    pub permutations: usize,
    pub seed:         u64,
    /// Exponent of the ranking scores in the running sum.
    pub weight:       f64,
}

impl Default for PrerankParams {
    fn default() -> Self {
        Self {
            min_size:     5,
            max_size:     500,
            permutations: 1000,
            seed:         123,
            weight:       1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrerankRecord {
    pub gene_set:     String,
    pub term:         String,
    pub es:           f64,
    pub nes:          Option<f64>,
    pub pvalue:       Option<f64>,
    pub fdr:          Option<f64>,
    pub matched_size: usize,
    pub lead_genes:   String,
}

/// Enrichment score of the genes at sorted positions `hits` of a list with
/// `scores` sorted descending. Returns the score and the index into `hits`
/// of the last leading edge gene for a positive score, or of the first one
/// for a negative score.
pub fn enrichment_score(
    scores: &[f64],
    hits: &[usize],
    weight: f64,
) -> (f64, usize) {
    let n = scores.len();
    let m = hits.len();
    if m == 0 || m >= n {
        return (0.0, 0);
    }
    let weights = hits
        .iter()
        .map(|&pos| scores[pos].abs().powf(weight))
        .collect_vec();
    let norm: f64 = weights.iter().sum();
    let hit_step = |w: f64| if norm > 0.0 { w / norm } else { 1.0 / m as f64 };
    let miss_step = 1.0 / (n - m) as f64;

    let (mut max_dev, mut max_at) = (f64::NEG_INFINITY, 0);
    let (mut min_dev, mut min_at) = (f64::INFINITY, 0);
    let mut cumulated = 0.0;
    for (i, (&pos, &w)) in hits.iter().zip(weights.iter()).enumerate() {
        let misses = (pos - i) as f64 * miss_step;
        let before = cumulated - misses;
        if before < min_dev {
            min_dev = before;
            min_at = i;
        }
        cumulated += hit_step(w);
        let after = cumulated - misses;
        if after > max_dev {
            max_dev = after;
            max_at = i;
        }
    }
    if max_dev.abs() >= min_dev.abs() {
        (max_dev, max_at)
    }
    else {
        (min_dev, min_at)
    }
}

#[derive(Debug, Clone)]
struct TermScore {
    term:       String,
    es:         f64,
    null:       Vec<f64>,
    size:       usize,
    lead_genes: Vec<String>,
}

fn score_term(
    term: &str,
    hits: Vec<usize>,
    genes: &[String],
    scores: &[f64],
    params: &PrerankParams,
    seed: u64,
) -> TermScore {
    let (es, edge) = enrichment_score(scores, &hits, params.weight);
    let lead = if es >= 0.0 {
        &hits[..=edge]
    }
    else {
        &hits[edge..]
    };
    let lead_genes = lead.iter().map(|&pos| genes[pos].clone()).collect_vec();

    let mut rng = StdRng::seed_from_u64(seed);
    let null = (0..params.permutations)
        .map(|_| {
            let mut random = sample(&mut rng, scores.len(), hits.len()).into_vec();
            random.sort_unstable();
            enrichment_score(scores, &random, params.weight).0
        })
        .collect_vec();

    TermScore {
        term: term.to_string(),
        es,
        null,
        size: hits.len(),
        lead_genes,
    }
}

fn same_sign_mean(
    null: &[f64],
    positive: bool,
) -> Option<f64> {
    let values = null
        .iter()
        .copied()
        .filter(|&x| if positive { x >= 0.0 } else { x < 0.0 })
        .collect_vec();
    mean(&values).map(f64::abs).filter(|&m| m > 0.0)
}

fn nominal_pvalue(
    es: f64,
    null: &[f64],
) -> Option<f64> {
    let (extreme, total) = if es >= 0.0 {
        (
            null.iter().filter(|&&x| x >= es).count(),
            null.iter().filter(|&&x| x >= 0.0).count(),
        )
    }
    else {
        (
            null.iter().filter(|&&x| x <= es).count(),
            null.iter().filter(|&&x| x < 0.0).count(),
        )
    };
    (total > 0).then(|| extreme as f64 / total as f64)
}

fn normalise_null(
    null: &[f64],
    pos_mean: Option<f64>,
    neg_mean: Option<f64>,
) -> Vec<f64> {
    null.iter()
        .filter_map(|&x| {
            if x >= 0.0 {
                pos_mean.map(|m| x / m)
            }
            else {
                neg_mean.map(|m| x / m)
            }
        })
        .collect()
}

/// FDR of a normalised score: the share of null scores at least as extreme
/// divided by the share of observed scores at least as extreme, both among
/// scores of the same sign.
fn fdr(
    nes: f64,
    observed: &[f64],
    null: &[f64],
) -> Option<f64> {
    let share = |values: &[f64]| {
        let (extreme, total) = if nes >= 0.0 {
            (
                values.iter().filter(|&&x| x >= nes).count(),
                values.iter().filter(|&&x| x >= 0.0).count(),
            )
        }
        else {
            (
                values.iter().filter(|&&x| x <= nes).count(),
                values.iter().filter(|&&x| x < 0.0).count(),
            )
        };
        (total > 0).then(|| extreme as f64 / total as f64)
    };
    let null_share = share(null)?;
    let observed_share = share(observed).filter(|&s| s > 0.0)?;
    Some((null_share / observed_share).min(1.0))
}

/// Scores every term of `library` on the ranked list. Terms whose number of
/// genes found in the list is outside the size bounds are skipped.
pub fn prerank_list(
    ranked: &[(String, f64)],
    library: &GeneSetLibrary,
    params: &PrerankParams,
) -> Vec<PrerankRecord> {
    let genes = ranked.iter().map(|(g, _)| g.clone()).collect_vec();
    let scores = ranked.iter().map(|(_, s)| *s).collect_vec();
    let positions: HashMap<&str, usize> = genes
        .iter()
        .enumerate()
        .map(|(i, g)| (g.as_str(), i))
        .collect();

    let candidates = library
        .terms()
        .iter()
        .enumerate()
        .filter_map(|(i, (term, term_genes))| {
            let hits = term_genes
                .iter()
                .filter_map(|g| positions.get(g.as_str()).copied())
                .sorted_unstable()
                .collect_vec();
            let size_ok = hits.len() >= params.min_size.max(1)
                && hits.len() <= params.max_size
                && hits.len() < genes.len();
            size_ok.then_some((i, term, hits))
        })
        .collect_vec();
    if candidates.is_empty() {
        warn!(
            "No term of {} has between {} and {} genes in the list",
            library.name(),
            params.min_size,
            params.max_size
        );
        return Vec::new();
    }
    debug!(
        "{}: scoring {} of {} terms with {} permutations on {} threads",
        library.name(),
        candidates.len(),
        library.len(),
        params.permutations,
        n_threads()
    );

    let scored: Vec<TermScore> = THREAD_POOL.install(|| {
        candidates
            .into_par_iter()
            .map(|(i, term, hits)| {
                score_term(
                    term,
                    hits,
                    &genes,
                    &scores,
                    params,
                    params.seed.wrapping_add(i as u64),
                )
            })
            .collect()
    });

    let normalised = scored
        .iter()
        .map(|score| {
            let pos_mean = same_sign_mean(&score.null, true);
            let neg_mean = same_sign_mean(&score.null, false);
            let nes = if score.es >= 0.0 { pos_mean } else { neg_mean }.map(|m| score.es / m);
            (nes, normalise_null(&score.null, pos_mean, neg_mean))
        })
        .collect_vec();
    let observed = normalised.iter().filter_map(|(nes, _)| *nes).collect_vec();
    let null_all = normalised
        .iter()
        .flat_map(|(_, null)| null.iter().copied())
        .collect_vec();

    scored
        .into_iter()
        .zip(normalised)
        .map(|(score, (nes, _))| PrerankRecord {
            gene_set:     library.name().to_string(),
            term:         score.term,
            es:           score.es,
            nes,
            pvalue:       nominal_pvalue(score.es, &score.null),
            fdr:          nes.and_then(|nes| fdr(nes, &observed, &null_all)),
            matched_size: score.size,
            lead_genes:   score.lead_genes.join(";"),
        })
        .collect()
}

pub fn write_prerank_records<P: AsRef<Path>>(
    path: P,
    records: &[PrerankRecord],
) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Could not create {}", path.display()))?;
    writer.write_record(PRERANK_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn prerank_file(
    file: &Path,
    outdir: &Path,
    libraries: &[GeneSetLibrary],
    params: &PrerankParams,
) -> anyhow::Result<PathBuf> {
    let ranked = read_ranked_list(file)?;
    ensure!(!ranked.is_empty(), "{} holds no ranked genes", file.display());
    let records = libraries
        .iter()
        .flat_map(|library| prerank_list(&ranked, library, params))
        .sorted_by(|a, b| {
            let a = a.nes.unwrap_or(f64::NEG_INFINITY);
            let b = b.nes.unwrap_or(f64::NEG_INFINITY);
            b.total_cmp(&a)
        })
        .collect_vec();
    let output = outdir.join(result_filename(file, EnrichKind::Prerank)?);
    write_prerank_records(&output, &records)?;
    Ok(output)
}

/// Runs the analysis on the given ranked list files, writing one
/// `<file>.prerank.txt` per list into `outdir`. Files that fail are logged
/// and skipped.
pub fn prerank_files<P: AsRef<Path>>(
    files: &[P],
    outdir: &Path,
    libraries: &[GeneSetLibrary],
    params: &PrerankParams,
) -> anyhow::Result<Vec<PathBuf>> {
    ensure!(
        params.min_size <= params.max_size,
        "Minimal gene set size {} exceeds the maximal size {}",
        params.min_size,
        params.max_size
    );
    fs::create_dir_all(outdir)
        .with_context(|| format!("Could not create {}", outdir.display()))?;
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let file = file.as_ref();
        debug!("Running prerank on {}", file.display());
        match prerank_file(file, outdir, libraries, params) {
            Ok(output) => written.push(output),
            Err(e) => warn!("Prerank failed on {}: {:#}", file.display(), e),
        }
    }
    info!("Wrote {} prerank results to {}", written.len(), outdir.display());
    Ok(written)
}

/// Runs the analysis on every ranked list in `dir`.
pub fn prerank<P: AsRef<Path>, Q: AsRef<Path>>(
    dir: P,
    outdir: Q,
    libraries: &[GeneSetLibrary],
    params: &PrerankParams,
) -> anyhow::Result<Vec<PathBuf>> {
    let files = list_files(dir.as_ref())?;
    prerank_files(&files, outdir.as_ref(), libraries, params)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use indexmap::{
        IndexMap,
        IndexSet,
    };
    use rstest::rstest;
    use tempfile::tempdir;

    use super::*;

    fn ranked(n: usize) -> Vec<(String, f64)> {
        (0..n)
            .map(|i| (format!("G{}", i), (n - i) as f64))
            .collect()
    }

    fn library(terms: &[(&str, Vec<usize>)]) -> GeneSetLibrary {
        let terms: IndexMap<String, IndexSet<String>> = terms
            .iter()
            .map(|(term, genes)| {
                (
                    term.to_string(),
                    genes.iter().map(|i| format!("G{}", i)).collect(),
                )
            })
            .collect();
        GeneSetLibrary::new("Toy", terms)
    }

    #[test]
    fn top_genes_score_one() {
        let scores = [4.0, 3.0, 2.0, 1.0];
        let (es, edge) = enrichment_score(&scores, &[0, 1], 1.0);
        assert_approx_eq!(es, 1.0);
        assert_eq!(edge, 1);
    }

    #[test]
    fn bottom_genes_score_minus_one() {
        let scores = [4.0, 3.0, 2.0, 1.0];
        let (es, edge) = enrichment_score(&scores, &[2, 3], 1.0);
        assert_approx_eq!(es, -1.0);
        assert_eq!(edge, 0);
    }

    #[rstest]
    #[case(0.0)]
    #[case(1.0)]
    fn classic_and_weighted_scores(#[case] weight: f64) {
        // hits at 0 and 2 of 4; misses step by 0.5
        let scores = [3.0, 2.0, 1.0, 1.0];
        let (es, _) = enrichment_score(&scores, &[0, 2], weight);
        let first = if weight == 0.0 { 0.5 } else { 0.75 };
        assert_approx_eq!(es, first);
    }

    #[test]
    fn enriched_term_is_significant() {
        let ranked = ranked(50);
        let library = library(&[
            ("Top", (0..6).collect()),
            ("Bottom", (44..50).collect()),
            ("Tiny", vec![1, 2]),
        ]);
        let params = PrerankParams {
            min_size: 3,
            permutations: 200,
            ..Default::default()
        };
        let records = prerank_list(&ranked, &library, &params);
        assert_eq!(records.len(), 2);

        let top = records.iter().find(|r| r.term == "Top").cloned().unwrap();
        assert_approx_eq!(top.es, 1.0);
        assert!(top.nes.unwrap() > 1.0);
        assert!(top.pvalue.unwrap() < 0.05);
        assert_eq!(top.matched_size, 6);
        assert_eq!(top.lead_genes, "G0;G1;G2;G3;G4;G5");

        let bottom = records.iter().find(|r| r.term == "Bottom").cloned().unwrap();
        assert_approx_eq!(bottom.es, -1.0);
        assert!(bottom.nes.unwrap() < -1.0);
        assert_eq!(bottom.lead_genes, "G44;G45;G46;G47;G48;G49");
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let ranked = ranked(30);
        let library = library(&[("Mixed", vec![0, 5, 10, 15, 20])]);
        let params = PrerankParams {
            min_size: 2,
            permutations: 100,
            ..Default::default()
        };
        assert_eq!(
            prerank_list(&ranked, &library, &params),
            prerank_list(&ranked, &library, &params)
        );
    }

    #[test]
    fn results_are_written_per_list() -> anyhow::Result<()> {
        let input = tempdir()?;
        let out = tempdir()?;
        let list = ranked(20)
            .into_iter()
            .map(|(g, s)| format!("{}\t{}", g, s))
            .join("\n");
        fs::write(input.path().join("T.cells_S01.txt"), list)?;

        let params = PrerankParams {
            min_size: 3,
            permutations: 50,
            ..Default::default()
        };
        let written = prerank(
            input.path(),
            out.path(),
            &[library(&[("Top", (0..4).collect())])],
            &params,
        )?;
        assert_eq!(written, vec![out.path().join("T.cells_S01.txt.prerank.txt")]);
        let content = fs::read_to_string(&written[0])?;
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some(PRERANK_HEADER.join("\t").as_str()));
        assert!(lines.next().unwrap_or_default().starts_with("Toy\tTop\t"));
        Ok(())
    }
}
