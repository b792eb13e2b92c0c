//! Gene lengths computed from the exons of a GTF annotation.
//!
//! For every gene four lengths are reported:
//! `mean`, `median` and `longest_isoform` of the exonic lengths of its
//! transcripts, and `merged`, the length of the union of all its exons.

use std::path::{
    Path,
    PathBuf,
};

use anyhow::{
    ensure,
    Context,
};
use bio::io::gff::{
    GffType,
    Reader,
};
use indexmap::IndexMap;
use itertools::Itertools;
use log::{
    debug,
    info,
    warn,
};
use serde::Serialize;

use crate::io::append_to_name;
use crate::utils::{
    format_float,
    mean,
    median,
};

const EXON_FEATURE: &str = "exon";
const GENE_ID_ATTR: &str = "gene_id";
const GENE_NAME_ATTR: &str = "gene_name";
const TRANSCRIPT_ID_ATTR: &str = "transcript_id";

#[derive(Debug, Clone, PartialEq)]
pub struct GeneLength {
    pub gene_id:         String,
    pub gene_name:       String,
    pub mean:            f64,
    pub median:          f64,
    pub longest_isoform: f64,
    pub merged:          f64,
}

#[derive(Debug, Serialize)]
struct GeneNameRecord<'a> {
    gene_id:   &'a str,
    gene_name: &'a str,
}

#[derive(Default)]
struct GeneExons {
    name:        Option<String>,
    transcripts: IndexMap<String, Vec<(u64, u64)>>,
}

fn attribute<'a>(
    record: &'a bio::io::gff::Record,
    key: &str,
) -> Option<&'a str> {
    record
        .attributes()
        .get(key)
        .map(|value| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
}

/// Length of the union of closed intervals.
fn merged_length(intervals: &[(u64, u64)]) -> u64 {
    let mut total = 0;
    let mut current: Option<(u64, u64)> = None;
    for &(start, end) in intervals.iter().sorted() {
        current = match current {
            Some((s, e)) if start <= e + 1 => Some((s, e.max(end))),
            Some((s, e)) => {
                total += e - s + 1;
                Some((start, end))
            },
            None => Some((start, end)),
        };
    }
    if let Some((s, e)) = current {
        total += e - s + 1;
    }
    total
}

/// Reads exon records of a GTF file and computes lengths per gene, in order
/// of first appearance.
pub fn gene_lengths_from_gtf<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<GeneLength>> {
    let path = path.as_ref();
    let mut reader = Reader::from_file(path, GffType::GTF2)
        .with_context(|| format!("Could not open {}", path.display()))?;

    let mut genes: IndexMap<String, GeneExons> = IndexMap::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record.with_context(|| format!("Malformed record in {}", path.display()))?;
        if record.feature_type() != EXON_FEATURE {
            continue;
        }
        let Some(gene_id) = attribute(&record, GENE_ID_ATTR) else {
            skipped += 1;
            continue;
        };
        let transcript_id = attribute(&record, TRANSCRIPT_ID_ATTR).unwrap_or(gene_id);
        let entry = genes.entry(gene_id.to_string()).or_default();
        if entry.name.is_none() {
            entry.name = attribute(&record, GENE_NAME_ATTR).map(str::to_string);
        }
        let (start, end) = (*record.start(), *record.end());
        entry
            .transcripts
            .entry(transcript_id.to_string())
            .or_default()
            .push((start.min(end), start.max(end)));
    }
    if skipped > 0 {
        warn!("Skipped {} exons without a gene_id", skipped);
    }
    ensure!(!genes.is_empty(), "No exons found in {}", path.display());

    let lengths = genes
        .into_iter()
        .map(|(gene_id, exons)| {
            let isoforms = exons
                .transcripts
                .values()
                .map(|intervals| {
                    intervals
                        .iter()
                        .map(|(s, e)| (e - s + 1) as f64)
                        .sum::<f64>()
                })
                .collect_vec();
            let all_exons = exons.transcripts.values().flatten().copied().collect_vec();
            GeneLength {
                gene_name: exons.name.unwrap_or_else(|| gene_id.clone()),
                mean: mean(&isoforms).unwrap_or(0.0),
                median: median(&isoforms).unwrap_or(0.0),
                longest_isoform: isoforms.iter().copied().fold(0.0, f64::max),
                merged: merged_length(&all_exons) as f64,
                gene_id,
            }
        })
        .collect_vec();
    info!("Computed lengths of {} genes from {}", lengths.len(), path.display());
    Ok(lengths)
}

/// `<gtf>.lengths`
pub fn lengths_path<P: AsRef<Path>>(gtf: P) -> PathBuf {
    append_to_name(gtf, ".lengths")
}

/// `<gtf>.names`
pub fn names_path<P: AsRef<Path>>(gtf: P) -> PathBuf {
    append_to_name(gtf, ".names")
}

/// Writes a tab separated lengths table. The gene identifier comes first
/// and the gene name second, or the other way around with `swap`.
pub fn write_lengths<P: AsRef<Path>>(
    lengths: &[GeneLength],
    path: P,
    swap: bool,
) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path.as_ref())?;
    let (first, second) = if swap {
        ("gene_name", "gene")
    }
    else {
        ("gene", "gene_name")
    };
    writer.write_record([first, second, "mean", "median", "longest_isoform", "merged"])?;
    for gene in lengths {
        let (first, second) = if swap {
            (&gene.gene_name, &gene.gene_id)
        }
        else {
            (&gene.gene_id, &gene.gene_name)
        };
        writer.write_record([
            first.clone(),
            second.clone(),
            format_float(gene.mean),
            format_float(gene.median),
            format_float(gene.longest_isoform),
            format_float(gene.merged),
        ])?;
    }
    writer.flush()?;
    debug!("Wrote {} gene lengths to {}", lengths.len(), path.as_ref().display());
    Ok(())
}

/// Writes the `gene_id`/`gene_name` assignment.
pub fn write_names<P: AsRef<Path>>(
    lengths: &[GeneLength],
    path: P,
) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path.as_ref())?;
    for gene in lengths {
        writer.serialize(GeneNameRecord {
            gene_id:   &gene.gene_id,
            gene_name: &gene.gene_name,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Computes gene lengths of `gtf` and writes `<gtf>.lengths` and
/// `<gtf>.names`. Returns the lengths file.
pub fn prepare_lengths<P: AsRef<Path>>(
    gtf: P,
    swap: bool,
) -> anyhow::Result<PathBuf> {
    let gtf = gtf.as_ref();
    let lengths = gene_lengths_from_gtf(gtf)?;
    let output = lengths_path(gtf);
    write_lengths(&lengths, &output, swap)?;
    write_names(&lengths, names_path(gtf))?;
    Ok(output)
}
