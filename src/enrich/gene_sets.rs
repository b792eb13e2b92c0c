use std::fs::{
    self,
    File,
};
use std::io::{
    BufRead,
    BufReader,
    BufWriter,
    Write,
};
use std::path::{
    Path,
    PathBuf,
};

use anyhow::{
    anyhow,
    Context,
};
use indexmap::IndexMap;
use itertools::Itertools;
use log::{
    debug,
    info,
    warn,
};
use serde::Deserialize;

use super::cell_types::CellTypeCollection;
use super::EnrichKind;
use crate::settings::{
    GENE_INFO_FILE,
    MISSING_STATES,
};
use crate::utils::format_float;

/// One row of an EcoTyper `gene_info.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneInfo {
    #[serde(rename = "Gene")]
    pub gene:   String,
    #[serde(rename = "State", default)]
    pub state:  String,
    #[serde(rename = "MaxFC", default, deserialize_with = "csv::invalid_option")]
    pub max_fc: Option<f64>,
}

pub fn read_gene_info<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<GeneInfo>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Could not open {}", path.display()))?;
    reader
        .deserialize()
        .map(|record| record.with_context(|| format!("Malformed row in {}", path.display())))
        .collect()
}

/// Genes of each state, in file order. Genes without a state are dropped.
fn genes_by_state(info: Vec<GeneInfo>) -> IndexMap<String, Vec<GeneInfo>> {
    let mut states: IndexMap<String, Vec<GeneInfo>> = IndexMap::new();
    for row in info {
        let state = row.state.trim();
        if MISSING_STATES.contains(&state) {
            continue;
        }
        states.entry(state.to_string()).or_default().push(row);
    }
    states.sort_keys();
    states
}

/// Directory under `outdir` holding the gene sets of one analysis.
pub fn gene_sets_dir<P: AsRef<Path>>(
    outdir: P,
    kind: EnrichKind,
) -> PathBuf {
    outdir.as_ref().join(kind.dir_name())
}

/// Name of the gene set file of a cell state.
pub fn gene_set_filename(
    cell_type: &str,
    state: &str,
) -> String {
    format!("{}_{}.txt", cell_type, state)
}

fn write_gene_list(
    path: &Path,
    genes: &[GeneInfo],
) -> anyhow::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for row in genes {
        writeln!(writer, "{}", row.gene)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_ranked_list(
    path: &Path,
    genes: &[GeneInfo],
) -> anyhow::Result<()> {
    let ranked = genes
        .iter()
        .filter_map(|row| row.max_fc.map(|fc| (row.gene.as_str(), fc)))
        .sorted_by(|a, b| b.1.total_cmp(&a.1))
        .collect_vec();
    if ranked.len() < genes.len() {
        warn!(
            "{} genes without {} skipped in {}",
            genes.len() - ranked.len(),
            crate::settings::MAX_FC_COL,
            path.display()
        );
    }
    let mut writer = BufWriter::new(File::create(path)?);
    for (gene, fc) in ranked {
        writeln!(writer, "{}\t{}", gene, format_float(fc))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes one gene set file per cell state found in the EcoTyper directory.
/// Gene lists go to `outdir/enrichr`, ranked lists to `outdir/prerank`.
/// Returns the written files.
pub fn collect_gene_sets<P: AsRef<Path>, Q: AsRef<Path>>(
    ecotyper_dir: P,
    outdir: Q,
    enrichr: bool,
    prerank: bool,
) -> anyhow::Result<Vec<PathBuf>> {
    let outdir = outdir.as_ref();
    let cell_types = CellTypeCollection::from_dir(ecotyper_dir.as_ref())?;
    let kinds = [(EnrichKind::Enrichr, enrichr), (EnrichKind::Prerank, prerank)]
        .into_iter()
        .filter_map(|(kind, selected)| selected.then_some(kind))
        .collect_vec();
    for kind in &kinds {
        fs::create_dir_all(gene_sets_dir(outdir, *kind))?;
    }

    let mut written = Vec::new();
    for (cell_type, dirs) in cell_types.iter() {
        for dir in dirs {
            let info_path = dir.join(GENE_INFO_FILE);
            if !info_path.is_file() {
                warn!("{} has no {}, skipping", dir.display(), GENE_INFO_FILE);
                continue;
            }
            let states = genes_by_state(read_gene_info(&info_path)?);
            debug!("{}: {} states", cell_type, states.len());
            for (state, genes) in states.iter() {
                let filename = gene_set_filename(cell_type, state);
                for kind in &kinds {
                    let path = gene_sets_dir(outdir, *kind).join(&filename);
                    match kind {
                        EnrichKind::Enrichr => write_gene_list(&path, genes),
                        EnrichKind::Prerank => write_ranked_list(&path, genes),
                    }
                    .with_context(|| format!("Could not write {}", path.display()))?;
                    written.push(path);
                }
            }
        }
    }
    info!("Collected {} gene set files into {}", written.len(), outdir.display());
    Ok(written)
}

/// Reads a gene list, one gene per line. Duplicates are dropped.
pub fn read_gene_list<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<String>> {
    let path = path.as_ref();
    let reader = BufReader::new(
        File::open(path).with_context(|| format!("Could not open {}", path.display()))?,
    );
    let mut genes = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let gene = line.split('\t').next().unwrap_or_default().trim();
        if !gene.is_empty() {
            genes.push(gene.to_string());
        }
    }
    Ok(genes.into_iter().unique().collect())
}

/// Reads a ranked list of `gene<TAB>score` lines and sorts it by descending
/// score. A header line is tolerated.
pub fn read_ranked_list<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<(String, f64)>> {
    let path = path.as_ref();
    let reader = BufReader::new(
        File::open(path).with_context(|| format!("Could not open {}", path.display()))?,
    );
    let mut ranked = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (gene, score) = line
            .split_once('\t')
            .ok_or_else(|| anyhow!("{}:{}: expected 'gene<TAB>score'", path.display(), line_no + 1))?;
        match score.trim().parse::<f64>() {
            Ok(score) => ranked.push((gene.trim().to_string(), score)),
            Err(_) if line_no == 0 => continue,
            Err(_) => {
                return Err(anyhow!(
                    "{}:{}: '{}' is not a number",
                    path.display(),
                    line_no + 1,
                    score
                ))
            },
        }
    }
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(ranked.into_iter().unique_by(|(gene, _)| gene.clone()).collect())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::settings::ECOTYPES_DIR;

    #[test]
    fn gene_sets_per_state() -> anyhow::Result<()> {
        let ecotyper = tempdir()?;
        let out = tempdir()?;
        let cell_type = ecotyper.path().join("B.cells");
        fs::create_dir(&cell_type)?;
        fs::create_dir(ecotyper.path().join(ECOTYPES_DIR))?;
        fs::write(
            cell_type.join(GENE_INFO_FILE),
            "Gene\tState\tMaxFC\tOther\nCD19\tS01\t1.5\tx\nMS4A1\tS01\t2.5\tx\nCD79A\tS02\tNA\tx\nACTB\tNA\t0.1\tx\n",
        )?;

        let written = collect_gene_sets(ecotyper.path(), out.path(), true, true)?;
        assert_eq!(written.len(), 4);

        let enrichr_dir = gene_sets_dir(out.path(), EnrichKind::Enrichr);
        let prerank_dir = gene_sets_dir(out.path(), EnrichKind::Prerank);
        assert_eq!(fs::read_to_string(enrichr_dir.join("B.cells_S01.txt"))?, "CD19\nMS4A1\n");
        assert_eq!(fs::read_to_string(enrichr_dir.join("B.cells_S02.txt"))?, "CD79A\n");
        assert_eq!(
            fs::read_to_string(prerank_dir.join("B.cells_S01.txt"))?,
            "MS4A1\t2.5\nCD19\t1.5\n"
        );
        assert_eq!(fs::read_to_string(prerank_dir.join("B.cells_S02.txt"))?, "");
        assert!(!enrichr_dir.join("B.cells_NA.txt").exists());
        Ok(())
    }

    #[test]
    fn only_selected_kinds_are_written() -> anyhow::Result<()> {
        let ecotyper = tempdir()?;
        let out = tempdir()?;
        let cell_type = ecotyper.path().join("T.cells");
        fs::create_dir(&cell_type)?;
        fs::write(cell_type.join(GENE_INFO_FILE), "Gene\tState\tMaxFC\nCD3E\tS01\t3\n")?;

        collect_gene_sets(ecotyper.path(), out.path(), false, true)?;
        assert!(!gene_sets_dir(out.path(), EnrichKind::Enrichr).exists());
        assert_eq!(
            fs::read_to_string(gene_sets_dir(out.path(), EnrichKind::Prerank).join("T.cells_S01.txt"))?,
            "CD3E\t3\n"
        );
        Ok(())
    }

    #[test]
    fn ranked_list_tolerates_header() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("ranked.txt");
        fs::write(&path, "gene\tscore\nA\t-1\nB\t2\nA\t0\n")?;
        let ranked = read_ranked_list(&path)?;
        assert_eq!(ranked, vec![("B".to_string(), 2.0), ("A".to_string(), 0.0)]);
        Ok(())
    }
}
