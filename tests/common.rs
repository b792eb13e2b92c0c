#![allow(dead_code)]
use std::fs;
use std::path::{
    Path,
    PathBuf,
};

use ecohelper::settings::{
    ECOTYPES_DIR,
    ECOTYPES_FILE,
    GENE_INFO_FILE,
};
use rand::rngs::StdRng;
use rand::{
    Rng,
    SeedableRng,
};

/// Synthetic counts, annotation and GTF of a small single-cell experiment.
pub struct DemoDataset {
    pub n_genes: usize,
    pub n_cells: usize,
    pub seed:    u64,
}

impl Default for DemoDataset {
    fn default() -> Self {
        Self {
            n_genes: 5,
            n_cells: 6,
            seed:    42,
        }
    }
}

impl DemoDataset {
    pub fn cell(
        &self,
        idx: usize,
    ) -> String {
        format!("c-{}", idx + 1)
    }

    pub fn cell_type(
        &self,
        idx: usize,
    ) -> &'static str {
        if idx % 2 == 0 {
            "T cell"
        }
        else {
            "B-cell"
        }
    }

    /// Gene `i` has a single exon of `100 * (i + 1)` bases.
    pub fn gene_length(
        &self,
        idx: usize,
    ) -> f64 {
        100.0 * (idx + 1) as f64
    }

    pub fn write_counts(
        &self,
        path: &Path,
    ) -> anyhow::Result<()> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut content = String::from("gene_id");
        for j in 0..self.n_cells {
            content.push('\t');
            content.push_str(&self.cell(j));
        }
        content.push('\n');
        for i in 0..self.n_genes {
            content.push_str(&format!("G{}", i));
            for _ in 0..self.n_cells {
                content.push_str(&format!("\t{}", rng.gen_range(1..500)));
            }
            content.push('\n');
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn write_gtf(
        &self,
        path: &Path,
    ) -> anyhow::Result<()> {
        let mut content = String::new();
        let mut start = 1;
        for i in 0..self.n_genes {
            let end = start + self.gene_length(i) as usize - 1;
            content.push_str(&format!(
                "chr1\tdemo\texon\t{}\t{}\t.\t+\t.\tgene_id \"G{}\"; transcript_id \"T{}\"; gene_name \"Gene-{}\";\n",
                start, end, i, i, i
            ));
            start = end + 1000;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn write_annotation(
        &self,
        path: &Path,
    ) -> anyhow::Result<()> {
        let mut content = String::from("ID\tCellType\tSample\n");
        for j in 0..self.n_cells {
            content.push_str(&format!(
                "{}\t{}\tP-{}\n",
                self.cell(j),
                self.cell_type(j),
                j / 3
            ));
        }
        fs::write(path, content)?;
        Ok(())
    }
}

/// An EcoTyper result directory with two cell types of two states each, and
/// a GMT library covering their genes. Returns the result directory and the
/// library path.
pub fn demo_ecotyper(root: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
    let ecotyper = root.join("discovery");
    for (cell_type, prefix) in [("B.cells", "B"), ("T.cells", "T")] {
        let path = ecotyper.join(cell_type);
        fs::create_dir_all(&path)?;
        let mut info = String::from("Gene\tState\tMaxFC\n");
        for i in 0..10 {
            let state = if i < 5 { "S01" } else { "S02" };
            info.push_str(&format!("{}{}\t{}\t{:.2}\n", prefix, i, state, 10.0 - i as f64 * 0.5));
        }
        info.push_str(&format!("{}X\tNA\t0.1\n", prefix));
        fs::write(path.join(GENE_INFO_FILE), info)?;
    }
    fs::create_dir_all(ecotyper.join(ECOTYPES_DIR))?;
    fs::write(
        ecotyper.join(ECOTYPES_DIR).join(ECOTYPES_FILE),
        "CellType\tState\tEcotype\nB.cells\tS01\tE1\nT.cells\tS02\tE1\nB.cells\tS02\tE2\nT.cells\tS01\tE2\n",
    )?;

    let gmt = root.join("demo.gmt");
    fs::write(
        &gmt,
        "B_early\tB cells early\tB0\tB1\tB2\n\
         B_late\tB cells late\tB5\tB6\tB7\tB8\n\
         T_early\tT cells early\tT0\tT1\tT2\n\
         T_late\tT cells late\tT6\tT7\tT8\n\
         Mixed\tmixed\tB0\tT0\tB6\tT6\tB9\tT9\n",
    )?;
    Ok((ecotyper, gmt))
}

/// Rows of a tab separated file, header included.
pub fn read_rows(path: &Path) -> anyhow::Result<Vec<Vec<String>>> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect())
}
