//! Gene set enrichment of EcoTyper cell states.
//!
//! EcoTyper assigns genes to the cell states of every cell type it finds.
//! The gene sets of the states are collected from its result directory
//! ([`collect_gene_sets`]) and analysed either by over-representation
//! ([`enrichr`]) or by pre-ranked enrichment on the fold changes
//! ([`prerank`]). Results of the states of a cell type can be merged
//! ([`assemble_results`]) and restricted to the states forming ecotypes
//! ([`EcotypeCollection`]).

use std::fmt::Display;
use std::fs;
use std::path::{
    Path,
    PathBuf,
};
use std::str::FromStr;

use anyhow::{
    anyhow,
    ensure,
    Context,
};
use itertools::Itertools;
use log::{
    info,
    warn,
};

mod assemble;
mod cell_types;
mod collection;
mod ecotypes;
mod enrichr;
mod gene_sets;
mod prerank;

pub use assemble::assemble_results;
pub use cell_types::CellTypeCollection;
pub use collection::{
    EnrichmentCollection,
    Resolution,
};
pub use ecotypes::{
    Ecotype,
    EcotypeCollection,
};
pub use enrichr::{
    enrich_gene_list,
    enrichr,
    enrichr_files,
    EnrichrRecord,
};
pub use gene_sets::{
    collect_gene_sets,
    gene_set_filename,
    gene_sets_dir,
    read_gene_info,
    GeneInfo,
};
pub use prerank::{
    enrichment_score,
    prerank,
    prerank_files,
    prerank_list,
    PrerankParams,
    PrerankRecord,
};

use crate::io::GeneSetLibrary;
use crate::settings::{
    ENRICHMENT_RESULTS_SUFFIX,
    ENRICHR_DIR,
    ENRICHR_SUFFIX,
    GENE_SETS_DIR,
    PRERANK_DIR,
    PRERANK_SUFFIX,
};

/// The two kinds of enrichment analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrichKind {
    Enrichr,
    Prerank,
}

impl EnrichKind {
    /// Suffix of result files.
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Enrichr => ENRICHR_SUFFIX,
            Self::Prerank => PRERANK_SUFFIX,
        }
    }

    /// Directory of the collected gene sets.
    pub const fn dir_name(&self) -> &'static str {
        match self {
            Self::Enrichr => ENRICHR_DIR,
            Self::Prerank => PRERANK_DIR,
        }
    }
}

impl FromStr for EnrichKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "enrichr" => Ok(Self::Enrichr),
            "prerank" => Ok(Self::Prerank),
            other => Err(anyhow!(
                "Results type must be one of enrichr, prerank, got '{}'",
                other
            )),
        }
    }
}

impl Display for EnrichKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Enrichr => write!(f, "enrichr"),
            Self::Prerank => write!(f, "prerank"),
        }
    }
}

/// Regular files of `dir`, sorted by name.
pub(crate) fn list_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    Ok(fs::read_dir(dir)
        .with_context(|| format!("Could not list {}", dir.display()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .sorted()
        .collect())
}

/// Name of the result file of an analysed gene set file.
pub(crate) fn result_filename(
    file: &Path,
    kind: EnrichKind,
) -> anyhow::Result<String> {
    let name = file
        .file_name()
        .ok_or_else(|| anyhow!("Invalid gene set file {}", file.display()))?;
    Ok(format!("{}{}", name.to_string_lossy(), kind.suffix()))
}

/// `<parent>/<name>_enrichment_results` of an EcoTyper directory.
pub fn default_output<P: AsRef<Path>>(ecotyper_dir: P) -> PathBuf {
    let dir = ecotyper_dir.as_ref();
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    dir.parent()
        .unwrap_or_else(|| Path::new(""))
        .join(format!("{}{}", name, ENRICHMENT_RESULTS_SUFFIX))
}

#[derive(Debug, Clone, Default)]
pub struct EnrichOptions {
    /// Defaults to [`default_output`].
    pub output:    Option<PathBuf>,
    /// GMT gene set libraries.
    pub gene_sets: Vec<PathBuf>,
    pub enrichr:   bool,
    pub prerank:   bool,
    /// Merge the results of the states of each cell type.
    pub assemble:  bool,
    /// Only analyse states forming ecotypes, one sub-directory per ecotype.
    /// Results are not assembled in this mode.
    pub ecotypes:  bool,
    pub params:    PrerankParams,
}

impl EnrichOptions {
    fn kinds(&self) -> Vec<EnrichKind> {
        [
            (EnrichKind::Enrichr, self.enrichr),
            (EnrichKind::Prerank, self.prerank),
        ]
        .into_iter()
        .filter_map(|(kind, selected)| selected.then_some(kind))
        .collect()
    }
}

fn run_kind<P: AsRef<Path>>(
    kind: EnrichKind,
    files: &[P],
    outdir: &Path,
    libraries: &[GeneSetLibrary],
    params: &PrerankParams,
) -> anyhow::Result<Vec<PathBuf>> {
    match kind {
        EnrichKind::Enrichr => enrichr_files(files, outdir, libraries),
        EnrichKind::Prerank => prerank_files(files, outdir, libraries, params),
    }
}

/// Collects the gene sets of the EcoTyper directory and runs the selected
/// analyses on them. Returns the output directory.
pub fn enrich<P: AsRef<Path>>(
    ecotyper_dir: P,
    options: &EnrichOptions,
) -> anyhow::Result<PathBuf> {
    let input = ecotyper_dir.as_ref();
    ensure!(
        input.is_dir(),
        "{} is not an EcoTyper results directory",
        input.display()
    );
    let kinds = options.kinds();
    ensure!(
        kinds.is_empty() || !options.gene_sets.is_empty(),
        "No gene sets were specified"
    );
    let libraries = options
        .gene_sets
        .iter()
        .map(GeneSetLibrary::from_gmt)
        .collect::<anyhow::Result<Vec<_>>>()?;

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| default_output(input));
    let collected = output.join(GENE_SETS_DIR);
    fs::create_dir_all(&collected)
        .with_context(|| format!("Could not create {}", collected.display()))?;
    collect_gene_sets(input, &collected, options.enrichr, options.prerank)?;

    if kinds.is_empty() {
        warn!("No analysis selected, specify enrichr and/or prerank");
        return Ok(output);
    }

    if options.ecotypes {
        if options.assemble {
            warn!("Results are not assembled when analysing ecotypes");
        }
        let ecotypes = EcotypeCollection::from_dir(input)?;
        for ecotype in ecotypes.iter() {
            let outdir = output.join(ecotype.label());
            info!("Analysing ecotype {}", ecotype.label());
            for kind in &kinds {
                let source = gene_sets_dir(&collected, *kind);
                let files = ecotype
                    .gene_set_filenames()
                    .into_iter()
                    .map(|name| source.join(name))
                    .filter(|path| {
                        let exists = path.is_file();
                        if !exists {
                            warn!("No gene set {} for ecotype {}", path.display(), ecotype.label());
                        }
                        exists
                    })
                    .collect_vec();
                run_kind(*kind, &files, &outdir, &libraries, &options.params)?;
            }
        }
    }
    else {
        let cell_types = CellTypeCollection::from_dir(input)?;
        for kind in &kinds {
            let files = list_files(&gene_sets_dir(&collected, *kind))?;
            run_kind(*kind, &files, &output, &libraries, &options.params)?;
            if options.assemble {
                assemble_results(&output, &cell_types, *kind, true)?;
            }
        }
    }
    info!("Enrichment results written to {}", output.display());
    Ok(output)
}
