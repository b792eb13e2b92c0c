//! Fixed file, directory and column names shared by the tools.
//!
//! EcoTyper writes its results in a fixed layout; the enrichment and drop
//! tools rely on these names to find the inputs they need.

/// Column holding the cell state of a gene or cell.
pub const STATE_COL: &str = "State";
/// Column holding the cell type label.
pub const CELL_TYPE_COL: &str = "CellType";
/// Column holding the maximal fold change of a gene across states.
pub const MAX_FC_COL: &str = "MaxFC";
/// Column holding sample identifiers in an annotation table.
pub const SAMPLE_COL: &str = "Sample";
/// Column holding cell identifiers in an annotation table.
pub const ID_COL: &str = "ID";

/// Per-cell-type gene assignment written by EcoTyper.
pub const GENE_INFO_FILE: &str = "gene_info.txt";
/// Directory of EcoTyper ecotype results.
pub const ECOTYPES_DIR: &str = "Ecotypes";
/// Ecotype assignment of cell states.
pub const ECOTYPES_FILE: &str = "ecotypes.txt";

/// Directory the per-state gene sets are collected into.
pub const GENE_SETS_DIR: &str = "gene_sets";
pub const ENRICHR_DIR: &str = "enrichr";
pub const PRERANK_DIR: &str = "prerank";

pub const ENRICHR_SUFFIX: &str = ".enrichr.txt";
pub const PRERANK_SUFFIX: &str = ".prerank.txt";

/// Appended to the name of an EcoTyper directory to form the default
/// enrichment output directory.
pub const ENRICHMENT_RESULTS_SUFFIX: &str = "_enrichment_results";

/// Values of a state column that mark an unassigned gene.
pub const MISSING_STATES: [&str; 3] = ["", "NA", "nan"];

/// Environment variable sizing the global thread pool.
pub const NUM_THREADS_ENV: &str = "ECOHELPER_NUM_THREADS";
