//! File formats read and written by the tools.
//!
//! - [`tabular`]: delimited text tables (csv, tsv, txt) as polars frames.
//! - [`mtx`]: MatrixMarket coordinate files with name sidecars.
//! - [`seurat`]: extraction from Seurat RDS files via `Rscript`.
//! - [`gmt`]: gene set libraries.

pub mod gmt;
pub mod matrix;
pub mod mtx;
pub mod schema;
pub mod seurat;
pub mod tabular;

pub use gmt::GeneSetLibrary;
pub use matrix::LabeledMatrix;
pub use mtx::{
    read_mtx,
    write_mtx,
};
pub use schema::{
    append_to_name,
    file_suffix,
    with_suffix,
    DataFormat,
};
pub use seurat::{
    seurat_to_tabular,
    SeuratExtraction,
};
pub use tabular::{
    read_table,
    write_table,
};
