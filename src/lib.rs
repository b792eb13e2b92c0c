//! # ecohelper
//!
//! `ecohelper` is a toolbox for pre-processing transcriptomics data to be
//! used with the EcoTyper cell state and ecotype discovery framework. Every
//! operation is a file-to-file transformation, also available through the
//! `eco_helper` command-line tool.
//!
//! ## Structure
//!
//! * [`convert`]: conversion between csv/tsv/txt tables, MatrixMarket files
//!   and Seurat RDS objects.
//! * [`normalise`]: TPM and CPM normalisation of raw counts, with gene
//!   lengths computed from GTF annotations.
//! * [`format`]: regex based cleanup of index, header and column labels so
//!   they are accepted by EcoTyper.
//! * [`enrich`]: gene set enrichment analysis (over-representation and
//!   pre-ranked) of the cell states identified by EcoTyper.
//! * [`drop`]: removal of entries from annotation/expression dataset pairs.
//! * [`io`]: readers and writers of the supported file formats.
//! * [`settings`]: fixed file and column names of EcoTyper results.
//! * [`utils`]: thread pool, rounding and statistics helpers.
//!
//! Number of threads to be used can be configured with the
//! `ECOHELPER_NUM_THREADS` environment variable.
//!
//! ## Usage
//!
//! ```no_run
//! use ecohelper::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut options = NormaliseOptions::new(NormMethod::Tpm);
//!     options.gtf = Some("annotation.gtf".into());
//!     let written = normalise("counts.tsv", &options)?;
//!
//!     let options = FormatOptions {
//!         preset: Some(Preset::EcoExpression),
//!         ..Default::default()
//!     };
//!     format(&written, &options)?;
//!     Ok(())
//! }
//! ```

#[ctor::ctor]
fn init() {
    if let Ok(n) = std::env::var(settings::NUM_THREADS_ENV) {
        std::env::set_var("POLARS_MAX_THREADS", n)
    }
}

pub mod convert;
pub mod drop;
pub mod enrich;
pub mod format;
pub mod io;
pub mod normalise;
pub mod prelude;
pub mod settings;
pub mod utils;
