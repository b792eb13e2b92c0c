pub use crate::convert::{
    convert,
    ConvertOptions,
};
pub use crate::drop::{
    drop_entries,
    Dataset,
    DropOptions,
};
pub use crate::enrich::{
    assemble_results,
    collect_gene_sets,
    enrich,
    enrichr,
    prerank,
    CellTypeCollection,
    EcotypeCollection,
    EnrichKind,
    EnrichOptions,
    EnrichmentCollection,
    PrerankParams,
    Resolution,
};
pub use crate::format::{
    format,
    FormatOptions,
    Formats,
    Formatter,
    Preset,
};
pub use crate::io::{
    DataFormat,
    GeneSetLibrary,
    LabeledMatrix,
};
pub use crate::normalise::{
    normalise,
    LengthColumns,
    NormMethod,
    NormTable,
    NormaliseOptions,
};
