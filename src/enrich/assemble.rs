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

use super::cell_types::CellTypeCollection;
use super::{
    list_files,
    EnrichKind,
};
use crate::io::tabular::{
    concat_tables,
    prepend_column,
    read_table,
    text_series,
    write_table,
};
use crate::settings::STATE_COL;

/// State of a raw result file `<CellType>_<State>.txt<suffix>`, if the file
/// belongs to `cell_type`.
pub fn state_of(
    filename: &str,
    cell_type: &str,
    kind: EnrichKind,
) -> Option<String> {
    let rest = filename
        .strip_prefix(cell_type)?
        .strip_prefix('_')?;
    if !rest.ends_with(kind.suffix()) {
        return None;
    }
    let state = rest.split('.').next()?;
    (!state.is_empty() && !state.contains('_')).then(|| state.to_string())
}

/// Merges the raw result files of each cell type in `dir` into
/// `<CellType><suffix>`, with the state of every row in a leading column.
/// Returns the assembled files.
pub fn assemble_results<P: AsRef<Path>>(
    dir: P,
    cell_types: &CellTypeCollection,
    kind: EnrichKind,
    remove_raw: bool,
) -> anyhow::Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let files = list_files(dir)?;
    let mut assembled = Vec::new();

    for cell_type in cell_types.names() {
        let raw = files
            .iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_string_lossy().to_string();
                state_of(&name, cell_type, kind).map(|state| (state, path.clone()))
            })
            .collect_vec();
        if raw.is_empty() {
            debug!("No {} results for {}", kind, cell_type);
            continue;
        }

        let tables = raw
            .iter()
            .map(|(state, path)| {
                let df = read_table(path, b'\t')
                    .with_context(|| format!("Could not read {}", path.display()))?;
                let states = vec![Some(state.clone()); df.height()];
                prepend_column(&df, text_series(STATE_COL, states))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        let mut merged = concat_tables(tables)?;
        let output = dir.join(format!("{}{}", cell_type, kind.suffix()));
        write_table(&mut merged, &output, b'\t')?;
        debug!("Assembled {} files into {}", raw.len(), output.display());

        if remove_raw {
            for (_, path) in &raw {
                if let Err(e) = fs::remove_file(path) {
                    warn!("Could not remove {}: {}", path.display(), e);
                }
            }
        }
        assembled.push(output);
    }
    info!(
        "Assembled {} results of {} cell types in {}",
        kind,
        assembled.len(),
        dir.display()
    );
    Ok(assembled)
}
