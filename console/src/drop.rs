use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use ecohelper::prelude::*;
use ecohelper::settings::{
    CELL_TYPE_COL,
    ID_COL,
    SAMPLE_COL,
};
use log::info;

use crate::utils::{
    validate_input,
    validate_output,
    PipelineCommand,
    UtilsArgs,
};

#[derive(Debug, Clone, Args)]
pub struct DropArgs {
    #[arg(help = "Annotation table.")]
    annotation: PathBuf,
    #[arg(help = "Expression matrix, entries in columns.")]
    expression: PathBuf,

    #[arg(short, long, num_args = 1.., help = "Samples to drop.")]
    samples:      Vec<String>,
    #[arg(short, long = "celltypes", num_args = 1.., help = "Cell types to drop.")]
    cell_types:   Vec<String>,
    #[arg(short, long, num_args = 1.., help = "Entry identifiers to drop.")]
    ids:          Vec<String>,
    #[arg(
        short,
        long,
        help = "Basename of the outputs. The inputs with a .drop suffix by default."
    )]
    output:       Option<PathBuf>,
    #[arg(long, default_value = SAMPLE_COL, help = "Annotation column of samples.")]
    sample_col:   String,
    #[arg(long = "celltype-col", default_value = CELL_TYPE_COL, help = "Annotation column of cell types.")]
    cell_type_col: String,
    #[arg(long, default_value = ID_COL, help = "Annotation column of entry identifiers.")]
    id_col:       String,
}

impl PipelineCommand for DropArgs {
    fn run(
        &self,
        _utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        validate_input(&self.annotation)?;
        validate_input(&self.expression)?;
        if let Some(output) = &self.output {
            validate_output(output)?;
        }
        if self.samples.is_empty() && self.cell_types.is_empty() && self.ids.is_empty() {
            bail!("Nothing to drop, specify samples, cell types or ids");
        }

        let options = DropOptions {
            ids:           self.ids.clone(),
            samples:       self.samples.clone(),
            cell_types:    self.cell_types.clone(),
            id_col:        self.id_col.clone(),
            sample_col:    self.sample_col.clone(),
            cell_type_col: self.cell_type_col.clone(),
            output:        self.output.clone(),
        };
        let (annotation, expression) = drop_entries(&self.annotation, &self.expression, &options)?;
        info!(
            "Reduced dataset written to {} and {}",
            annotation.display(),
            expression.display()
        );
        Ok(())
    }
}
