use std::path::PathBuf;

use clap::{
    Args,
    ValueEnum,
};
use ecohelper::prelude::*;
use log::info;

use crate::utils::{
    init_progress,
    validate_input,
    validate_output,
    PipelineCommand,
    UtilsArgs,
};

#[derive(Debug, Clone, Copy, ValueEnum, Eq, PartialEq)]
pub enum CliNormMethod {
    Tpm,
    Cpm,
}

impl From<CliNormMethod> for NormMethod {
    fn from(value: CliNormMethod) -> Self {
        match value {
            CliNormMethod::Tpm => NormMethod::Tpm,
            CliNormMethod::Cpm => NormMethod::Cpm,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct NormaliseArgs {
    #[arg(value_enum, help = "Normalisation to perform.")]
    norm:  CliNormMethod,
    #[arg(help = "Table of raw counts, genes in rows and samples in columns.")]
    input: PathBuf,

    #[arg(
        short,
        long,
        help = "Output file. By default the input with the method inserted before its suffix."
    )]
    output: Option<PathBuf>,
    #[arg(short, long, default_value_t = 5, help = "Number of decimals to round to.")]
    digits: u32,
    #[arg(long, default_value_t = false, help = "Log-transform the normalised values.")]
    log:    bool,

    #[arg(
        short,
        long,
        help = "Table of gene lengths. Required for TPM unless a GTF file is given.",
        help_heading = "LENGTHS"
    )]
    lengths:       Option<PathBuf>,
    #[arg(
        short,
        long,
        help = "GTF annotation to compute gene lengths from.",
        help_heading = "LENGTHS"
    )]
    gtf:           Option<PathBuf>,
    #[arg(
        short,
        long,
        default_value_t = false,
        help = "Identify genes of the GTF derived lengths by gene name instead of gene id.",
        help_heading = "LENGTHS"
    )]
    swap:          bool,
    #[arg(
        short,
        long,
        default_value_t = false,
        help = "Replace gene identifiers by gene names in the output.",
        help_heading = "LENGTHS"
    )]
    names:         bool,
    #[arg(
        long,
        help = "Column of the lengths table holding lengths. The last column by default.",
        help_heading = "LENGTHS"
    )]
    length_column: Option<String>,
    #[arg(
        long,
        help = "Column of the lengths table holding gene identifiers. The first column by default.",
        help_heading = "LENGTHS"
    )]
    id_column:     Option<String>,
    #[arg(
        long,
        help = "Column of the lengths table holding gene names.",
        help_heading = "LENGTHS"
    )]
    name_column:   Option<String>,
}

impl NormaliseArgs {
    fn options(&self) -> NormaliseOptions {
        let mut options = NormaliseOptions::new(self.norm.into());
        options.output = self.output.clone();
        options.lengths = self.lengths.clone();
        options.gtf = self.gtf.clone();
        options.swap = self.swap;
        options.names = self.names;
        options.digits = self.digits;
        options.log = self.log;
        options.columns = LengthColumns {
            which:    self.length_column.clone(),
            id_col:   self.id_column.clone(),
            name_col: self.name_column.clone(),
        };
        options
    }
}

impl PipelineCommand for NormaliseArgs {
    fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        validate_input(&self.input)?;
        if let Some(gtf) = &self.gtf {
            validate_input(gtf)?;
        }
        if let Some(lengths) = &self.lengths {
            validate_input(lengths)?;
        }
        if let Some(output) = &self.output {
            validate_output(output)?;
        }

        let spinner = init_progress(utils, None)?;
        spinner.set_message(format!("Normalising {}", self.input.display()));
        let written = normalise(&self.input, &self.options())?;
        spinner.finish_and_clear();
        info!("Normalised counts written to {}", written.display());
        Ok(())
    }
}
