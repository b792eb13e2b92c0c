use std::path::PathBuf;

use anyhow::bail;
use clap::{
    Args,
    ValueEnum,
};
use console::style;
use ecohelper::prelude::*;
use log::info;

use crate::utils::{
    expand_wildcards,
    init_progress,
    validate_input,
    validate_output,
    PipelineCommand,
    UtilsArgs,
};

#[derive(Debug, Clone, Copy, ValueEnum, Eq, PartialEq)]
pub enum CliFormat {
    Csv,
    Tsv,
    Txt,
    Mtx,
    Rds,
}

impl From<CliFormat> for DataFormat {
    fn from(value: CliFormat) -> Self {
        match value {
            CliFormat::Csv => DataFormat::Csv,
            CliFormat::Tsv => DataFormat::Tsv,
            CliFormat::Txt => DataFormat::Txt,
            CliFormat::Mtx => DataFormat::Mtx,
            CliFormat::Rds => DataFormat::Rds,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ConvertArgs {
    #[arg(
        value_parser,
        num_args = 1..,
        required = true,
        help = "Input file(s). Wildcards are expanded."
    )]
    inputs: Vec<String>,

    #[arg(
        short,
        long,
        help = "Output file. By default the input with an altered suffix. With --recursive, the output directory."
    )]
    output: Option<PathBuf>,

    #[arg(
        short,
        long,
        default_value_t = false,
        help = "Mark the output as a directory rather than a target file."
    )]
    recursive: bool,

    #[arg(
        long,
        value_enum,
        help = "Input format, in case it is not evident from the input file suffix."
    )]
    from: Option<CliFormat>,

    #[arg(
        long,
        value_enum,
        help = "Output format, in case it is not evident from the output file suffix."
    )]
    to: Option<CliFormat>,

    #[arg(
        short,
        long,
        default_value_t = false,
        help = "Also write the index (row names) to tabular outputs. For Seurat objects this only applies to metadata tables, extracted data always has an index."
    )]
    index: bool,

    #[arg(
        short,
        long,
        help = "Assay layer to extract from a Seurat object. 'counts' by default.",
        help_heading = "SEURAT"
    )]
    data: Option<String>,

    #[arg(
        short,
        long,
        num_args = 1..,
        help = "Slots or attributes to extract from a Seurat object. 'meta.data' by default.",
        help_heading = "SEURAT"
    )]
    metadata: Option<Vec<String>>,
}

impl ConvertArgs {
    fn options(&self) -> ConvertOptions {
        ConvertOptions {
            output:    self.output.clone(),
            recursive: self.recursive,
            from:      self.from.map(|f| DataFormat::from(f).to_string()),
            to:        self.to.map(|f| DataFormat::from(f).to_string()),
            index:     self.index,
            data:      self.data.clone(),
            metadata:  self.metadata.clone(),
        }
    }
}

impl PipelineCommand for ConvertArgs {
    fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let inputs = expand_wildcards(self.inputs.clone());
        if inputs.is_empty() {
            bail!("No input files matched");
        }
        if inputs.len() > 1 && !self.recursive && self.output.is_some() {
            eprintln!(
                "{} inputs were given with a single output file, use {} to write into a directory.",
                inputs.len(),
                style("--recursive").red()
            );
            bail!("Multiple inputs require an output directory");
        }
        if let (Some(output), false) = (&self.output, self.recursive) {
            validate_output(output)?;
        }

        let options = self.options();
        let progress_bar = init_progress(utils, Some(inputs.len()))?;
        for input in inputs.iter() {
            validate_input(input)?;
            progress_bar.set_message(format!("{}", input.display()));
            let written = convert(input, &options)?;
            info!("{} -> {}", input.display(), written.display());
            progress_bar.inc(1);
        }
        progress_bar.finish_and_clear();
        Ok(())
    }
}
