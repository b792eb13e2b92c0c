use std::path::PathBuf;

use clap::{
    Args,
    ValueEnum,
};
use console::style;
use dialoguer::Confirm;
use ecohelper::format::output_path;
use ecohelper::prelude::*;
use log::info;

use crate::utils::{
    validate_input,
    validate_output,
    PipelineCommand,
    UtilsArgs,
};

#[derive(Debug, Clone, Copy, ValueEnum, Eq, PartialEq)]
pub enum CliSeparator {
    Tsv,
    Csv,
    Txt,
}

impl CliSeparator {
    fn name(&self) -> &'static str {
        match self {
            Self::Tsv => "tsv",
            Self::Csv => "csv",
            Self::Txt => "txt",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Eq, PartialEq)]
pub enum CliPreset {
    Expression,
    EcoExpression,
    Annotation,
}

impl From<CliPreset> for Preset {
    fn from(value: CliPreset) -> Self {
        match value {
            CliPreset::Expression => Preset::Expression,
            CliPreset::EcoExpression => Preset::EcoExpression,
            CliPreset::Annotation => Preset::Annotation,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct FormatArgs {
    #[arg(help = "Table to reformat.")]
    input: PathBuf,

    #[arg(short, long, help = "Output file. The input is overwritten by default.")]
    output: Option<PathBuf>,
    #[arg(short, long, help = "Suffix appended to the output file name.")]
    suffix: Option<String>,
    #[arg(
        short,
        long = "format",
        help = "Substitution rules, either a file of 'pattern : replacement' lines or the name of built-in rules. EcoTyper by default."
    )]
    formats: Option<String>,
    #[arg(short, long, default_value_t = false, help = "Reformat the index.")]
    index: bool,
    #[arg(short, long, default_value_t = false, help = "Reformat the header.")]
    names: bool,
    #[arg(
        short,
        long,
        num_args = 1..,
        help = "Columns whose values to reformat."
    )]
    columns: Vec<String>,
    #[arg(long, help = "Label of the index in the output.")]
    index_name: Option<String>,
    #[arg(long, default_value_t = false, help = "Do not write the index.")]
    no_index: bool,
    #[arg(
        short,
        long,
        default_value_t = false,
        help = "Process the file line by line. Only index and header can be reformatted."
    )]
    pseudo: bool,
    #[arg(
        long,
        value_enum,
        help = "Separator of the input file. Taken from its suffix by default."
    )]
    separator: Option<CliSeparator>,
    #[arg(short = 'y', long, default_value_t = false, help = "Overwrite the input without asking.")]
    yes: bool,

    #[arg(
        long,
        value_enum,
        conflicts_with_all = ["expression", "eco_expression", "annotation"],
        help = "Preset of options.",
        help_heading = "PRESETS"
    )]
    preset:         Option<CliPreset>,
    #[arg(
        short = 'e',
        long,
        default_value_t = false,
        help = "Reformat index and header in pseudo mode.",
        help_heading = "PRESETS"
    )]
    expression:     bool,
    #[arg(
        short = 'E',
        long,
        default_value_t = false,
        help = "Reformat index and header in pseudo mode using the EcoTyper rules.",
        help_heading = "PRESETS"
    )]
    eco_expression: bool,
    #[arg(
        short = 'a',
        long,
        default_value_t = false,
        help = "Reformat index, CellType and Sample using the EcoTyper rules, labelling the index ID.",
        help_heading = "PRESETS"
    )]
    annotation:     bool,
}

impl FormatArgs {
    fn preset(&self) -> Option<Preset> {
        if let Some(preset) = self.preset {
            return Some(preset.into());
        }
        [
            (self.eco_expression, Preset::EcoExpression),
            (self.expression, Preset::Expression),
            (self.annotation, Preset::Annotation),
        ]
        .into_iter()
        .find_map(|(selected, preset)| selected.then_some(preset))
    }

    fn options(&self) -> FormatOptions {
        FormatOptions {
            output:     self.output.clone(),
            suffix:     self.suffix.clone(),
            formats:    self.formats.clone(),
            index:      self.index,
            names:      self.names,
            columns:    self.columns.clone(),
            index_name: self.index_name.clone(),
            no_index:   self.no_index,
            pseudo:     self.pseudo,
            separator:  self.separator.map(|s| s.name().to_string()),
            preset:     self.preset(),
        }
    }
}

impl PipelineCommand for FormatArgs {
    fn run(
        &self,
        _utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        validate_input(&self.input)?;
        let options = self.options();
        if self.output.is_some() {
            validate_output(&output_path(&self.input, &options))?;
        }

        if output_path(&self.input, &options) == self.input && !self.yes {
            let prompt = format!(
                "{} will be overwritten. Continue?",
                self.input.display()
            );
            if !Confirm::new().with_prompt(prompt).interact()? {
                println!("{}", style("Process aborted by the user").red());
                return Ok(());
            }
        }

        let written = format(&self.input, &options)?;
        info!("Reformatted table written to {}", written.display());
        Ok(())
    }
}
