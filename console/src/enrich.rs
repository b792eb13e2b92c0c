use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use ecohelper::prelude::*;
use log::info;

use crate::utils::{
    expand_wildcards,
    init_progress,
    validate_dir,
    validate_input,
    PipelineCommand,
    UtilsArgs,
};

#[derive(Debug, Clone, Args)]
pub struct EnrichArgs {
    #[arg(help = "EcoTyper results directory.")]
    input: PathBuf,

    #[arg(
        short,
        long,
        help = "Output directory. <input>_enrichment_results next to the input by default."
    )]
    output:    Option<PathBuf>,
    #[arg(
        short,
        long,
        num_args = 1..,
        help = "GMT gene set libraries. Wildcards are expanded."
    )]
    gene_sets: Vec<String>,
    #[arg(short, long, default_value_t = false, help = "Run the over-representation analysis.")]
    enrichr:   bool,
    #[arg(short, long, default_value_t = false, help = "Run the pre-ranked analysis.")]
    prerank:   bool,
    #[arg(
        short,
        long,
        default_value_t = false,
        help = "Merge the results of the states of each cell type."
    )]
    assemble:  bool,
    #[arg(
        short = 'E',
        long,
        default_value_t = false,
        help = "Only analyse the states forming ecotypes, one sub-directory per ecotype. Results are not assembled."
    )]
    ecotypes:  bool,

    #[arg(
        long,
        num_args = 2,
        value_names = ["MIN", "MAX"],
        default_values_t = [5, 500],
        help = "Bounds of the number of genes of a set found in the ranked list.",
        help_heading = "PRERANK"
    )]
    size:         Vec<usize>,
    #[arg(
        long,
        default_value_t = 1000,
        help = "Number of permutations.",
        help_heading = "PRERANK"
    )]
    permutations: usize,
    #[arg(long, default_value_t = 123, help = "Random seed.", help_heading = "PRERANK")]
    seed:         u64,
    #[arg(
        long,
        default_value_t = 1.0,
        help = "Exponent of the ranking scores.",
        help_heading = "PRERANK"
    )]
    weight:       f64,
}

impl EnrichArgs {
    fn params(&self) -> anyhow::Result<PrerankParams> {
        let [min_size, max_size] = self.size[..] else {
            bail!("--size requires a minimum and a maximum");
        };
        Ok(PrerankParams {
            min_size,
            max_size,
            permutations: self.permutations,
            seed: self.seed,
            weight: self.weight,
        })
    }
}

impl PipelineCommand for EnrichArgs {
    fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        validate_dir(&self.input)?;
        let gene_sets = expand_wildcards(self.gene_sets.clone());
        for path in gene_sets.iter() {
            validate_input(path)?;
        }

        let options = EnrichOptions {
            output: self.output.clone(),
            gene_sets,
            enrichr: self.enrichr,
            prerank: self.prerank,
            assemble: self.assemble,
            ecotypes: self.ecotypes,
            params: self.params()?,
        };

        let spinner = init_progress(utils, None)?;
        spinner.set_message(format!("Analysing {}", self.input.display()));
        let output = enrich(&self.input, &options)?;
        spinner.finish_and_clear();
        info!("Enrichment results written to {}", output.display());
        Ok(())
    }
}
