use std::path::{
    Path,
    PathBuf,
};

use anyhow::{
    anyhow,
    bail,
};
use clap::{
    ArgAction,
    Args,
};
use console::style;
use ecohelper::settings::NUM_THREADS_ENV;
use glob::glob;
use indicatif::{
    ProgressBar,
    ProgressStyle,
};
use log::LevelFilter;

/// A subcommand of the command-line tool.
pub trait PipelineCommand {
    fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()>;
}

#[derive(Args, Debug, Clone)]
pub struct UtilsArgs {
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging verbosity (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.",
        help_heading = "UTILS"
    )]
    pub verbose:  u8,
    #[arg(
        long,
        default_value_t = false,
        help = "Display progress bars.",
        help_heading = "UTILS"
    )]
    pub progress: bool,
    #[arg(
        short = '@',
        long,
        help = "Number of threads to use. All available by default.",
        help_heading = "UTILS"
    )]
    pub threads:  Option<usize>,
}

impl UtilsArgs {
    /// Initialises logging and the number of threads. Must run before any
    /// library call.
    pub fn setup(&self) -> anyhow::Result<()> {
        if let Some(threads) = self.threads {
            if threads == 0 {
                bail!("Number of threads must be positive");
            }
            std::env::set_var(NUM_THREADS_ENV, threads.to_string());
            std::env::set_var("POLARS_MAX_THREADS", threads.to_string());
        }

        let mut builder = pretty_env_logger::formatted_builder();
        match std::env::var("RUST_LOG") {
            Ok(filters) => {
                builder.parse_filters(&filters);
            },
            Err(_) => {
                builder.filter_level(match self.verbose {
                    0 => LevelFilter::Warn,
                    1 => LevelFilter::Info,
                    2 => LevelFilter::Debug,
                    _ => LevelFilter::Trace,
                });
            },
        }
        builder
            .try_init()
            .map_err(|e| anyhow!("Could not initialise logging: {}", e))?;
        Ok(())
    }
}

pub fn init_pbar(total: usize) -> anyhow::Result<ProgressBar> {
    let progress_bar = ProgressBar::new(total as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}, ETA: {eta}] [{bar:40.cyan/blue}] {pos:>5.green}/{len:5} {msg}",
            )?
            .progress_chars("#>-"),
    );
    progress_bar.set_message("Processing...");
    Ok(progress_bar)
}

pub fn init_spinner() -> anyhow::Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(spinner)
}

/// A progress bar when progress is requested, hidden otherwise. A spinner
/// is used when the amount of work is unknown.
pub fn init_progress(
    utils: &UtilsArgs,
    total: Option<usize>,
) -> anyhow::Result<ProgressBar> {
    if !utils.progress {
        return Ok(ProgressBar::hidden());
    }
    match total {
        Some(total) => init_pbar(total),
        None => init_spinner(),
    }
}

pub fn validate_input(path: &Path) -> anyhow::Result<PathBuf> {
    if !path.exists() {
        eprintln!("Path {} does not exist.", style(path.display()).red());
        bail!("Input {} does not exist", path.display());
    }
    if !path.is_file() {
        eprintln!("Path {} is not a file.", style(path.display()).red());
        bail!("Input {} is not a file", path.display());
    }
    Ok(path.to_path_buf())
}

pub fn validate_dir(path: &Path) -> anyhow::Result<PathBuf> {
    if !path.is_dir() {
        eprintln!("Path {} is not a directory.", style(path.display()).red());
        bail!("Input {} is not a directory", path.display());
    }
    Ok(path.to_path_buf())
}

pub fn validate_output(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_dir() {
        eprintln!("Output path {} is a directory.", style(path.display()).red());
        bail!("Output {} is a directory", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            eprintln!(
                "Output directory {} does not exist.",
                style(parent.display()).red()
            );
            bail!("Output directory {} does not exist", parent.display());
        }
    }
    Ok(path.to_path_buf())
}

pub(crate) fn expand_wildcards(paths: Vec<String>) -> Vec<PathBuf> {
    let mut expanded_paths = Vec::new();

    for path in paths {
        if path.contains('*') || path.contains('?') {
            match glob(&path) {
                Ok(matches) => {
                    for entry in matches.filter_map(Result::ok) {
                        expanded_paths.push(entry);
                    }
                },
                Err(e) => eprintln!("Error processing wildcard '{}': {}", path, e),
            }
        }
        else {
            expanded_paths.push(PathBuf::from(path));
        }
    }

    expanded_paths
}
