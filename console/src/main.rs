mod convert;
mod drop;
mod enrich;
mod format;
mod normalise;
mod utils;

use clap::{
    Parser,
    Subcommand,
};
use utils::{
    PipelineCommand,
    UtilsArgs,
};
use wild::ArgsOs;

#[derive(Parser, Debug)]
#[command(
    name = "eco_helper",
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None,)]
struct Cli {
    #[command(subcommand)]
    command: MainMenu,
}

#[derive(Subcommand, Debug)]
enum MainMenu {
    /// Convert between csv/tsv/txt tables, MatrixMarket files and Seurat objects.
    Convert {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  convert::ConvertArgs,
    },

    /// Normalise raw counts to TPM or CPM.
    Normalise {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  normalise::NormaliseArgs,
    },

    /// Reformat index, header and column labels of a table.
    Format {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  format::FormatArgs,
    },

    /// Gene set enrichment of the cell states of an EcoTyper run.
    Enrich {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  enrich::EnrichArgs,
    },

    /// Drop entries from an annotation and expression dataset.
    Drop {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  drop::DropArgs,
    },
}

fn main() -> anyhow::Result<()> {
    let args: ArgsOs = wild::args_os();
    let cli = Cli::parse_from(args);

    match cli.command {
        MainMenu::Convert { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Normalise { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Format { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Enrich { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Drop { utils, args } => {
            utils.setup()?;
            args.run(&utils)?
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::fs;

    use clap::CommandFactory;
    use ecohelper::drop::output_paths;

    use super::*;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_enrich_size() {
        let cli = Cli::try_parse_from([
            "eco_helper",
            "enrich",
            "results",
            "-g",
            "a.gmt",
            "b.gmt",
            "-p",
            "--size",
            "10",
            "200",
        ])
        .unwrap();
        match cli.command {
            MainMenu::Enrich { args, .. } => {
                let dbg = format!("{:?}", args);
                assert!(dbg.contains("size: [10, 200]"));
                assert!(dbg.contains("prerank: true"));
            },
            other => panic!("Unexpected command {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_norm() {
        assert!(Cli::try_parse_from(["eco_helper", "normalise", "rpkm", "counts.tsv"]).is_err());
    }

    #[test]
    fn presets_conflict() {
        assert!(Cli::try_parse_from([
            "eco_helper",
            "format",
            "table.tsv",
            "--preset",
            "annotation",
            "-e"
        ])
        .is_err());
    }

    #[test]
    fn drop_runs_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let annotation = dir.path().join("annotation.tsv");
        let expression = dir.path().join("expression.tsv");
        fs::write(
            &annotation,
            "ID\tCellType\tSample\nc1\tT\ts1\nc2\tB\ts1\nc3\tT\ts2\n",
        )
        .unwrap();
        fs::write(&expression, "Gene\tc1\tc2\tc3\nG1\t1\t2\t3\nG2\t4\t5\t6\n").unwrap();

        let cli = Cli::try_parse_from([
            OsString::from("eco_helper"),
            OsString::from("drop"),
            annotation.clone().into_os_string(),
            expression.clone().into_os_string(),
            OsString::from("-c"),
            OsString::from("B"),
        ])
        .unwrap();
        let MainMenu::Drop { utils, args } = cli.command
        else {
            panic!("Expected the drop command");
        };
        args.run(&utils).unwrap();

        let (_, expression_out) = output_paths(&annotation, &expression, None);
        let reduced = fs::read_to_string(expression_out).unwrap();
        assert_eq!(reduced.lines().next(), Some("Gene\tc1\tc3"));
    }

    #[test]
    fn outputs_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let counts = dir.path().join("counts.tsv");
        fs::write(&counts, "gene\ts1\nG1\t1\n").unwrap();

        for output in [dir.path().to_path_buf(), dir.path().join("missing").join("out.tsv")] {
            let cli = Cli::try_parse_from([
                OsString::from("eco_helper"),
                OsString::from("format"),
                counts.clone().into_os_string(),
                OsString::from("-o"),
                output.into_os_string(),
                OsString::from("-y"),
            ])
            .unwrap();
            let MainMenu::Format { utils, args } = cli.command
            else {
                panic!("Expected the format command");
            };
            assert!(args.run(&utils).is_err());
        }
        assert_eq!(
            fs::read_to_string(&counts).unwrap(),
            "gene\ts1\nG1\t1\n"
        );
    }

    #[test]
    fn format_help_describes_rules_files() {
        let command = Cli::command();
        let help = command
            .find_subcommand("format")
            .and_then(|format| format.get_arguments().find(|arg| arg.get_id() == "formats"))
            .and_then(|arg| arg.get_help())
            .map(|help| help.to_string())
            .unwrap();
        assert!(help.contains("'pattern : replacement'"));
        assert!(!help.contains("JSON"));
    }
}
