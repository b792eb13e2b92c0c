use std::fs;

use rstest::rstest;
use tempfile::tempdir;

use super::*;

#[test]
fn annotation_preset_rewrites_columns() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("annotation.tsv");
    fs::write(
        &input,
        "\tCellType\tSample\tnote\ncell-1\tT cell\tP-01\tkeep-me\ncell-2\tB-cell\tP 02\tx y\n",
    )?;
    let options = FormatOptions {
        preset: Some(Preset::Annotation),
        ..Default::default()
    };
    let output = format(&input, &options)?;
    assert_eq!(output, input);
    assert_eq!(
        fs::read_to_string(&output)?,
        "ID\tCellType\tSample\tnote\ncell.1\tT_cell\tP.01\tkeep-me\ncell.2\tB.cell\tP_02\tx y\n"
    );
    Ok(())
}

#[test]
fn index_label_is_formatted_with_the_index() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("table.csv");
    let output = dir.path().join("out.csv");
    fs::write(&input, "gene-id,a-b\nx-1,1\n")?;
    let options = FormatOptions {
        output: Some(output.clone()),
        index: true,
        ..Default::default()
    };
    format(&input, &options)?;
    assert_eq!(fs::read_to_string(&output)?, "gene.id,a-b\nx.1,1\n");
    Ok(())
}

#[test]
fn output_suffix_does_not_change_format() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("table.csv");
    fs::write(&input, "id,a-b\nx-1,1\n")?;
    let options = FormatOptions {
        output: Some(dir.path().join("table.tsv")),
        suffix: Some(".fixed".into()),
        names: true,
        ..Default::default()
    };
    let output = format(&input, &options)?;
    assert_eq!(output, dir.path().join("table.tsv.fixed"));
    assert_eq!(fs::read_to_string(&output)?, "id\ta.b\nx-1\t1\n");
    Ok(())
}

#[test]
fn expression_preset_streams() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("expr.txt");
    fs::write(&input, "gene s-1 s-2\nHLA-A 1.50 007\n")?;
    let options = FormatOptions {
        preset: Some(Preset::EcoExpression),
        ..Default::default()
    };
    format(&input, &options)?;
    assert_eq!(fs::read_to_string(&input)?, "gene s.1 s.2\nHLA.A 1.50 007\n");
    Ok(())
}

#[test]
fn missing_column_is_an_error() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("annotation.tsv");
    fs::write(&input, "ID\tCellType\nc1\tT\n")?;
    let options = FormatOptions {
        preset: Some(Preset::Annotation),
        ..Default::default()
    };
    let err = format(&input, &options).unwrap_err();
    assert!(err.to_string().contains("Sample"));
    Ok(())
}

#[rstest]
#[case("data.tsv", None, Some(b'\t'))]
#[case("data.CSV", None, Some(b','))]
#[case("data.gz", Some("txt"), Some(b' '))]
#[case("data.gz", None, None)]
#[case("data.tsv", Some("mtx"), None)]
fn separator_resolution(
    #[case] input: &str,
    #[case] separator: Option<&str>,
    #[case] expected: Option<u8>,
) {
    assert_eq!(input_separator(Path::new(input), separator).ok(), expected);
}

#[test]
fn formatter_on_a_loaded_frame() -> anyhow::Result<()> {
    use polars::prelude::*;

    use crate::io::tabular::{
        column_names,
        text_column,
    };

    let df = df!(
        "gene" => ["HLA-A", "CD8 A"],
        "cell-1" => ["1", "2"],
        "type" => ["T cell", "B-cell"]
    )?;
    let mut formatter = Formatter::from_frame(Formats::ecotyper(), df, b'\t');
    formatter.reformat(true, true, &["type".to_string()])?;
    let df = formatter.get().ok_or_else(|| anyhow!("No table"))?;
    assert_eq!(column_names(df), ["gene", "cell.1", "type"]);
    assert_eq!(
        text_column(df, "gene")?,
        [Some("HLA.A".to_string()), Some("CD8_A".to_string())]
    );
    assert_eq!(
        text_column(df, "type")?,
        [Some("T_cell".to_string()), Some("B.cell".to_string())]
    );
    Ok(())
}
