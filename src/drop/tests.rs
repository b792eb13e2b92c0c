use std::fs;

use tempfile::{
    tempdir,
    TempDir,
};

use super::*;

const ANNOTATION: &str = "ID\tCellType\tSample\nc1\tB\tP1\nc2\tT\tP1\nc3\tT\tP2\nc4\tNK\tP2\n";
const EXPRESSION: &str = "Gene\tc1\tc2\tc3\tc4\nCD19\t5\t0\t0\t1\nCD3E\t0\t7\t8\t0\n";

fn fixture() -> anyhow::Result<(TempDir, PathBuf, PathBuf)> {
    let dir = tempdir()?;
    let annotation = dir.path().join("annotation.tsv");
    let expression = dir.path().join("expression.tsv");
    fs::write(&annotation, ANNOTATION)?;
    fs::write(&expression, EXPRESSION)?;
    Ok((dir, annotation, expression))
}

#[test]
fn ids_use_the_index() -> anyhow::Result<()> {
    let (_dir, annotation, expression) = fixture()?;
    let mut dataset = Dataset::read(&annotation, &expression)?;
    let dropped = dataset.drop_from_column(&["c2".into(), "c9".into()], ID_COL)?;
    assert_eq!(dropped, vec!["c2"]);
    assert_eq!(dataset.annotation().height(), 3);
    assert_eq!(column_names(dataset.expression()), vec!["Gene", "c1", "c3", "c4"]);
    Ok(())
}

#[test]
fn samples_and_cell_types() -> anyhow::Result<()> {
    let (_dir, annotation, expression) = fixture()?;
    let options = DropOptions {
        samples: vec!["P2".into()],
        cell_types: vec!["B".into()],
        ..Default::default()
    };
    let (annotation_out, expression_out) = drop_entries(&annotation, &expression, &options)?;
    assert_eq!(annotation_out, append_to_name(&annotation, ".drop"));
    assert_eq!(
        fs::read_to_string(&annotation_out)?,
        "ID\tCellType\tSample\nc2\tT\tP1\n"
    );
    assert_eq!(
        fs::read_to_string(&expression_out)?,
        "Gene\tc2\nCD19\t0\nCD3E\t7\n"
    );
    // inputs are untouched
    assert_eq!(fs::read_to_string(&annotation)?, ANNOTATION);
    Ok(())
}

#[test]
fn basename_output() -> anyhow::Result<()> {
    let (dir, annotation, expression) = fixture()?;
    let options = DropOptions {
        ids: vec!["c1".into()],
        output: Some(dir.path().join("reduced")),
        ..Default::default()
    };
    let (annotation_out, expression_out) = drop_entries(&annotation, &expression, &options)?;
    assert_eq!(annotation_out, dir.path().join("reduced.annotation.tsv"));
    assert_eq!(expression_out, dir.path().join("reduced.expression.tsv"));
    assert!(annotation_out.is_file() && expression_out.is_file());
    Ok(())
}

#[test]
fn unknown_column_is_an_error() -> anyhow::Result<()> {
    let (_dir, annotation, expression) = fixture()?;
    let mut dataset = Dataset::read(&annotation, &expression)?;
    let err = dataset
        .drop_from_column(&["x".into()], "Batch")
        .unwrap_err();
    assert!(err.to_string().contains("Batch"));
    Ok(())
}

#[test]
fn id_column_other_than_index() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let annotation = dir.path().join("annotation.tsv");
    let expression = dir.path().join("expression.tsv");
    fs::write(&annotation, "cell\tID\tCellType\nc1\tx1\tB\nc2\tx2\tT\n")?;
    fs::write(&expression, "Gene\tc1\tc2\nG\t1\t2\n")?;
    let mut dataset = Dataset::read(&annotation, &expression)?;
    let dropped = dataset.drop_from_column(&["x2".into()], ID_COL)?;
    assert_eq!(dropped, vec!["c2"]);
    assert_eq!(column_names(dataset.expression()), vec!["Gene", "c1"]);
    Ok(())
}
