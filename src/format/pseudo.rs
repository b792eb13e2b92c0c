//! Streaming reformatting of large tables.
//!
//! Only the header line and the first field of every data line are
//! rewritten; everything else is copied byte for byte, so the table is never
//! held in memory.

use std::fs::File;
use std::io::{
    BufRead,
    BufReader,
    BufWriter,
    Write,
};
use std::path::Path;

use anyhow::Context;
use log::{
    debug,
    info,
};

use super::formats::Formats;
use crate::io::tabular::{
    is_comment,
    is_short_header,
};

#[derive(Debug, Clone, Default)]
pub struct PseudoOptions {
    /// Rewrite the first field of data lines.
    pub index:      bool,
    /// Rewrite header labels, except the index label.
    pub names:      bool,
    /// New header label of the index column.
    pub index_name: Option<String>,
    /// Drop the index column.
    pub no_index:   bool,
}

fn split_first(
    line: &str,
    separator: char,
) -> (&str, Option<&str>) {
    match line.split_once(separator) {
        Some((first, rest)) => (first, Some(rest)),
        None => (line, None),
    }
}

fn join_first(
    first: Option<&str>,
    rest: Option<&str>,
    separator: char,
) -> String {
    match (first, rest) {
        (Some(first), Some(rest)) => format!("{}{}{}", first, separator, rest),
        (Some(first), None) => first.to_string(),
        (None, Some(rest)) => rest.to_string(),
        (None, None) => String::new(),
    }
}

/// Rewrites the header line. A `short` header has no index label, so every
/// field is a column label and the index label counts as empty.
fn reformat_header(
    line: &str,
    short: bool,
    separator: char,
    formats: &Formats,
    options: &PseudoOptions,
) -> String {
    let (first, rest) = if short {
        (None, Some(line))
    }
    else {
        let (first, rest) = split_first(line, separator);
        (Some(first), rest)
    };
    let first = match (&options.index_name, first) {
        (Some(name), _) => Some(name.clone()),
        (None, Some(first)) if options.index => Some(formats.apply(first)),
        (None, first) => first.map(str::to_string),
    };
    let rest = rest.map(|rest| {
        if options.names {
            rest.split(separator)
                .map(|label| formats.apply(label))
                .collect::<Vec<_>>()
                .join(&separator.to_string())
        }
        else {
            rest.to_string()
        }
    });
    let first = first.filter(|_| !options.no_index);
    join_first(first.as_deref(), rest.as_deref(), separator)
}

fn reformat_line(
    line: &str,
    separator: char,
    formats: &Formats,
    options: &PseudoOptions,
) -> String {
    let (first, rest) = split_first(line, separator);
    if options.no_index {
        return rest.unwrap_or_default().to_string();
    }
    if options.index {
        join_first(Some(&formats.apply(first)), rest, separator)
    }
    else {
        line.to_string()
    }
}

/// Streams `input` into `output`. Output may be the input itself: lines are
/// written to a temporary file next to the output, which then replaces it.
pub fn pseudo_format<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    separator: u8,
    formats: &Formats,
    options: &PseudoOptions,
) -> anyhow::Result<()> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let sep = separator as char;
    let reader = BufReader::new(
        File::open(input).with_context(|| format!("Could not open {}", input.display()))?,
    );

    let parent = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Could not create a temporary file in {}", parent.display()))?;
    let mut writer = BufWriter::new(tmp.as_file());

    // The header is held back until the first data line tells whether it
    // lacks the index label.
    let mut header: Option<String> = None;
    let mut in_data = false;
    let mut n_lines = 0usize;
    for line in reader.lines() {
        let line = line?;
        let line = line.strip_suffix('\r').unwrap_or(&line);
        if in_data {
            writeln!(writer, "{}", reformat_line(line, sep, formats, options))?;
        }
        else {
            match header.take() {
                None if is_comment(line) => writeln!(writer, "{}", line)?,
                None => header = Some(line.to_string()),
                Some(header_line) => {
                    let short = is_short_header(&header_line, line, separator);
                    if short {
                        debug!("Header of {} lacks the index label", input.display());
                    }
                    writeln!(
                        writer,
                        "{}",
                        reformat_header(&header_line, short, sep, formats, options)
                    )?;
                    writeln!(writer, "{}", reformat_line(line, sep, formats, options))?;
                    in_data = true;
                },
            }
        }
        n_lines += 1;
    }
    if let Some(header_line) = header {
        writeln!(
            writer,
            "{}",
            reformat_header(&header_line, false, sep, formats, options)
        )?;
    }
    writer.flush()?;
    drop(writer);

    tmp.persist(output)
        .with_context(|| format!("Could not write {}", output.display()))?;
    debug!("Streamed {} lines", n_lines);
    info!("Wrote reformatted table to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn only_header_and_first_field_change() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("expr.tsv");
        std::fs::write(&path, "gene-id\tS-1\tS 2\nHLA-A\t1-2\t3\nTP53\t4\t5-6\n")?;
        let options = PseudoOptions {
            index: true,
            names: true,
            ..Default::default()
        };
        pseudo_format(&path, &path, b'\t', &Formats::ecotyper(), &options)?;
        assert_eq!(
            std::fs::read_to_string(&path)?,
            "gene.id\tS.1\tS_2\nHLA.A\t1-2\t3\nTP53\t4\t5-6\n"
        );
        Ok(())
    }

    #[test]
    fn index_can_be_renamed_or_dropped() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        std::fs::write(&input, ",a,b\nr-1,1,2\n")?;

        let renamed = PseudoOptions {
            index_name: Some("ID".into()),
            ..Default::default()
        };
        pseudo_format(&input, &output, b',', &Formats::ecotyper(), &renamed)?;
        assert_eq!(std::fs::read_to_string(&output)?, "ID,a,b\nr-1,1,2\n");

        let dropped = PseudoOptions {
            no_index: true,
            ..Default::default()
        };
        pseudo_format(&input, &output, b',', &Formats::ecotyper(), &dropped)?;
        assert_eq!(std::fs::read_to_string(&output)?, "a,b\n1,2\n");
        Ok(())
    }

    #[rstest]
    #[case::names(
        PseudoOptions { names: true, ..Default::default() },
        "S.1\tS_2\nHLA-A\t1\t2\n"
    )]
    #[case::index(
        PseudoOptions { index: true, names: true, ..Default::default() },
        "S.1\tS_2\nHLA.A\t1\t2\n"
    )]
    #[case::index_name(
        PseudoOptions { index_name: Some("ID".into()), ..Default::default() },
        "ID\tS-1\tS 2\nHLA-A\t1\t2\n"
    )]
    #[case::no_index(
        PseudoOptions { no_index: true, ..Default::default() },
        "S-1\tS 2\n1\t2\n"
    )]
    fn header_without_index_label(
        #[case] options: PseudoOptions,
        #[case] expected: &str,
    ) -> anyhow::Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("r.tsv");
        let output = dir.path().join("out.tsv");
        std::fs::write(&input, "S-1\tS 2\nHLA-A\t1\t2\n")?;
        pseudo_format(&input, &output, b'\t', &Formats::ecotyper(), &options)?;
        assert_eq!(std::fs::read_to_string(&output)?, expected);
        Ok(())
    }

    #[test]
    fn leading_comments_are_copied() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("expr.tsv");
        std::fs::write(&path, "# source: a-b\ngene-id\tS-1\nA-1\t1\n")?;
        let options = PseudoOptions {
            index: true,
            names: true,
            ..Default::default()
        };
        pseudo_format(&path, &path, b'\t', &Formats::ecotyper(), &options)?;
        assert_eq!(
            std::fs::read_to_string(&path)?,
            "# source: a-b\ngene.id\tS.1\nA.1\t1\n"
        );
        Ok(())
    }
}
