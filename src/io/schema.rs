use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use anyhow::anyhow;

/// File formats understood by the conversion and formatting tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    /// Comma separated values
    Csv,
    /// Tab separated values
    Tsv,
    /// Space separated values
    Txt,
    /// MatrixMarket coordinate matrix
    Mtx,
    /// R serialized `SeuratObject`
    Rds,
}

impl FromStr for DataFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(DataFormat::Csv),
            "tsv" => Ok(DataFormat::Tsv),
            "txt" => Ok(DataFormat::Txt),
            "mtx" => Ok(DataFormat::Mtx),
            "rds" | "seurat" => Ok(DataFormat::Rds),
            other => Err(anyhow!("Unsupported data format '{}'", other)),
        }
    }
}

impl Display for DataFormat {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let str = match self {
            DataFormat::Csv => "csv",
            DataFormat::Tsv => "tsv",
            DataFormat::Txt => "txt",
            DataFormat::Mtx => "mtx",
            DataFormat::Rds => "rds",
        };
        write!(f, "{}", str)
    }
}

impl DataFormat {
    /// Field separator of tabular formats.
    pub const fn separator(&self) -> Option<u8> {
        match self {
            Self::Csv => Some(b','),
            Self::Tsv => Some(b'\t'),
            Self::Txt => Some(b' '),
            Self::Mtx | Self::Rds => None,
        }
    }

    pub const fn is_tabular(&self) -> bool {
        self.separator().is_some()
    }

    /// Resolves the format from the suffix of a file name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let suffix = file_suffix(path).ok_or_else(|| {
            anyhow!("Could not infer a format for {}: no file suffix", path.display())
        })?;
        Self::from_str(&suffix)
    }
}

/// Returns the text after the last `.` of the file name, if there is one.
pub fn file_suffix<P: AsRef<Path>>(path: P) -> Option<String> {
    let name = path.as_ref().file_name()?.to_string_lossy().to_string();
    name.rfind('.')
        .map(|loc| name[loc + 1..].to_string())
}

/// Replaces the suffix of the file name with `suffix`, or appends it when the
/// file has none.
pub fn with_suffix<P: AsRef<Path>>(
    path: P,
    suffix: &str,
) -> std::path::PathBuf {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = match name.rfind('.') {
        Some(loc) => &name[..loc],
        None => name.as_str(),
    };
    path.with_file_name(format!("{}.{}", stem, suffix))
}

/// Appends `extra` to the file name without touching its suffix.
pub fn append_to_name<P: AsRef<Path>>(
    path: P,
    extra: &str,
) -> std::path::PathBuf {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}", name, extra))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("counts.csv", Some("csv"))]
    #[case("dir.v2/counts.TSV", Some("TSV"))]
    #[case("archive.tar.gz", Some("gz"))]
    #[case("dir.v2/README", None)]
    fn suffix_is_taken_after_last_dot(
        #[case] path: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(file_suffix(path).as_deref(), expected);
    }

    #[test]
    fn formats_are_case_insensitive() {
        assert_eq!(DataFormat::from_str("TSV").unwrap(), DataFormat::Tsv);
        assert_eq!(DataFormat::from_str("Seurat").unwrap(), DataFormat::Rds);
        assert!(DataFormat::from_str("xlsx").is_err());
    }

    #[test]
    fn suffix_replacement_keeps_directory() {
        assert_eq!(
            with_suffix("data/run.1/counts.csv", "mtx"),
            PathBuf::from("data/run.1/counts.mtx")
        );
        assert_eq!(with_suffix("counts", "tsv"), PathBuf::from("counts.tsv"));
        assert_eq!(
            append_to_name("out/table.tsv", ".fixed"),
            PathBuf::from("out/table.tsv.fixed")
        );
    }
}
