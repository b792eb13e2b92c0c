use std::fs::File;
use std::io::{
    BufRead,
    BufReader,
};
use std::path::Path;

use anyhow::{
    anyhow,
    Context,
};
use indexmap::IndexMap;
use log::debug;
use regex_lite::Regex;

/// Name of the built-in rules making labels acceptable to EcoTyper.
pub const ECOTYPER_FORMAT: &str = "EcoTyper";

/// Ordered regex substitutions applied one after the other.
#[derive(Debug, Clone)]
pub struct Formats {
    rules: Vec<(Regex, String)>,
}

impl Formats {
    pub fn try_from_map(map: &IndexMap<String, String>) -> anyhow::Result<Self> {
        let rules = map
            .iter()
            .map(|(pattern, replacement)| {
                Regex::new(pattern)
                    .map(|re| (re, replacement.clone()))
                    .map_err(|e| anyhow!("Invalid pattern '{}': {}", pattern, e))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// `-` becomes `.` and spaces become `_`.
    pub fn ecotyper() -> Self {
        let map = IndexMap::from([
            ("-".to_string(), ".".to_string()),
            (" ".to_string(), "_".to_string()),
        ]);
        Self::try_from_map(&map).expect("built-in patterns are valid")
    }

    /// Reads rules from a file of `pattern : replacement` lines. Blank lines
    /// and lines starting with `#` are skipped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(
            File::open(path).with_context(|| format!("Could not open {}", path.display()))?,
        );
        let mut map = IndexMap::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (pattern, replacement) = line.split_once(':').ok_or_else(|| {
                anyhow!(
                    "{}:{}: expected 'pattern : replacement'",
                    path.display(),
                    line_no + 1
                )
            })?;
            map.insert(pattern.trim().to_string(), replacement.trim().to_string());
        }
        debug!("Read {} substitution rules from {}", map.len(), path.display());
        Self::try_from_map(&map)
    }

    /// Resolves `name` as a file of rules, or else as a built-in rule set.
    pub fn resolve(name: &str) -> anyhow::Result<Self> {
        if Path::new(name).exists() {
            return Self::from_file(name);
        }
        match name {
            ECOTYPER_FORMAT => Ok(Self::ecotyper()),
            other => Err(anyhow!(
                "The format '{}' is not available. Define your own rules in a file and pass its path instead",
                other
            )),
        }
    }

    /// Applies every rule in order.
    pub fn apply(
        &self,
        text: &str,
    ) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |acc, (re, replacement)| {
                re.replace_all(&acc, replacement.as_str()).into_owned()
            })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for Formats {
    fn default() -> Self {
        Self::ecotyper()
    }
}
