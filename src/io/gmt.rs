use std::fs::File;
use std::io::{
    BufRead,
    BufReader,
};
use std::path::Path;

use anyhow::{
    anyhow,
    ensure,
    Context,
};
use hashbrown::HashSet;
use indexmap::{
    IndexMap,
    IndexSet,
};
use log::{
    debug,
    warn,
};

/// A named collection of gene sets read from a GMT file.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneSetLibrary {
    name:  String,
    terms: IndexMap<String, IndexSet<String>>,
}

impl GeneSetLibrary {
    pub fn new(
        name: &str,
        terms: IndexMap<String, IndexSet<String>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            terms,
        }
    }

    /// Reads a GMT file. Each line holds a term, a description and the genes
    /// of the term, all tab separated. The library is named after the file
    /// stem.
    pub fn from_gmt<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| anyhow!("Invalid gene set path {}", path.display()))?;
        let reader = BufReader::new(
            File::open(path)
                .with_context(|| format!("Could not open {}", path.display()))?,
        );

        let mut terms: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let mut fields = line.trim_end_matches(['\r', '\n']).split('\t');
            let term = match fields.next().map(str::trim) {
                Some(term) if !term.is_empty() => term.to_string(),
                _ => continue,
            };
            let genes: IndexSet<String> = fields
                .skip(1)
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect();
            if genes.is_empty() {
                warn!("{}:{}: term '{}' has no genes", name, line_no + 1, term);
                continue;
            }
            terms.entry(term).or_default().extend(genes);
        }
        ensure!(
            !terms.is_empty(),
            "Gene set library {} holds no terms",
            path.display()
        );
        debug!("Loaded {} terms from library {}", terms.len(), name);
        Ok(Self { name, terms })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn terms(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// All genes annotated by any term.
    pub fn background(&self) -> HashSet<&str> {
        self.terms
            .values()
            .flat_map(|genes| genes.iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn reads_terms_and_collapses_duplicates() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("hallmark.gmt");
        let mut file = File::create(&path)?;
        writeln!(file, "APOPTOSIS\thttp://x\tBAX\tBAK1\tBAX")?;
        writeln!(file, "\tno name\tTP53")?;
        writeln!(file, "EMPTY\tdesc")?;
        writeln!(file, "HYPOXIA\t\tVEGFA\tHIF1A")?;
        drop(file);

        let library = GeneSetLibrary::from_gmt(&path)?;
        assert_eq!(library.name(), "hallmark");
        assert_eq!(library.len(), 2);
        assert_eq!(library.terms()["APOPTOSIS"].len(), 2);
        assert_eq!(library.background().len(), 4);
        Ok(())
    }

    #[test]
    fn empty_library_is_an_error() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("empty.gmt");
        std::fs::write(&path, "\n")?;
        assert!(GeneSetLibrary::from_gmt(&path).is_err());
        Ok(())
    }
}
