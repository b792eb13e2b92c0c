use std::fs::File;
use std::io::{
    BufRead,
    BufReader,
    BufWriter,
    Write,
};
use std::path::{
    Path,
    PathBuf,
};

use anyhow::{
    anyhow,
    Context,
};
use itertools::Itertools;
use log::{
    debug,
    info,
};
use ndarray::Array2;
use sprs::{
    CsMat,
    TriMat,
};

use super::matrix::LabeledMatrix;
use super::schema::with_suffix;

/// Path of the sibling file listing column names of an `.mtx` file.
pub fn cols_path<P: AsRef<Path>>(path: P) -> PathBuf {
    with_suffix(path, "mtx_cols")
}

/// Path of the sibling file listing row names of an `.mtx` file.
pub fn rows_path<P: AsRef<Path>>(path: P) -> PathBuf {
    with_suffix(path, "mtx_rows")
}

fn read_names(path: &Path) -> anyhow::Result<Option<Vec<String>>> {
    if !path.exists() {
        return Ok(None);
    }
    let reader = BufReader::new(File::open(path)?);
    let names = reader
        .lines()
        .map(|line| line.map(|l| l.trim_end_matches('\r').to_string()))
        .filter_ok(|l| !l.is_empty())
        .collect::<Result<Vec<_>, _>>()?;
    debug!("Read {} names from {}", names.len(), path.display());
    Ok(Some(names))
}

fn write_names(
    path: &Path,
    names: &[String],
) -> anyhow::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write!(writer, "{}", names.join("\n"))?;
    writer.flush()?;
    Ok(())
}

/// Reads a MatrixMarket coordinate file into a dense matrix.
///
/// Row and column names are taken from the `.mtx_rows` and `.mtx_cols`
/// sibling files when they exist. Without a column file, columns are named
/// by their position.
pub fn read_mtx<P: AsRef<Path>>(path: P) -> anyhow::Result<LabeledMatrix> {
    let path = path.as_ref();
    let triplets: TriMat<f64> = sprs::io::read_matrix_market(path)
        .map_err(|e| anyhow!("Could not read {}: {}", path.display(), e))?;

    let mut data = Array2::<f64>::zeros((triplets.rows(), triplets.cols()));
    for (value, (row, col)) in triplets.triplet_iter() {
        data[[row, col]] += *value;
    }
    info!(
        "Read {}x{} matrix with {} entries from {}",
        data.nrows(),
        data.ncols(),
        triplets.nnz(),
        path.display()
    );

    let row_names = read_names(&rows_path(path))?;
    let col_names = read_names(&cols_path(path))?
        .unwrap_or_else(|| (0..data.ncols()).map(|i| i.to_string()).collect());
    LabeledMatrix::try_new(data, row_names, col_names)
        .with_context(|| format!("Name files do not match {}", path.display()))
}

/// Writes a matrix as a MatrixMarket coordinate file and its name files.
pub fn write_mtx<P: AsRef<Path>>(
    matrix: &LabeledMatrix,
    path: P,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut triplets = TriMat::new((matrix.nrows(), matrix.ncols()));
    for ((row, col), value) in matrix.data().indexed_iter() {
        if *value != 0.0 {
            triplets.add_triplet(row, col, *value);
        }
    }
    let sparse: CsMat<f64> = triplets.to_csr();
    sprs::io::write_matrix_market(path, &sparse)
        .with_context(|| format!("Could not write {}", path.display()))?;

    write_names(&cols_path(path), matrix.col_names())?;
    if let Some(rows) = matrix.row_names() {
        write_names(&rows_path(path), rows)?;
    }
    info!(
        "Wrote {}x{} matrix ({} non-zero) to {}",
        matrix.nrows(),
        matrix.ncols(),
        sparse.nnz(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn labels_travel_in_sibling_files() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("counts.mtx");
        let matrix = LabeledMatrix::try_new(
            array![[1.0, 0.0], [0.0, 2.5]],
            Some(vec!["g1".into(), "g2".into()]),
            vec!["c1".into(), "c2".into()],
        )?;
        write_mtx(&matrix, &path)?;
        assert!(rows_path(&path).exists());
        assert_eq!(
            std::fs::read_to_string(cols_path(&path))?,
            "c1\nc2"
        );

        let read = read_mtx(&path)?;
        assert_eq!(read.data(), matrix.data());
        assert_eq!(read.row_names(), matrix.row_names());
        assert_eq!(read.col_names(), matrix.col_names());
        Ok(())
    }

    #[test]
    fn missing_name_files_fall_back_to_positions() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("plain.mtx");
        std::fs::write(
            &path,
            "%%MatrixMarket matrix coordinate real general\n2 3 2\n1 1 4\n2 3 1\n",
        )?;
        let read = read_mtx(&path)?;
        assert!(read.row_names().is_none());
        assert_eq!(read.col_names(), ["0", "1", "2"]);
        assert_eq!(read.data()[[0, 0]], 4.0);
        assert_eq!(read.data()[[1, 2]], 1.0);
        Ok(())
    }
}
