use crate::table::Table;
use harvest_core::CoreError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Concatenates `inputs` in list order into one CSV at `output`.
///
/// Rows keep their order within each file; no deduplication is done. Returns the
/// number of rows written.
pub fn combine_csv_files(inputs: &[PathBuf], output: &Path) -> Result<usize, CoreError> {
    if inputs.is_empty() {
        return Err(CoreError::invalid_input("no CSV files to combine"));
    }

    let mut combined = Table::default();
    for input in inputs {
        let table = Table::load(input)?;
        debug!("Loaded {} rows from {}", table.len(), input.display());
        combined.append(table)?;
    }

    combined.save(output)?;
    info!(
        "Combined {} files into {} ({} rows)",
        inputs.len(),
        output.display(),
        combined.len()
    );
    Ok(combined.len())
}
