use std::path::{Path, PathBuf};

use cyclops_shared::{CatalogError, RegionCatalog};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum CatalogLoadError {
    #[error("failed to read region catalog {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Invalid(#[from] CatalogError),
}

/// Load the region catalog from `path`, or the built-in dataset when unset.
pub async fn load_catalog(path: Option<&Path>) -> Result<RegionCatalog, CatalogLoadError> {
    let catalog = match path {
        Some(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| CatalogLoadError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
            let catalog = RegionCatalog::from_json(&bytes)?;
            info!(path = %path.display(), regions = catalog.len(), "loaded region catalog");
            catalog
        }
        None => {
            let catalog = RegionCatalog::builtin()?;
            info!(regions = catalog.len(), "using built-in region catalog");
            catalog
        }
    };
    Ok(catalog)
}
