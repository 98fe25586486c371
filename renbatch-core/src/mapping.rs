use crate::catalog::{CatalogItem, ItemCategory, VecCatalog};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// One line of a mapping file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub source: PathBuf,
    pub destination: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ItemCategory>,
}

impl MappingRecord {
    pub fn category(&self) -> ItemCategory {
        self.category
            .unwrap_or_else(|| ItemCategory::guess(&self.source))
    }
}

/// Read a JSON mapping file, resolving relative sources against `root`.
///
/// Destinations are left as written; relative ones are resolved against
/// their source's directory during validation.
pub fn load_mapping(path: &Path, root: &Path) -> Result<Vec<MappingRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open mapping file: {}", path.display()))?;
    let records: Vec<MappingRecord> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse mapping file: {}", path.display()))?;

    Ok(records
        .into_iter()
        .map(|mut record| {
            if record.source.is_relative() {
                record.source = root.join(&record.source);
            }
            record
        })
        .collect())
}

/// Catalog of the items a mapping file describes
pub fn catalog_from_records(records: &[MappingRecord]) -> VecCatalog {
    VecCatalog::new(
        records
            .iter()
            .map(|record| CatalogItem {
                source: record.source.clone(),
                destination: record.destination.clone(),
                category: record.category(),
            })
            .collect(),
    )
}
