use crate::virtual_ids::normalize_city_name;
use ahash::AHashSet;
use anyhow::{Context, Result};
use serde_derive::Deserialize;
use std::path::Path;

/// One row of the static city directory.
#[derive(Debug, Clone, Deserialize)]
pub struct CityEntry {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
}

/// Static city → coordinate directory, loaded once per run from a CSV file
/// with a `city,lat,lon` header. Duplicate cities (after normalization) keep
/// the first row.
#[derive(Debug, Clone)]
pub struct CityDirectory {
    entries: Vec<CityEntry>,
}

impl CityDirectory {
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("opening city directory {}", path.display()))?;

        let mut entries = Vec::new();
        let mut seen: AHashSet<String> = AHashSet::new();
        for record in reader.deserialize() {
            let entry: CityEntry = record.context("malformed city directory row")?;
            if seen.insert(normalize_city_name(&entry.city)) {
                entries.push(entry);
            }
        }

        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<CityEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CityEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
