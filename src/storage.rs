//! Multi-region tabular storage.
//!
//! A workbook is a set of named regions, each a header row plus data rows of
//! text cells. [`CsvWorkbook`] keeps one `<region>.csv` file per region in a
//! workbook directory, so replacing one region never rewrites its siblings.
//! [`MemoryWorkbook`] keeps regions in a map and is what the tests drive.

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    error::{StoreError, StoreResult},
    io_utils,
};

const REGION_EXTENSION: &str = "csv";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Region {
    pub fn new(headers: &[&str], rows: &[&[&str]]) -> Self {
        Region {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }
}

pub trait TabularStorage {
    /// Where the regions live; used in error messages.
    fn location(&self) -> &Path;

    fn region_names(&self) -> StoreResult<Vec<String>>;

    fn read_region(&self, name: &str) -> StoreResult<Region>;

    /// Replaces one region entirely, leaving every other region untouched.
    fn write_region(&mut self, name: &str, region: &Region) -> StoreResult<()>;

    /// Stored spelling of `name`, matched case-insensitively.
    fn resolve_region(&self, name: &str) -> StoreResult<Option<String>> {
        let wanted = name.trim();
        let names = self.region_names()?;
        Ok(names
            .iter()
            .find(|candidate| candidate.as_str() == wanted)
            .or_else(|| {
                names
                    .iter()
                    .find(|candidate| candidate.eq_ignore_ascii_case(wanted))
            })
            .cloned())
    }
}

fn not_found(name: &str, location: &Path) -> StoreError {
    StoreError::NotFound {
        table: name.to_string(),
        workbook: location.to_path_buf(),
    }
}

#[derive(Debug)]
pub struct CsvWorkbook {
    root: PathBuf,
    encoding: &'static Encoding,
}

impl CsvWorkbook {
    /// Opens an existing workbook directory.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        let unavailable = |source: io::Error| StoreError::StorageUnavailable {
            path: root.clone(),
            source,
        };
        let metadata = fs::metadata(&root).map_err(unavailable)?;
        if !metadata.is_dir() {
            return Err(unavailable(io::Error::new(
                io::ErrorKind::InvalidInput,
                "workbook path is not a directory",
            )));
        }
        Ok(Self {
            root,
            encoding: UTF_8,
        })
    }

    /// Opens the workbook directory, creating it when missing.
    pub fn create(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::StorageUnavailable {
            path: root.clone(),
            source,
        })?;
        Self::open(root)
    }

    /// Encoding used to decode region files; writes are always UTF-8.
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn region_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{REGION_EXTENSION}"))
    }

    fn unavailable(&self, source: io::Error) -> StoreError {
        StoreError::StorageUnavailable {
            path: self.root.clone(),
            source,
        }
    }
}

fn valid_region_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty()
        && trimmed == name
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
}

impl TabularStorage for CsvWorkbook {
    fn location(&self) -> &Path {
        &self.root
    }

    fn region_names(&self) -> StoreResult<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|e| self.unavailable(e))?;
        let mut names = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| self.unavailable(e))?.path();
            let is_region = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(REGION_EXTENSION));
            if !is_region || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_region(&self, name: &str) -> StoreResult<Region> {
        let Some(stored) = self.resolve_region(name)? else {
            return Err(not_found(name, &self.root));
        };
        let path = self.region_path(&stored);
        debug!("Reading region '{stored}' from {path:?}");
        let file = File::open(&path).map_err(|e| self.unavailable(e))?;
        let mut reader = io_utils::open_csv_reader(BufReader::new(file));
        let mut region = Region::default();
        for (idx, record) in reader.byte_records().enumerate() {
            let record = record.map_err(|e| self.unavailable(e.into()))?;
            let decoded =
                io_utils::decode_record(&record, self.encoding).map_err(|e| self.unavailable(e))?;
            if idx == 0 {
                region.headers = decoded;
            } else {
                region.rows.push(decoded);
            }
        }
        Ok(region)
    }

    fn write_region(&mut self, name: &str, region: &Region) -> StoreResult<()> {
        let write_error = |source: io::Error| StoreError::StorageWrite {
            table: name.to_string(),
            source,
        };
        if !valid_region_name(name) {
            return Err(write_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{name}' cannot be used as a region name"),
            )));
        }
        let stored = self
            .resolve_region(name)
            .map_err(|err| write_error(io::Error::other(err.to_string())))?
            .unwrap_or_else(|| name.to_string());
        let path = self.region_path(&stored);
        debug!("Replacing region '{stored}' at {path:?}");
        io_utils::atomic_write(&path, |file| {
            let mut writer = io_utils::open_csv_writer(file);
            writer.write_record(&region.headers)?;
            for row in &region.rows {
                writer.write_record(row)?;
            }
            writer.flush()
        })
        .map_err(write_error)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryWorkbook {
    location: PathBuf,
    regions: BTreeMap<String, Region>,
    read_only: bool,
}

impl Default for MemoryWorkbook {
    fn default() -> Self {
        Self {
            location: PathBuf::from("memory"),
            regions: BTreeMap::new(),
            read_only: false,
        }
    }
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, name: &str, region: Region) -> Self {
        self.regions.insert(name.to_string(), region);
        self
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.get(name)
    }

    /// Makes every write fail, for exercising save failures.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }
}

impl TabularStorage for MemoryWorkbook {
    fn location(&self) -> &Path {
        &self.location
    }

    fn region_names(&self) -> StoreResult<Vec<String>> {
        Ok(self.regions.keys().cloned().collect())
    }

    fn read_region(&self, name: &str) -> StoreResult<Region> {
        let stored = self
            .resolve_region(name)?
            .ok_or_else(|| not_found(name, &self.location))?;
        Ok(self.regions[&stored].clone())
    }

    fn write_region(&mut self, name: &str, region: &Region) -> StoreResult<()> {
        if self.read_only {
            return Err(StoreError::StorageWrite {
                table: name.to_string(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "workbook is read-only"),
            });
        }
        let stored = self
            .resolve_region(name)?
            .unwrap_or_else(|| name.to_string());
        self.regions.insert(stored, region.clone());
        Ok(())
    }
}
