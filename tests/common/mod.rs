#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

pub const VIP_CSV: &str = "\
Customer Name,Transaction Count,Transaction Total
A,1,Rp1.000
B,2,500
";

pub const PRODUCT_CSV: &str = "\
Product Name,Purchase Count
Kopi Susu,40
Teh Tarik,25
Roti Bakar,-
";

/// Scratch workbook directory that cleans up on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates an empty `CRM Analyst` workbook directory.
    pub fn new() -> Self {
        let temp_dir = tempdir().expect("temp dir");
        fs::create_dir(temp_dir.path().join("CRM Analyst")).expect("create workbook dir");
        Self { temp_dir }
    }

    /// Workbook seeded with the VIP and product sheets.
    pub fn seeded() -> Self {
        let workspace = Self::new();
        workspace.write_region("VIP BUYER", VIP_CSV);
        workspace.write_region("PRODUCT POPULARITY", PRODUCT_CSV);
        workspace
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn workbook(&self) -> PathBuf {
        self.temp_dir.path().join("CRM Analyst")
    }

    pub fn region_path(&self, name: &str) -> PathBuf {
        self.workbook().join(format!("{name}.csv"))
    }

    /// Writes a region file and returns its path.
    pub fn write_region(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.region_path(name);
        fs::write(&path, contents).expect("write region");
        path
    }

    pub fn read_region(&self, name: &str) -> String {
        fs::read_to_string(self.region_path(name)).expect("read region")
    }
}
