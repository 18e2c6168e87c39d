mod common;

use std::path::PathBuf;

use common::TestWorkspace;
use crm_sheets::{
    import::import_excel,
    kinds::Registry,
    listing::ListRequest,
    record::Value,
    session::Session,
    storage::{CsvWorkbook, TabularStorage},
};
use rust_decimal::Decimal;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn imported_workspace() -> (TestWorkspace, Vec<(String, usize)>) {
    let workspace = TestWorkspace::new();
    let mut workbook = CsvWorkbook::open(workspace.workbook()).unwrap();
    let imported = import_excel(
        &fixture_path("crm_analyst.xlsx"),
        &mut workbook,
        &Registry::builtin(),
    )
    .unwrap();
    (workspace, imported)
}

#[test]
fn every_sheet_becomes_a_trimmed_region() {
    let (workspace, imported) = imported_workspace();
    assert_eq!(
        imported,
        vec![("VIP BUYER".to_string(), 3), ("CUSTOMER GROWTH".to_string(), 2)]
    );
    let workbook = CsvWorkbook::open(workspace.workbook()).unwrap();
    let mut names = workbook.region_names().unwrap();
    names.sort();
    assert_eq!(names, vec!["CUSTOMER GROWTH", "VIP BUYER"]);
}

#[test]
fn short_rows_are_padded_and_numbers_keep_their_value() {
    let (workspace, _) = imported_workspace();
    let stored = workspace.read_region("VIP BUYER");
    assert!(stored.contains("\"Ani\",\"3\",\"1501\""), "{stored}");
    assert!(stored.contains("\"Budi\",\"1\",\"\""), "{stored}");
    assert!(stored.contains("\"Cici\",\"2\",\"Rp 2.000\""), "{stored}");

    let workbook = CsvWorkbook::open(workspace.workbook()).unwrap();
    let mut session = Session::new(workbook, Registry::builtin());
    let listing = session.list("VIP Buyer", &ListRequest::default()).unwrap();
    let totals = listing
        .rows
        .iter()
        .map(|row| (row.cells[0].as_display(), row.cells[2].clone()))
        .collect::<Vec<_>>();
    assert_eq!(
        totals,
        vec![
            ("Cici".to_string(), Value::Decimal(Decimal::from(2_000))),
            ("Ani".to_string(), Value::Decimal(Decimal::from(1_501))),
            ("Budi".to_string(), Value::Decimal(Decimal::ZERO)),
        ]
    );
}

#[test]
fn date_cells_become_month_dates() {
    let (workspace, _) = imported_workspace();
    let workbook = CsvWorkbook::open(workspace.workbook()).unwrap();
    let mut session = Session::new(workbook, Registry::builtin());
    let listing = session.list("Customer Growth", &ListRequest::default()).unwrap();
    let months = listing
        .rows
        .iter()
        .map(|row| row.cells[0].as_display())
        .collect::<Vec<_>>();
    assert_eq!(months, vec!["2024-02-01", "2024-01-01"]);
}
