mod common;

use assert_cmd::Command;
use common::TestWorkspace;
use predicates::prelude::*;
use predicates::str::contains;

fn crm(workspace: &TestWorkspace) -> Command {
    let mut cmd = Command::cargo_bin("crm-sheets").expect("binary exists");
    cmd.current_dir(workspace.root())
        .env_remove("CRM_SHEETS_WORKBOOK")
        .env("RUST_LOG", "error");
    cmd
}

#[test]
fn missing_workbook_fails_fast() {
    let dir = tempfile::tempdir().expect("temp dir");
    Command::cargo_bin("crm-sheets")
        .expect("binary exists")
        .current_dir(dir.path())
        .env_remove("CRM_SHEETS_WORKBOOK")
        .args(["list", "VIP Buyer"])
        .assert()
        .failure()
        .stderr(contains("is missing"));
}

#[test]
fn list_shows_ranked_rows_with_tiers() {
    let workspace = TestWorkspace::seeded();
    crm(&workspace)
        .args(["list", "VIP Buyer"])
        .assert()
        .success()
        .stdout(contains("Tier"))
        .stdout(contains("0  A"))
        .stdout(contains("1000  top"))
        .stdout(contains("1  B"));
}

#[test]
fn list_unknown_sheet_reports_not_found() {
    let workspace = TestWorkspace::seeded();
    crm(&workspace)
        .args(["list", "Customer Growth"])
        .assert()
        .failure()
        .stderr(contains("was not found"));
}

#[test]
fn add_saves_unless_no_save() {
    let workspace = TestWorkspace::seeded();
    crm(&workspace)
        .args([
            "add",
            "VIP Buyer",
            "--set",
            "Customer Name=C",
            "--set",
            "Transaction Total=Rp 2.000",
            "--no-save",
        ])
        .assert()
        .success()
        .stdout(contains("added record #3"));
    assert!(!workspace.read_region("VIP BUYER").contains("\"C\""));

    crm(&workspace)
        .args([
            "add",
            "VIP Buyer",
            "--set",
            "Customer Name=C",
            "--set",
            "transaction_total=Rp 2.000",
        ])
        .assert()
        .success();
    let stored = workspace.read_region("VIP BUYER");
    assert!(stored.contains("\"C\",\"0\",\"2000\""), "{stored}");
}

#[test]
fn add_with_blank_key_is_rejected() {
    let workspace = TestWorkspace::seeded();
    let before = workspace.read_region("VIP BUYER");
    crm(&workspace)
        .args(["add", "VIP Buyer", "--set", "Customer Name=  "])
        .assert()
        .failure()
        .stderr(contains("must not be blank"));
    assert_eq!(workspace.read_region("VIP BUYER"), before);
}

#[test]
fn edit_and_remove_address_listed_positions() {
    let workspace = TestWorkspace::seeded();
    crm(&workspace)
        .args(["edit", "Product Popularity", "1", "--set", "Purchase Count=99"])
        .assert()
        .success();
    let stored = workspace.read_region("PRODUCT POPULARITY");
    assert!(stored.contains("\"Teh Tarik\",\"99\""), "{stored}");

    crm(&workspace)
        .args(["remove", "Product Popularity", "0"])
        .assert()
        .success();
    let stored = workspace.read_region("PRODUCT POPULARITY");
    assert!(!stored.contains("Teh Tarik"), "{stored}");
    assert!(stored.contains("Kopi Susu"), "{stored}");
}

#[test]
fn out_of_range_positions_fail() {
    let workspace = TestWorkspace::seeded();
    for position in ["3", "-1"] {
        crm(&workspace)
            .args(["remove", "Product Popularity", position])
            .assert()
            .failure()
            .stderr(contains("out of range"));
    }
}

#[test]
fn json_listing_carries_ids_and_labels() {
    let workspace = TestWorkspace::seeded();
    let output = crm(&workspace)
        .args(["list", "Product Popularity", "--format", "json"])
        .output()
        .expect("run list");
    assert!(output.status.success());
    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(listing["derived"], "Tier");
    let rows = listing["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["cells"][0], "Kopi Susu");
    assert_eq!(rows[0]["label"], "top");
    assert_eq!(rows[2]["cells"][1], 0);
}

#[test]
fn kinds_write_round_trips_through_config() {
    let workspace = TestWorkspace::seeded();
    let config = workspace.root().join("kinds.yaml");
    crm(&workspace)
        .args(["kinds", "--write", config.to_str().unwrap()])
        .assert()
        .success();
    crm(&workspace)
        .args(["--config", config.to_str().unwrap(), "kinds"])
        .assert()
        .success()
        .stdout(contains("VIP Buyer [VIP BUYER]"))
        .stdout(contains("Customer Favorite Product"));
}

#[test]
fn shell_keeps_changes_until_save() {
    let workspace = TestWorkspace::seeded();
    crm(&workspace)
        .arg("shell")
        .write_stdin(
            "add 'VIP Buyer' --set 'Customer Name=Cici' --set 'Transaction Total=5000'\n\
             list 'VIP Buyer'\n\
             quit\n",
        )
        .assert()
        .success()
        .stdout(contains("Cici").and(contains("Unsaved changes discarded")));
    assert!(!workspace.read_region("VIP BUYER").contains("Cici"));

    crm(&workspace)
        .arg("shell")
        .write_stdin(
            "add 'VIP Buyer' --set 'Customer Name=Cici'\n\
             save 'VIP Buyer'\n",
        )
        .assert()
        .success()
        .stdout(contains("saved VIP Buyer"));
    assert!(workspace.read_region("VIP BUYER").contains("Cici"));
}

#[test]
fn import_creates_the_workbook_from_excel() {
    let workspace = TestWorkspace::new();
    let fixture = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join("crm_analyst.xlsx");
    crm(&workspace)
        .args(["--workbook", "Imported", "import"])
        .arg(&fixture)
        .assert()
        .success()
        .stdout(contains("VIP BUYER: 3 row(s)"))
        .stdout(contains("CUSTOMER GROWTH: 2 row(s)"));
    crm(&workspace)
        .args(["--workbook", "Imported", "list", "VIP Buyer"])
        .assert()
        .success()
        .stdout(contains("1501  top"));
}
