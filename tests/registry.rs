mod common;

use std::fs;

use common::TestWorkspace;
use crm_sheets::{
    kinds::Registry,
    listing::ListRequest,
    record::Value,
    session::Session,
    storage::CsvWorkbook,
};
use rust_decimal::Decimal;

const SUPPLIER_KINDS: &str = r#"
kinds:
  - name: Supplier Spend
    sheet: SUPPLIERS
    columns:
      - name: Supplier
        type: text
        required: true
      - name: Spend
        type: decimal
    ranking:
      column: Spend
    derivation:
      kind: rank_tier
      name: Band
      rule:
        bands:
          - below: 1
            label: key
        otherwise: regular
    coercion:
      strip_tokens: ["EUR"]
      thousands_separators: ["."]
      decimal_separator: ","
"#;

#[test]
fn yaml_registry_drives_custom_tables() {
    let workspace = TestWorkspace::new();
    workspace.write_region("SUPPLIERS", "Supplier,Spend\nAcme,\"EUR 1.250,50\"\nGlobex,990\n");
    let config = workspace.root().join("kinds.yaml");
    fs::write(&config, SUPPLIER_KINDS).unwrap();

    let registry = Registry::load(&config).unwrap();
    let workbook = CsvWorkbook::open(workspace.workbook()).unwrap();
    let mut session = Session::new(workbook, registry);

    let listing = session.list("supplier spend", &ListRequest::default()).unwrap();
    assert_eq!(listing.derived.as_deref(), Some("Band"));
    assert_eq!(listing.rows[0].cells[1], Value::Decimal(Decimal::new(125_050, 2)));
    assert_eq!(listing.labels(), vec![Some("key"), Some("regular")]);

    session
        .add("Supplier Spend", &[("Supplier".into(), "Initech".into()), ("Spend".into(), "12,5".into())])
        .unwrap();
    session.save("Supplier Spend").unwrap();
    let stored = workspace.read_region("SUPPLIERS");
    assert!(stored.contains("\"Acme\",\"1250,5\""), "{stored}");
    assert!(stored.contains("\"Initech\",\"12,5\""), "{stored}");
}

#[test]
fn invalid_registry_is_rejected() {
    let workspace = TestWorkspace::new();
    let config = workspace.root().join("kinds.yaml");
    fs::write(&config, SUPPLIER_KINDS.replace("column: Spend", "column: Budget")).unwrap();
    let err = Registry::load(&config).unwrap_err();
    assert!(format!("{err:#}").contains("Ranking column 'Budget'"));
}
