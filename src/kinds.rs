//! Table-kind registry: per-sheet descriptors driving one generic pipeline.
//!
//! A [`TableKind`] names the storage region, the column schema, the ranking
//! column and how the presentation attribute is derived. The six kinds of the
//! CRM workbook ship as [`Registry::builtin()`]; a YAML file with the same shape
//! can replace them.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow, ensure};
use serde::{Deserialize, Serialize};

use crate::coerce::{CoercionRules, column_key};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Integer,
    Decimal,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Decimal)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub datatype: ColumnType,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

impl ColumnSpec {
    fn new(name: &str, datatype: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            datatype,
            required: false,
            choices: Vec::new(),
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

impl Direction {
    pub fn is_descending(self) -> bool {
        self == Direction::Desc
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ranking {
    pub column: String,
    #[serde(default)]
    pub direction: Direction,
}

/// Ranks strictly below `below` (zero-based) receive `label`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierBand {
    pub below: usize,
    pub label: String,
}

/// Total function from zero-based rank to a label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierRule {
    pub bands: Vec<TierBand>,
    pub otherwise: String,
}

impl TierRule {
    pub fn new(bands: &[(usize, &str)], otherwise: &str) -> Self {
        Self {
            bands: bands
                .iter()
                .map(|(below, label)| TierBand {
                    below: *below,
                    label: label.to_string(),
                })
                .collect(),
            otherwise: otherwise.to_string(),
        }
    }

    pub fn label_for(&self, rank: usize) -> &str {
        self.bands
            .iter()
            .find(|band| rank < band.below)
            .map(|band| band.label.as_str())
            .unwrap_or(&self.otherwise)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Derivation {
    #[default]
    None,
    /// Label from the record's rank in the ranking order.
    RankTier { name: String, rule: TierRule },
    /// Label looked up from another column's value.
    Lookup {
        name: String,
        source: String,
        mapping: BTreeMap<String, String>,
        otherwise: String,
    },
}

impl Derivation {
    pub fn column_name(&self) -> Option<&str> {
        match self {
            Derivation::None => None,
            Derivation::RankTier { name, .. } | Derivation::Lookup { name, .. } => Some(name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableKind {
    pub name: String,
    /// Region (sheet) name in the workbook; matched case-insensitively.
    pub sheet: String,
    pub columns: Vec<ColumnSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<Ranking>,
    #[serde(default)]
    pub derivation: Derivation,
    #[serde(default)]
    pub coercion: CoercionRules,
}

impl TableKind {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        let key = column_key(name);
        self.columns.iter().find(|c| column_key(&c.name) == key)
    }

    /// The text column that identifies a record to a person; must be non-blank.
    pub fn key_column(&self) -> Option<&ColumnSpec> {
        self.columns
            .iter()
            .find(|c| c.required && c.datatype == ColumnType::Text)
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.columns.is_empty(), "Table kind '{}' has no columns", self.name);
        ensure!(
            self.key_column().is_some(),
            "Table kind '{}' needs a required text column",
            self.name
        );
        if let Some(ranking) = &self.ranking {
            let column = self.column(&ranking.column).ok_or_else(|| {
                anyhow!(
                    "Ranking column '{}' is not a column of '{}'",
                    ranking.column,
                    self.name
                )
            })?;
            ensure!(
                column.datatype.is_numeric(),
                "Ranking column '{}' of '{}' must be numeric",
                column.name,
                self.name
            );
        }
        match &self.derivation {
            Derivation::None => {}
            Derivation::RankTier { rule, .. } => {
                ensure!(
                    self.ranking.is_some(),
                    "Table kind '{}' derives tiers without a ranking column",
                    self.name
                );
                ensure!(
                    rule.bands.windows(2).all(|w| w[0].below <= w[1].below),
                    "Tier bands of '{}' must be in ascending order",
                    self.name
                );
            }
            Derivation::Lookup { source, .. } => {
                ensure!(
                    self.column(source).is_some(),
                    "Lookup source '{}' is not a column of '{}'",
                    source,
                    self.name
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    pub kinds: Vec<TableKind>,
}

pub const BUYER_STATUSES: &[&str] = &[
    "New Buyer",
    "Repeat Buyer",
    "Loyal Buyer",
    "VIP Buyer",
    "Potential Buyer",
    "At Risk",
    "Churned",
];

impl Registry {
    pub fn builtin() -> Self {
        use ColumnType::*;

        let status_colors = BUYER_STATUSES
            .iter()
            .zip(["blue", "green", "gold", "purple", "teal", "orange", "red"])
            .map(|(status, color)| (status.to_string(), color.to_string()))
            .collect();

        let ranked = |column: &str| {
            Some(Ranking {
                column: column.to_string(),
                direction: Direction::Desc,
            })
        };

        Registry {
            kinds: vec![
                TableKind {
                    name: "VIP Buyer".into(),
                    sheet: "VIP BUYER".into(),
                    columns: vec![
                        ColumnSpec::new("Customer Name", Text).required(),
                        ColumnSpec::new("Transaction Count", Integer),
                        ColumnSpec::new("Transaction Total", Decimal),
                    ],
                    ranking: ranked("Transaction Total"),
                    derivation: Derivation::RankTier {
                        name: "Tier".into(),
                        rule: TierRule::new(&[(3, "top"), (10, "mid")], "none"),
                    },
                    coercion: CoercionRules::default(),
                },
                TableKind {
                    name: "Customer Category".into(),
                    sheet: "CUSTOMER CATEGORY".into(),
                    columns: vec![
                        ColumnSpec::new("Customer Name", Text).required(),
                        ColumnSpec::new("Repeat Status", Text),
                        ColumnSpec::new("Buyer Status", Text).choices(BUYER_STATUSES),
                    ],
                    ranking: None,
                    derivation: Derivation::Lookup {
                        name: "Color".into(),
                        source: "Buyer Status".into(),
                        mapping: status_colors,
                        otherwise: "grey".into(),
                    },
                    coercion: CoercionRules::default(),
                },
                TableKind {
                    name: "Marketing Channel".into(),
                    sheet: "MARKETING CHANNEL".into(),
                    columns: vec![
                        ColumnSpec::new("Channel", Text).required(),
                        ColumnSpec::new("Count", Integer),
                    ],
                    ranking: ranked("Count"),
                    derivation: Derivation::RankTier {
                        name: "Dominant".into(),
                        rule: TierRule::new(&[(1, "dominant")], "none"),
                    },
                    coercion: CoercionRules::default(),
                },
                TableKind {
                    name: "Customer Growth".into(),
                    sheet: "CUSTOMER GROWTH".into(),
                    columns: vec![
                        ColumnSpec::new("Month", Text).required(),
                        ColumnSpec::new("Customer Count", Integer),
                    ],
                    ranking: ranked("Customer Count"),
                    derivation: Derivation::RankTier {
                        name: "Trend".into(),
                        rule: TierRule::new(&[(3, "rising"), (4, "flat")], "falling"),
                    },
                    coercion: CoercionRules::default(),
                },
                TableKind {
                    name: "Product Popularity".into(),
                    sheet: "PRODUCT POPULARITY".into(),
                    columns: vec![
                        ColumnSpec::new("Product Name", Text).required(),
                        ColumnSpec::new("Purchase Count", Integer),
                    ],
                    ranking: ranked("Purchase Count"),
                    derivation: Derivation::RankTier {
                        name: "Tier".into(),
                        rule: TierRule::new(&[(5, "top")], "none"),
                    },
                    coercion: CoercionRules::default(),
                },
                TableKind {
                    name: "Customer Favorite Product".into(),
                    sheet: "CUSTOMER FAVORITE PRODUCT".into(),
                    columns: vec![
                        ColumnSpec::new("Customer Name", Text).required(),
                        ColumnSpec::new("Favorite Product", Text),
                        ColumnSpec::new("Purchase Count", Integer),
                    ],
                    ranking: None,
                    derivation: Derivation::None,
                    coercion: CoercionRules::default(),
                },
            ],
        }
    }

    /// Finds a kind by display name or sheet name, ignoring case and spacing.
    pub fn get(&self, name: &str) -> Option<&TableKind> {
        let key = column_key(name);
        self.kinds
            .iter()
            .find(|kind| column_key(&kind.name) == key || column_key(&kind.sheet) == key)
    }

    pub fn validate(&self) -> Result<()> {
        for kind in &self.kinds {
            kind.validate()?;
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening registry {path:?}"))?;
        let registry: Registry = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing registry {path:?}"))?;
        registry
            .validate()
            .with_context(|| format!("Validating registry {path:?}"))?;
        Ok(registry)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating registry {path:?}"))?;
        let mut writer = BufWriter::new(file);
        serde_yaml::to_writer(&mut writer, self)
            .with_context(|| format!("Writing registry {path:?}"))?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_is_valid() {
        let registry = Registry::builtin();
        assert_eq!(registry.kinds.len(), 6);
        registry.validate().expect("builtin registry validates");
    }

    #[test]
    fn lookup_accepts_display_or_sheet_name() {
        let registry = Registry::builtin();
        assert_eq!(registry.get("vip buyer").unwrap().name, "VIP Buyer");
        assert_eq!(registry.get("VIP BUYER").unwrap().name, "VIP Buyer");
        assert_eq!(
            registry.get("product_popularity").unwrap().name,
            "Product Popularity"
        );
        assert!(registry.get("Suppliers").is_none());
    }

    #[test]
    fn tier_rules_cover_every_rank() {
        let registry = Registry::builtin();
        let rule_of = |name: &str| match &registry.get(name).unwrap().derivation {
            Derivation::RankTier { rule, .. } => rule.clone(),
            other => panic!("expected rank tier, got {other:?}"),
        };

        let vip = rule_of("VIP Buyer");
        let labels = (0..12).map(|r| vip.label_for(r)).collect::<Vec<_>>();
        assert_eq!(&labels[..3], &["top"; 3]);
        assert_eq!(&labels[3..10], &["mid"; 7]);
        assert_eq!(&labels[10..], &["none"; 2]);

        let growth = rule_of("Customer Growth");
        assert_eq!(growth.label_for(2), "rising");
        assert_eq!(growth.label_for(3), "flat");
        assert_eq!(growth.label_for(4), "falling");

        let product = rule_of("Product Popularity");
        assert_eq!(product.label_for(4), "top");
        assert_eq!(product.label_for(5), "none");
    }

    #[test]
    fn rank_tier_without_ranking_is_rejected() {
        let mut registry = Registry::builtin();
        registry.kinds[0].ranking = None;
        assert!(registry.validate().is_err());
    }
}
