use std::collections::HashMap;

use crate::{
    kinds::{Derivation, TierRule},
    record::{Record, RecordId},
    store::TableStore,
};

/// A record with its zero-based rank and derived presentation label.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<'a> {
    pub rank: usize,
    pub record: &'a Record,
    pub label: Option<String>,
}

/// Attaches tier labels to records that are already in rank order.
pub fn apply_tier_rule<'a>(sorted: Vec<&'a Record>, rule: &TierRule) -> Vec<Ranked<'a>> {
    sorted
        .into_iter()
        .enumerate()
        .map(|(rank, record)| Ranked {
            rank,
            record,
            label: Some(rule.label_for(rank).to_string()),
        })
        .collect()
}

/// Ranks the whole table and derives its presentation attribute from scratch.
pub fn derive(store: &TableStore) -> Vec<Ranked<'_>> {
    let sorted = store.ranked_view();
    match &store.kind().derivation {
        Derivation::RankTier { rule, .. } => apply_tier_rule(sorted, rule),
        Derivation::Lookup {
            source,
            mapping,
            otherwise,
            ..
        } => {
            let source_index = store.column_index(source);
            sorted
                .into_iter()
                .enumerate()
                .map(|(rank, record)| {
                    let key = source_index
                        .and_then(|idx| record.cell(idx))
                        .map(|value| value.as_display())
                        .unwrap_or_default();
                    let label = mapping.get(key.trim()).unwrap_or(otherwise).clone();
                    Ranked {
                        rank,
                        record,
                        label: Some(label),
                    }
                })
                .collect()
        }
        Derivation::None => sorted
            .into_iter()
            .enumerate()
            .map(|(rank, record)| Ranked {
                rank,
                record,
                label: None,
            })
            .collect(),
    }
}

/// Rank and label per record id, for joining onto a differently ordered view.
pub fn labels_by_id(ranked: &[Ranked<'_>]) -> HashMap<RecordId, (usize, Option<String>)> {
    ranked
        .iter()
        .map(|r| (r.record.id, (r.rank, r.label.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{kinds::Registry, store::FieldInput};

    fn field(column: &str, value: &str) -> FieldInput {
        (column.to_string(), value.to_string())
    }

    fn labelled(ranked: &[Ranked<'_>]) -> Vec<(String, String)> {
        ranked
            .iter()
            .map(|r| {
                (
                    r.record.cells[0].as_display(),
                    r.label.clone().unwrap_or_default(),
                )
            })
            .collect()
    }

    #[test]
    fn growth_trend_follows_rank() {
        let kind = Registry::builtin().get("Customer Growth").cloned().unwrap();
        let mut store = TableStore::new(kind, Vec::new());
        for (month, count) in [("Jan", "10"), ("Feb", "40"), ("Mar", "30"), ("Apr", "20"), ("May", "50")] {
            store
                .create(&[field("Month", month), field("Customer Count", count)])
                .unwrap();
        }
        let trend = labelled(&derive(&store));
        assert_eq!(
            trend,
            vec![
                ("May".to_string(), "rising".to_string()),
                ("Feb".to_string(), "rising".to_string()),
                ("Mar".to_string(), "rising".to_string()),
                ("Apr".to_string(), "flat".to_string()),
                ("Jan".to_string(), "falling".to_string()),
            ]
        );
    }

    #[test]
    fn ranks_shift_after_insert() {
        let kind = Registry::builtin().get("Product Popularity").cloned().unwrap();
        let mut store = TableStore::new(kind, Vec::new());
        for idx in 0..5 {
            store
                .create(&[
                    field("Product Name", &format!("P{idx}")),
                    field("Purchase Count", &format!("{}", 10 + idx)),
                ])
                .unwrap();
        }
        let before = labels_by_id(&derive(&store));
        let lowest = store.records()[0].id;
        assert_eq!(before[&lowest].1.as_deref(), Some("top"));

        store
            .create(&[field("Product Name", "Hit"), field("Purchase Count", "99")])
            .unwrap();
        let after = labels_by_id(&derive(&store));
        assert_eq!(after[&lowest], (5, Some("none".to_string())));
    }

    #[test]
    fn status_lookup_falls_back() {
        let kind = Registry::builtin().get("Customer Category").cloned().unwrap();
        let mut store = TableStore::new(kind, Vec::new());
        store
            .create(&[field("Customer Name", "Ani"), field("Buyer Status", "Churned")])
            .unwrap();
        store.create(&[field("Customer Name", "Budi")]).unwrap();
        let colors = labelled(&derive(&store));
        assert_eq!(colors[0].1, "red");
        assert_eq!(colors[1].1, "grey");
    }

    #[test]
    fn favorites_keep_insertion_order_without_labels() {
        let kind = Registry::builtin()
            .get("Customer Favorite Product")
            .cloned()
            .unwrap();
        let mut store = TableStore::new(kind, Vec::new());
        store.create(&[field("Customer Name", "Zed"), field("Purchase Count", "1")]).unwrap();
        store.create(&[field("Customer Name", "Ani"), field("Purchase Count", "9")]).unwrap();
        let ranked = derive(&store);
        assert_eq!(ranked[0].record.cells[0].as_display(), "Zed");
        assert!(ranked.iter().all(|r| r.label.is_none()));
    }
}
