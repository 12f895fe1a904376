//! Latest known price per instrument.
//!
//! The live view keeps one `PriceRecord` per symbol in first-seen order. The
//! only mutation is `merge`: an unseen symbol is appended, a known symbol has
//! its fields replaced in place without moving. Every applied merge bumps
//! `revision`, which the presentation layer uses as a coarse change signal.
use std::collections::HashMap;

use price_common::{PipelineError, PriceRecord, Result};
use serde::Serialize;

/// What a merge did to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A new entry was appended at this position.
    Inserted(usize),
    /// The existing entry at this position was overwritten.
    Updated(usize),
}

/// Ordered, symbol-keyed collection of price records.
#[derive(Debug, Default, Serialize)]
pub struct LiveView {
    records: Vec<PriceRecord>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
    revision: u64,
}

impl LiveView {
    /// Create an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert `incoming` by symbol.
    ///
    /// Merging a value equal to the stored one still rewrites the fields and
    /// bumps the revision. Records without a symbol are rejected and leave the
    /// view untouched.
    pub fn merge(&mut self, incoming: PriceRecord) -> Result<MergeOutcome> {
        if !incoming.has_symbol() {
            return Err(PipelineError::EmptySymbol);
        }
        self.revision += 1;
        if let Some(&index) = self.positions.get(&incoming.symbol) {
            self.records[index].assign_from(&incoming);
            return Ok(MergeOutcome::Updated(index));
        }
        let index = self.records.len();
        self.positions.insert(incoming.symbol.clone(), index);
        self.records.push(incoming);
        Ok(MergeOutcome::Inserted(index))
    }

    /// Records in presentation order.
    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    /// Record for `symbol`, if seen.
    pub fn get(&self, symbol: &str) -> Option<&PriceRecord> {
        self.positions.get(symbol).map(|&index| &self.records[index])
    }

    /// Position of `symbol` in presentation order.
    pub fn position(&self, symbol: &str) -> Option<usize> {
        self.positions.get(symbol).copied()
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no symbol has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Incremented by every applied merge and by `clear`.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.records.clear();
        self.positions.clear();
        self.revision += 1;
    }

    /// Encode the view as a JSON document.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Free-function form of [`LiveView::merge`].
pub fn merge(view: &mut LiveView, incoming: PriceRecord) -> Result<MergeOutcome> {
    view.merge(incoming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn record(symbol: &str, bid_qty: i64, ask_qty: i64) -> PriceRecord {
        PriceRecord::new(
            symbol,
            Decimal::from(9),
            Decimal::from(10),
            Decimal::from(bid_qty),
            Decimal::from(ask_qty),
        )
    }

    fn symbols(view: &LiveView) -> Vec<&str> {
        view.records().iter().map(|r| r.symbol.as_str()).collect()
    }

    #[test]
    fn unseen_symbol_is_appended() {
        let mut view = LiveView::new();
        assert_eq!(view.merge(record("A", 11, 11)).unwrap(), MergeOutcome::Inserted(0));
        assert_eq!(view.merge(record("B", 11, 12)).unwrap(), MergeOutcome::Inserted(1));
        assert_eq!(view.len(), 2);
        assert_eq!(symbols(&view), vec!["A", "B"]);
    }

    #[test]
    fn known_symbol_keeps_position() {
        let mut view = LiveView::new();
        for symbol in ["A", "B", "C"] {
            view.merge(record(symbol, 11, 11)).unwrap();
        }
        assert_eq!(view.merge(record("B", 110, 11)).unwrap(), MergeOutcome::Updated(1));
        assert_eq!(view.len(), 3);
        assert_eq!(symbols(&view), vec!["A", "B", "C"]);
        assert_eq!(view.get("B").unwrap().bid_qty, Decimal::from(110));
    }

    #[test]
    fn repeated_merge_still_bumps_revision() {
        let mut view = LiveView::new();
        view.merge(record("A", 11, 11)).unwrap();
        let before = view.revision();
        view.merge(record("A", 11, 11)).unwrap();
        assert_eq!(view.revision(), before + 1);
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn empty_symbol_is_rejected() {
        let mut view = LiveView::new();
        let result = merge(&mut view, record(" ", 1, 1));
        assert!(matches!(result, Err(PipelineError::EmptySymbol)));
        assert!(view.is_empty());
        assert_eq!(view.revision(), 0);
    }

    #[test]
    fn clear_resets_records() {
        let mut view = LiveView::new();
        view.merge(record("A", 1, 1)).unwrap();
        view.clear();
        assert!(view.is_empty());
        assert!(view.get("A").is_none());
        assert_eq!(view.merge(record("B", 1, 1)).unwrap(), MergeOutcome::Inserted(0));
    }

    #[test]
    fn json_snapshot_lists_records_in_order() {
        let mut view = LiveView::new();
        view.merge(record("B", 1, 1)).unwrap();
        view.merge(record("A", 1, 1)).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&view.to_json_bytes().unwrap()).unwrap();
        assert_eq!(json["records"][0]["symbol"], "B");
        assert_eq!(json["records"][1]["symbol"], "A");
        assert_eq!(json["revision"], 2);
    }

    fn arb_record() -> impl Strategy<Value = PriceRecord> {
        ("[A-E]", 0i64..1000, 0i64..1000, 0i64..1000, 0i64..1000).prop_map(|(s, b, a, bq, aq)| {
            PriceRecord::new(
                s,
                Decimal::new(b, 2),
                Decimal::new(a, 2),
                Decimal::from(bq),
                Decimal::from(aq),
            )
        })
    }

    proptest! {
        #[test]
        fn merging_twice_leaves_single_equal_entry(
            seed in proptest::collection::vec(arb_record(), 0..20),
            r in arb_record(),
        ) {
            let mut view = LiveView::new();
            for s in seed {
                view.merge(s).unwrap();
            }
            view.merge(r.clone()).unwrap();
            view.merge(r.clone()).unwrap();
            let matching: Vec<_> = view.records().iter().filter(|x| x.symbol == r.symbol).collect();
            prop_assert_eq!(matching.len(), 1);
            prop_assert_eq!(matching[0], &r);
        }

        #[test]
        fn order_is_first_seen_order(updates in proptest::collection::vec(arb_record(), 1..50)) {
            let mut view = LiveView::new();
            let mut first_seen: Vec<String> = Vec::new();
            for u in updates {
                if !first_seen.contains(&u.symbol) {
                    first_seen.push(u.symbol.clone());
                }
                view.merge(u).unwrap();
            }
            let order: Vec<String> = view.records().iter().map(|r| r.symbol.clone()).collect();
            prop_assert_eq!(order, first_seen);
        }
    }
}
