use rustc_hash::{FxHashMap, FxHashSet};
use sheetform_common::{CellReference, LabelName, SpreadsheetSelection};

use crate::error::StoreError;

/// Label definitions. A label may point at a cell, a range, a row, a column
/// or another label.
#[derive(Debug, Clone, Default)]
pub struct LabelStore {
    labels: FxHashMap<LabelName, SpreadsheetSelection>,
}

impl LabelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Define or redefine `label`, returning the previous target.
    pub fn save(
        &mut self,
        label: LabelName,
        target: SpreadsheetSelection,
    ) -> Result<Option<SpreadsheetSelection>, StoreError> {
        if target == SpreadsheetSelection::Label(label.clone()) {
            return Err(StoreError::LabelCycle(label));
        }
        Ok(self.labels.insert(label, target))
    }

    pub fn load(&self, label: &LabelName) -> Option<&SpreadsheetSelection> {
        self.labels.get(label)
    }

    pub fn delete(&mut self, label: &LabelName) -> Option<SpreadsheetSelection> {
        self.labels.remove(label)
    }

    /// Follow label-to-label definitions until a non-label target.
    pub fn resolve(&self, label: &LabelName) -> Result<&SpreadsheetSelection, StoreError> {
        let mut seen = FxHashSet::default();
        let mut current = label;
        loop {
            if !seen.insert(current) {
                return Err(StoreError::LabelCycle(label.clone()));
            }
            match self.labels.get(current) {
                Some(SpreadsheetSelection::Label(next)) => current = next,
                Some(target) => return Ok(target),
                None => return Err(StoreError::UnknownLabel(current.clone())),
            }
        }
    }

    /// Labels whose resolved target covers `cell`, sorted by name.
    pub fn labels_for(&self, cell: CellReference) -> Vec<LabelName> {
        let mut labels: Vec<LabelName> = self
            .labels
            .keys()
            .filter(|label| {
                self.resolve(label)
                    .ok()
                    .and_then(SpreadsheetSelection::to_range)
                    .is_some_and(|range| range.contains(cell))
            })
            .cloned()
            .collect();
        labels.sort();
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetform_common::CellRange;

    fn label(name: &str) -> LabelName {
        LabelName::new(name).unwrap()
    }

    fn selection(text: &str) -> SpreadsheetSelection {
        SpreadsheetSelection::parse(text).unwrap()
    }

    #[test]
    fn save_load_delete() {
        let mut store = LabelStore::new();
        assert_eq!(store.save(label("Total"), selection("B9")), Ok(None));
        assert_eq!(
            store.save(label("TOTAL"), selection("C9")),
            Ok(Some(selection("B9")))
        );
        assert_eq!(store.load(&label("total")), Some(&selection("C9")));
        assert_eq!(store.delete(&label("Total")), Some(selection("C9")));
        assert!(store.is_empty());
    }

    #[test]
    fn resolve_follows_chains() {
        let mut store = LabelStore::new();
        store.save(label("Rates"), selection("A1:A12")).unwrap();
        store.save(label("Current"), selection("Rates")).unwrap();
        store.save(label("Alias"), selection("Current")).unwrap();

        assert_eq!(
            store.resolve(&label("alias")),
            Ok(&SpreadsheetSelection::Range(CellRange::parse("A1:A12").unwrap()))
        );
        assert_eq!(
            store.resolve(&label("Missing")),
            Err(StoreError::UnknownLabel(label("Missing")))
        );
    }

    #[test]
    fn cycles_are_reported() {
        let mut store = LabelStore::new();
        assert_eq!(
            store.save(label("Loop"), selection("loop")),
            Err(StoreError::LabelCycle(label("Loop")))
        );
        store.save(label("Ping"), selection("Pong")).unwrap();
        store.save(label("Pong"), selection("Ping")).unwrap();
        assert_eq!(
            store.resolve(&label("Ping")),
            Err(StoreError::LabelCycle(label("Ping")))
        );
    }

    #[test]
    fn labels_for_cell() {
        let mut store = LabelStore::new();
        store.save(label("Header"), selection("A1:D1")).unwrap();
        store.save(label("Corner"), selection("A1")).unwrap();
        store.save(label("Other"), selection("F6")).unwrap();
        store.save(label("Top"), selection("Header")).unwrap();

        let cell = CellReference::parse("$A$1").unwrap();
        assert_eq!(
            store.labels_for(cell),
            vec![label("Corner"), label("Header"), label("Top")]
        );
        assert!(store.labels_for(CellReference::parse("Z99").unwrap()).is_empty());
    }
}
