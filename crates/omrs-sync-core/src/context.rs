//! Run-scoped synchronization state

use crate::model::{ConceptId, ExportId};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;

/// Incoming concept id -> local concept id, in reconciliation order
#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    ids: IndexMap<ExportId, ConceptId>,
}

impl TranslationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the local id of an incoming concept, returning the previous one if any
    pub fn insert(&mut self, incoming: ExportId, local: ConceptId) -> Option<ConceptId> {
        self.ids.insert(incoming, local)
    }

    pub fn get(&self, incoming: ExportId) -> Option<ConceptId> {
        self.ids.get(&incoming).copied()
    }

    pub fn contains(&self, incoming: ExportId) -> bool {
        self.ids.contains_key(&incoming)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ExportId, ConceptId)> + '_ {
        self.ids.iter().map(|(incoming, local)| (*incoming, *local))
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCounters {
    pub concepts_processed: usize,
    pub concepts_exported: usize,
    pub retired_concepts_exported: usize,
    pub sources_exported: usize,
    pub classes_exported: usize,
    pub internal_mappings_exported: usize,
    pub external_mappings_exported: usize,
    pub questions_exported: usize,
    pub answers_exported: usize,
    pub concept_sets_exported: usize,
    pub set_members_exported: usize,
    pub ignored_self_mappings: usize,
}

impl SyncCounters {
    pub fn mappings_exported(&self) -> usize {
        self.internal_mappings_exported + self.external_mappings_exported
    }
}

/// Mutable state threaded through the loader, reconciler and resolver
#[derive(Debug, Default)]
pub struct SyncContext {
    pub translations: TranslationTable,
    pub counters: SyncCounters,
    questions: HashSet<ConceptId>,
    set_owners: HashSet<ConceptId>,
}

impl SyncContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a newly created answer row and its question if first seen
    pub fn record_answer(&mut self, question: ConceptId) {
        self.counters.answers_exported += 1;
        if self.questions.insert(question) {
            self.counters.questions_exported += 1;
        }
    }

    /// Count a newly created set member row and its owner if first seen
    pub fn record_set_member(&mut self, owner: ConceptId) {
        self.counters.set_members_exported += 1;
        if self.set_owners.insert(owner) {
            self.counters.concept_sets_exported += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_table_keeps_order() {
        let mut table = TranslationTable::new();
        table.insert(ExportId(200), ConceptId(99));
        table.insert(ExportId(100), ConceptId(42));

        let pairs: Vec<_> = table.iter().collect();
        assert_eq!(
            pairs,
            vec![
                (ExportId(200), ConceptId(99)),
                (ExportId(100), ConceptId(42))
            ]
        );
        assert_eq!(table.get(ExportId(100)), Some(ConceptId(42)));
        assert!(!table.contains(ExportId(1)));
    }

    #[test]
    fn test_distinct_questions_counted_once() {
        let mut context = SyncContext::new();
        context.record_answer(ConceptId(1));
        context.record_answer(ConceptId(1));
        context.record_answer(ConceptId(2));

        assert_eq!(context.counters.answers_exported, 3);
        assert_eq!(context.counters.questions_exported, 2);
    }
}
