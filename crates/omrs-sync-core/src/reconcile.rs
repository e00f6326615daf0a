//! Concept reconciliation
//!
//! Decides which local concept an incoming record corresponds to. A concept
//! is considered present when any of its names already exists with the same
//! text, type, locale and preferred flag; otherwise it is created under the
//! incoming id, or the next free id when that one is taken.

use crate::context::SyncContext;
use crate::error::{ReferenceKind, SyncError};
use crate::model::{Concept, ConceptId, ConceptName, NewConceptDescription, NewConceptName};
use crate::records::ConceptRecord;
use crate::result::Result;
use crate::store::RecordStore;
use tracing::debug;

/// Result of reconciling one concept record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub concept_id: ConceptId,
    pub created: bool,
}

/// Reconcile one concept record, persisting whatever is missing
pub fn reconcile_concept<S: RecordStore + ?Sized>(
    store: &mut S,
    record: &ConceptRecord,
    context: &mut SyncContext,
) -> Result<Reconciled> {
    context.counters.concepts_processed += 1;

    let class = store
        .find_class(&record.concept_class)?
        .ok_or_else(|| SyncError::reference_not_found(ReferenceKind::Class, &record.concept_class))?;
    let datatype = store
        .find_datatype(&record.datatype)?
        .ok_or_else(|| SyncError::reference_not_found(ReferenceKind::Datatype, &record.datatype))?;

    let reconciled = match matching_concept(store, record)? {
        Some(concept_id) => {
            debug!(
                "Concept {} matched existing concept {} by name",
                record.id, concept_id
            );
            Reconciled {
                concept_id,
                created: false,
            }
        }
        None => {
            let concept_id = allocate_id(store, ConceptId(record.id.0))?;
            store.insert_concept(Concept {
                id: concept_id,
                retired: record.retired,
                datatype_id: datatype.id,
                class_id: class.id,
                is_set: record.is_set(),
                uuid: record.external_id.clone(),
            })?;
            debug!("Created concept {} for incoming {}", concept_id, record.id);
            Reconciled {
                concept_id,
                created: true,
            }
        }
    };
    context
        .translations
        .insert(record.id, reconciled.concept_id);

    persist_details(store, record, reconciled.concept_id)?;

    context.counters.concepts_exported += 1;
    if record.retired {
        context.counters.retired_concepts_exported += 1;
    }
    Ok(reconciled)
}

/// Owning concept of the best existing name match, if any
fn matching_concept<S: RecordStore + ?Sized>(
    store: &S,
    record: &ConceptRecord,
) -> Result<Option<ConceptId>> {
    let mut first: Option<ConceptName> = None;
    for name in &record.names {
        for existing in store.find_names(&name.key())? {
            if existing.is_fully_specified() {
                return Ok(Some(existing.concept_id));
            }
            first.get_or_insert(existing);
        }
    }
    Ok(first.map(|name| name.concept_id))
}

/// The preferred id if free, otherwise one past the current maximum
fn allocate_id<S: RecordStore + ?Sized>(store: &S, preferred: ConceptId) -> Result<ConceptId> {
    if store.get_concept(preferred)?.is_none() {
        return Ok(preferred);
    }
    let max = store.max_concept_id()?.unwrap_or(preferred);
    Ok(ConceptId(max.0 + 1))
}

fn persist_details<S: RecordStore + ?Sized>(
    store: &mut S,
    record: &ConceptRecord,
    concept_id: ConceptId,
) -> Result<()> {
    for name in &record.names {
        store.get_or_create_name(NewConceptName {
            concept_id,
            key: name.key(),
            uuid: name.external_id.clone(),
        })?;
    }
    for description in &record.descriptions {
        store.get_or_create_description(NewConceptDescription {
            concept_id,
            description: description.description.clone(),
            locale: description.locale.clone(),
            uuid: description.external_id.clone(),
        })?;
    }
    if let Some(numeric) = record.numeric(concept_id) {
        store.get_or_create_numeric(numeric)?;
    }
    Ok(())
}
