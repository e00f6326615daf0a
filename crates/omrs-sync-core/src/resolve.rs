//! Mapping resolution
//!
//! Mappings fall into two regimes. External mappings point at a code in
//! another terminology and become a reference term plus a reference map.
//! Internal mappings point at another concept of the dictionary: question and
//! answer pairs become concept answers, set membership becomes concept set
//! rows, and every other relation is stored as a reference map to a term
//! named after the target concept.

use crate::context::SyncContext;
use crate::error::{ReferenceKind, SyncError};
use crate::model::{
    ConceptId, MapKey, NewConceptAnswer, NewConceptSet, NewReferenceMap, NewReferenceTerm,
};
use crate::naming::SourceDirectory;
use crate::records::{ConceptUrl, MappingRecord, MappingTarget};
use crate::result::Result;
use crate::store::RecordStore;
use tracing::{debug, warn};

/// Internal map type linking a coded question to one of its answers
pub const Q_AND_A: &str = "Q-AND-A";

/// Internal map type linking a set to one of its members
pub const CONCEPT_SET: &str = "CONCEPT-SET";

/// What a mapping turned into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    ExternalMap { map_id: i64, created: bool },
    Answer { answer_id: i64, created: bool },
    SetMember { set_id: i64, created: bool },
    InternalMap { map_id: i64, created: bool },
    /// Both endpoints are the same local concept; skipped on purpose and counted
    SelfMapping,
}

/// Resolve one mapping against the translation table and persist it
pub fn resolve_mapping<S: RecordStore + ?Sized>(
    store: &mut S,
    directory: &SourceDirectory,
    mapping: &MappingRecord,
    context: &mut SyncContext,
) -> Result<Resolution> {
    let from = context
        .translations
        .get(mapping.from.concept)
        .ok_or_else(|| SyncError::UnknownFromConcept {
            id: mapping.from.concept.0,
            url: mapping.from.url.clone(),
        })?;
    if store.get_concept(from)?.is_none() {
        return Err(SyncError::reference_not_found(
            ReferenceKind::Concept,
            from.to_string(),
        ));
    }

    match &mapping.target {
        MappingTarget::External {
            source,
            code,
            ref_term,
        } => {
            context.counters.external_mappings_exported += 1;
            let source_id = local_source_id(store, directory, source)?;
            let map_type_id = map_type_id(store, &mapping.map_type)?;
            let term = store.get_or_create_term(NewReferenceTerm {
                source_id,
                code: code.clone(),
                retired: mapping.retired,
                uuid: ref_term.clone(),
            })?;
            let map = store.get_or_create_map(NewReferenceMap {
                key: MapKey {
                    concept_id: from,
                    term_id: term.row.id,
                    map_type_id,
                },
                uuid: mapping.external_id.clone(),
            })?;
            debug!(
                "External mapping {} -> {}:{} ({})",
                from, source, code, mapping.map_type
            );
            Ok(Resolution::ExternalMap {
                map_id: map.row.id,
                created: map.created,
            })
        }
        MappingTarget::Internal { to, ref_map } => {
            context.counters.internal_mappings_exported += 1;
            let to_id =
                context
                    .translations
                    .get(to.concept)
                    .ok_or_else(|| SyncError::UnknownToConcept {
                        id: to.concept.0,
                        url: to.url.clone(),
                    })?;
            if to_id == from {
                warn!(
                    "Skipping self-mapping on concept {} ({})",
                    from, mapping.map_type
                );
                context.counters.ignored_self_mappings += 1;
                return Ok(Resolution::SelfMapping);
            }
            match mapping.map_type.as_str() {
                Q_AND_A => {
                    let answer = store.get_or_create_answer(NewConceptAnswer {
                        question: from,
                        answer: to_id,
                        sort_weight: mapping.sort_weight,
                        uuid: mapping.external_id.clone(),
                    })?;
                    if answer.created {
                        context.record_answer(from);
                    }
                    Ok(Resolution::Answer {
                        answer_id: answer.row.id,
                        created: answer.created,
                    })
                }
                CONCEPT_SET => {
                    let member = store.get_or_create_set_member(NewConceptSet {
                        owner: from,
                        member: to_id,
                        sort_weight: mapping.sort_weight,
                        uuid: mapping.external_id.clone(),
                    })?;
                    if member.created {
                        context.record_set_member(from);
                    }
                    Ok(Resolution::SetMember {
                        set_id: member.row.id,
                        created: member.created,
                    })
                }
                _ => resolve_internal_map(store, directory, mapping, from, to, ref_map.as_deref()),
            }
        }
    }
}

fn resolve_internal_map<S: RecordStore + ?Sized>(
    store: &mut S,
    directory: &SourceDirectory,
    mapping: &MappingRecord,
    from: ConceptId,
    to: &ConceptUrl,
    ref_map: Option<&str>,
) -> Result<Resolution> {
    let map_type_id = map_type_id(store, &mapping.map_type)?;
    let source_id = local_source_id(store, directory, &to.source)?;
    let code = to.concept.to_string();

    let existing = match mapping.external_id.as_deref() {
        Some(uuid) => store.find_term_by_uuid(uuid)?,
        None => None,
    };
    let term = match existing {
        Some(term) => term,
        None => {
            store
                .get_or_create_term(NewReferenceTerm {
                    source_id,
                    code: code.clone(),
                    retired: mapping.retired,
                    uuid: mapping.external_id.clone(),
                })?
                .row
        }
    };

    let map = store.get_or_create_map(NewReferenceMap {
        key: MapKey {
            concept_id: from,
            term_id: term.id,
            map_type_id,
        },
        uuid: ref_map.map(str::to_string),
    })?;
    debug!(
        "Internal mapping {} -> {}:{} ({})",
        from, to.source, code, mapping.map_type
    );
    Ok(Resolution::InternalMap {
        map_id: map.row.id,
        created: map.created,
    })
}

fn local_source_id<S: RecordStore + ?Sized>(
    store: &S,
    directory: &SourceDirectory,
    remote_id: &str,
) -> Result<i64> {
    let name = directory.to_local_name(remote_id);
    store
        .find_source(&name)?
        .map(|source| source.id)
        .ok_or_else(|| SyncError::reference_not_found(ReferenceKind::Source, name))
}

fn map_type_id<S: RecordStore + ?Sized>(store: &S, name: &str) -> Result<i64> {
    store
        .find_map_type(name)?
        .map(|map_type| map_type.id)
        .ok_or_else(|| SyncError::reference_not_found(ReferenceKind::MapType, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{Concept, ExportId, NewReferenceSource, NewReferenceTerm};
    use crate::records::Record;
    use crate::store::MemoryStore;

    fn store_with_concepts(ids: &[i64]) -> MemoryStore {
        let mut store = MemoryStore::with_defaults();
        for id in ids {
            store
                .insert_concept(Concept {
                    id: ConceptId(*id),
                    retired: false,
                    datatype_id: 1,
                    class_id: 1,
                    is_set: false,
                    uuid: format!("c-{id}"),
                })
                .unwrap();
        }
        store
    }

    fn add_source(store: &mut MemoryStore, name: &str) -> i64 {
        store
            .insert_source(NewReferenceSource {
                name: name.to_string(),
                description: None,
                hl7_code: None,
                creator: 1,
                retired: false,
                retired_by: None,
                uuid: format!("src-{name}"),
            })
            .unwrap()
            .id
    }

    fn external(map_type: &str, from: i64, source: &str, code: &str) -> MappingRecord {
        MappingRecord::parse_line(&format!(
            r#"{{"from_concept_url":"/orgs/CIEL/sources/CIEL/concepts/{from}/","to_source_url":"/orgs/IHTSDO/sources/{source}/","to_concept_code":"{code}","map_type":"{map_type}","external_id":"m-{from}-{code}"}}"#
        ))
        .unwrap()
    }

    fn internal(map_type: &str, from: i64, to: i64) -> MappingRecord {
        MappingRecord::parse_line(&format!(
            r#"{{"from_concept_url":"/orgs/CIEL/sources/CIEL/concepts/{from}/","to_concept_url":"/orgs/CIEL/sources/CIEL/concepts/{to}/","map_type":"{map_type}","external_id":"m-{from}-{to}"}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_unknown_from_concept() {
        let mut store = store_with_concepts(&[]);
        let mut context = SyncContext::new();
        let err = resolve_mapping(
            &mut store,
            &SourceDirectory::default(),
            &internal(Q_AND_A, 1, 2),
            &mut context,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownFromConcept);
    }

    #[test]
    fn test_unknown_to_concept() {
        let mut store = store_with_concepts(&[10]);
        let mut context = SyncContext::new();
        context.translations.insert(ExportId(1), ConceptId(10));

        let err = resolve_mapping(
            &mut store,
            &SourceDirectory::default(),
            &internal("SAME-AS", 1, 2),
            &mut context,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownToConcept);
        assert_eq!(context.counters.internal_mappings_exported, 1);
    }

    #[test]
    fn test_self_mapping_is_skipped() {
        let mut store = store_with_concepts(&[10]);
        let mut context = SyncContext::new();
        context.translations.insert(ExportId(1), ConceptId(10));
        context.translations.insert(ExportId(2), ConceptId(10));

        let resolution = resolve_mapping(
            &mut store,
            &SourceDirectory::default(),
            &internal(Q_AND_A, 1, 2),
            &mut context,
        )
        .unwrap();

        assert_eq!(resolution, Resolution::SelfMapping);
        assert!(store.answers().is_empty());
        assert_eq!(context.counters.ignored_self_mappings, 1);
    }

    #[test]
    fn test_question_counted_once_per_concept() {
        let mut store = store_with_concepts(&[10, 20, 30]);
        let mut context = SyncContext::new();
        for (incoming, local) in [(1, 10), (2, 20), (3, 30)] {
            context.translations.insert(ExportId(incoming), ConceptId(local));
        }
        let directory = SourceDirectory::default();

        resolve_mapping(&mut store, &directory, &internal(Q_AND_A, 1, 2), &mut context).unwrap();
        resolve_mapping(&mut store, &directory, &internal(Q_AND_A, 1, 3), &mut context).unwrap();

        assert_eq!(context.counters.answers_exported, 2);
        assert_eq!(context.counters.questions_exported, 1);
    }

    #[test]
    fn test_unknown_map_type_creates_no_term() {
        let mut store = store_with_concepts(&[10]);
        add_source(&mut store, "SNOMED CT");
        let mut context = SyncContext::new();
        context.translations.insert(ExportId(1), ConceptId(10));

        let err = resolve_mapping(
            &mut store,
            &SourceDirectory::default(),
            &external("RELATED-TO", 1, "SNOMED-CT", "61462000"),
            &mut context,
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ReferenceNotFound);
        assert!(err.to_string().contains("RELATED-TO"));
        assert!(store.terms().is_empty());
        assert!(store.maps().is_empty());
    }

    #[test]
    fn test_unknown_target_source() {
        let mut store = store_with_concepts(&[10]);
        let mut context = SyncContext::new();
        context.translations.insert(ExportId(1), ConceptId(10));

        let err = resolve_mapping(
            &mut store,
            &SourceDirectory::default(),
            &external("SAME-AS", 1, "LOINC", "8302-2"),
            &mut context,
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ReferenceNotFound);
        assert!(err.to_string().contains("LOINC"));
        assert!(store.terms().is_empty());
    }

    #[test]
    fn test_internal_map_reuses_term_found_by_uuid() {
        let mut store = store_with_concepts(&[10, 20]);
        let ciel = add_source(&mut store, "CIEL");
        let other = add_source(&mut store, "PIH");
        let seeded = store
            .insert_term(NewReferenceTerm {
                source_id: other,
                code: "4711".to_string(),
                retired: false,
                uuid: Some("m-1-2".to_string()),
            })
            .unwrap();
        let mut context = SyncContext::new();
        context.translations.insert(ExportId(1), ConceptId(10));
        context.translations.insert(ExportId(2), ConceptId(20));

        let resolution = resolve_mapping(
            &mut store,
            &SourceDirectory::default(),
            &internal("SAME-AS", 1, 2),
            &mut context,
        )
        .unwrap();

        assert!(matches!(
            resolution,
            Resolution::InternalMap { created: true, .. }
        ));
        assert_eq!(store.terms().len(), 1);
        assert!(store.find_term(ciel, "2").unwrap().is_none());
        assert_eq!(store.maps().len(), 1);
        assert_eq!(store.maps()[0].key.term_id, seeded.id);
        assert_eq!(store.maps()[0].key.concept_id, ConceptId(10));
    }
}
