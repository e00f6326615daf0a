//! In-process record store
//!
//! Backs dry runs and tests. Rows live in insertion-ordered vectors, so
//! lookups return matches in the order they were written, like an
//! unordered `SELECT` against a freshly loaded table would.

use super::{DEFAULT_DATATYPES, DEFAULT_MAP_TYPES, RecordStore};
use crate::error::SyncError;
use crate::model::{
    Concept, ConceptAnswer, ConceptClass, ConceptDatatype, ConceptDescription, ConceptId,
    ConceptMapType, ConceptName, ConceptNumeric, ConceptSet, MapKey, NameKey, NewConceptAnswer,
    NewConceptClass, NewConceptDescription, NewConceptName, NewConceptSet, NewReferenceMap,
    NewReferenceSource, NewReferenceTerm, ReferenceMap, ReferenceSource, ReferenceTerm,
};
use crate::result::Result;

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    next_id: i64,
    classes: Vec<ConceptClass>,
    datatypes: Vec<ConceptDatatype>,
    map_types: Vec<ConceptMapType>,
    sources: Vec<ReferenceSource>,
    concepts: Vec<Concept>,
    names: Vec<ConceptName>,
    descriptions: Vec<ConceptDescription>,
    numerics: Vec<ConceptNumeric>,
    terms: Vec<ReferenceTerm>,
    maps: Vec<ReferenceMap>,
    answers: Vec<ConceptAnswer>,
    set_members: Vec<ConceptSet>,
}

impl MemoryStore {
    /// Empty store without any lookup rows
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the standard OpenMRS datatypes and map types
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        for name in DEFAULT_DATATYPES {
            store.add_datatype(name);
        }
        for name in DEFAULT_MAP_TYPES {
            store.add_map_type(name);
        }
        store
    }

    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_datatype(&mut self, name: &str) -> ConceptDatatype {
        let row = ConceptDatatype {
            id: self.allocate(),
            name: name.to_string(),
        };
        self.datatypes.push(row.clone());
        row
    }

    pub fn add_map_type(&mut self, name: &str) -> ConceptMapType {
        let row = ConceptMapType {
            id: self.allocate(),
            name: name.to_string(),
        };
        self.map_types.push(row.clone());
        row
    }

    pub fn classes(&self) -> &[ConceptClass] {
        &self.classes
    }

    pub fn sources(&self) -> &[ReferenceSource] {
        &self.sources
    }

    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    pub fn names(&self) -> &[ConceptName] {
        &self.names
    }

    pub fn descriptions(&self) -> &[ConceptDescription] {
        &self.descriptions
    }

    pub fn numerics(&self) -> &[ConceptNumeric] {
        &self.numerics
    }

    pub fn terms(&self) -> &[ReferenceTerm] {
        &self.terms
    }

    pub fn maps(&self) -> &[ReferenceMap] {
        &self.maps
    }

    pub fn answers(&self) -> &[ConceptAnswer] {
        &self.answers
    }

    pub fn set_members(&self) -> &[ConceptSet] {
        &self.set_members
    }
}

impl RecordStore for MemoryStore {
    fn find_class(&self, name: &str) -> Result<Option<ConceptClass>> {
        Ok(self.classes.iter().find(|row| row.name == name).cloned())
    }

    fn insert_class(&mut self, class: NewConceptClass) -> Result<ConceptClass> {
        let row = ConceptClass {
            id: self.allocate(),
            name: class.name,
            description: class.description,
            creator: class.creator,
            retired: class.retired,
            retired_by: class.retired_by,
            uuid: class.uuid,
        };
        self.classes.push(row.clone());
        Ok(row)
    }

    fn find_datatype(&self, name: &str) -> Result<Option<ConceptDatatype>> {
        Ok(self.datatypes.iter().find(|row| row.name == name).cloned())
    }

    fn find_map_type(&self, name: &str) -> Result<Option<ConceptMapType>> {
        Ok(self.map_types.iter().find(|row| row.name == name).cloned())
    }

    fn find_source(&self, name: &str) -> Result<Option<ReferenceSource>> {
        Ok(self.sources.iter().find(|row| row.name == name).cloned())
    }

    fn insert_source(&mut self, source: NewReferenceSource) -> Result<ReferenceSource> {
        let row = ReferenceSource {
            id: self.allocate(),
            name: source.name,
            description: source.description,
            hl7_code: source.hl7_code,
            creator: source.creator,
            retired: source.retired,
            retired_by: source.retired_by,
            uuid: source.uuid,
        };
        self.sources.push(row.clone());
        Ok(row)
    }

    fn list_sources(&self) -> Result<Vec<ReferenceSource>> {
        Ok(self.sources.clone())
    }

    fn get_concept(&self, id: ConceptId) -> Result<Option<Concept>> {
        Ok(self.concepts.iter().find(|row| row.id == id).cloned())
    }

    fn max_concept_id(&self) -> Result<Option<ConceptId>> {
        Ok(self.concepts.iter().map(|row| row.id).max())
    }

    fn insert_concept(&mut self, concept: Concept) -> Result<Concept> {
        if self.concepts.iter().any(|row| row.id == concept.id) {
            return Err(SyncError::store_error(format!(
                "duplicate concept_id {}",
                concept.id
            )));
        }
        self.concepts.push(concept.clone());
        Ok(concept)
    }

    fn find_names(&self, key: &NameKey) -> Result<Vec<ConceptName>> {
        Ok(self
            .names
            .iter()
            .filter(|row| {
                row.name == key.name
                    && row.name_type == key.name_type
                    && row.locale == key.locale
                    && row.locale_preferred == key.locale_preferred
            })
            .cloned()
            .collect())
    }

    fn insert_name(&mut self, name: NewConceptName) -> Result<ConceptName> {
        let row = ConceptName {
            id: self.allocate(),
            concept_id: name.concept_id,
            name: name.key.name,
            name_type: name.key.name_type,
            locale: name.key.locale,
            locale_preferred: name.key.locale_preferred,
            uuid: name.uuid,
        };
        self.names.push(row.clone());
        Ok(row)
    }

    fn find_description(
        &self,
        concept_id: ConceptId,
        description: &str,
        uuid: Option<&str>,
    ) -> Result<Option<ConceptDescription>> {
        Ok(self
            .descriptions
            .iter()
            .find(|row| {
                row.concept_id == concept_id
                    && row.description == description
                    && row.uuid.as_deref() == uuid
            })
            .cloned())
    }

    fn insert_description(
        &mut self,
        description: NewConceptDescription,
    ) -> Result<ConceptDescription> {
        let row = ConceptDescription {
            id: self.allocate(),
            concept_id: description.concept_id,
            description: description.description,
            locale: description.locale,
            uuid: description.uuid,
        };
        self.descriptions.push(row.clone());
        Ok(row)
    }

    fn find_numeric(&self, concept_id: ConceptId) -> Result<Option<ConceptNumeric>> {
        Ok(self
            .numerics
            .iter()
            .find(|row| row.concept_id == concept_id)
            .cloned())
    }

    fn insert_numeric(&mut self, numeric: ConceptNumeric) -> Result<ConceptNumeric> {
        self.numerics.push(numeric.clone());
        Ok(numeric)
    }

    fn find_term(&self, source_id: i64, code: &str) -> Result<Option<ReferenceTerm>> {
        Ok(self
            .terms
            .iter()
            .find(|row| row.source_id == source_id && row.code == code)
            .cloned())
    }

    fn find_term_by_uuid(&self, uuid: &str) -> Result<Option<ReferenceTerm>> {
        Ok(self
            .terms
            .iter()
            .find(|row| row.uuid.as_deref() == Some(uuid))
            .cloned())
    }

    fn insert_term(&mut self, term: NewReferenceTerm) -> Result<ReferenceTerm> {
        let row = ReferenceTerm {
            id: self.allocate(),
            source_id: term.source_id,
            code: term.code,
            retired: term.retired,
            uuid: term.uuid,
        };
        self.terms.push(row.clone());
        Ok(row)
    }

    fn find_map(&self, key: &MapKey) -> Result<Option<ReferenceMap>> {
        Ok(self.maps.iter().find(|row| row.key == *key).cloned())
    }

    fn insert_map(&mut self, map: NewReferenceMap) -> Result<ReferenceMap> {
        let row = ReferenceMap {
            id: self.allocate(),
            key: map.key,
            uuid: map.uuid,
        };
        self.maps.push(row.clone());
        Ok(row)
    }

    fn find_answer(
        &self,
        question: ConceptId,
        answer: ConceptId,
    ) -> Result<Option<ConceptAnswer>> {
        Ok(self
            .answers
            .iter()
            .find(|row| row.question == question && row.answer == answer)
            .cloned())
    }

    fn insert_answer(&mut self, answer: NewConceptAnswer) -> Result<ConceptAnswer> {
        let row = ConceptAnswer {
            id: self.allocate(),
            question: answer.question,
            answer: answer.answer,
            sort_weight: answer.sort_weight,
            uuid: answer.uuid,
        };
        self.answers.push(row.clone());
        Ok(row)
    }

    fn find_set_member(&self, owner: ConceptId, member: ConceptId) -> Result<Option<ConceptSet>> {
        Ok(self
            .set_members
            .iter()
            .find(|row| row.owner == owner && row.member == member)
            .cloned())
    }

    fn insert_set_member(&mut self, member: NewConceptSet) -> Result<ConceptSet> {
        let row = ConceptSet {
            id: self.allocate(),
            owner: member.owner,
            member: member.member,
            sort_weight: member.sort_weight,
            uuid: member.uuid,
        };
        self.set_members.push(row.clone());
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Upsert;

    fn new_class(name: &str) -> NewConceptClass {
        NewConceptClass {
            name: name.to_string(),
            description: None,
            creator: 1,
            retired: false,
            retired_by: None,
            uuid: format!("{name}-uuid"),
        }
    }

    #[test]
    fn test_get_or_create_reports_creation_once() {
        let mut store = MemoryStore::new();

        let first = store.get_or_create_class(new_class("Diagnosis")).unwrap();
        let second = store.get_or_create_class(new_class("Diagnosis")).unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.row, second.row);
        assert_eq!(store.classes().len(), 1);
    }

    #[test]
    fn test_duplicate_concept_id_is_rejected() {
        let mut store = MemoryStore::with_defaults();
        let concept = Concept {
            id: ConceptId(7),
            retired: false,
            datatype_id: 1,
            class_id: 1,
            is_set: false,
            uuid: "c-7".to_string(),
        };
        store.insert_concept(concept.clone()).unwrap();

        assert!(store.insert_concept(concept).is_err());
        assert_eq!(store.max_concept_id().unwrap(), Some(ConceptId(7)));
    }

    #[test]
    fn test_defaults_seed_lookup_tables() {
        let store = MemoryStore::with_defaults();
        assert!(store.find_datatype("N/A").unwrap().is_some());
        assert!(store.find_map_type("SAME-AS").unwrap().is_some());
        assert!(store.find_map_type("Q-AND-A").unwrap().is_none());
    }

    #[test]
    fn test_answer_upsert_keyed_on_pair() {
        let mut store = MemoryStore::new();
        let answer = NewConceptAnswer {
            question: ConceptId(1),
            answer: ConceptId(2),
            sort_weight: Some(1.0),
            uuid: None,
        };
        let created = store.get_or_create_answer(answer.clone()).unwrap();
        let reweighted = NewConceptAnswer {
            sort_weight: Some(5.0),
            ..answer
        };
        let again: Upsert<ConceptAnswer> = store.get_or_create_answer(reweighted).unwrap();

        assert!(created.created);
        assert!(!again.created);
        assert_eq!(again.row.sort_weight, Some(1.0));
        assert_eq!(store.answers().len(), 1);
    }
}
