//! Record store abstraction
//!
//! The synchronizer only needs a handful of primitive operations per entity
//! family: look a row up by its natural key, and insert a row. The
//! "get-or-create" operations built on top of them are provided methods of
//! [`RecordStore`], so every backend gets the same check-then-create
//! semantics and reports whether a row was actually written.
//!
//! Check-then-create is not atomic. Two concurrent runs against the same
//! database may both insert; a run is expected to be the only writer.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::model::{
    Concept, ConceptAnswer, ConceptClass, ConceptDatatype, ConceptDescription, ConceptId,
    ConceptMapType, ConceptName, ConceptNumeric, ConceptSet, MapKey, NameKey, NewConceptAnswer,
    NewConceptClass, NewConceptDescription, NewConceptName, NewConceptSet, NewReferenceMap,
    NewReferenceSource, NewReferenceTerm, ReferenceMap, ReferenceSource, ReferenceTerm,
};
use crate::result::Result;

/// Datatypes every OpenMRS dictionary ships with
pub const DEFAULT_DATATYPES: &[&str] = &[
    "Numeric",
    "Coded",
    "Text",
    "N/A",
    "Document",
    "Date",
    "Time",
    "Datetime",
    "Boolean",
    "Rule",
    "Structured Numeric",
    "Complex",
];

/// Map types every OpenMRS dictionary ships with
pub const DEFAULT_MAP_TYPES: &[&str] = &[
    "SAME-AS",
    "NARROWER-THAN",
    "BROADER-THAN",
    "Associated finding",
    "Associated morphology",
    "Associated procedure",
    "Associated with",
    "Causative agent",
    "Finding site",
    "Has specimen",
    "Laterality",
    "Severity",
    "Site of metastasis",
    "Is a",
    "May be a",
    "MAPS-TO",
];

/// Outcome of a get-or-create call
#[derive(Debug, Clone, PartialEq)]
pub struct Upsert<T> {
    pub row: T,
    pub created: bool,
}

impl<T> Upsert<T> {
    pub fn existing(row: T) -> Self {
        Self {
            row,
            created: false,
        }
    }

    pub fn created(row: T) -> Self {
        Self { row, created: true }
    }
}

/// Persistence operations needed by the synchronizer
pub trait RecordStore {
    fn find_class(&self, name: &str) -> Result<Option<ConceptClass>>;
    fn insert_class(&mut self, class: NewConceptClass) -> Result<ConceptClass>;

    fn find_datatype(&self, name: &str) -> Result<Option<ConceptDatatype>>;
    fn find_map_type(&self, name: &str) -> Result<Option<ConceptMapType>>;

    fn find_source(&self, name: &str) -> Result<Option<ReferenceSource>>;
    fn insert_source(&mut self, source: NewReferenceSource) -> Result<ReferenceSource>;
    fn list_sources(&self) -> Result<Vec<ReferenceSource>>;

    fn get_concept(&self, id: ConceptId) -> Result<Option<Concept>>;
    fn max_concept_id(&self) -> Result<Option<ConceptId>>;
    fn insert_concept(&mut self, concept: Concept) -> Result<Concept>;

    /// All names matching the key exactly, in insertion order
    fn find_names(&self, key: &NameKey) -> Result<Vec<ConceptName>>;
    fn insert_name(&mut self, name: NewConceptName) -> Result<ConceptName>;

    fn find_description(
        &self,
        concept_id: ConceptId,
        description: &str,
        uuid: Option<&str>,
    ) -> Result<Option<ConceptDescription>>;
    fn insert_description(
        &mut self,
        description: NewConceptDescription,
    ) -> Result<ConceptDescription>;

    fn find_numeric(&self, concept_id: ConceptId) -> Result<Option<ConceptNumeric>>;
    fn insert_numeric(&mut self, numeric: ConceptNumeric) -> Result<ConceptNumeric>;

    fn find_term(&self, source_id: i64, code: &str) -> Result<Option<ReferenceTerm>>;
    fn find_term_by_uuid(&self, uuid: &str) -> Result<Option<ReferenceTerm>>;
    fn insert_term(&mut self, term: NewReferenceTerm) -> Result<ReferenceTerm>;

    fn find_map(&self, key: &MapKey) -> Result<Option<ReferenceMap>>;
    fn insert_map(&mut self, map: NewReferenceMap) -> Result<ReferenceMap>;

    fn find_answer(&self, question: ConceptId, answer: ConceptId)
    -> Result<Option<ConceptAnswer>>;
    fn insert_answer(&mut self, answer: NewConceptAnswer) -> Result<ConceptAnswer>;

    fn find_set_member(&self, owner: ConceptId, member: ConceptId) -> Result<Option<ConceptSet>>;
    fn insert_set_member(&mut self, member: NewConceptSet) -> Result<ConceptSet>;

    fn get_or_create_class(&mut self, class: NewConceptClass) -> Result<Upsert<ConceptClass>> {
        if let Some(row) = self.find_class(&class.name)? {
            return Ok(Upsert::existing(row));
        }
        self.insert_class(class).map(Upsert::created)
    }

    fn get_or_create_source(
        &mut self,
        source: NewReferenceSource,
    ) -> Result<Upsert<ReferenceSource>> {
        if let Some(row) = self.find_source(&source.name)? {
            return Ok(Upsert::existing(row));
        }
        self.insert_source(source).map(Upsert::created)
    }

    /// Names are matched globally on their full key, not per concept
    fn get_or_create_name(&mut self, name: NewConceptName) -> Result<Upsert<ConceptName>> {
        if let Some(row) = self.find_names(&name.key)?.into_iter().next() {
            return Ok(Upsert::existing(row));
        }
        self.insert_name(name).map(Upsert::created)
    }

    fn get_or_create_description(
        &mut self,
        description: NewConceptDescription,
    ) -> Result<Upsert<ConceptDescription>> {
        if let Some(row) = self.find_description(
            description.concept_id,
            &description.description,
            description.uuid.as_deref(),
        )? {
            return Ok(Upsert::existing(row));
        }
        self.insert_description(description).map(Upsert::created)
    }

    fn get_or_create_numeric(&mut self, numeric: ConceptNumeric) -> Result<Upsert<ConceptNumeric>> {
        if let Some(row) = self.find_numeric(numeric.concept_id)? {
            return Ok(Upsert::existing(row));
        }
        self.insert_numeric(numeric).map(Upsert::created)
    }

    fn get_or_create_term(&mut self, term: NewReferenceTerm) -> Result<Upsert<ReferenceTerm>> {
        if let Some(row) = self.find_term(term.source_id, &term.code)? {
            return Ok(Upsert::existing(row));
        }
        self.insert_term(term).map(Upsert::created)
    }

    fn get_or_create_map(&mut self, map: NewReferenceMap) -> Result<Upsert<ReferenceMap>> {
        if let Some(row) = self.find_map(&map.key)? {
            return Ok(Upsert::existing(row));
        }
        self.insert_map(map).map(Upsert::created)
    }

    fn get_or_create_answer(&mut self, answer: NewConceptAnswer) -> Result<Upsert<ConceptAnswer>> {
        if let Some(row) = self.find_answer(answer.question, answer.answer)? {
            return Ok(Upsert::existing(row));
        }
        self.insert_answer(answer).map(Upsert::created)
    }

    fn get_or_create_set_member(&mut self, member: NewConceptSet) -> Result<Upsert<ConceptSet>> {
        if let Some(row) = self.find_set_member(member.owner, member.member)? {
            return Ok(Upsert::existing(row));
        }
        self.insert_set_member(member).map(Upsert::created)
    }
}
