//! Row types of the OpenMRS concept dictionary
//!
//! These mirror the tables the synchronizer writes to. Rows that the store
//! assigns a surrogate key to come in two flavours: the stored row (with `id`)
//! and a `New*` struct used to create it. Concepts carry an explicit id chosen
//! by the reconciler and therefore have no `New*` counterpart.

use serde::Serialize;
use std::fmt;

/// Name type marking the canonical name of a concept
pub const FULLY_SPECIFIED: &str = "FULLY_SPECIFIED";

/// Datatype whose concepts carry a numeric extension row
pub const NUMERIC_DATATYPE: &str = "Numeric";

/// Durable concept identifier in the target store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ConceptId(pub i64);

impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Concept identifier as found in the OCL export
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ExportId(pub i64);

impl fmt::Display for ExportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConceptClass {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub creator: i64,
    pub retired: bool,
    pub retired_by: Option<i64>,
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewConceptClass {
    pub name: String,
    pub description: Option<String>,
    pub creator: i64,
    pub retired: bool,
    pub retired_by: Option<i64>,
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConceptDatatype {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConceptMapType {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSource {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub hl7_code: Option<String>,
    pub creator: i64,
    pub retired: bool,
    pub retired_by: Option<i64>,
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReferenceSource {
    pub name: String,
    pub description: Option<String>,
    pub hl7_code: Option<String>,
    pub creator: i64,
    pub retired: bool,
    pub retired_by: Option<i64>,
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Concept {
    pub id: ConceptId,
    pub retired: bool,
    pub datatype_id: i64,
    pub class_id: i64,
    pub is_set: bool,
    pub uuid: String,
}

/// Exact-match key used to recognise a name that already exists
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameKey {
    pub name: String,
    pub name_type: Option<String>,
    pub locale: String,
    pub locale_preferred: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConceptName {
    pub id: i64,
    pub concept_id: ConceptId,
    pub name: String,
    pub name_type: Option<String>,
    pub locale: String,
    pub locale_preferred: bool,
    pub uuid: Option<String>,
}

impl ConceptName {
    pub fn key(&self) -> NameKey {
        NameKey {
            name: self.name.clone(),
            name_type: self.name_type.clone(),
            locale: self.locale.clone(),
            locale_preferred: self.locale_preferred,
        }
    }

    pub fn is_fully_specified(&self) -> bool {
        self.name_type.as_deref() == Some(FULLY_SPECIFIED)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewConceptName {
    pub concept_id: ConceptId,
    pub key: NameKey,
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConceptDescription {
    pub id: i64,
    pub concept_id: ConceptId,
    pub description: String,
    pub locale: String,
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewConceptDescription {
    pub concept_id: ConceptId,
    pub description: String,
    pub locale: String,
    pub uuid: Option<String>,
}

/// Numeric extension of a concept, keyed by the concept itself
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConceptNumeric {
    pub concept_id: ConceptId,
    pub hi_absolute: Option<f64>,
    pub hi_critical: Option<f64>,
    pub hi_normal: Option<f64>,
    pub low_absolute: Option<f64>,
    pub low_critical: Option<f64>,
    pub low_normal: Option<f64>,
    pub units: Option<String>,
    pub precise: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTerm {
    pub id: i64,
    pub source_id: i64,
    pub code: String,
    pub retired: bool,
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReferenceTerm {
    pub source_id: i64,
    pub code: String,
    pub retired: bool,
    pub uuid: Option<String>,
}

/// Uniqueness key of a concept reference map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapKey {
    pub concept_id: ConceptId,
    pub term_id: i64,
    pub map_type_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceMap {
    pub id: i64,
    pub key: MapKey,
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReferenceMap {
    pub key: MapKey,
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConceptAnswer {
    pub id: i64,
    pub question: ConceptId,
    pub answer: ConceptId,
    pub sort_weight: Option<f64>,
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewConceptAnswer {
    pub question: ConceptId,
    pub answer: ConceptId,
    pub sort_weight: Option<f64>,
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConceptSet {
    pub id: i64,
    pub owner: ConceptId,
    pub member: ConceptId,
    pub sort_weight: Option<f64>,
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewConceptSet {
    pub owner: ConceptId,
    pub member: ConceptId,
    pub sort_weight: Option<f64>,
    pub uuid: Option<String>,
}
