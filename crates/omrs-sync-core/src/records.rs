//! Typed records of the OCL JSON-lines export
//!
//! Every input file is parsed once, at the ingestion boundary, into the structs
//! below. Anything that does not fit the schema surfaces as a single
//! [`SyncError::MalformedRecord`] pointing at the file and line, so the
//! reconciliation code never has to probe loosely typed JSON.
//!
//! OCL exports are not strict about scalar types: ids arrive as strings or
//! numbers, flags as booleans or `0`/`1`, sort weights as `"1.0"` or `1.0`. The
//! `de` helpers accept all of those spellings.

use crate::error::SyncError;
use crate::model::{ConceptId, ConceptNumeric, ExportId, FULLY_SPECIFIED, NUMERIC_DATATYPE, NameKey};
use crate::result::Result;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Position of the source id in a slash-delimited OCL URL
pub const SOURCE_SEGMENT: usize = 4;

/// Position of the concept id in a slash-delimited OCL concept URL
pub const CONCEPT_SEGMENT: usize = 6;

/// The four independent input files of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Concept,
    Mapping,
    Source,
    Class,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecordKind::Concept => "concept",
            RecordKind::Mapping => "mapping",
            RecordKind::Source => "source",
            RecordKind::Class => "class",
        };
        f.write_str(label)
    }
}

/// A record type that can be parsed from one JSON line
pub trait Record: Sized {
    const KIND: RecordKind;

    fn parse_line(line: &str) -> std::result::Result<Self, String>;
}

/// Parse every non-blank line of `content` as a record
///
/// `origin` is only used to label errors.
pub fn parse_records<R: Record>(origin: &Path, content: &str) -> Result<Vec<R>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            R::parse_line(line).map_err(|message| SyncError::malformed(origin, index + 1, message))
        })
        .collect()
}

/// Read a JSON-lines file into typed records
pub fn read_records<R: Record>(path: &Path) -> Result<Vec<R>> {
    let content = fs::read_to_string(path).map_err(|e| SyncError::io_error(path, e))?;
    let records = parse_records::<R>(path, &content)?;
    debug!(
        "Loaded {} {} records from {}",
        records.len(),
        R::KIND,
        path.display()
    );
    Ok(records)
}

/// One concept of the export
#[derive(Debug, Clone, Deserialize)]
pub struct ConceptRecord {
    #[serde(deserialize_with = "de::export_id")]
    pub id: ExportId,
    pub concept_class: String,
    pub datatype: String,
    pub names: Vec<NameRecord>,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub descriptions: Vec<DescriptionRecord>,
    #[serde(default)]
    pub extras: Option<ConceptExtras>,
    #[serde(default, deserialize_with = "de::flexible_bool")]
    pub retired: bool,
    pub external_id: String,
}

impl ConceptRecord {
    pub fn is_set(&self) -> bool {
        self.extras.as_ref().is_some_and(|extras| extras.is_set)
    }

    /// Numeric extension for `Numeric` concepts, built from the extras
    pub fn numeric(&self, concept_id: ConceptId) -> Option<ConceptNumeric> {
        if self.datatype != NUMERIC_DATATYPE {
            return None;
        }
        let extras = self.extras.clone().unwrap_or_default();
        Some(ConceptNumeric {
            concept_id,
            hi_absolute: extras.hi_absolute,
            hi_critical: extras.hi_critical,
            hi_normal: extras.hi_normal,
            low_absolute: extras.low_absolute,
            low_critical: extras.low_critical,
            low_normal: extras.low_normal,
            units: extras.units,
            precise: extras.precise,
        })
    }

    /// The fully specified name, falling back to the first name
    pub fn display_name(&self) -> Option<&str> {
        self.names
            .iter()
            .find(|name| name.name_type.as_deref() == Some(FULLY_SPECIFIED))
            .or_else(|| self.names.first())
            .map(|name| name.name.as_str())
    }
}

impl Record for ConceptRecord {
    const KIND: RecordKind = RecordKind::Concept;

    fn parse_line(line: &str) -> std::result::Result<Self, String> {
        serde_json::from_str(line).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameRecord {
    pub name: String,
    #[serde(default)]
    pub name_type: Option<String>,
    pub locale: String,
    #[serde(default, deserialize_with = "de::flexible_bool")]
    pub locale_preferred: bool,
    #[serde(default)]
    pub external_id: Option<String>,
}

impl NameRecord {
    pub fn key(&self) -> NameKey {
        NameKey {
            name: self.name.clone(),
            name_type: self.name_type.clone(),
            locale: self.locale.clone(),
            locale_preferred: self.locale_preferred,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DescriptionRecord {
    pub description: String,
    pub locale: String,
    #[serde(default)]
    pub description_type: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

/// Free-form `extras` of a concept; only the keys below are consumed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConceptExtras {
    #[serde(default, deserialize_with = "de::flexible_bool")]
    pub is_set: bool,
    #[serde(default, deserialize_with = "de::optional_f64")]
    pub hi_absolute: Option<f64>,
    #[serde(default, deserialize_with = "de::optional_f64")]
    pub hi_critical: Option<f64>,
    #[serde(default, deserialize_with = "de::optional_f64")]
    pub hi_normal: Option<f64>,
    #[serde(default, deserialize_with = "de::optional_f64")]
    pub low_absolute: Option<f64>,
    #[serde(default, deserialize_with = "de::optional_f64")]
    pub low_critical: Option<f64>,
    #[serde(default, deserialize_with = "de::optional_f64")]
    pub low_normal: Option<f64>,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default, deserialize_with = "de::flexible_bool")]
    pub precise: bool,
}

/// A reference source of the export
#[derive(Debug, Clone, Deserialize)]
pub struct SourceRecord {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "de::required_i64")]
    pub creator: i64,
    #[serde(default, deserialize_with = "de::flexible_bool")]
    pub retired: bool,
    #[serde(default, deserialize_with = "de::optional_i64")]
    pub retired_by: Option<i64>,
    pub uuid: String,
    #[serde(default)]
    pub hl7: Option<String>,
}

impl Record for SourceRecord {
    const KIND: RecordKind = RecordKind::Source;

    fn parse_line(line: &str) -> std::result::Result<Self, String> {
        serde_json::from_str(line).map_err(|e| e.to_string())
    }
}

/// A concept class of the export
#[derive(Debug, Clone, Deserialize)]
pub struct ClassRecord {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "de::required_i64")]
    pub creator: i64,
    #[serde(default, deserialize_with = "de::flexible_bool")]
    pub retired: bool,
    #[serde(default, deserialize_with = "de::optional_i64")]
    pub retired_by: Option<i64>,
    pub uuid: String,
}

impl Record for ClassRecord {
    const KIND: RecordKind = RecordKind::Class;

    fn parse_line(line: &str) -> std::result::Result<Self, String> {
        serde_json::from_str(line).map_err(|e| e.to_string())
    }
}

/// A concept reference parsed out of an OCL URL
///
/// `/orgs/CIEL/sources/CIEL/concepts/1065/` yields source `CIEL` and
/// concept `1065`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptUrl {
    pub url: String,
    pub source: String,
    pub concept: ExportId,
}

impl ConceptUrl {
    pub fn parse(url: &str) -> std::result::Result<Self, String> {
        let source = url_segment(url, SOURCE_SEGMENT)?;
        let concept = url_segment(url, CONCEPT_SEGMENT)?;
        let concept = concept
            .parse::<i64>()
            .map_err(|_| format!("concept id '{concept}' in '{url}' is not numeric"))?;
        Ok(Self {
            url: url.to_string(),
            source: source.to_string(),
            concept: ExportId(concept),
        })
    }
}

fn url_segment(url: &str, position: usize) -> std::result::Result<&str, String> {
    url.split('/')
        .nth(position)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| format!("'{url}' has no segment at position {position}"))
}

/// Where a mapping points to
#[derive(Debug, Clone, PartialEq)]
pub enum MappingTarget {
    /// A code in another terminology
    External {
        source: String,
        code: String,
        ref_term: Option<String>,
    },
    /// Another concept of the same dictionary
    Internal {
        to: ConceptUrl,
        ref_map: Option<String>,
    },
}

/// One mapping of the export
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRecord {
    pub from: ConceptUrl,
    pub map_type: String,
    pub sort_weight: Option<f64>,
    pub external_id: Option<String>,
    pub retired: bool,
    pub target: MappingTarget,
}

impl MappingRecord {
    pub fn is_external(&self) -> bool {
        matches!(self.target, MappingTarget::External { .. })
    }
}

#[derive(Debug, Deserialize)]
struct RawMapping {
    from_concept_url: String,
    #[serde(default)]
    to_source_url: Option<String>,
    #[serde(default, deserialize_with = "de::optional_text")]
    to_concept_code: Option<String>,
    #[serde(default)]
    to_concept_url: Option<String>,
    map_type: String,
    #[serde(default, deserialize_with = "de::optional_f64")]
    sort_weight: Option<f64>,
    #[serde(default)]
    external_id: Option<String>,
    #[serde(default, deserialize_with = "de::flexible_bool")]
    retired: bool,
    #[serde(default)]
    ref_term: Option<String>,
    #[serde(default)]
    ref_m: Option<String>,
}

impl TryFrom<RawMapping> for MappingRecord {
    type Error = String;

    fn try_from(raw: RawMapping) -> std::result::Result<Self, Self::Error> {
        let from = ConceptUrl::parse(&raw.from_concept_url)?;
        let target = match (raw.to_source_url, raw.to_concept_url) {
            (Some(source_url), _) => MappingTarget::External {
                source: url_segment(&source_url, SOURCE_SEGMENT)?.to_string(),
                code: raw
                    .to_concept_code
                    .ok_or("external mapping without `to_concept_code`")?,
                ref_term: raw.ref_term,
            },
            (None, Some(concept_url)) => MappingTarget::Internal {
                to: ConceptUrl::parse(&concept_url)?,
                ref_map: raw.ref_m,
            },
            (None, None) => {
                return Err("mapping has neither `to_source_url` nor `to_concept_url`".into());
            }
        };
        Ok(Self {
            from,
            map_type: raw.map_type,
            sort_weight: raw.sort_weight,
            external_id: raw.external_id,
            retired: raw.retired,
            target,
        })
    }
}

impl Record for MappingRecord {
    const KIND: RecordKind = RecordKind::Mapping;

    fn parse_line(line: &str) -> std::result::Result<Self, String> {
        let raw: RawMapping = serde_json::from_str(line).map_err(|e| e.to_string())?;
        MappingRecord::try_from(raw)
    }
}

mod de {
    use crate::model::ExportId;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Bool(bool),
        Int(i64),
        Float(f64),
        Text(String),
    }

    impl Scalar {
        fn as_bool(&self) -> Option<bool> {
            match self {
                Scalar::Bool(value) => Some(*value),
                Scalar::Int(value) => Some(*value != 0),
                Scalar::Float(value) => Some(*value != 0.0),
                Scalar::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Some(true),
                    "false" | "0" | "" => Some(false),
                    _ => None,
                },
            }
        }

        fn as_i64(&self) -> Option<i64> {
            match self {
                Scalar::Int(value) => Some(*value),
                Scalar::Float(value) if value.fract() == 0.0 => Some(*value as i64),
                Scalar::Text(text) => text.trim().parse().ok(),
                _ => None,
            }
        }

        fn as_f64(&self) -> Option<f64> {
            match self {
                Scalar::Int(value) => Some(*value as f64),
                Scalar::Float(value) => Some(*value),
                Scalar::Text(text) => text.trim().parse().ok(),
                Scalar::Bool(_) => None,
            }
        }

        fn into_text(self) -> String {
            match self {
                Scalar::Bool(value) => value.to_string(),
                Scalar::Int(value) => value.to_string(),
                Scalar::Float(value) => value.to_string(),
                Scalar::Text(text) => text,
            }
        }
    }

    pub fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Option::<Scalar>::deserialize(deserializer)? {
            None => Ok(false),
            Some(value) => value
                .as_bool()
                .ok_or_else(|| D::Error::custom("expected a boolean flag")),
        }
    }

    pub fn optional_i64<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i64>, D::Error> {
        match Option::<Scalar>::deserialize(deserializer)? {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| D::Error::custom("expected an integer")),
        }
    }

    pub fn required_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        optional_i64(deserializer)?.ok_or_else(|| D::Error::custom("expected an integer, got null"))
    }

    pub fn optional_f64<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<f64>, D::Error> {
        match Option::<Scalar>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Scalar::Text(text)) if text.trim().is_empty() => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| D::Error::custom("expected a number")),
        }
    }

    pub fn optional_text<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(Option::<Scalar>::deserialize(deserializer)?.map(Scalar::into_text))
    }

    pub fn export_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ExportId, D::Error> {
        required_i64(deserializer).map(ExportId)
    }

    pub fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
    }
}
