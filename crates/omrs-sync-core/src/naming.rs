//! Source naming directory
//!
//! OCL identifies reference sources by URL-safe ids owned by an organization
//! (`IHTSDO/SNOMED-CT`), while OpenMRS stores a flat display name
//! (`SNOMED CT`). The directory translates between the two and knows which
//! organization owns each source in the catalog.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One known reference source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceEntry {
    /// Organization owning the source in OCL
    #[schemars(description = "OCL organization that owns the source")]
    pub owner: String,

    /// OCL source id
    #[schemars(description = "Source id as used in OCL URLs")]
    pub remote_id: String,

    /// OpenMRS concept_reference_source.name
    #[schemars(description = "Source name in the OpenMRS database")]
    pub local_name: String,
}

impl SourceEntry {
    pub fn new(
        owner: impl Into<String>,
        remote_id: impl Into<String>,
        local_name: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            remote_id: remote_id.into(),
            local_name: local_name.into(),
        }
    }
}

const BUILTIN_SOURCES: &[(&str, &str, &str)] = &[
    ("CIEL", "CIEL", "CIEL"),
    ("WHO", "ICD-10-WHO", "ICD-10-WHO"),
    ("WHO", "ICD-10-WHO-NP", "ICD-10-WHO NP"),
    ("WHO", "ICD-10-WHO-2nd", "ICD-10-WHO 2nd"),
    ("WHO", "ICD-10-WHO-NP2", "ICD-10-WHO NP2"),
    ("WHO", "ICPC2", "ICPC2"),
    ("WHO", "WHOATC", "WHO ATC"),
    ("IHTSDO", "SNOMED-CT", "SNOMED CT"),
    ("IHTSDO", "SNOMED-NP", "SNOMED NP"),
    ("IHTSDO", "SNOMED-MVP", "SNOMED MVP"),
    ("NLM", "RxNORM", "RxNORM"),
    ("NLM", "RxNORM-Comb", "RxNORM Comb"),
    ("Regenstrief", "LOINC", "LOINC"),
    ("HL7", "HL-7-CVX", "HL-7 CVX"),
    ("IMO", "IMO-ProblemIT", "IMO ProblemIT"),
    ("IMO", "IMO-ProcedureIT", "IMO ProcedureIT"),
    ("VA", "NDF-RT-NUI", "NDF-RT NUI"),
    ("MSSO", "MedDRA", "MedDRA"),
    ("PIH", "PIH", "PIH"),
    ("PIH", "PIH-Malawi", "PIH Malawi"),
    ("AMPATH", "AMPATH", "AMPATH"),
    ("MDRTB", "org.openmrs.module.mdrtb", "org.openmrs.module.mdrtb"),
];

/// Bidirectional OCL <-> OpenMRS source name translation
#[derive(Debug, Clone)]
pub struct SourceDirectory {
    entries: Vec<SourceEntry>,
}

impl Default for SourceDirectory {
    fn default() -> Self {
        Self {
            entries: BUILTIN_SOURCES
                .iter()
                .map(|(owner, remote, local)| SourceEntry::new(*owner, *remote, *local))
                .collect(),
        }
    }
}

impl SourceDirectory {
    /// Directory without any entries; every name translates to itself
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add entries on top of the current ones
    ///
    /// An entry replaces any existing entry with the same OCL id or the same
    /// OpenMRS name.
    pub fn with_entries(mut self, entries: impl IntoIterator<Item = SourceEntry>) -> Self {
        for entry in entries {
            self.entries.retain(|existing| {
                existing.remote_id != entry.remote_id && existing.local_name != entry.local_name
            });
            self.entries.push(entry);
        }
        self
    }

    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }

    /// OCL source id -> OpenMRS source name; unknown ids pass through unchanged
    pub fn to_local_name(&self, remote_id: &str) -> String {
        self.entries
            .iter()
            .find(|entry| entry.remote_id == remote_id)
            .map(|entry| entry.local_name.clone())
            .unwrap_or_else(|| remote_id.to_string())
    }

    /// OpenMRS source name -> OCL source id; unknown names pass through unchanged
    pub fn to_remote_name(&self, local_name: &str) -> String {
        self.entries
            .iter()
            .find(|entry| entry.local_name == local_name)
            .map(|entry| entry.remote_id.clone())
            .unwrap_or_else(|| local_name.to_string())
    }

    /// Organization owning an OCL source id
    pub fn owner_of(&self, remote_id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.remote_id == remote_id)
            .map(|entry| entry.owner.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_translation_both_ways() {
        let directory = SourceDirectory::default();
        assert_eq!(directory.to_local_name("SNOMED-CT"), "SNOMED CT");
        assert_eq!(directory.to_remote_name("SNOMED CT"), "SNOMED-CT");
        assert_eq!(directory.owner_of("SNOMED-CT"), Some("IHTSDO"));
    }

    #[test]
    fn test_unknown_names_pass_through() {
        let directory = SourceDirectory::default();
        assert_eq!(directory.to_local_name("Local-Dict"), "Local-Dict");
        assert_eq!(directory.to_remote_name("Local Dict"), "Local Dict");
        assert_eq!(directory.owner_of("Local-Dict"), None);
    }

    #[test]
    fn test_custom_entry_overrides_builtin() {
        let directory = SourceDirectory::default()
            .with_entries([SourceEntry::new("Bahmni", "SNOMED-CT", "SNOMED-CT Bahmni")]);

        assert_eq!(directory.to_local_name("SNOMED-CT"), "SNOMED-CT Bahmni");
        assert_eq!(directory.owner_of("SNOMED-CT"), Some("Bahmni"));
        assert_eq!(directory.to_remote_name("SNOMED CT"), "SNOMED CT");
    }
}
