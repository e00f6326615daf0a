//! Run orchestration
//!
//! A run loads sources, then classes, then reconciles every concept, and only
//! then resolves mappings, so that every mapping endpoint is already in the
//! translation table. The first error aborts the run; rows written before it
//! stay in the store.

use crate::context::SyncContext;
use crate::error::SyncError;
use crate::loader::{load_classes, load_sources};
use crate::model::ExportId;
use crate::naming::SourceDirectory;
use crate::records::{
    ClassRecord, ConceptRecord, MappingRecord, MappingTarget, SourceRecord, read_records,
};
use crate::reconcile::reconcile_concept;
use crate::resolve::resolve_mapping;
use crate::result::Result;
use crate::store::RecordStore;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Progress reporting callback type
pub type ProgressCallback = Arc<dyn Fn(ProgressInfo) + Send + Sync>;

/// Stage of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Sources,
    Classes,
    Concepts,
    Mappings,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncPhase::Sources => "sources",
            SyncPhase::Classes => "classes",
            SyncPhase::Concepts => "concepts",
            SyncPhase::Mappings => "mappings",
        };
        f.write_str(label)
    }
}

/// Information about run progress
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    pub phase: SyncPhase,
    /// Records of this phase handled so far
    pub completed: usize,
    /// Records of this phase in total
    pub total: usize,
}

impl ProgressInfo {
    /// Completion of the current phase (0.0 to 1.0)
    pub fn completion_percentage(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Paths of the input files; any of them may be omitted
#[derive(Debug, Clone, Default)]
pub struct InputFiles {
    pub concepts: Option<PathBuf>,
    pub mappings: Option<PathBuf>,
    pub sources: Option<PathBuf>,
    pub classes: Option<PathBuf>,
}

impl InputFiles {
    pub fn is_empty(&self) -> bool {
        self.concepts.is_none()
            && self.mappings.is_none()
            && self.sources.is_none()
            && self.classes.is_none()
    }
}

/// Parsed records of one run
#[derive(Debug, Clone, Default)]
pub struct SyncInput {
    pub concepts: Vec<ConceptRecord>,
    pub mappings: Vec<MappingRecord>,
    pub sources: Vec<SourceRecord>,
    pub classes: Vec<ClassRecord>,
}

impl SyncInput {
    /// Read and validate every given file
    pub fn load(files: &InputFiles) -> Result<Self> {
        Ok(Self {
            concepts: read_optional(files.concepts.as_ref())?,
            mappings: read_optional(files.mappings.as_ref())?,
            sources: read_optional(files.sources.as_ref())?,
            classes: read_optional(files.classes.as_ref())?,
        })
    }
}

fn read_optional<R: crate::records::Record>(path: Option<&PathBuf>) -> Result<Vec<R>> {
    match path {
        Some(path) => read_records(path),
        None => Ok(Vec::new()),
    }
}

/// Dictionary being imported, as named in the OCL catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryRef {
    pub org_id: String,
    pub source_id: String,
}

/// Run options
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Only reconcile the concept with this incoming id and the concepts its
    /// internal mappings point to
    pub concept_filter: Option<ExportId>,
    pub dictionary: Option<DictionaryRef>,
}

/// A retired concept of the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetiredConcept {
    pub id: ExportId,
    pub name: Option<String>,
}

/// Retired concepts of the input, in file order
pub fn retired_concepts(concepts: &[ConceptRecord]) -> Vec<RetiredConcept> {
    concepts
        .iter()
        .filter(|concept| concept.retired)
        .map(|concept| RetiredConcept {
            id: concept.id,
            name: concept.display_name().map(str::to_string),
        })
        .collect()
}

/// Drives one synchronization run against a record store
pub struct Synchronizer<'a, S: RecordStore + ?Sized> {
    store: &'a mut S,
    directory: &'a SourceDirectory,
    options: SyncOptions,
    progress_callback: Option<ProgressCallback>,
}

impl<'a, S: RecordStore + ?Sized> Synchronizer<'a, S> {
    pub fn new(store: &'a mut S, directory: &'a SourceDirectory) -> Self {
        Self {
            store,
            directory,
            options: SyncOptions::default(),
            progress_callback: None,
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Set progress callback
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn report_progress(&self, phase: SyncPhase, completed: usize, total: usize) {
        if let Some(ref callback) = self.progress_callback {
            callback(ProgressInfo {
                phase,
                completed,
                total,
            });
        }
    }

    /// Run every phase and return the final context
    pub fn run(&mut self, input: &SyncInput) -> Result<SyncContext> {
        let mut context = SyncContext::new();
        if let Some(dictionary) = &self.options.dictionary {
            info!(
                "Importing dictionary {}/{}",
                dictionary.org_id, dictionary.source_id
            );
        }

        if !input.sources.is_empty() {
            info!("Loading {} reference sources", input.sources.len());
            load_sources(&mut *self.store, self.directory, &input.sources, &mut context)?;
            self.report_progress(SyncPhase::Sources, input.sources.len(), input.sources.len());
        }
        if !input.classes.is_empty() {
            info!("Loading {} concept classes", input.classes.len());
            load_classes(&mut *self.store, &input.classes, &mut context)?;
            self.report_progress(SyncPhase::Classes, input.classes.len(), input.classes.len());
        }

        let mappings: Vec<&MappingRecord> = match self.options.concept_filter {
            Some(id) => input
                .mappings
                .iter()
                .filter(|mapping| mapping.from.concept == id)
                .collect(),
            None => input.mappings.iter().collect(),
        };
        let concepts = self.selected_concepts(input, &mappings)?;
        info!("Reconciling {} concepts", concepts.len());
        for (index, concept) in concepts.iter().enumerate() {
            reconcile_concept(&mut *self.store, concept, &mut context)?;
            self.report_progress(SyncPhase::Concepts, index + 1, concepts.len());
        }

        info!("Resolving {} mappings", mappings.len());
        for (index, mapping) in mappings.iter().enumerate() {
            resolve_mapping(&mut *self.store, self.directory, mapping, &mut context)?;
            self.report_progress(SyncPhase::Mappings, index + 1, mappings.len());
        }

        info!(
            "Synchronized {} concepts and {} mappings",
            context.counters.concepts_exported,
            context.counters.mappings_exported()
        );
        Ok(context)
    }

    /// Concepts to reconcile; with a filter, the filtered concept plus the
    /// internal targets of its mappings, in file order
    fn selected_concepts<'i>(
        &self,
        input: &'i SyncInput,
        mappings: &[&MappingRecord],
    ) -> Result<Vec<&'i ConceptRecord>> {
        let Some(id) = self.options.concept_filter else {
            return Ok(input.concepts.iter().collect());
        };
        if !input.concepts.iter().any(|concept| concept.id == id) {
            return Err(SyncError::ConceptNotFound { id: id.0 });
        }

        let mut wanted: HashSet<ExportId> = mappings
            .iter()
            .filter_map(|mapping| match &mapping.target {
                MappingTarget::Internal { to, .. } => Some(to.concept),
                MappingTarget::External { .. } => None,
            })
            .collect();
        wanted.insert(id);
        Ok(input
            .concepts
            .iter()
            .filter(|concept| wanted.contains(&concept.id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Record;

    #[test]
    fn test_progress_info_completion_percentage() {
        let progress = ProgressInfo {
            phase: SyncPhase::Concepts,
            completed: 25,
            total: 100,
        };
        assert_eq!(progress.completion_percentage(), 0.25);

        let empty = ProgressInfo {
            phase: SyncPhase::Mappings,
            completed: 0,
            total: 0,
        };
        assert_eq!(empty.completion_percentage(), 1.0);
    }

    #[test]
    fn test_retired_concepts_listing() {
        let concepts: Vec<ConceptRecord> = [
            r#"{"id":1,"concept_class":"Misc","datatype":"N/A","names":[{"name":"Old","name_type":"FULLY_SPECIFIED","locale":"en"}],"retired":true,"external_id":"a"}"#,
            r#"{"id":2,"concept_class":"Misc","datatype":"N/A","names":[],"retired":false,"external_id":"b"}"#,
        ]
        .iter()
        .map(|line| ConceptRecord::parse_line(line).unwrap())
        .collect();

        let retired = retired_concepts(&concepts);
        assert_eq!(
            retired,
            vec![RetiredConcept {
                id: ExportId(1),
                name: Some("Old".to_string())
            }]
        );
    }
}
