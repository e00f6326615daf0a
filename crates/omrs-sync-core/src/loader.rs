//! Reference data loader for classes and sources

use crate::context::SyncContext;
use crate::model::{NewConceptClass, NewReferenceSource};
use crate::naming::SourceDirectory;
use crate::records::{ClassRecord, SourceRecord};
use crate::result::Result;
use crate::store::RecordStore;
use tracing::debug;

/// Create every source that is not yet present under its local name
///
/// Existing rows are never updated.
pub fn load_sources<S: RecordStore + ?Sized>(
    store: &mut S,
    directory: &SourceDirectory,
    records: &[SourceRecord],
    context: &mut SyncContext,
) -> Result<()> {
    for record in records {
        let name = directory.to_local_name(&record.name);
        let upsert = store.get_or_create_source(NewReferenceSource {
            name: name.clone(),
            description: record.description.clone(),
            hl7_code: record.hl7.clone(),
            creator: record.creator,
            retired: record.retired,
            retired_by: record.retired_by,
            uuid: record.uuid.clone(),
        })?;
        if upsert.created {
            debug!("Created reference source '{}' ({})", name, record.name);
            context.counters.sources_exported += 1;
        } else {
            debug!("Reference source '{}' already present", name);
        }
    }
    Ok(())
}

/// Create every concept class that is not yet present
pub fn load_classes<S: RecordStore + ?Sized>(
    store: &mut S,
    records: &[ClassRecord],
    context: &mut SyncContext,
) -> Result<()> {
    for record in records {
        let upsert = store.get_or_create_class(NewConceptClass {
            name: record.name.clone(),
            description: record.description.clone(),
            creator: record.creator,
            retired: record.retired,
            retired_by: record.retired_by,
            uuid: record.uuid.clone(),
        })?;
        if upsert.created {
            debug!("Created concept class '{}'", record.name);
            context.counters.classes_exported += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Record, SourceRecord};
    use crate::store::MemoryStore;

    #[test]
    fn test_source_names_are_translated() {
        let record = SourceRecord::parse_line(
            r#"{"name":"SNOMED-CT","description":"SNOMED","creator":1,"retired":false,"retired_by":null,"uuid":"src-1","hl7":null}"#,
        )
        .unwrap();
        let mut store = MemoryStore::with_defaults();
        let mut context = SyncContext::new();

        load_sources(
            &mut store,
            &SourceDirectory::default(),
            &[record],
            &mut context,
        )
        .unwrap();

        assert_eq!(store.sources()[0].name, "SNOMED CT");
        assert_eq!(context.counters.sources_exported, 1);
    }
}
