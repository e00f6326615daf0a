//! Shared fixtures for integration tests

#![allow(dead_code)]

use omrs_sync_core::model::{Concept, ConceptId, NameKey, NewConceptClass, NewConceptName};
use omrs_sync_core::{InputFiles, RecordStore};
use std::fs;
use std::path::Path;

pub const SOURCES: &str = r#"{"name":"CIEL","description":"Columbia International eHealth Laboratory","creator":1,"retired":false,"retired_by":null,"uuid":"src-ciel","hl7":null}
{"name":"SNOMED-CT","description":"SNOMED","creator":1,"retired":false,"retired_by":null,"uuid":"src-snomed","hl7":"SCT"}
"#;

pub const CLASSES: &str = r#"{"name":"Diagnosis","description":"Conclusion drawn","creator":1,"retired":false,"retired_by":null,"uuid":"class-diagnosis"}
{"name":"Question","description":"Question","creator":1,"retired":false,"retired_by":null,"uuid":"class-question"}
{"name":"ConvSet","description":"Convenience set","creator":1,"retired":false,"retired_by":null,"uuid":"class-convset"}
"#;

/// One concept line with a single fully specified English name
pub fn concept_line(id: i64, class: &str, datatype: &str, name: &str) -> String {
    format!(
        r#"{{"id":"{id}","concept_class":"{class}","datatype":"{datatype}","names":[{{"name":"{name}","name_type":"FULLY_SPECIFIED","locale":"en","locale_preferred":true,"external_id":"name-{id}"}}],"descriptions":[{{"description":"About {name}","locale":"en","external_id":"desc-{id}"}}],"extras":{{}},"retired":false,"external_id":"concept-{id}"}}"#
    )
}

pub fn internal_mapping(map_type: &str, from: i64, to: i64) -> String {
    format!(
        r#"{{"from_concept_url":"/orgs/CIEL/sources/CIEL/concepts/{from}/","to_concept_url":"/orgs/CIEL/sources/CIEL/concepts/{to}/","map_type":"{map_type}","sort_weight":"1.0","external_id":"map-{from}-{to}","retired":false}}"#
    )
}

pub fn external_mapping(map_type: &str, from: i64, source: &str, code: &str) -> String {
    format!(
        r#"{{"from_concept_url":"/orgs/CIEL/sources/CIEL/concepts/{from}/","to_source_url":"/orgs/IHTSDO/sources/{source}/","to_concept_code":"{code}","map_type":"{map_type}","external_id":"map-{from}-{code}","retired":false}}"#
    )
}

/// Write the given lines as input files into `dir`
pub fn write_inputs(
    dir: &Path,
    concepts: &[String],
    mappings: &[String],
    with_reference_data: bool,
) -> InputFiles {
    let concepts_path = dir.join("concepts.json");
    let mappings_path = dir.join("mappings.json");
    fs::write(&concepts_path, concepts.join("\n")).unwrap();
    fs::write(&mappings_path, mappings.join("\n")).unwrap();

    let mut files = InputFiles {
        concepts: Some(concepts_path),
        mappings: Some(mappings_path),
        ..InputFiles::default()
    };
    if with_reference_data {
        let sources_path = dir.join("sources.json");
        let classes_path = dir.join("classes.json");
        fs::write(&sources_path, SOURCES).unwrap();
        fs::write(&classes_path, CLASSES).unwrap();
        files.sources = Some(sources_path);
        files.classes = Some(classes_path);
    }
    files
}

/// Insert a concept with one fully specified name directly into the store
pub fn seed_concept<S: RecordStore>(store: &mut S, id: i64, name: &str) {
    let class = match store.find_class("Diagnosis").unwrap() {
        Some(class) => class,
        None => store
            .insert_class(NewConceptClass {
                name: "Diagnosis".to_string(),
                description: None,
                creator: 1,
                retired: false,
                retired_by: None,
                uuid: "class-diagnosis".to_string(),
            })
            .unwrap(),
    };
    let datatype = store.find_datatype("N/A").unwrap().unwrap();
    store
        .insert_concept(Concept {
            id: ConceptId(id),
            retired: false,
            datatype_id: datatype.id,
            class_id: class.id,
            is_set: false,
            uuid: format!("seed-{id}"),
        })
        .unwrap();
    store
        .insert_name(NewConceptName {
            concept_id: ConceptId(id),
            key: NameKey {
                name: name.to_string(),
                name_type: Some("FULLY_SPECIFIED".to_string()),
                locale: "en".to_string(),
                locale_preferred: true,
            },
            uuid: None,
        })
        .unwrap();
}
