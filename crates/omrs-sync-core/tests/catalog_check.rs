//! Catalog validation against a mock OCL API

use omrs_sync_core::model::NewReferenceSource;
use omrs_sync_core::{
    CatalogClient, ErrorKind, MemoryStore, RecordStore, SourceDirectory, SourceStatus,
    check_sources,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn add_source(store: &mut MemoryStore, name: &str, retired: bool) {
    store
        .insert_source(NewReferenceSource {
            name: name.to_string(),
            description: None,
            hl7_code: None,
            creator: 1,
            retired,
            retired_by: None,
            uuid: format!("src-{name}"),
        })
        .unwrap();
}

#[tokio::test]
async fn test_known_sources_pass() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/orgs/IHTSDO/sources/SNOMED-CT/"))
        .and(header("Authorization", "Token secret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut store = MemoryStore::with_defaults();
    add_source(&mut store, "SNOMED CT", false);
    add_source(&mut store, "LOINC", true);

    let client = CatalogClient::new(server.uri(), Some("secret".to_string())).unwrap();
    let checks = check_sources(&store, &SourceDirectory::default(), &client)
        .await
        .unwrap();

    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].remote_id, "SNOMED-CT");
    assert_eq!(checks[0].owner, "IHTSDO");
    assert_eq!(checks[0].status, SourceStatus::Found);
}

#[tokio::test]
async fn test_missing_remote_source_fails() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut store = MemoryStore::with_defaults();
    add_source(&mut store, "CIEL", false);

    let client = CatalogClient::new(server.uri(), Some("secret".to_string())).unwrap();
    let err = check_sources(&store, &SourceDirectory::default(), &client)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnrecognizedSource);
}

#[tokio::test]
async fn test_source_without_owner_fails() {
    let server = MockServer::start().await;
    let mut store = MemoryStore::with_defaults();
    add_source(&mut store, "Local Codes", false);

    let client = CatalogClient::new(server.uri(), Some("secret".to_string())).unwrap();
    let err = check_sources(&store, &SourceDirectory::default(), &client)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnrecognizedSource);
    assert!(err.to_string().contains("Local Codes"));
}

#[tokio::test]
async fn test_without_token_nothing_is_requested() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut store = MemoryStore::with_defaults();
    add_source(&mut store, "CIEL", false);

    let client = CatalogClient::new(server.uri(), None).unwrap();
    let checks = check_sources(&store, &SourceDirectory::default(), &client)
        .await
        .unwrap();

    assert_eq!(checks[0].status, SourceStatus::Unchecked);
}
