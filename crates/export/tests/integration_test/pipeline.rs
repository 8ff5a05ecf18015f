//! Tests for the full export pipeline: pagination, column union, CSV output
//! and the early-exit paths.

use std::path::Path;

use config_export::{
    collect_table, export, ExportConfig, ExportError, ExportOutcome, ExportRequest, FlattenOptions,
};

use crate::support::InMemoryService;

fn request(output: &Path) -> ExportRequest {
    let config = ExportConfig {
        output: output.to_path_buf(),
        page_limit: Some(2),
        ..ExportConfig::default()
    };
    ExportRequest::from_config("SELECT resourceId, accountId, tags", &config)
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[tokio::test]
async fn writes_union_of_columns_across_pages() {
    let service = InMemoryService::new(vec![
        (
            vec![
                r#"{"resourceId":"i-1","accountId":"111111111111","tags":[{"key":"Env","value":"prod"}]}"#,
                r#"{"resourceId":"i-2","accountId":"222222222222"}"#,
            ],
            vec!["resourceId", "accountId"],
        ),
        (
            vec![r#"{"resourceId":"i-3","accountId":"333333333333","tags":[{"key":"Owner","value":"ops"}]}"#],
            vec!["resourceId", "accountId"],
        ),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");

    let outcome = export(&service, &request(&path), &FlattenOptions::default())
        .await
        .unwrap();

    let ExportOutcome::Written(summary) = outcome else {
        panic!("expected a written file");
    };
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.columns, 4);
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.collisions, 0);

    let rows = read_rows(&path);
    assert_eq!(rows[0], ["resourceId", "accountId", "Env", "Owner"]);
    assert_eq!(rows[1], ["i-1", "=\"111111111111\"", "prod", ""]);
    assert_eq!(rows[2], ["i-2", "=\"222222222222\"", "", ""]);
    assert_eq!(rows[3], ["i-3", "=\"333333333333\"", "", "ops"]);
    assert!(rows.iter().all(|r| r.len() == 4));

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.starts_with(r#""resourceId","accountId","Env","Owner""#));

    let requests = service.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].next_token, None);
    assert_eq!(requests[1].next_token.as_deref(), Some("page-1"));
    assert!(requests.iter().all(|r| r.limit == Some(2)));
    assert!(requests
        .iter()
        .all(|r| r.aggregator == "aws-controltower-GuardrailsComplianceAggregator"));
}

#[tokio::test]
async fn allow_list_is_applied_per_row() {
    let service = InMemoryService::new(vec![(
        vec![
            r#"{"resourceId":"i-1","tags":[{"key":"Env","value":"prod"},{"key":"Owner","value":"x"}]}"#,
            r#"{"resourceId":"i-2","tags":[{"key":"Owner","value":"y"}]}"#,
        ],
        vec!["resourceId"],
    )]);
    let dir = tempfile::tempdir().unwrap();
    let options = FlattenOptions::from_tag_list(Some("Env"));

    let collected = collect_table(&service, &request(&dir.path().join("r.csv")), &options)
        .await
        .unwrap();

    let columns: Vec<&str> = collected.table.columns().collect();
    assert_eq!(columns, ["resourceId", "Env"]);
    assert!(!collected.table.rows()[1].contains_key("Env"));
}

#[tokio::test]
async fn collisions_are_counted() {
    let service = InMemoryService::new(vec![(
        vec![r#"{"resourceName":"a","tags":[{"key":"resourceName","value":"b"}]}"#],
        vec!["resourceName"],
    )]);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");

    let outcome = export(&service, &request(&path), &FlattenOptions::default())
        .await
        .unwrap();

    match outcome {
        ExportOutcome::Written(summary) => assert_eq!(summary.collisions, 1),
        other => panic!("unexpected outcome: {other:?}"),
    }
    let rows = read_rows(&path);
    assert_eq!(rows[1], ["b"]);
}

#[tokio::test]
async fn empty_result_writes_nothing() {
    let service = InMemoryService::new(vec![(vec![], vec!["resourceId"])]);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");

    let outcome = export(&service, &request(&path), &FlattenOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome, ExportOutcome::NoResults);
    assert!(!path.exists());
}

#[tokio::test]
async fn invalid_query_aborts_without_output() {
    let service = InMemoryService::rejecting();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");

    let err = export(&service, &request(&path), &FlattenOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.invalid_query(), Some("SELECT resourceId, accountId, tags"));
    assert!(!path.exists());
}

#[tokio::test]
async fn malformed_result_is_fatal_and_located() {
    let service = InMemoryService::new(vec![
        (vec![r#"{"configuration":{"instanceType":"t3.micro"}}"#], vec!["configuration.instanceType"]),
        (
            vec![
                r#"{"configuration":{"instanceType":"t3.small"}}"#,
                r#"{"configuration":{}}"#,
            ],
            vec!["configuration.instanceType"],
        ),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");

    let err = export(&service, &request(&path), &FlattenOptions::default())
        .await
        .unwrap_err();

    match err {
        ExportError::MalformedResult { page, index, .. } => {
            assert_eq!(page, 2);
            assert_eq!(index, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!path.exists());
}
