#![cfg(feature = "test-utils")]

use chrono::Utc;
use sentinel_graph::{migrate, DocumentUpsert, GraphClient, GraphWriter};
use sentinel_pipeline::{EntityKind, GeoResult, NormalisedEntity};
use std::collections::HashMap;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::neo4j::Neo4j;

async fn test_client() -> (testcontainers::ContainerAsync<Neo4j>, GraphClient) {
    let container = Neo4j::default().start().await.unwrap();
    let uri = format!(
        "bolt://127.0.0.1:{}",
        container.get_host_port_ipv4(7687).await.unwrap()
    );
    let client = GraphClient::connect(&uri, "neo4j", "password").await.unwrap();
    migrate(&client).await.unwrap();
    (container, client)
}

fn entity(kind: EntityKind, name: &str, occurrences: u32) -> NormalisedEntity {
    NormalisedEntity {
        kind,
        name: name.to_string(),
        occurrences,
        source_spans: Vec::new(),
    }
}

#[tokio::test]
async fn writing_same_document_twice_does_not_duplicate_nodes() {
    let (_container, client) = test_client().await;
    let writer = GraphWriter::new(client.clone());

    let document = DocumentUpsert {
        external_id: "doc-1".to_string(),
        title: "Title".to_string(),
        source_url: None,
        adapter: "feed".to_string(),
        published_at: Some(Utc::now()),
    };
    let entities = vec![entity(EntityKind::Person, "Alice Smith", 1)];
    let geo = HashMap::new();

    writer.write_document(&document, &entities, &geo).await.unwrap();
    writer.write_document(&document, &entities, &geo).await.unwrap();

    let mut result = client
        .inner()
        .execute(neo4rs::query("MATCH (d:Document {external_id: 'doc-1'}) RETURN count(d) AS n"))
        .await
        .unwrap();
    let row = result.next().await.unwrap().unwrap();
    let count: i64 = row.get("n").unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn co_occurs_weight_accumulates_across_documents() {
    let (_container, client) = test_client().await;
    let writer = GraphWriter::new(client.clone());
    let geo = HashMap::new();

    let entities = vec![
        entity(EntityKind::Person, "Bob Jones", 1),
        entity(EntityKind::Organization, "Acme Corp", 1),
    ];

    for i in 0..2 {
        let document = DocumentUpsert {
            external_id: format!("doc-{i}"),
            title: "Title".to_string(),
            source_url: None,
            adapter: "feed".to_string(),
            published_at: Some(Utc::now()),
        };
        writer.write_document(&document, &entities, &geo).await.unwrap();
    }

    let mut result = client
        .inner()
        .execute(neo4rs::query(
            "MATCH (:Person {name: 'Bob Jones'})-[r:CO_OCCURS]-(:Organization {name: 'Acme Corp'}) RETURN r.weight AS w",
        ))
        .await
        .unwrap();
    let row = result.next().await.unwrap().unwrap();
    let weight: i64 = row.get("w").unwrap();
    assert_eq!(weight, 2);
}
