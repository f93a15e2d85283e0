use chrono::{DateTime, Utc};
use neo4rs::query;
use sentinel_pipeline::{EntityKind, GeoResult, NormalisedEntity};
use tracing::debug;

use crate::GraphClient;

/// The fields upserted onto the `Document` node, per §4.8 step 1.
pub struct DocumentUpsert {
    pub external_id: String,
    pub title: String,
    pub source_url: Option<String>,
    pub adapter: String,
    pub published_at: Option<DateTime<Utc>>,
}

fn node_label(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Person => "Person",
        EntityKind::Organization => "Organization",
        EntityKind::Location => "Location",
    }
}

/// The `type` property value stored on an entity node, per §6.
fn entity_type(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Person => "person",
        EntityKind::Organization => "organization",
        EntityKind::Location => "location",
    }
}

/// Canonical orientation for a `CO_OCCURS` pair, avoiding duplicate edges
/// for the same unordered pair, per §4.8 step 4.
fn canonical_pair<'a>(
    a: (&'a str, &'a str),
    b: (&'a str, &'a str),
) -> ((&'a str, &'a str), (&'a str, &'a str)) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Idempotent upsert of document nodes, entity nodes, mention edges, and
/// pairwise co-occurrence edges, per §4.8.
pub struct GraphWriter {
    client: GraphClient,
}

impl GraphWriter {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Perform the full per-document write transaction described in §4.8,
    /// steps 1 through 4, in order.
    pub async fn write_document(
        &self,
        document: &DocumentUpsert,
        entities: &[NormalisedEntity],
        geo: &std::collections::HashMap<String, GeoResult>,
    ) -> Result<(), neo4rs::Error> {
        self.upsert_document(document).await?;

        for entity in entities {
            let geocode = if entity.kind == EntityKind::Location {
                geo.get(&entity.name)
            } else {
                None
            };
            self.upsert_entity(entity.kind, &entity.name, entity.occurrences, geocode)
                .await?;
            self.upsert_mentioned_in(entity.kind, &entity.name, &document.external_id, entity.occurrences)
                .await?;
        }

        for i in 0..entities.len() {
            for j in (i + 1)..entities.len() {
                let a = (node_label(entities[i].kind), entities[i].name.as_str());
                let b = (node_label(entities[j].kind), entities[j].name.as_str());
                if a == b {
                    continue;
                }
                let (lo, hi) = canonical_pair(a, b);
                self.upsert_co_occurs(lo, hi).await?;
            }
        }

        Ok(())
    }

    /// §4.8 step 1: upsert Document by `external_id`.
    async fn upsert_document(&self, document: &DocumentUpsert) -> Result<(), neo4rs::Error> {
        let q = query(
            r#"
            MERGE (d:Document {external_id: $external_id})
            SET d.title = $title,
                d.source_url = $source_url,
                d.adapter = $adapter,
                d.published_at = $published_at
            "#,
        )
        .param("external_id", document.external_id.clone())
        .param("title", document.title.clone())
        .param("source_url", document.source_url.clone().unwrap_or_default())
        .param("adapter", document.adapter.clone())
        .param(
            "published_at",
            document.published_at.map(|d| d.to_rfc3339()).unwrap_or_default(),
        );
        self.client.inner().run(q).await
    }

    /// §4.8 step 2: upsert an entity node by `(kind, canonical_name)`,
    /// accumulating `occurrences`, overwriting geocode fields when present.
    async fn upsert_entity(
        &self,
        kind: EntityKind,
        name: &str,
        occurrences_delta: u32,
        geo: Option<&GeoResult>,
    ) -> Result<(), neo4rs::Error> {
        let label = node_label(kind);
        let base = format!(
            r#"
            MERGE (e:{label} {{name: $name}})
            ON CREATE SET e.occurrences = $delta
            ON MATCH SET e.occurrences = COALESCE(e.occurrences, 0) + $delta
            SET e.type = $type
            "#
        );

        let q = if let Some(geo) = geo {
            let cypher = format!(
                "{base} SET e.latitude = $latitude, e.longitude = $longitude, e.country = $country, e.region = $region"
            );
            query(&cypher)
                .param("name", name.to_string())
                .param("delta", occurrences_delta as i64)
                .param("type", entity_type(kind))
                .param("latitude", geo.latitude)
                .param("longitude", geo.longitude)
                .param("country", geo.country.clone().unwrap_or_default())
                .param("region", geo.region.clone().unwrap_or_default())
        } else {
            query(&base)
                .param("name", name.to_string())
                .param("delta", occurrences_delta as i64)
                .param("type", entity_type(kind))
        };

        self.client.inner().run(q).await
    }

    /// §4.8 step 3: upsert `MENTIONED_IN`, overwriting the doc-local count.
    async fn upsert_mentioned_in(
        &self,
        kind: EntityKind,
        name: &str,
        document_external_id: &str,
        occurrences: u32,
    ) -> Result<(), neo4rs::Error> {
        let label = node_label(kind);
        let cypher = format!(
            r#"
            MATCH (e:{label} {{name: $name}})
            MATCH (d:Document {{external_id: $external_id}})
            MERGE (e)-[r:MENTIONED_IN]->(d)
            SET r.occurrences = $occurrences
            "#
        );
        let q = query(&cypher)
            .param("name", name.to_string())
            .param("external_id", document_external_id.to_string())
            .param("occurrences", occurrences as i64);
        self.client.inner().run(q).await
    }

    /// §4.8 step 4: upsert `CO_OCCURS`, accumulating `weight` and bumping
    /// `last_seen`. `lo`/`hi` are already canonically ordered by the caller.
    async fn upsert_co_occurs(&self, lo: (&str, &str), hi: (&str, &str)) -> Result<(), neo4rs::Error> {
        let (lo_label, lo_name) = lo;
        let (hi_label, hi_name) = hi;
        let cypher = format!(
            r#"
            MATCH (a:{lo_label} {{name: $lo_name}})
            MATCH (b:{hi_label} {{name: $hi_name}})
            MERGE (a)-[r:CO_OCCURS]-(b)
            ON CREATE SET r.weight = 1, r.last_seen = $now
            ON MATCH SET r.weight = COALESCE(r.weight, 0) + 1, r.last_seen = $now
            "#
        );
        let q = query(&cypher)
            .param("lo_name", lo_name.to_string())
            .param("hi_name", hi_name.to_string())
            .param("now", Utc::now().to_rfc3339());
        debug!(lo_name, hi_name, "co_occurs upsert");
        self.client.inner().run(q).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_is_order_independent() {
        let a = ("Person", "Alice");
        let b = ("Organization", "Acme");
        assert_eq!(canonical_pair(a, b), canonical_pair(b, a));
    }

    #[test]
    fn node_label_maps_each_kind() {
        assert_eq!(node_label(EntityKind::Person), "Person");
        assert_eq!(node_label(EntityKind::Organization), "Organization");
        assert_eq!(node_label(EntityKind::Location), "Location");
    }

    #[test]
    fn entity_type_maps_each_kind() {
        assert_eq!(entity_type(EntityKind::Person), "person");
        assert_eq!(entity_type(EntityKind::Organization), "organization");
        assert_eq!(entity_type(EntityKind::Location), "location");
    }
}
