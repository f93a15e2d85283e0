use neo4rs::query;
use tracing::info;

use crate::GraphClient;

/// Run idempotent schema migrations: uniqueness constraints only, per §4.8.
/// No spatial, full-text, or vector indexes — those belong to the
/// out-of-scope read API, not the ingestion core.
pub async fn migrate(client: &GraphClient) -> Result<(), neo4rs::Error> {
    let g = &client.graph;

    info!("running schema migrations");

    let constraints = [
        "CREATE CONSTRAINT document_external_id IF NOT EXISTS FOR (n:Document) REQUIRE n.external_id IS UNIQUE",
        "CREATE CONSTRAINT person_name IF NOT EXISTS FOR (n:Person) REQUIRE n.name IS UNIQUE",
        "CREATE CONSTRAINT organization_name IF NOT EXISTS FOR (n:Organization) REQUIRE n.name IS UNIQUE",
        "CREATE CONSTRAINT location_name IF NOT EXISTS FOR (n:Location) REQUIRE n.name IS UNIQUE",
    ];

    for c in &constraints {
        g.run(query(c)).await?;
    }
    info!("uniqueness constraints created");

    Ok(())
}
