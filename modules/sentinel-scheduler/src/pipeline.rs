use async_trait::async_trait;
use sentinel_adapters::AdapterRegistry;
use sentinel_graph::{DocumentUpsert, GraphWriter};
use sentinel_pipeline::{EntityKind, EntityTagger, GeoResult, Geocoder, Resolver};
use sentinel_store::{RawRow, RawStore};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::dispatcher::{Job, JobRunner};

const DEFAULT_SWEEP_BATCH_SIZE: i64 = 200;

/// Binds adapters, the raw store, the tagger/resolver/geocoder, and the
/// graph writer into the two job bodies the dispatcher runs, per §4.6/§4.7.
pub struct PipelineRunner {
    adapters: AdapterRegistry,
    store: RawStore,
    tagger: Box<dyn EntityTagger>,
    resolver: Resolver,
    geocoder: Geocoder,
    graph: GraphWriter,
    sweep_batch_size: i64,
}

impl PipelineRunner {
    pub fn new(
        adapters: AdapterRegistry,
        store: RawStore,
        tagger: Box<dyn EntityTagger>,
        resolver: Resolver,
        geocoder: Geocoder,
        graph: GraphWriter,
    ) -> Self {
        Self {
            adapters,
            store,
            tagger,
            resolver,
            geocoder,
            graph,
            sweep_batch_size: DEFAULT_SWEEP_BATCH_SIZE,
        }
    }

    async fn fetch_and_store(&self, adapter_name: &str) -> anyhow::Result<()> {
        let adapter = self.adapters.get(adapter_name)?;
        let items = adapter.fetch().await?;

        let mut inserted = 0;
        for item in &items {
            if self.store.upsert(item).await? {
                inserted += 1;
            }
        }
        info!(adapter = adapter_name, fetched = items.len(), inserted, "fetch complete");
        Ok(())
    }

    /// §4.7 "Processing sweep unit".
    async fn sweep(&self) -> anyhow::Result<()> {
        let rows = self.store.select_unprocessed(self.sweep_batch_size).await?;

        let mut processed = 0u32;
        let mut errors = 0u32;
        for row in rows {
            let id = row.id;
            match self.process_one(row).await {
                Ok(()) => {
                    self.store.mark_processed(id).await?;
                    processed += 1;
                }
                Err(e) => {
                    errors += 1;
                    warn!(row_id = %id, error = %e, "processing failed, leaving row unprocessed");
                }
            }
        }

        info!(processed, errors, "sweep complete");
        Ok(())
    }

    /// §4.7 "Single-item pipeline".
    async fn process_one(&self, row: RawRow) -> anyhow::Result<()> {
        let item = row.into_raw_item();

        let text_parts: Vec<&str> = [item.title.as_str(), item.summary.as_deref().unwrap_or(""), item.content.as_deref().unwrap_or("")]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        let text = text_parts.join(" ");

        let extracted = self.tagger.tag(&text);
        if extracted.is_empty() {
            return Ok(());
        }

        let normalised = self.resolver.resolve(&extracted);

        let mut geo: HashMap<String, GeoResult> = HashMap::new();
        for entity in normalised.iter().filter(|e| e.kind == EntityKind::Location) {
            if let Some(result) = self.geocoder.geocode(&entity.name).await {
                geo.insert(entity.name.clone(), result);
            }
        }

        let document = DocumentUpsert {
            external_id: item.external_id.clone(),
            title: item.title.clone(),
            source_url: item.source_url.clone(),
            adapter: item.source_adapter.clone(),
            published_at: item.published_at,
        };

        self.graph.write_document(&document, &normalised, &geo).await?;
        Ok(())
    }
}

#[async_trait]
impl JobRunner for PipelineRunner {
    async fn run(&self, job: &Job) -> anyhow::Result<()> {
        match job {
            Job::FetchAdapter(name) => self.fetch_and_store(name).await,
            Job::ProcessingSweep => self.sweep().await,
        }
    }
}
