use std::sync::Arc;

use clap::{Parser, Subcommand};
use sentinel_adapters::{AdapterRegistry, BusinessRegistryAdapter, EventsExportAdapter, FeedAdapter};
use sentinel_common::Config;
use sentinel_graph::{migrate, GraphClient, GraphWriter};
use sentinel_pipeline::{Geocoder, HeuristicTagger, Resolver};
use sentinel_scheduler::{Dispatcher, Job, JobRunner, PipelineRunner, Scheduler};
use sentinel_store::RawStore;
use tracing_subscriber::EnvFilter;

/// OSINT ingestion pipeline — fetch, tag, geocode, and graph public sources.
#[derive(Parser)]
#[command(name = "sentinel")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run dispatcher workers (fetch + processing jobs), driven by the scheduler.
    Worker,
    /// Run the recurring scheduler only (enqueues jobs; run `worker` elsewhere to drain them).
    Scheduler,
    /// Fetch once from a named adapter, then sweep once, synchronously.
    RunOnce {
        /// Adapter name: "feed", "gdelt", or "cvr".
        adapter: String,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();
}

async fn build_runner(config: &Config) -> anyhow::Result<PipelineRunner> {
    let mut adapters = AdapterRegistry::new();
    adapters.register(Box::new(FeedAdapter::new(config.rss_feed_urls.clone())));
    adapters.register(Box::new(EventsExportAdapter::new(
        config.gdelt_base_url.clone(),
        config.gdelt_focus_countries.clone(),
    )));
    adapters.register(Box::new(BusinessRegistryAdapter::new(
        config.cvr_api_url.clone(),
        config.cvr_api_key.clone(),
        Vec::new(),
    )));

    let store = RawStore::connect(&config.postgres_dsn).await?;

    let graph_client = GraphClient::connect(&config.neo4j_uri, &config.neo4j_user, &config.neo4j_password).await?;
    migrate(&graph_client).await?;
    let graph = GraphWriter::new(graph_client);

    let tagger = Box::new(HeuristicTagger::new());
    let resolver = Resolver::default();
    let geocoder = Geocoder::new(config.geocoder_user_agent.clone(), config.geocoder_rate_limit);

    Ok(PipelineRunner::new(adapters, store, tagger, resolver, geocoder, graph))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_redacted();

    match cli.command {
        // The dispatcher runs in-process rather than against an external broker
        // (see DESIGN.md), so "worker" and "scheduler" both mean: enqueue on the
        // recurring schedule and drain with a bounded pool, in this one process.
        Command::Worker | Command::Scheduler => {
            let runner: Arc<dyn JobRunner> = Arc::new(build_runner(&config).await?);
            let dispatcher = Dispatcher::spawn(4, runner);
            let scheduler = Scheduler::new(dispatcher, vec!["feed".to_string()]);
            scheduler.run().await;
        }
        Command::RunOnce { adapter } => {
            let runner = build_runner(&config).await?;
            runner.run(&Job::FetchAdapter(adapter)).await?;
            runner.run(&Job::ProcessingSweep).await?;
        }
    }

    Ok(())
}
