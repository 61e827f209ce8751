//! `mnema-worker` - the background ingestion process.
//!
//! Consumes `embedding_jobs` and `delete_jobs`, one message at a time per
//! consumer. Failure to set up the queue transport at startup is fatal;
//! everything after that is contained per-job.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mnema::db::store::InMemoryStore;
use mnema::db::vectorstore::InMemoryVectorStore;
use mnema::extract::LinkExtractor;
use mnema::ingest::{DeletionWorker, IngestionWorker, WorkerConfig};
use mnema::queue::{
    delete_queue_policy, embedding_queue_policy, run_consumer, InMemoryJobQueue, JobQueue,
    DELETE_QUEUE, EMBEDDING_QUEUE,
};
use mnema::rag::Embedder;
use mnema::utils::config::Config;

#[derive(Parser, Debug)]
#[command(name = "mnema-worker", version, about = "Mnema ingestion worker")]
struct Args {
    /// Load environment variables from this file before reading config.
    #[arg(long)]
    env_file: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    if let Some(path) = &args.env_file {
        dotenvy::from_path(path)
            .with_context(|| format!("failed to load env file {}", path.display()))?;
    }

    let config = Config::from_env().context("configuration")?;
    info!(
        embedding_queue = %config.queue.embedding_queue,
        delete_queue = %config.queue.delete_queue,
        "starting worker"
    );

    // Transport and stores. The in-memory implementations stand in until a
    // broker/database-backed JobQueue, ContentStore and VectorStore are wired
    // through the same traits for the target deployment.
    let queue: Arc<dyn JobQueue> = Arc::new(InMemoryJobQueue::new());
    let store = Arc::new(InMemoryStore::new());
    let vectors = Arc::new(InMemoryVectorStore::new());

    // Queue setup is the one fatal startup step.
    queue
        .declare(EMBEDDING_QUEUE, embedding_queue_policy())
        .await
        .context("declare embedding queue")?;
    queue
        .declare(DELETE_QUEUE, delete_queue_policy())
        .await
        .context("declare delete queue")?;

    let embedder = build_embedder(&config)?;
    let extractor = Arc::new(LinkExtractor::new(config.extract.clone()).context("extractor")?);

    let ingestion = Arc::new(IngestionWorker::new(
        store,
        vectors.clone(),
        embedder,
        extractor,
        WorkerConfig {
            chunk_size: config.ingest.chunk_size,
            upsert_batch_size: config.vector.upsert_batch_size,
            ..WorkerConfig::default()
        },
    ));
    let deletion = Arc::new(DeletionWorker::new(vectors));

    let ingest_task = tokio::spawn(run_consumer(queue.clone(), EMBEDDING_QUEUE, ingestion));
    let delete_task = tokio::spawn(run_consumer(queue.clone(), DELETE_QUEUE, deletion));

    tokio::signal::ctrl_c().await.context("signal handler")?;
    info!("shutdown requested, draining consumers");
    queue.close(EMBEDDING_QUEUE).await.context("close embedding queue")?;
    queue.close(DELETE_QUEUE).await.context("close delete queue")?;

    ingest_task.await.context("ingestion consumer")??;
    delete_task.await.context("deletion consumer")??;
    info!("worker stopped");
    Ok(())
}

#[cfg(feature = "local-embeddings")]
fn build_embedder(config: &Config) -> anyhow::Result<Arc<dyn Embedder>> {
    let model_type = config
        .embedding
        .model
        .parse()
        .context("embedding model")?;
    Ok(Arc::new(mnema::rag::EmbeddingService::new(model_type)))
}

#[cfg(not(feature = "local-embeddings"))]
fn build_embedder(_config: &Config) -> anyhow::Result<Arc<dyn Embedder>> {
    anyhow::bail!("mnema-worker was built without the 'local-embeddings' feature")
}
