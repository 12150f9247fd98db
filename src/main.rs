use anyhow::{Context, Result};
use memory_hub::{
    config::{AppConfig, StorageBackend},
    routes::routes,
    services::{
        embedding::select_embedding_provider, gateway_service::GatewayService,
        local_store::LocalObjectStore, object_store::ObjectStore, s3_store::S3ObjectStore,
    },
};
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    tracing::info!("Starting memory-hub with config: {:?}", cfg);

    // --- Initialize clients ---
    let store: Arc<dyn ObjectStore> = match cfg.storage.backend {
        StorageBackend::S3 => {
            tracing::info!(
                "Using S3 bucket {} in {}",
                cfg.storage.bucket,
                cfg.storage.region
            );
            let s3 = S3ObjectStore::from_env(&cfg.storage.region, cfg.storage.bucket.clone()).await;
            Arc::new(s3)
        }
        StorageBackend::Local => {
            let local = LocalObjectStore::new(&cfg.storage.local_dir, cfg.storage.bucket.clone());
            local.ensure_bucket().await.with_context(|| {
                format!(
                    "creating bucket directory under {}",
                    cfg.storage.local_dir.display()
                )
            })?;
            tracing::info!(
                "Using local object store at {}/{}",
                cfg.storage.local_dir.display(),
                cfg.storage.bucket
            );
            Arc::new(local)
        }
    };

    let embedder = select_embedding_provider(cfg.environment, &cfg.embedding)?;
    tracing::info!(
        "Embedding backend: {} (model {})",
        embedder.describe(),
        embedder.model_name()
    );

    // --- Initialize core service ---
    let service = GatewayService::new(store, embedder, cfg.upload.clone(), cfg.environment);

    // --- Build router ---
    let app = routes::app(service, &cfg.allowed_origins);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
