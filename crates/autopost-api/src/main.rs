//! Autopost service binary: HTTP surface plus the run scheduler.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use autopost_api::{create_router, metrics, ApiConfig, AppState};
use autopost_media::{FfmpegTransformer, TransformConfig};
use autopost_pipeline::{
    ManifestPolicy, MediaPipeline, NewSinceLastRun, PipelineConfig, RunOrchestrator,
    ScheduleConfig, Scheduler, SelectionMode, SelectionPolicy, WorkspaceManager,
};
use autopost_storage::{ObjectStorage, S3Client};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Install rustls crypto provider (required by the AWS SDK TLS stack)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("autopost=info".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting autopost-api");

    // Load configuration
    let config = ApiConfig::from_env();
    let pipeline_config = PipelineConfig::from_env();
    let schedule_config = ScheduleConfig::from_env();
    info!("API config: host={}, port={}", config.host, config.port);

    // Surface missing media tools at startup rather than mid-run
    if let Err(e) = autopost_media::check_ffmpeg() {
        error!("FFmpeg unavailable: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = autopost_media::check_ffprobe() {
        error!("FFprobe unavailable: {}", e);
        std::process::exit(1);
    }

    // Object storage (fatal when a bucket role mapping is missing)
    let storage: Arc<dyn ObjectStorage> = match S3Client::from_env().await {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to configure object storage: {}", e);
            std::process::exit(1);
        }
    };

    // Assemble the pipeline
    let transformer = Arc::new(FfmpegTransformer::new(TransformConfig {
        timeout: pipeline_config.transform_timeout,
        ..TransformConfig::default()
    }));
    let policy: Arc<dyn SelectionPolicy> = match pipeline_config.selection {
        SelectionMode::Manifest => Arc::new(ManifestPolicy::new(pipeline_config.manifest_key.clone())),
        SelectionMode::NewSinceLastRun => Arc::new(NewSinceLastRun),
    };
    let workspace = WorkspaceManager::new(pipeline_config.work_dir.clone());
    let pipeline = MediaPipeline::new(
        Arc::clone(&storage),
        transformer,
        policy,
        workspace,
        pipeline_config,
    );
    let orchestrator = Arc::new(RunOrchestrator::new(Arc::new(pipeline)));

    // Initialize metrics
    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    let metrics_handle = if metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics())
    } else {
        None
    };

    // Start the daily scheduler
    let scheduler = Scheduler::new(Arc::clone(&orchestrator), schedule_config);
    tokio::spawn(async move {
        scheduler.run().await;
    });

    // Create router
    let state = AppState::new(config.clone(), orchestrator, storage);
    let app = create_router(state, metrics_handle);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid bind address");

    info!("Listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Received shutdown signal");
}
