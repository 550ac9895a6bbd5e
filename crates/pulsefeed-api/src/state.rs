//! Application state wiring all components together.
//!
//! Core components are generic over the oracle/worker/transport/repository
//! ports, but AppState pins them to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use pulsefeed_core::feed::FeedOrchestrator;
use pulsefeed_core::scrape::ScrapeCoordinator;
use pulsefeed_core::session::SessionManager;
use pulsefeed_core::training::TrainingFlow;
use pulsefeed_infra::config::load_config;
use pulsefeed_infra::http::oracle::HttpRecommendationOracle;
use pulsefeed_infra::http::scraper::HttpScrapeWorker;
use pulsefeed_infra::http::transport::HttpChatTransport;
use pulsefeed_infra::sqlite::pool::DatabasePool;
use pulsefeed_infra::sqlite::session::SqliteSessionRepository;
use pulsefeed_types::config::AppConfig;

/// Concrete type aliases for the component generics pinned to infra
/// implementations.
pub type ConcreteSessionManager = SessionManager<SqliteSessionRepository, HttpChatTransport>;

pub type ConcreteTrainingFlow = TrainingFlow<SqliteSessionRepository>;

pub type ConcreteScrapeCoordinator = ScrapeCoordinator<HttpScrapeWorker>;

pub type ConcreteFeedOrchestrator =
    FeedOrchestrator<HttpRecommendationOracle, SqliteSessionRepository, HttpScrapeWorker>;

/// Shared application state holding all wired components.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<SqliteSessionRepository>,
    pub sessions: Arc<ConcreteSessionManager>,
    pub training: Arc<ConcreteTrainingFlow>,
    pub orchestrator: Arc<ConcreteFeedOrchestrator>,
    pub coordinator: Arc<ConcreteScrapeCoordinator>,
    pub config: AppConfig,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, connect to the
    /// database, wire components.
    pub async fn init(data_dir: PathBuf) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;

        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("pulsefeed.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;

        // The session repository doubles as the channel selector: the
        // channels worth scraping for a user are their subscriptions plus
        // the configured defaults.
        let repo = Arc::new(SqliteSessionRepository::new(
            db_pool.clone(),
            config.training.default_channels.clone(),
        ));

        let transport = Arc::new(HttpChatTransport::new(&config.transport));
        let worker = Arc::new(HttpScrapeWorker::new(&config.scraper));
        let oracle = Arc::new(HttpRecommendationOracle::new(&config.oracle));

        let coordinator = Arc::new(ScrapeCoordinator::new(
            worker,
            config.scraper.posts_per_channel,
        ));

        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&repo),
            transport,
            config.training.default_language.clone(),
        ));

        let training = Arc::new(TrainingFlow::new(Arc::clone(&repo)));

        let orchestrator = Arc::new(FeedOrchestrator::new(
            oracle,
            Arc::clone(&repo),
            Arc::clone(&coordinator),
            config.feed.clone(),
        ));

        Ok(Self {
            repo,
            sessions,
            training,
            orchestrator,
            coordinator,
            config,
            data_dir,
            db_pool,
        })
    }
}
