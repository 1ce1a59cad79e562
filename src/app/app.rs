use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::app_conf::AppConfig;
use crate::config::mongo_conf::MongoConfig;
use crate::config::retry_conf::RetryConfig;
use crate::repository::catalog_repo::MongoCatalogRepository;
use crate::repository::party_repo::MongoPartyRepository;
use crate::repository::quotation_repo::{MongoQuotationRepository, QuotationCounter};
use crate::router::catalog_router::catalog_router;
use crate::router::party_router::party_router;
use crate::router::quotation_router::quotation_router;
use crate::service::catalog_service::CatalogServiceImpl;
use crate::service::party_service::PartyServiceImpl;
use crate::service::quotation_service::QuotationServiceImpl;

pub struct App {
    config: AppConfig,
    router: Router,
    pub party_service: Arc<PartyServiceImpl>,
    pub quotation_service: Arc<QuotationServiceImpl>,
    pub catalog_service: Arc<CatalogServiceImpl>,
}

/// Full HTTP surface over the given services.
pub fn create_router(
    party_service: Arc<PartyServiceImpl>,
    quotation_service: Arc<QuotationServiceImpl>,
    catalog_service: Arc<CatalogServiceImpl>,
) -> Router {
    Router::new()
        .merge(party_router(party_service))
        .merge(quotation_router(quotation_service))
        .merge(catalog_router(catalog_service))
        .route("/health", get(|| async { "OK" }))
}

impl App {
    pub async fn new(config: AppConfig) -> Self {
        let mongo_config = MongoConfig::from_env().expect("Mongo config error");
        let retry_config = RetryConfig::from_env().expect("Retry config error");

        let db = crate::repository::connect(&mongo_config).await.expect("MongoDB connection error");

        let party_repo = Arc::new(MongoPartyRepository::new(&db, &mongo_config));
        let quotation_repo = Arc::new(MongoQuotationRepository::new(&db, &mongo_config));
        let catalog_repo = Arc::new(MongoCatalogRepository::new(&db));

        // Identifier and version assignment depend on these; refuse to serve without them
        party_repo.ensure_unique_indexes().await.expect("Party unique index error");
        quotation_repo.ensure_unique_indexes().await.expect("Quotation unique index error");

        if let Err(e) = party_repo.ensure_query_indexes().await {
            warn!("Failed to ensure party query indexes: {}", e);
        }
        if let Err(e) = catalog_repo.ensure_indexes().await {
            warn!("Failed to ensure catalog indexes: {}", e);
        }

        let party_service = Arc::new(PartyServiceImpl::new(
            party_repo.clone(),
            Some(quotation_repo.clone() as Arc<dyn QuotationCounter>),
            retry_config,
        ));
        let quotation_service = Arc::new(QuotationServiceImpl::new(
            quotation_repo,
            party_repo,
            catalog_repo.clone(),
            retry_config,
        ));
        let catalog_service = Arc::new(CatalogServiceImpl::new(catalog_repo));

        let router = create_router(party_service.clone(), quotation_service.clone(), catalog_service.clone());
        App { config, router, party_service, quotation_service, catalog_service }
    }

    pub async fn start(self) {
        let addr = SocketAddr::new(self.config.host.parse().expect("Invalid host"), self.config.port);
        info!("🚀 Server running at http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind address");
        axum::serve(listener, self.router).await.expect("Failed to start server");
    }
}
