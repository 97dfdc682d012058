use std::net::SocketAddr;
use std::sync::Arc;

use mongodb::Client;

use listingbot::{
    config::{self, StoreKind},
    routes,
    services::{
        leg_action::LogLegAction,
        memory_store::MemoryOrderStore,
        mongo_store::{self, MongoOrderStore},
        order_store::OrderStore,
    },
    AppState,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    let store: Arc<dyn OrderStore> = match settings.order_store {
        StoreKind::Mongo => {
            let client = Client::with_uri_str(&settings.mongodb_uri)
                .await
                .expect("Failed to connect to MongoDB");
            let db = client.database(&settings.mongodb_db);

            if let Err(e) = mongo_store::ensure_indexes(&db).await {
                tracing::warn!("could not create indexes: {}", e);
            }
            Arc::new(MongoOrderStore::new(db))
        }
        StoreKind::Memory => {
            tracing::warn!("using in-memory order store; orders are lost on restart");
            Arc::new(MemoryOrderStore::new())
        }
    };

    let state = AppState::new(settings.clone(), store, Arc::new(LogLegAction));

    if settings.rearm_on_startup {
        if let Err(e) = state.scheduler.rearm_pending().await {
            tracing::error!("re-arming pending legs failed: {}", e);
        }
    } else {
        tracing::info!("re-arm disabled; pending legs from earlier runs will not fire");
    }

    let app = routes::app(state);

    let ip = settings
        .host
        .parse::<std::net::IpAddr>()
        .expect("HOST must be an IP address");
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind listener");
    axum::serve(listener, app).await.expect("server error");
}
