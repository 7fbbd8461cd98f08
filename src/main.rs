use actix_web::{middleware::Compress, web, App, HttpServer};
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use driftpost::config::AppConfig;
use driftpost::openapi::ApiDoc;
use driftpost::repo::{inmem::InMemRepo, pg::PgRepo};
use driftpost::storage::build_object_store;
use driftpost::{config, AppState, CorsHeaders};

const DB_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env automatically only in debug builds; production sets the environment externally.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = AppConfig::from_env();
    let missing = cfg.missing_required();
    if !missing.is_empty() {
        eprintln!("Missing required environment variables: {:?}", missing);
        eprintln!("Please copy .env.example to .env and configure it");
        std::process::exit(1);
    }
    info!("Bootstrapping driftpost server");
    info!(
        "Bottle policy: window={} pick={:?} close={:?}",
        cfg.bottle_policy.candidate_window, cfg.bottle_policy.pick, cfg.bottle_policy.close
    );
    if cfg.admin_secret.is_none() {
        warn!("ADMIN_SECRET not set; file deletion is disabled");
    }

    let object_store = build_object_store(&cfg.s3).await.map_err(std::io::Error::other)?;

    let state = match cfg.database_url.as_deref() {
        Some(db_url) => {
            use sqlx::postgres::PgPoolOptions;
            let pool = tokio::time::timeout(
                DB_CONNECT_TIMEOUT,
                PgPoolOptions::new().max_connections(cfg.db_max_connections).connect(db_url),
            )
            .await
            .map_err(|_| std::io::Error::other("timed out connecting to DATABASE_URL"))?
            .map_err(std::io::Error::other)?;
            sqlx::migrate!("./migrations").run(&pool).await.map_err(std::io::Error::other)?;
            info!("Using Postgres repository backend");
            AppState::new(PgRepo::new(pool), object_store, cfg.bottle_policy, cfg.admin_secret.clone())
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory repository backend (data is lost on restart)");
            AppState::new(InMemRepo::new(), object_store, cfg.bottle_policy, cfg.admin_secret.clone())
        }
    };

    let openapi = ApiDoc::openapi();
    info!("OpenAPI spec generated");
    let cors = CorsHeaders::default().with_origin(cfg.cors_allow_origin.clone());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(cors.clone())
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind((cfg.bind_addr.as_str(), cfg.port))?;

    info!("Listening on http://{}:{}", cfg.bind_addr, cfg.port);

    server.run().await
}
