use actix_web::{web, App, HttpServer};
use marketplace_chat_service::{
    config, error, logging, routes,
    services::{ChatStore, JwtUserDirectory},
    state::AppState,
};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = config::Config::from_env()?;

    let store = ChatStore::open(&cfg.data_dir)
        .await
        .map_err(|e| error::AppError::StartServer(format!("chat store: {e}")))?;

    let directory = Arc::new(JwtUserDirectory::new(&cfg.users_file, &cfg.jwt_secret));
    tracing::info!(users_file = %cfg.users_file.display(), "token resolver ready");

    let bind_addr = cfg.bind_addr();
    let state = AppState::new(store, directory, cfg);

    tracing::info!(%bind_addr, "starting marketplace-chat-service");

    HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure)
    })
    .bind(&bind_addr)
    .map_err(|e| error::AppError::StartServer(format!("bind REST: {e}")))?
    .run()
    .await
    .map_err(|e| error::AppError::StartServer(format!("REST server: {e}")))
}
