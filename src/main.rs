use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{
    http::header,
    middleware::{DefaultHeaders, Logger},
    web, App, HttpServer,
};

use smartlearn_server::{
    app_state::AppState,
    auth::AuthMiddleware,
    config::Config,
    handlers,
    middleware::{RateLimit, RequestIdMiddleware},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    config.validate_for_production();

    let bind_addr = (config.web_server_host.clone(), config.web_server_port);
    let upload_dir = config.upload_dir.clone();
    let cors_origins = config.cors_origins.clone();
    let global_limit = RateLimit::global(config.rate_limit_window, config.rate_limit_max);
    let login_limit = RateLimit::failed_logins(config.login_limit_window, config.login_limit_max);

    std::fs::create_dir_all(&upload_dir)?;

    let state = AppState::new(config).await.map_err(|e| {
        log::error!("Failed to initialise application state: {}", e);
        std::io::Error::other(e.to_string())
    })?;
    let state = Arc::new(state);

    log::info!("SmartLearn API listening on {}:{}", bind_addr.0, bind_addr.1);

    HttpServer::new(move || {
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .expose_headers(vec![header::CONTENT_DISPOSITION])
            .supports_credentials()
            .max_age(3600);

        let auth = AuthMiddleware::new(state.jwt_service.clone(), state.user_repository.clone());
        let login_limit = login_limit.clone();

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(auth)
            .wrap(global_limit.clone())
            .wrap(RequestIdMiddleware)
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add((header::X_FRAME_OPTIONS, "SAMEORIGIN"))
                    .add((header::REFERRER_POLICY, "no-referrer")),
            )
            .wrap(cors)
            .wrap(Logger::default())
            .configure(|cfg| handlers::configure(cfg, login_limit))
            .service(Files::new("/uploads", upload_dir.clone()))
    })
    .bind(bind_addr)?
    .run()
    .await
}
