// Clinic booking API server
use actix_cors::Cors;
use actix_files::Files;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use std::time::Instant;

mod cli;
mod clock;
mod config;
mod error;
mod handlers;
mod logging;
mod middleware;
mod models;
mod routes;
mod store;
mod types;
mod validation;

use cli::{Cli, Commands, DbCommands, UserCommands};
use config::{AppConfig, BackendKind, CorsRule};

fn cors_for(rules: &[CorsRule]) -> Cors {
    let cors = if CorsRule::allows_any(rules) {
        Cors::default().allow_any_origin()
    } else {
        let rules = rules.to_vec();
        Cors::default().allowed_origin_fn(move |origin, _req| {
            origin
                .to_str()
                .map(|o| config::is_origin_allowed(&rules, o))
                .unwrap_or(false)
        })
    };
    cors.allow_any_method()
        .allow_any_header()
        .supports_credentials()
        .max_age(3600)
}

async fn run_command(cfg: &AppConfig, command: &Commands) -> anyhow::Result<()> {
    match command {
        Commands::Serve => Ok(()),
        Commands::Db { action: DbCommands::Test } => {
            let db = store::connect(&cfg.backend)?;
            cli::test_connection(db.client()).await?;
            println!("✓ Store connection successful ({:?})", cfg.backend.kind);
            Ok(())
        }
        Commands::User { action: UserCommands::AddAdmin(args) } => {
            if cfg.backend.kind != BackendKind::Local {
                anyhow::bail!("add-admin only manages the local store; create hosted accounts in the backend");
            }
            let db = store::connect(&cfg.backend)?;
            let admin = cli::add_admin(db.client(), args).await?;
            println!("✓ Admin user created: {}", admin.username);
            if let Some(id) = &admin.id {
                println!("  ID: {}", id);
            }
            Ok(())
        }
    }
}

async fn serve(cfg: AppConfig) -> anyhow::Result<()> {
    let database = store::connect(&cfg.backend).context("opening store")?;
    match cfg.backend.kind {
        BackendKind::Local => tracing::info!("Store: local ({})", cfg.backend.db_path),
        BackendKind::Rest => tracing::info!(
            "Store: rest ({}), privileged client {}",
            cfg.backend.rest_url,
            if cfg.backend.service_key.is_some() { "enabled" } else { "disabled" }
        ),
    }

    let bind_address = (cfg.server.host.clone(), cfg.server.port);
    logging::log_server_startup(&cfg.server.host, cfg.server.port, &cfg.server.environment);

    let db_data = web::Data::new(database);
    let cfg_data = web::Data::new(cfg.clone());

    HttpServer::new(move || {
        let app = App::new()
            .app_data(routes::json_config(cfg_data.server.json_limit))
            .app_data(db_data.clone())
            .app_data(cfg_data.clone())
            .wrap(middleware::security::SecurityHeaders)
            .wrap(cors_for(&cfg_data.cors_rules))
            .wrap(Logger::default())
            .configure(routes::configure)
            .default_service(web::to(routes::not_found));

        // Frontends last so `/api` keeps priority
        match &cfg_data.server.static_dir {
            Some(dir) => app.service(Files::new("/", dir).index_file("index.html")),
            None => app,
        }
    })
    .bind(bind_address)?
    .run()
    .await?;
    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    logging::init_logging(cli.verbose)?;
    logging::print_build_info();

    let mut cfg = config::load_config_from_file(&cli.config)?;
    if let Some(host) = &cli.host {
        cfg.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        cfg.server.port = port;
    }

    if config::ensure_signing_secret(&mut cfg)? {
        tracing::warn!("⚠️ No signing secret configured; using a random one, tokens will not survive a restart");
    }
    error::expose_error_detail(!cfg.is_production());

    match &cli.command {
        Some(command) if !cli.is_server_mode() => {
            let name = format!("{command:?}");
            logging::log_command_start(&name, "management command");
            let started = Instant::now();
            let result = run_command(&cfg, command).await;
            logging::log_command_complete(&name, result.is_ok(), started.elapsed());
            result
        }
        _ => serve(cfg).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::header, test, HttpResponse};

    async fn allowed_origin(rules: Vec<CorsRule>, origin: &str) -> Option<String> {
        let app = test::init_service(
            App::new()
                .wrap(cors_for(&rules))
                .route("/api/health", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/health")
            .insert_header((header::ORIGIN, origin))
            .to_request();
        let resp = test::call_service(&app, req).await;
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    #[actix_web::test]
    async fn cors_echoes_listed_origins_only() {
        let rules = config::parse_allowed_origins("https://klinik.example, https://*.klinik.example");
        assert_eq!(
            allowed_origin(rules.clone(), "https://admin.klinik.example").await.as_deref(),
            Some("https://admin.klinik.example")
        );
        assert_eq!(allowed_origin(rules, "https://evil.example").await, None);
        assert_eq!(
            allowed_origin(vec![], "http://localhost:5173").await.as_deref(),
            Some("http://localhost:5173")
        );
    }
}
