use actix_web::{App, HttpResponse, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use tabungan_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    events::ChangeFeed,
    external::WhatsAppClient,
    handlers,
    ledger::LedgerRef,
    middlewares::{AuthMiddleware, create_cors},
    offline::{Connectivity, OfflineQueue},
    services::*,
    swagger::swagger_config,
    tasks::{self, Tasks},
    utils::JwtService,
};

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration file");

    // antrian offline harus siap walau database utama mati
    let queue = OfflineQueue::connect(&config.offline)
        .await
        .expect("Failed to open offline queue database");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(&config.jwt.secret);
    let feed = ChangeFeed::default();
    let connectivity = Connectivity::new(true);

    let transaction_service = TransactionService::new(pool.clone(), feed.clone());
    let ledger: LedgerRef = Arc::new(transaction_service.clone());
    let form_service = TransactionFormService::new(
        ledger.clone(),
        queue.clone(),
        connectivity.clone(),
        feed.clone(),
    );
    let sync_service = SyncService::new(
        ledger,
        queue.clone(),
        connectivity.clone(),
        feed.clone(),
        config.sync.clone(),
    );
    let class_service = ClassService::new(pool.clone(), feed.clone());
    let student_service = StudentService::new(pool.clone(), feed.clone());
    let import_service = ImportService::new(pool.clone(), feed.clone());
    let export_service = ExportService::new(pool.clone(), feed.clone(), config.app.clone());
    let dashboard_service = DashboardService::new(pool.clone(), queue.clone());
    let school_service = SchoolService::new(pool.clone(), feed.clone());
    let profile_service = ProfileService::new(pool.clone(), feed.clone());
    let wali_kelas_service = WaliKelasService::new(pool.clone(), feed.clone());
    let portal_service = StudentPortalService::new(pool.clone(), config.student_portal.clone());
    let report_service = ReportService::new(
        pool.clone(),
        school_service.clone(),
        WhatsAppClient::new(config.report.clone()),
    );

    tasks::spawn_all(Tasks {
        pool: pool.clone(),
        connectivity: connectivity.clone(),
        sync: sync_service.clone(),
        portal: portal_service.clone(),
        report: report_service.clone(),
        sync_config: config.sync.clone(),
        report_config: config.report.clone(),
    });

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let cors_origins = config.server.cors_origins.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .wrap(create_cors(&cors_origins))
            .wrap(Logger::default())
            .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
            .app_data(web::JsonConfig::default().limit(MAX_UPLOAD_BYTES))
            .app_data(web::Data::new(feed.clone()))
            .app_data(web::Data::new(queue.clone()))
            .app_data(web::Data::new(connectivity.clone()))
            .app_data(web::Data::new(transaction_service.clone()))
            .app_data(web::Data::new(form_service.clone()))
            .app_data(web::Data::new(sync_service.clone()))
            .app_data(web::Data::new(class_service.clone()))
            .app_data(web::Data::new(student_service.clone()))
            .app_data(web::Data::new(import_service.clone()))
            .app_data(web::Data::new(export_service.clone()))
            .app_data(web::Data::new(dashboard_service.clone()))
            .app_data(web::Data::new(school_service.clone()))
            .app_data(web::Data::new(profile_service.clone()))
            .app_data(web::Data::new(wali_kelas_service.clone()))
            .app_data(web::Data::new(portal_service.clone()))
            .app_data(web::Data::new(report_service.clone()))
            .configure(swagger_config)
            .route("/health", web::get().to(|| async { HttpResponse::Ok().body("ok") }))
            .service(
                web::scope("/api/v1")
                    .configure(handlers::class_config)
                    .configure(handlers::student_config)
                    .configure(handlers::transaction_config)
                    .configure(handlers::import_config)
                    .configure(handlers::export_config)
                    .configure(handlers::dashboard_config)
                    .configure(handlers::offline_config)
                    .configure(handlers::events_config)
                    .configure(handlers::student_portal_config)
                    .configure(handlers::wali_kelas_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
