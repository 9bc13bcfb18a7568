use actix_web::{App, ResponseError, http::StatusCode, test, web};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use std::sync::Arc;
use tabungan_backend::config::{StudentPortalConfig, SyncConfig};
use tabungan_backend::database::{DbPool, connect, run_migrations};
use tabungan_backend::entities::{
    TransactionKind, class_entity as classes, student_entity as students,
};
use tabungan_backend::events::ChangeFeed;
use tabungan_backend::handlers;
use tabungan_backend::ledger::{Ledger, LedgerRef, NewTransaction};
use tabungan_backend::middlewares::AuthMiddleware;
use tabungan_backend::models::{CreateTransactionRequest, SubmitStatus, TransactionQuery};
use tabungan_backend::offline::{Connectivity, OfflineQueue};
use tabungan_backend::services::{
    ImportService, StudentPortalService, SyncService, SyncTrigger, TransactionFormService,
    TransactionService,
};
use tabungan_backend::utils::JwtService;
use uuid::Uuid;

async fn setup() -> (DbPool, students::Model) {
    let db = connect("sqlite::memory:", 1).await.unwrap();
    run_migrations(&db).await.unwrap();
    let now = chrono::Utc::now();
    let class = classes::ActiveModel {
        id: Set(Uuid::new_v4()),
        nama_kelas: Set("VIII B".into()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&db)
    .await
    .unwrap();
    let student = students::ActiveModel {
        id: Set(Uuid::new_v4()),
        nis: Set("2024001".into()),
        nama: Set("Dewi Lestari".into()),
        kelas_id: Set(class.id),
        saldo: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&db)
    .await
    .unwrap();
    (db, student)
}

async fn saldo_of(db: &DbPool, id: Uuid) -> i64 {
    students::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .saldo
}

#[tokio::test]
async fn offline_form_entry_is_synced_after_reconnect() {
    let (db, student) = setup().await;
    let queue = OfflineQueue::init(connect("sqlite::memory:", 1).await.unwrap())
        .await
        .unwrap();
    let feed = ChangeFeed::default();
    let connectivity = Connectivity::new(false);
    let ledger: LedgerRef = Arc::new(TransactionService::new(db.clone(), feed.clone()));
    let form = TransactionFormService::new(
        ledger.clone(),
        queue.clone(),
        connectivity.clone(),
        feed.clone(),
    );
    let sync = SyncService::new(
        ledger,
        queue.clone(),
        connectivity.clone(),
        feed,
        SyncConfig::default(),
    );

    let submitted = form
        .submit(
            CreateTransactionRequest {
                student_id: student.id,
                jenis: TransactionKind::Setor,
                jumlah: 25_000,
                tanggal: "01/03/2025".into(),
                keterangan: Some("setoran mingguan".into()),
            },
            "Bu Ani",
        )
        .await
        .unwrap();
    assert_eq!(submitted.status, SubmitStatus::Queued);
    assert_eq!(queue.get_pending_count().await.unwrap(), 1);
    assert_eq!(saldo_of(&db, student.id).await, 0);

    // manual sync ditolak selama offline
    assert!(sync.sync_all_pending(SyncTrigger::Manual).await.is_err());

    connectivity.set_online(true);
    let report = sync.sync_all_pending(SyncTrigger::Manual).await.unwrap();
    assert_eq!(report.success, 1);
    assert_eq!(queue.get_pending_count().await.unwrap(), 0);
    assert_eq!(saldo_of(&db, student.id).await, 25_000);
}

#[tokio::test]
async fn backdated_entries_resnapshot_history() {
    let (db, student) = setup().await;
    let svc = TransactionService::new(db.clone(), ChangeFeed::default());
    let d = |day| NaiveDate::from_ymd_opt(2025, 2, day).unwrap();
    let tx = |jenis, jumlah, tanggal| NewTransaction {
        student_id: student.id,
        jenis,
        jumlah,
        tanggal,
        keterangan: None,
        admin: "admin".into(),
    };

    svc.apply(tx(TransactionKind::Setor, 10_000, d(10))).await.unwrap();
    svc.apply(tx(TransactionKind::Tarik, 4_000, d(12))).await.unwrap();
    // dicatat belakangan untuk tanggal lebih awal
    svc.apply(tx(TransactionKind::Setor, 5_000, d(11))).await.unwrap();

    let page = svc
        .list_transactions(&TransactionQuery {
            student_id: Some(student.id),
            ..Default::default()
        })
        .await
        .unwrap();
    let snapshots: Vec<(NaiveDate, i64)> = page
        .data
        .iter()
        .map(|t| (t.tanggal, t.saldo_setelah))
        .collect();
    assert_eq!(
        snapshots,
        vec![(d(12), 11_000), (d(11), 15_000), (d(10), 10_000)]
    );
    assert_eq!(saldo_of(&db, student.id).await, 11_000);
}

#[tokio::test]
async fn reimporting_same_file_changes_nothing() {
    let (db, student) = setup().await;
    let import = ImportService::new(db.clone(), ChangeFeed::default());
    let csv = "NIS,Jenis,Tanggal,Jumlah,Keterangan\n\
               2024001,Setor,2025-01-06,20000,\n\
               2024001,Setor,2025-01-13,15000,\n\
               2024001,Tarik,2025-01-20,5000,jajan\n";

    let first = import.import_transactions(csv, "Pak Budi").await.unwrap();
    assert_eq!(first.inserted, 3);
    assert_eq!(saldo_of(&db, student.id).await, 30_000);

    let second = import.import_transactions(csv, "Pak Budi").await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped_duplicates, 3);
    assert_eq!(saldo_of(&db, student.id).await, 30_000);
}

#[actix_web::test]
async fn student_portal_is_public_and_admin_routes_are_not() {
    let (db, _student) = setup().await;
    let portal = StudentPortalService::new(db, StudentPortalConfig::default());
    let app = test::init_service(
        App::new()
            .wrap(AuthMiddleware::new(JwtService::new("rahasia")))
            .app_data(web::Data::new(portal))
            .service(
                web::scope("/api/v1")
                    .configure(handlers::student_portal_config)
                    .configure(handlers::class_config),
            ),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/student/session")
        .set_json(serde_json::json!({ "nis": "2024001" }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["student"]["nama"], "Dewi Lestari");
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/v1/student/me")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["saldo"], 0);

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/classes")
        .to_request();
    let err = test::try_call_service(&app, req).await.err().unwrap();
    assert_eq!(
        err.as_response_error().error_response().status(),
        StatusCode::UNAUTHORIZED
    );
}
