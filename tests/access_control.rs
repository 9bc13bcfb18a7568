use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, http::StatusCode, test, web};
use chrono::NaiveDate;
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;
use tabungan_backend::config::SyncConfig;
use tabungan_backend::database::{DbPool, connect, run_migrations};
use tabungan_backend::entities::{
    Role, TransactionKind, class_entity as classes, student_entity as students,
};
use tabungan_backend::events::ChangeFeed;
use tabungan_backend::handlers;
use tabungan_backend::ledger::{LedgerRef, NewTransaction};
use tabungan_backend::middlewares::AuthMiddleware;
use tabungan_backend::models::{AssignWaliKelasRequest, UpsertProfileRequest};
use tabungan_backend::offline::{Connectivity, OfflineQueue};
use tabungan_backend::services::{
    ProfileService, SyncService, TransactionFormService, TransactionService, WaliKelasService,
};
use tabungan_backend::utils::{AppMetadata, Claims, JwtService};
use uuid::Uuid;

const SECRET: &str = "rahasia";

struct Harness {
    db: DbPool,
    kelas: classes::Model,
    student: students::Model,
    queue: OfflineQueue,
    connectivity: Connectivity,
    ledger: TransactionService,
    form: TransactionFormService,
    sync: SyncService,
    profiles: ProfileService,
    wali_kelas: WaliKelasService,
}

async fn insert_class(db: &DbPool, nama: &str) -> classes::Model {
    let now = chrono::Utc::now();
    classes::ActiveModel {
        id: Set(Uuid::new_v4()),
        nama_kelas: Set(nama.into()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

async fn harness(online: bool) -> Harness {
    let db = connect("sqlite::memory:", 1).await.unwrap();
    run_migrations(&db).await.unwrap();
    let kelas = insert_class(&db, "VII C").await;
    let now = chrono::Utc::now();
    let student = students::ActiveModel {
        id: Set(Uuid::new_v4()),
        nis: Set("2024117".into()),
        nama: Set("Rina Marlina".into()),
        kelas_id: Set(kelas.id),
        saldo: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&db)
    .await
    .unwrap();

    let queue = OfflineQueue::init(connect("sqlite::memory:", 1).await.unwrap())
        .await
        .unwrap();
    let feed = ChangeFeed::default();
    let connectivity = Connectivity::new(online);
    let ledger = TransactionService::new(db.clone(), feed.clone());
    let ledger_ref: LedgerRef = Arc::new(ledger.clone());
    let form = TransactionFormService::new(
        ledger_ref.clone(),
        queue.clone(),
        connectivity.clone(),
        feed.clone(),
    );
    let sync = SyncService::new(
        ledger_ref,
        queue.clone(),
        connectivity.clone(),
        feed.clone(),
        SyncConfig::default(),
    );
    Harness {
        profiles: ProfileService::new(db.clone(), feed.clone()),
        wali_kelas: WaliKelasService::new(db.clone(), feed),
        db,
        kelas,
        student,
        queue,
        connectivity,
        ledger,
        form,
        sync,
    }
}

fn app(
    h: &Harness,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody + use<>>,
        Error = actix_web::Error,
        InitError = (),
    > + use<>,
> {
    App::new()
        .wrap(AuthMiddleware::new(JwtService::new(SECRET)))
        .app_data(web::Data::new(h.queue.clone()))
        .app_data(web::Data::new(h.connectivity.clone()))
        .app_data(web::Data::new(h.ledger.clone()))
        .app_data(web::Data::new(h.form.clone()))
        .app_data(web::Data::new(h.sync.clone()))
        .app_data(web::Data::new(h.profiles.clone()))
        .app_data(web::Data::new(h.wali_kelas.clone()))
        .service(
            web::scope("/api/v1")
                .configure(handlers::transaction_config)
                .configure(handlers::offline_config)
                .configure(handlers::wali_kelas_config),
        )
}

/// Token seperti terbitan auth provider; `app_role` masuk ke `app_metadata`.
fn token(user_id: Uuid, app_role: Option<&str>) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        email: None,
        role: Some("authenticated".into()),
        app_metadata: app_role.map(|r| AppMetadata {
            role: Some(r.into()),
        }),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

async fn user_with_role(h: &Harness, role: Role) -> Uuid {
    let id = Uuid::new_v4();
    h.profiles
        .upsert(UpsertProfileRequest {
            id,
            role,
            nama: Some(format!("{role}")),
            email: None,
        })
        .await
        .unwrap();
    id
}

async fn queue_one(h: &Harness) -> String {
    h.queue
        .add_to_queue(&NewTransaction {
            student_id: h.student.id,
            jenis: TransactionKind::Setor,
            jumlah: 10_000,
            tanggal: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            keterangan: None,
            admin: "Bu Ani".into(),
        })
        .await
        .unwrap()
}

fn setor_body(h: &Harness) -> serde_json::Value {
    serde_json::json!({
        "student_id": h.student.id,
        "jenis": "Setor",
        "jumlah": 15000,
        "tanggal": "2025-03-04",
        "keterangan": "tabungan"
    })
}

#[actix_web::test]
async fn non_admin_cannot_read_transactions() {
    let h = harness(true).await;
    let app = test::init_service(app(&h)).await;

    let siswa = user_with_role(&h, Role::Student).await;
    let tanpa_profil = Uuid::new_v4();
    for user in [siswa, tanpa_profil] {
        let req = test::TestRequest::get()
            .uri("/api/v1/admin/transactions")
            .insert_header(bearer(&token(user, None)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    let admin = user_with_role(&h, Role::Admin).await;
    let req = test::TestRequest::get()
        .uri("/api/v1/admin/transactions")
        .insert_header(bearer(&token(admin, None)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn offline_queue_endpoints_reject_non_admin() {
    let h = harness(true).await;
    let app = test::init_service(app(&h)).await;
    let id = queue_one(&h).await;
    let siswa = token(Uuid::new_v4(), Some("student"));

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/admin/offline/{id}"))
        .insert_header(bearer(&siswa))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(h.queue.get_pending_count().await.unwrap(), 1);

    for req in [
        test::TestRequest::get().uri("/api/v1/admin/offline/status"),
        test::TestRequest::post().uri("/api/v1/admin/offline/sync"),
        test::TestRequest::post().uri("/api/v1/admin/offline/purge"),
    ] {
        let resp = test::call_service(&app, req.insert_header(bearer(&siswa)).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
    assert_eq!(h.queue.get_pending_count().await.unwrap(), 1);

    // klaim admin di token tidak dipakai selama profil bisa dibaca
    let palsu = token(Uuid::new_v4(), Some("admin"));
    let req = test::TestRequest::get()
        .uri("/api/v1/admin/offline/status")
        .insert_header(bearer(&palsu))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let admin = user_with_role(&h, Role::Admin).await;
    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/admin/offline/{id}"))
        .insert_header(bearer(&token(admin, None)))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    assert_eq!(h.queue.get_pending_count().await.unwrap(), 0);
}

#[actix_web::test]
async fn offline_submit_trusts_admin_token_role_only() {
    let h = harness(false).await;
    let app = test::init_service(app(&h)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/transactions")
        .insert_header(bearer(&token(Uuid::new_v4(), Some("student"))))
        .set_json(setor_body(&h))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );
    let req = test::TestRequest::post()
        .uri("/api/v1/admin/transactions")
        .insert_header(bearer(&token(Uuid::new_v4(), None)))
        .set_json(setor_body(&h))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(h.queue.get_pending_count().await.unwrap(), 0);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/transactions")
        .insert_header(bearer(&token(Uuid::new_v4(), Some("admin"))))
        .set_json(setor_body(&h))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "queued");
    assert_eq!(h.queue.get_pending_count().await.unwrap(), 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/offline/status")
        .insert_header(bearer(&token(Uuid::new_v4(), Some("admin"))))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["online"], false);
    assert_eq!(body["data"]["pending_count"], 1);
}

#[actix_web::test]
async fn online_submit_uses_profile_role() {
    let h = harness(true).await;
    let app = test::init_service(app(&h)).await;

    let siswa = user_with_role(&h, Role::Student).await;
    let req = test::TestRequest::post()
        .uri("/api/v1/admin/transactions")
        .insert_header(bearer(&token(siswa, Some("admin"))))
        .set_json(setor_body(&h))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let admin = user_with_role(&h, Role::Admin).await;
    let req = test::TestRequest::post()
        .uri("/api/v1/admin/transactions")
        .insert_header(bearer(&token(admin, None)))
        .set_json(setor_body(&h))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "applied");
    assert_eq!(body["data"]["saldo_setelah"], 15000);
    assert_eq!(h.queue.get_pending_count().await.unwrap(), 0);
}

#[actix_web::test]
async fn wali_kelas_sees_only_own_roster() {
    let h = harness(true).await;
    let app = test::init_service(app(&h)).await;
    let kelas_lain = insert_class(&h.db, "VII D").await;

    let wali_a = user_with_role(&h, Role::WaliKelas).await;
    let wali_b = user_with_role(&h, Role::WaliKelas).await;
    for (user_id, kelas_id, nama) in [
        (wali_a, h.kelas.id, "Bu Sari"),
        (wali_b, kelas_lain.id, "Pak Joko"),
    ] {
        h.wali_kelas
            .assign(AssignWaliKelasRequest {
                user_id,
                kelas_id,
                nama: nama.into(),
            })
            .await
            .unwrap();
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/wali-kelas/{wali_b}/students"))
        .insert_header(bearer(&token(wali_a, None)))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/wali-kelas/{wali_a}/students"))
        .insert_header(bearer(&token(wali_a, None)))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["nama_kelas"], "VII C");
    assert_eq!(body["data"]["students"][0]["nama"], "Rina Marlina");

    // siswa biasa tidak punya akses roster sama sekali
    let siswa = user_with_role(&h, Role::Student).await;
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/wali-kelas/{wali_a}/students"))
        .insert_header(bearer(&token(siswa, None)))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );
}
