//! HTTP-level integration tests for the location import protocol.
//!
//! Every test runs against the in-memory reference store with a live
//! dispatcher, so no database is needed.

mod common;

use axum::http::StatusCode;
use common::{
    action, admin_token, body_json, build_test_app, get_auth, import, multipart_body, post_form,
    post_multipart, start_upload, user_token, SUMMARY_PATH, TEST_MAX_UPLOAD_BYTES,
};
use psgc_core::entity::EntityType;
use psgc_db::models::region::UpsertRegion;
use psgc_pipeline::record::ReferenceRecord;
use psgc_pipeline::ReferenceStore;

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn headerless_regions_file_imports_end_to_end() {
    let app = build_test_app();

    let (_, done) = import(&app, "regions", "1,NCR,R1\n2,CAR,R2").await;

    assert_eq!(done["status"], "completed");
    assert_eq!(done["processed_rows"], 2);
    assert_eq!(done["total_rows"], 2);
    assert_eq!(done["progress"], 100);
    assert_eq!(
        app.store.records(EntityType::Region).await,
        vec![
            ReferenceRecord::Region(UpsertRegion { id: 1, name: "NCR".into(), code: "R1".into() }),
            ReferenceRecord::Region(UpsertRegion { id: 2, name: "CAR".into(), code: "R2".into() }),
        ]
    );
}

#[tokio::test]
async fn full_hierarchy_loads_top_down() {
    let app = build_test_app();

    let (_, r) = import(&app, "regions", "id,region_name,region_code\n1,CAR,R14\n").await;
    let (_, p) = import(&app, "provinces", "id,province_name,region_code\n10,Abra,R14\n11,Apayao,R14\n").await;
    let (_, c) = import(&app, "citymun", "id,citymun_name,province_id\n100,Bangued,10\n").await;
    let (_, b) = import(
        &app,
        "barangays",
        "id,barangay_name,citymun_id\n1000,Calaba,100\n1001,Zone 1,100\n1002,Zone 2,100\n",
    )
    .await;

    for done in [&r, &p, &c, &b] {
        assert_eq!(done["status"], "completed", "{done}");
    }
    assert_eq!(b["processed_rows"], 3);

    let summary = body_json(get_auth(&app, SUMMARY_PATH, &admin_token(&app)).await).await;
    assert_eq!(summary["data"]["regions"], 1);
    assert_eq!(summary["data"]["provinces"], 2);
    assert_eq!(summary["data"]["citymun"], 1);
    assert_eq!(summary["data"]["barangays"], 3);
}

#[tokio::test]
async fn malformed_rows_are_reported_through_get_errors() {
    let app = build_test_app();
    let data = "1,NCR,R1\nabc,Bad,R2\n3,Ilocos,R3\n4,,R4\n";

    let (upload_id, done) = import(&app, "regions", data).await;

    assert_eq!(done["status"], "completed");
    assert_eq!(done["total_rows"], 4);
    assert_eq!(done["processed_rows"], 2);
    assert_eq!(done["failed_rows"], 2);

    let errors = action(&app, "get_errors", &upload_id).await;
    assert_eq!(errors["success"], true);
    assert_eq!(errors["failed_rows"], 2);
    assert_eq!(errors["errors"][0]["line"], 2);
    assert_eq!(errors["errors"][1]["line"], 4);
    assert_eq!(errors["errors"][1]["reason"], "region_name is empty");
}

#[tokio::test]
async fn reimporting_the_same_file_is_idempotent() {
    let app = build_test_app();
    let data = "1,NCR,R1\n2,CAR,R2\n3,Ilocos,R3\n";

    import(&app, "regions", data).await;
    let first = app.store.records(EntityType::Region).await;
    let (_, again) = import(&app, "regions", data).await;

    assert_eq!(again["status"], "completed");
    assert_eq!(app.store.records(EntityType::Region).await, first);
    assert_eq!(app.store.count(EntityType::Region).await.unwrap(), 3);
}

// ---------------------------------------------------------------------------
// Job-level failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn provinces_before_regions_fail_naming_dependency() {
    let app = build_test_app();

    let (_, done) = import(&app, "provinces", "10,Abra,R14\n").await;

    assert_eq!(done["status"], "error");
    let message = done["message"].as_str().unwrap();
    assert!(message.contains("no regions exist"), "{message}");
    assert_eq!(app.store.count(EntityType::Province).await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Intake failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn intake_failures_answer_success_false() {
    let app = build_test_app();

    let wrong_type = start_upload(&app, "municipalities", "m.csv", b"1,a,1").await;
    assert_eq!(wrong_type["success"], false);
    assert!(wrong_type["message"].as_str().unwrap().contains("municipalities"));

    let wrong_ext = start_upload(&app, "regions", "regions.txt", b"1,NCR,R1").await;
    assert_eq!(wrong_ext["success"], false);

    let empty = start_upload(&app, "regions", "regions.csv", b"").await;
    assert_eq!(empty["success"], false);
    assert_eq!(empty["message"], "The uploaded file is empty");

    let too_big = vec![b'1'; TEST_MAX_UPLOAD_BYTES + 1];
    let large = start_upload(&app, "regions", "regions.csv", &too_big).await;
    assert_eq!(large["success"], false);

    let token = admin_token(&app);
    let no_file = multipart_body(&[("action", "start_upload"), ("upload_type", "regions")], None);
    let json = body_json(post_multipart(&app, Some(&token), no_file).await).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "No file was uploaded");

    assert!(app.jobs.is_empty().await);
}

// ---------------------------------------------------------------------------
// Process / poll / cleanup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn process_twice_is_a_noop_success() {
    let app = build_test_app();
    let (upload_id, done) = import(&app, "regions", "1,NCR,R1\n").await;
    assert_eq!(done["status"], "completed");

    let again = action(&app, "process_upload", &upload_id).await;
    assert_eq!(again["success"], true);
    let progress = action(&app, "get_progress", &upload_id).await;
    assert_eq!(progress["status"], "completed");
    assert_eq!(progress["processed_rows"], 1);
}

#[tokio::test]
async fn cleanup_twice_succeeds_and_forgets_the_job() {
    let app = build_test_app();
    let (upload_id, _) = import(&app, "regions", "1,NCR,R1\n").await;
    let path = app.jobs.get(&upload_id).await.unwrap().source_file_path;
    assert!(path.exists());

    assert_eq!(action(&app, "cleanup", &upload_id).await["success"], true);
    assert_eq!(action(&app, "cleanup", &upload_id).await["success"], true);

    assert!(!path.exists());
    assert!(app.jobs.is_empty().await);
    let gone = action(&app, "get_progress", &upload_id).await;
    assert_eq!(gone["success"], false);
}

#[tokio::test]
async fn unknown_upload_id_answers_success_false() {
    let app = build_test_app();

    for name in ["process_upload", "get_progress", "get_errors"] {
        let json = action(&app, name, "0000").await;
        assert_eq!(json["success"], false, "{name}: {json}");
        assert!(json["message"].as_str().unwrap().contains("0000"));
    }
}

// ---------------------------------------------------------------------------
// Malformed requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_action_is_bad_request() {
    let app = build_test_app();
    let response = post_form(&app, &admin_token(&app), "action=explode&upload_id=1").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "Unknown action 'explode'");
}

#[tokio::test]
async fn missing_upload_id_is_bad_request() {
    let app = build_test_app();
    let response = post_form(&app, &admin_token(&app), "action=get_progress").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Missing required field 'upload_id'");
}

#[tokio::test]
async fn start_upload_requires_multipart() {
    let app = build_test_app();
    let response = post_form(&app, &admin_token(&app), "action=start_upload&upload_type=regions").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = build_test_app();
    let body = multipart_body(&[("action", "get_progress"), ("upload_id", "x")], None);

    let response = post_multipart(&app, None, body).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn non_admin_is_forbidden() {
    let app = build_test_app();
    let body = multipart_body(&[("action", "get_progress"), ("upload_id", "x")], None);

    let response = post_multipart(&app, Some(&user_token(&app)), body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let summary = get_auth(&app, SUMMARY_PATH, &user_token(&app)).await;
    assert_eq!(summary.status(), StatusCode::FORBIDDEN);
}
