// Read-through caching, invalidation and exports against a mock server.

mod common;

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use classbook_core::api::ExportParams;
use classbook_core::models::{SchoolClass, Teacher};
use classbook_core::{ApiError, Resource, ScopeParams};

use common::{classes_page, logged_in, mount_identity_ok, ok};

fn year_page(page: u32) -> ScopeParams {
    ScopeParams::new().school_year("2024-2025").page(page, 10)
}

#[tokio::test]
async fn test_pagination_is_served_from_cache() {
    let (server, classbook) = logged_in().await;
    mount_identity_ok(&server).await;

    for (page, names) in [(1, ["10A1", "10A2"]), (2, ["11A1", "11A2"])] {
        Mock::given(method("GET"))
            .and(path("/api/classes"))
            .and(query_param("schoolYear", "2024-2025"))
            .and(query_param("page", page.to_string()))
            .and(query_param("limit", "10"))
            .respond_with(ok(classes_page(&names, page, 4)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let first = classbook.classes(year_page(1)).await.unwrap();
    let second = classbook.classes(year_page(2)).await.unwrap();
    let again = classbook.classes(year_page(1)).await.unwrap();

    assert_eq!(second.records[0].name, "11A1");
    assert!(Arc::ptr_eq(&first.records, &again.records));
    assert_eq!(again.pagination.unwrap().page, 1);
    assert_eq!(again.pagination.unwrap().total, 4);
}

#[tokio::test]
async fn test_mutation_then_fresh_read() {
    let (server, classbook) = logged_in().await;
    mount_identity_ok(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/classes"))
        .respond_with(ok(classes_page(&["10A1"], 1, 1)))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/classes"))
        .respond_with(ok(classes_page(&["10A1", "10A9"], 1, 2)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/classes"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({
                "code": 201,
                "msg": "Tạo lớp thành công",
                "data": { "id": "c9", "name": "10A9", "schoolYear": "2024-2025" }
            })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let before = classbook.classes(year_page(1)).await.unwrap();
    assert_eq!(before.len(), 1);

    let created: Option<SchoolClass> = classbook
        .create(Resource::Classes, &json!({ "name": "10A9", "schoolYear": "2024-2025" }))
        .await
        .unwrap();
    assert_eq!(created.unwrap().name, "10A9");

    let after = classbook.classes(year_page(1)).await.unwrap();
    let names: Vec<&str> = after.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["10A1", "10A9"]);
}

#[tokio::test]
async fn test_invalidation_leaves_other_domains_cached() {
    let (server, classbook) = logged_in().await;
    mount_identity_ok(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/classes"))
        .respond_with(ok(classes_page(&["10A1"], 1, 1)))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/teachers"))
        .respond_with(ok(json!([{ "id": "t1", "fullName": "Lê Văn C" }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/classes/c1-0"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    classbook.classes(year_page(1)).await.unwrap();
    classbook.classes(ScopeParams::new().filter("grade", "10")).await.unwrap();
    let teachers = classbook.teachers(ScopeParams::new()).await.unwrap();
    assert_eq!(teachers.records[0].full_name, "Lê Văn C");

    let updated: Option<serde_json::Value> = classbook
        .update(Resource::Classes, "c1-0", &json!({ "name": "10A1 mới" }))
        .await
        .unwrap();
    assert!(updated.is_none());

    // Teachers still served from cache, classes refetched once for page 1
    // (the filtered view is not reloaded).
    let cached: classbook_core::Page<Teacher> = classbook.teachers(ScopeParams::new()).await.unwrap();
    assert!(Arc::ptr_eq(&cached.records, &teachers.records));
    classbook.classes(year_page(1)).await.unwrap();
}

#[tokio::test]
async fn test_failed_mutation_keeps_cache() {
    let (server, classbook) = logged_in().await;
    mount_identity_ok(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/subjects"))
        .respond_with(ok(json!([{ "id": 1, "name": "Toán" }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/subjects"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "code": 409, "msg": "Môn học đã tồn tại" })),
        )
        .mount(&server)
        .await;

    classbook.subjects(ScopeParams::new()).await.unwrap();
    let err = classbook
        .create::<_, serde_json::Value>(Resource::Subjects, &json!({ "name": "Toán" }))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Api { code: 409, .. }));

    classbook.subjects(ScopeParams::new()).await.unwrap();
}

#[tokio::test]
async fn test_http_conflict_reports_server_message() {
    let (server, classbook) = logged_in().await;
    mount_identity_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/classes"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({ "code": 409, "msg": "Tên lớp đã tồn tại" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = classbook
        .create::<_, serde_json::Value>(Resource::Classes, &json!({ "name": "10A1" }))
        .await
        .unwrap_err();
    match err {
        ApiError::ClientError { status, ref message } => {
            assert_eq!(status, 409);
            assert_eq!(message, "Tên lớp đã tồn tại");
        }
        other => panic!("expected ClientError, got {:?}", other),
    }
    assert!(classbook.session().is_authenticated());
}

#[tokio::test]
async fn test_logout_empties_cache() {
    let (server, classbook) = logged_in().await;
    mount_identity_ok(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/weeks"))
        .respond_with(ok(json!([{ "id": 1, "weekNumber": 1 }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ok(json!(null)))
        .mount(&server)
        .await;

    classbook.weeks(ScopeParams::new()).await.unwrap();
    assert!(!classbook.cache().is_empty());

    classbook.logout().await.unwrap();
    assert!(classbook.cache().is_empty());
}

#[tokio::test]
async fn test_export_preserves_server_filename() {
    let (server, classbook) = logged_in().await;
    mount_identity_ok(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/reports/teaching-records/export"))
        .and(query_param("schoolYear", "2024-2025"))
        .and(query_param("teacherId", "t1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "content-disposition",
                    "attachment; filename*=UTF-8''bao-cao-tuan-1-4.xlsx",
                )
                .insert_header(
                    "content-type",
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                )
                .set_body_bytes(vec![0x50, 0x4b, 0x03, 0x04]),
        )
        .expect(1)
        .mount(&server)
        .await;

    let file = classbook
        .export_teaching_report(&ExportParams::new("2024-2025").teacher("t1").weeks(1, 4))
        .await
        .unwrap();
    assert_eq!(file.filename, "bao-cao-tuan-1-4.xlsx");
    assert_eq!(file.bytes, vec![0x50, 0x4b, 0x03, 0x04]);
    assert!(file.content_type.unwrap().contains("spreadsheetml"));
}

#[tokio::test]
async fn test_export_falls_back_to_default_filename() {
    let (server, classbook) = logged_in().await;
    mount_identity_ok(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/reports/teaching-records/export"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
        .mount(&server)
        .await;

    let file = classbook
        .export_teaching_report(&ExportParams::new("2024-2025"))
        .await
        .unwrap();
    assert_eq!(file.filename, "teaching-report.xlsx");
}

#[tokio::test]
async fn test_export_validation_issues_no_request() {
    let (server, classbook) = logged_in().await;
    Mock::given(method("GET"))
        .and(path("/api/reports/teaching-records/export"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = classbook
        .export_teaching_report(&ExportParams::new(""))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}
