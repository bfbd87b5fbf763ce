// Shared fixtures for the wiremock-backed integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use classbook_core::auth::MemoryStorage;
use classbook_core::{Classbook, Config};

pub const TOKEN: &str = "tok-device-a";
pub const EXPIRED_MSG: &str =
    "Phiên đăng nhập đã hết hạn (tài khoản vừa đăng nhập trên thiết bị khác)";

pub fn config_for(server: &MockServer) -> Config {
    Config {
        base_url: format!("{}/api", server.uri()),
        ..Config::default()
    }
}

pub async fn setup() -> (MockServer, Classbook) {
    let server = MockServer::start().await;
    let classbook =
        Classbook::with_storage(&config_for(&server), Box::new(MemoryStorage::default())).unwrap();
    (server, classbook)
}

pub fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "code": 200, "msg": "OK", "data": data }))
}

pub fn expired(status: u16) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({ "code": status, "msg": EXPIRED_MSG }))
}

pub fn classes_page(names: &[&str], page: u32, total: u64) -> Value {
    let classes: Vec<Value> = names
        .iter()
        .enumerate()
        .map(|(i, name)| json!({ "id": format!("c{}-{}", page, i), "name": name, "schoolYear": "2024-2025" }))
        .collect();
    json!({
        "classes": classes,
        "pagination": { "page": page, "limit": 10, "total": total, "totalPages": 2 }
    })
}

/// Mount a login endpoint and the identity check, then log in.
pub async fn logged_in() -> (MockServer, Classbook) {
    let (server, classbook) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ok(json!({
            "token": TOKEN,
            "user": { "id": 1, "role": "teacher", "email": "gv@truong.edu.vn" }
        })))
        .mount(&server)
        .await;

    classbook
        .login("gv@truong.edu.vn", "matkhau")
        .await
        .expect("login should succeed");
    (server, classbook)
}

pub async fn mount_identity_ok(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ok(json!({ "id": 1, "role": "teacher", "email": "gv@truong.edu.vn" })))
        .mount(server)
        .await;
}
