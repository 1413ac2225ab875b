//! End-to-end tests of the REST API over the in-memory repository.
//!
//! Requests are driven in-process through `tower::ServiceExt::oneshot`.

mod support;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;

use support::{patient_body, TestApp};
use valyanmed::db::repository::UserRepository;
use valyanmed::models::UserRole;

// =========================================================
// Health and authentication
// =========================================================

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");

    app.repo.set_healthy(false);
    let (_, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn test_login_returns_token_and_profile() {
    let app = TestApp::new().await;
    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "admin", "password": support::ADMIN_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isSuccess"], true);
    assert_eq!(body["value"]["tokenType"], "Bearer");
    assert_eq!(body["value"]["user"]["role"], "admin");
    assert!(body["value"]["user"].get("passwordHash").is_none());

    let token = body["value"]["token"].as_str().unwrap();
    let (status, me) = app.get("/api/auth/me", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["value"]["username"], "admin");
    assert!(!me["value"]["lastLogin"].is_null());
}

#[tokio::test]
async fn test_wrong_password_is_401() {
    let app = TestApp::new().await;
    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["isSuccess"], false);
    assert_eq!(body["errors"], json!(["Invalid username or password"]));
}

#[tokio::test]
async fn test_protected_routes_require_a_valid_token() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/api/patients", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["isSuccess"], false);

    let (status, _) = app.get("/api/patients", "garbage").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = app.repo.find_user_by_username("admin").await.unwrap().unwrap();
    let expired = app
        .auth
        .keys()
        .issue_at(&admin, Utc::now() - Duration::hours(5))
        .unwrap();
    let (status, body) = app.get("/api/patients", &expired.token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errors"], json!(["Session has expired"]));
}

#[tokio::test]
async fn test_users_routes_are_admin_only() {
    let app = TestApp::new().await;
    let nurse = app.user_token("asistenta", UserRole::Nurse).await;

    let (status, body) = app.get("/api/users", &nurse).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["isSuccess"], false);

    // other resources stay available
    let (status, _) = app.get("/api/patients", &nurse).await;
    assert_eq!(status, StatusCode::OK);

    let admin = app.admin_token().await;
    let (status, body) = app.get("/api/users", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_admin_cannot_deactivate_self() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let admin = app.repo.find_user_by_username("admin").await.unwrap().unwrap();

    let (status, _) = app.delete(&format!("/api/users/{}", admin.id), &token).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .put(
            &format!("/api/users/{}", admin.id),
            &token,
            json!({
                "email": "admin@valyanmed.ro",
                "displayName": "Administrator",
                "role": "admin",
                "isActive": false
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"]["isActive"], true);

    let (status, _) = app.get("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_user_over_http() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let (status, body) = app
        .post(
            "/api/users",
            &token,
            json!({
                "username": "dr.ionescu",
                "email": "ionescu@valyanmed.ro",
                "displayName": "Dr. Ionescu",
                "role": "doctor",
                "password": "parola-lunga"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["value"]["role"], "doctor");

    let (status, _) = app
        .post(
            "/api/users",
            &token,
            json!({
                "username": "dr.ionescu",
                "email": "alt@valyanmed.ro",
                "displayName": "Alt",
                "role": "doctor",
                "password": "parola-lunga"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.login("dr.ionescu", "parola-lunga").await;
}

// =========================================================
// Patients: CRUD, status mapping and listings
// =========================================================

#[tokio::test]
async fn test_patient_crud_round_trip() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let (status, body) = app
        .post("/api/patients", &token, patient_body("1850312400012", "Popescu", "Iasi"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["isSuccess"], true);
    let id = body["value"]["id"].as_i64().unwrap();
    assert_eq!(body["value"]["isActive"], true);

    let (status, body) = app.get(&format!("/api/patients/{}", id), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"]["lastName"], "Popescu");

    let mut update = patient_body("1850312400012", "Popescu-Radu", "Cluj");
    update["email"] = json!("popescu@example.com");
    let (status, body) = app.put(&format!("/api/patients/{}", id), &token, update).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"]["city"], "Cluj");

    let (status, body) = app.get("/api/patients/by-cnp/1850312400012", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"]["id"], id);

    let (status, body) = app.delete(&format!("/api/patients/{}", id), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "isSuccess": true, "errors": [] }));

    // soft delete: hidden from default listings, still readable by id
    let (_, body) = app.get("/api/patients", &token).await;
    assert!(body["value"].as_array().unwrap().is_empty());
    let (_, body) = app.get("/api/patients?includeInactive=true", &token).await;
    assert_eq!(body["value"].as_array().unwrap().len(), 1);
    let (_, body) = app.get(&format!("/api/patients/{}", id), &token).await;
    assert_eq!(body["value"]["isActive"], false);
}

#[tokio::test]
async fn test_patient_validation_is_400_with_every_message() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let mut body = patient_body("1850312400013", "", "Iasi");
    body["email"] = json!("not-an-email");
    let (status, body) = app.post("/api/patients", &token, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["isSuccess"], false);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 3, "{:?}", errors);
    assert!(body.get("value").is_none());
}

#[tokio::test]
async fn test_duplicate_cnp_is_409() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let (status, _) = app
        .post("/api/patients", &token, patient_body("1850312400012", "Popescu", "Iasi"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app
        .post("/api/patients", &token, patient_body("1850312400012", "Ionescu", "Cluj"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["isSuccess"], false);
}

#[tokio::test]
async fn test_missing_patient_is_404() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let (status, body) = app.get("/api/patients/999", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["isSuccess"], false);

    let (status, _) = app.get("/api/patients/by-cnp/1850312400020", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_requests_get_an_outcome_body() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/patients")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"cnp\": 12"))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["isSuccess"], false);

    let (status, body) = app.get("/api/patients/abc", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["isSuccess"], false);

    let (status, _) = app.get("/api/patients/paged?page=first", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_paged_and_grouped_listings() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let patients = [
        ("1850312400012", "Popescu", "Iasi"),
        ("1850312400020", "Ionescu", "Cluj"),
        ("1850312400039", "Avram", "Iasi"),
        ("1850312400047", "Marin", "Brasov"),
        ("1850312400055", "Georgescu", "Iasi"),
    ];
    for (cnp, name, city) in patients {
        let (status, _) = app.post("/api/patients", &token, patient_body(cnp, name, city)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // page 0 and an oversized page size are normalized
    let (status, body) = app
        .get("/api/patients/paged?page=0&pageSize=500", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"]["page"], 1);
    assert_eq!(body["value"]["pageSize"], 100);
    assert_eq!(body["value"]["totalCount"], 5);

    let (_, body) = app
        .get(
            "/api/patients/paged?page=1&pageSize=2&sortColumn=lastName&sortDirection=desc",
            &token,
        )
        .await;
    let names: Vec<_> = body["value"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["lastName"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Popescu", "Marin"]);
    assert_eq!(body["value"]["totalPages"], 3);
    assert_eq!(body["value"]["hasNext"], true);

    for direction in ["Desc", "DESC"] {
        let uri = format!(
            "/api/patients/paged?pageSize=2&sortColumn=lastName&sortDirection={}",
            direction
        );
        let (status, body) = app.get(&uri, &token).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["value"]["items"][0]["lastName"], "Popescu");
    }

    let (status, body) = app
        .get("/api/patients/paged?page=9223372036854775807&pageSize=10", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["value"]["items"].as_array().unwrap().is_empty());
    assert_eq!(body["value"]["totalCount"], 5);
    assert_eq!(body["value"]["page"], i64::from(i32::MAX));

    // beyond the last page: no items, totals still reported
    let (_, body) = app.get("/api/patients/paged?page=9&pageSize=2", &token).await;
    assert!(body["value"]["items"].as_array().unwrap().is_empty());
    assert_eq!(body["value"]["totalCount"], 5);

    let (_, body) = app.get("/api/patients/paged?search=IASI", &token).await;
    assert_eq!(body["value"]["totalCount"], 3);

    let (status, body) = app.get("/api/patients/grouped?groupBy=city", &token).await;
    assert_eq!(status, StatusCode::OK);
    let groups = body["value"]["groups"].as_array().unwrap();
    let keys: Vec<_> = groups.iter().map(|g| g["key"].as_str().unwrap()).collect();
    assert_eq!(keys, vec!["Brasov", "Cluj", "Iasi"]);
    assert_eq!(groups[2]["count"], 3);

    let (status, body) = app.get("/api/patients/grouped?groupBy=lastName", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"][0].as_str().unwrap().contains("Cannot group by"));

    let (status, _) = app.get("/api/patients/grouped", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =========================================================
// Departments, staff, devices, medications, partners
// =========================================================

async fn create(app: &TestApp, token: &str, uri: &str, body: serde_json::Value) -> i64 {
    let (status, response) = app.post(uri, token, body).await;
    assert_eq!(status, StatusCode::CREATED, "{}: {}", uri, response);
    response["value"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_department_hierarchy_and_staff_placement() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let category = |name: &str| json!({ "name": name, "kind": "category" });
    let medical = create(&app, &token, "/api/departments", category("Medical")).await;
    let surgical = create(&app, &token, "/api/departments", category("Surgical")).await;
    let cardiology = create(
        &app,
        &token,
        "/api/departments",
        json!({ "name": "Cardiology", "kind": "specialty", "parentId": medical }),
    )
    .await;

    // a subspecialty cannot hang off a category
    let (status, _) = app
        .post(
            "/api/departments",
            &token,
            json!({ "name": "Interventional", "kind": "subspecialty", "parentId": medical }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get("/api/departments/tree", &token).await;
    let roots = body["value"].as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["name"], "Medical");
    assert_eq!(roots[0]["children"][0]["name"], "Cardiology");

    let (_, body) = app.get(&format!("/api/departments/{}/children", medical), &token).await;
    assert_eq!(body["value"].as_array().unwrap().len(), 1);
    let (_, body) = app.get("/api/departments/by-kind/category", &token).await;
    assert_eq!(body["value"].as_array().unwrap().len(), 2);

    let (status, _) = app.delete(&format!("/api/departments/{}", medical), &token).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // an update cannot switch the flag off behind the delete rule
    let (status, body) = app
        .put(
            &format!("/api/departments/{}", medical),
            &token,
            json!({ "name": "Medical", "kind": "category", "isActive": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"]["isActive"], true);
    let (_, body) = app.get("/api/departments/tree", &token).await;
    assert_eq!(body["value"].as_array().unwrap().len(), 2);

    let staff = json!({
        "firstName": "Ana",
        "lastName": "Pop",
        "position": "doctor",
        "licenseNumber": "CMR-1001",
        "categoryId": medical,
        "specialtyId": cardiology
    });
    let staff_id = create(&app, &token, "/api/medical-staff", staff).await;
    let (_, body) = app
        .get(&format!("/api/medical-staff/by-department/{}", cardiology), &token)
        .await;
    assert_eq!(body["value"][0]["id"], staff_id);

    // specialty outside the selected category
    let misplaced = json!({
        "firstName": "Dan",
        "lastName": "Pop",
        "position": "doctor",
        "categoryId": surgical,
        "specialtyId": cardiology
    });
    let (status, _) = app.post("/api/medical-staff", &token, misplaced).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let duplicate_license = json!({
        "firstName": "Ion",
        "lastName": "Rus",
        "position": "nurse",
        "licenseNumber": "CMR-1001"
    });
    let (status, _) = app.post("/api/medical-staff", &token, duplicate_license).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_devices_due_for_maintenance() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let today = Utc::now().date_naive();

    let soon = create(
        &app,
        &token,
        "/api/medical-devices",
        json!({
            "name": "ECG",
            "serialNumber": "ecg-001",
            "nextMaintenance": (today + Duration::days(10)).to_string()
        }),
    )
    .await;
    create(
        &app,
        &token,
        "/api/medical-devices",
        json!({
            "name": "MRI",
            "serialNumber": "mri-001",
            "nextMaintenance": (today + Duration::days(90)).to_string()
        }),
    )
    .await;

    let (status, body) = app.get("/api/medical-devices/maintenance-due", &token).await;
    assert_eq!(status, StatusCode::OK);
    let due = body["value"].as_array().unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0]["id"], soon);
    assert_eq!(due[0]["serialNumber"], "ECG-001");

    let (_, body) = app.get("/api/medical-devices/maintenance-due?days=120", &token).await;
    assert_eq!(body["value"].as_array().unwrap().len(), 2);

    let (status, _) = app.get("/api/medical-devices/maintenance-due?days=1000", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/medical-devices",
            &token,
            json!({
                "name": "Echo",
                "serialNumber": "echo-1",
                "lastMaintenance": today.to_string(),
                "nextMaintenance": (today - Duration::days(1)).to_string()
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_medication_stock_adjustments() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let id = create(
        &app,
        &token,
        "/api/medications",
        json!({
            "name": "Paracetamol 500",
            "activeSubstance": "paracetamol",
            "form": "tablet",
            "stockQuantity": 10,
            "minStock": 5,
            "unitPrice": 2.5
        }),
    )
    .await;

    let (_, body) = app.get("/api/medications/low-stock", &token).await;
    assert!(body["value"].as_array().unwrap().is_empty());

    let uri = format!("/api/medications/{}/stock", id);
    let (status, body) = app.post(&uri, &token, json!({ "delta": -6 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"]["stockQuantity"], 4);

    let (_, body) = app.get("/api/medications/low-stock", &token).await;
    assert_eq!(body["value"][0]["id"], id);

    let (status, _) = app.post(&uri, &token, json!({ "delta": -20 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post(&uri, &token, json!({ "delta": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/medications",
            &token,
            json!({ "name": "Bad", "activeSubstance": "x", "form": "syrup", "unitPrice": -1.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_partner_fiscal_code_rules() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let id = create(
        &app,
        &token,
        "/api/partners",
        json!({
            "name": "Farmacia Centrala",
            "partnerType": "pharmacy",
            "fiscalCode": "RO 18547290"
        }),
    )
    .await;

    let (status, body) = app.get("/api/partners/by-fiscal-code/ro18547290", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"]["id"], id);
    assert_eq!(body["value"]["fiscalCode"], "18547290");

    let (status, _) = app
        .post(
            "/api/partners",
            &token,
            json!({ "name": "Copie", "partnerType": "supplier", "fiscalCode": "18547290" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(
            "/api/partners",
            &token,
            json!({ "name": "Gresit", "partnerType": "supplier", "fiscalCode": "18547291" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get("/api/partners/grouped?groupBy=partnerType", &token).await;
    assert_eq!(body["value"]["groups"][0]["key"], "pharmacy");
}
