use crate::fixtures::seed::case_body;
use crate::fixtures::test_app::TestApp;
use serde_json::Value;

fn ids(cases: &[Value]) -> Vec<String> {
    cases
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn agent_open_b2b_listing_only_holds_own_cases() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let mine = app
        .open_case(
            Some(&m.admin),
            case_body("Agent A", &m.agent_a.id, &m.agent_a.id, Some(&m.property_b.id)),
        )
        .await;
    let theirs = app
        .open_case(
            Some(&m.admin),
            case_body("Agent B", &m.agent_b.id, &m.agent_b.id, Some(&m.property_b.id)),
        )
        .await;
    // B2C case on agent A's property: excluded from B2B listings
    app.open_case(
        Some(&m.client),
        case_body("Jane", &m.admin.id, &m.client.id, Some(&m.property_a.id)),
    )
    .await;

    let resp = app
        .auth_get(
            "/api/support-cases?status=open&origin=b2b",
            &m.agent_a.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let cases: Vec<Value> = resp.json().await.unwrap();

    assert_eq!(ids(&cases), vec![mine["id"].as_str().unwrap().to_string()]);
    for case in &cases {
        assert_eq!(case["case_status"], "open");
        assert_ne!(case["opened_by"], "client");
        assert_eq!(case["supporter_id"], m.agent_a.hex());
    }
    assert!(!ids(&cases).contains(&theirs["id"].as_str().unwrap().to_string()));
}

#[tokio::test]
async fn agent_b2c_listing_includes_cases_on_owned_properties() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let on_a = app
        .open_case(
            Some(&m.client),
            case_body("Jane", &m.admin.id, &m.client.id, Some(&m.property_a.id)),
        )
        .await;
    let on_b = app
        .open_case(
            Some(&m.client),
            case_body("Jane", &m.admin.id, &m.client.id, Some(&m.property_b.id)),
        )
        .await;

    let cases: Vec<Value> = app
        .auth_get("/api/support-cases?origin=b2c", &m.agent_a.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let listed = ids(&cases);
    assert!(listed.contains(&on_a["id"].as_str().unwrap().to_string()));
    assert!(!listed.contains(&on_b["id"].as_str().unwrap().to_string()));
    assert_eq!(cases[0]["property"]["property_name"], "Marina Villa");
}

#[tokio::test]
async fn listings_are_partitioned_by_status() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let open = app
        .open_case(Some(&m.client), case_body("Jane", &m.admin.id, &m.client.id, None))
        .await;
    let to_close = app
        .open_case(Some(&m.client), case_body("Jane", &m.admin.id, &m.client.id, None))
        .await;
    app.auth_put(
        &format!("/api/support-cases/{}", to_close["id"].as_str().unwrap()),
        &m.admin.access_token,
    )
    .json(&serde_json::json!({ "case_status": "closed" }))
    .send()
    .await
    .unwrap();

    let open_cases: Vec<Value> = app
        .auth_get("/api/support-cases?status=open", &m.admin.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ids(&open_cases), vec![open["id"].as_str().unwrap().to_string()]);

    let closed_cases: Vec<Value> = app
        .auth_get("/api/support-cases?status=closed&origin=b2c", &m.admin.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ids(&closed_cases), vec![to_close["id"].as_str().unwrap().to_string()]);

    let all: Vec<Value> = app
        .auth_get("/api/support-cases", &m.admin.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn listing_access_rules() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let client = app
        .auth_get("/api/support-cases?status=open", &m.client.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(client.status().as_u16(), 403);
    let err: Value = client.json().await.unwrap();
    assert_eq!(err["message"], "Access denied");

    let anonymous = app
        .client
        .get(app.url("/api/support-cases"))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status().as_u16(), 401);

    let bad_filter = app
        .auth_get("/api/support-cases?status=pending", &m.admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(bad_filter.status().as_u16(), 400);
}

#[tokio::test]
async fn agent_outside_case_gets_403() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let case = app
        .open_case(
            Some(&m.client),
            case_body("Jane", &m.agent_a.id, &m.client.id, Some(&m.property_a.id)),
        )
        .await;
    let id = case["id"].as_str().unwrap();

    let outsider = app
        .auth_get(&format!("/api/support-cases/{}", id), &m.agent_b.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(outsider.status().as_u16(), 403);
    let err: Value = outsider.json().await.unwrap();
    assert_eq!(err["message"], "Access denied");

    // Owner of the property may read even when not the supporter
    let b_case = app
        .open_case(
            Some(&m.client),
            case_body("Jane", &m.admin.id, &m.client.id, Some(&m.property_b.id)),
        )
        .await;
    let owner = app
        .auth_get(
            &format!("/api/support-cases/{}", b_case["id"].as_str().unwrap()),
            &m.agent_b.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(owner.status().as_u16(), 200);
}

#[tokio::test]
async fn clients_read_only_cases_they_take_part_in() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let case = app
        .open_case(Some(&m.client), case_body("Jane", &m.admin.id, &m.client.id, None))
        .await;
    let id = case["id"].as_str().unwrap();

    app.fetch_case(id, &m.client.access_token).await;

    let stranger = app
        .auth_get(&format!("/api/support-cases/{}", id), &m.other_client.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(stranger.status().as_u16(), 403);

    let bogus = app
        .auth_get(&format!("/api/support-cases/{}", id), "not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(bogus.status().as_u16(), 401);
}

#[tokio::test]
async fn property_listing_is_owner_or_admin_only() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    app.open_case(
        Some(&m.client),
        case_body("Jane", &m.admin.id, &m.client.id, Some(&m.property_a.id)),
    )
    .await;
    app.open_case(
        Some(&m.client),
        case_body("Jane", &m.admin.id, &m.client.id, Some(&m.property_b.id)),
    )
    .await;

    let path = format!("/api/support-cases/property/{}?status=open", m.property_a.hex());

    let owner: Vec<Value> = app
        .auth_get(&path, &m.agent_a.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(owner.len(), 1);
    assert_eq!(owner[0]["property_id"], m.property_a.hex());

    let admin: Vec<Value> = app
        .auth_get(&path, &m.admin.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(admin.len(), 1);

    let other = app
        .auth_get(&path, &m.agent_b.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(other.status().as_u16(), 403);

    let invalid = app
        .auth_get("/api/support-cases/property/nope", &m.admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status().as_u16(), 400);
}

#[tokio::test]
async fn unassigned_cases_for_super_admin() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let unassigned = app.seed_unassigned_case(Some(m.property_a.id)).await;
    app.open_case(Some(&m.client), case_body("Jane", &m.admin.id, &m.client.id, None))
        .await;

    let cases: Vec<Value> = app
        .auth_get("/api/support-cases/unassigned", &m.admin.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ids(&cases), vec![unassigned.to_hex()]);

    let count: Value = app
        .auth_get("/api/support-cases/unassigned/count", &m.admin.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count["count"], 1);

    let agent = app
        .auth_get("/api/support-cases/unassigned", &m.agent_a.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(agent.status().as_u16(), 403);
}
