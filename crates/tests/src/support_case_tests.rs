use crate::fixtures::seed::{case_body, message_body};
use crate::fixtures::test_app::TestApp;
use serde_json::Value;
use std::time::Duration;

#[tokio::test]
async fn client_created_case_starts_open_and_seen_only_by_client() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let case = app
        .open_case(
            Some(&m.client),
            case_body("Jane Client", &m.admin.id, &m.client.id, Some(&m.property_a.id)),
        )
        .await;

    assert_eq!(case["case_status"], "open");
    assert_eq!(case["opened_by"], "client");
    assert!(case["closed_by"].is_null());

    let conversation = case["conversation"].as_array().unwrap();
    assert_eq!(conversation.len(), 1);
    let first = &conversation[0];
    assert_eq!(first["inquiry_about"], "Marina Villa availability");
    assert_eq!(first["message"], "A representative will be with you shortly.");
    assert_eq!(first["seen_by_client"], true);
    assert_eq!(first["seen_by_admin"], false);
    assert_eq!(first["seen_by_agent"], false);
    assert_eq!(first["message_by"]["author_id"], m.client.hex());
}

#[tokio::test]
async fn guest_creation_counts_as_client() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let case = app
        .open_case(None, case_body("Walk-in", &m.admin.id, &m.client.id, None))
        .await;
    assert_eq!(case["opened_by"], "client");
    assert_eq!(case["conversation"][0]["seen_by_client"], true);
}

#[tokio::test]
async fn staff_openers_get_staff_first_message() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let by_admin = app
        .open_case(
            Some(&m.admin),
            case_body("Agent A", &m.admin.id, &m.agent_a.id, Some(&m.property_a.id)),
        )
        .await;
    assert_eq!(by_admin["opened_by"], "super_admin");
    let first = &by_admin["conversation"][0];
    assert_eq!(first["message"], "New support case created by Platform Administration");
    assert_eq!(first["seen_by_admin"], true);
    assert_eq!(first["seen_by_agent"], false);
    assert_eq!(first["seen_by_client"], false);
    // Admin-opened cases are authored by the supporter
    assert_eq!(first["message_by"]["author_id"], m.admin.hex());

    let by_agent = app
        .open_case(
            Some(&m.agent_a),
            case_body("Agent A", &m.admin.id, &m.agent_a.id, Some(&m.property_a.id)),
        )
        .await;
    assert_eq!(by_agent["opened_by"], "agent");
    let first = &by_agent["conversation"][0];
    assert_eq!(first["message"], "New support case created by agent");
    assert_eq!(first["seen_by_agent"], true);
    assert_eq!(first["seen_by_admin"], false);
}

#[tokio::test]
async fn create_rejects_missing_or_malformed_fields() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let mut body = case_body("Jane", &m.admin.id, &m.client.id, None);
    body.as_object_mut().unwrap().remove("inquiry_about");
    let resp = app
        .auth_post("/api/support-cases/new", &m.client.access_token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"], "validation");

    let mut body = case_body("Jane", &m.admin.id, &m.client.id, None);
    body["supporter_id"] = serde_json::json!("not-an-id");
    let resp = app
        .auth_post("/api/support-cases/new", &m.client.access_token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    // Nothing was written
    let count = app
        .db
        .collection::<bson::Document>("support_cases")
        .count_documents(bson::doc! {})
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn create_emails_with_property_name_or_fallback() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    app.open_case(
        Some(&m.client),
        case_body("Jane", &m.admin.id, &m.client.id, Some(&m.property_a.id)),
    )
    .await;
    app.open_case(Some(&m.client), case_body("Jane", &m.admin.id, &m.client.id, None))
        .await;

    let sent = app.emails.wait_for(2, Duration::from_secs(5)).await;
    assert_eq!(sent.len(), 2);
    let subjects: Vec<&str> = sent.iter().map(|e| e.subject.as_str()).collect();
    assert!(subjects.contains(&"New Support Case | Marina Villa"));
    assert!(subjects.contains(&"New Support Case | Unknown Property"));
}

#[tokio::test]
async fn notifier_failure_does_not_fail_the_write() {
    let app = TestApp::spawn_with_failing_notifier().await;
    let m = app.seed_marketplace().await;

    let case = app
        .open_case(Some(&m.client), case_body("Jane", &m.admin.id, &m.client.id, None))
        .await;
    let id = case["id"].as_str().unwrap();

    let resp = app
        .auth_put(&format!("/api/support-cases/{}", id), &m.admin.access_token)
        .json(&serde_json::json!({ "case_status": "closed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn get_case_expands_supporter_and_property() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let case = app
        .open_case(
            Some(&m.client),
            case_body("Jane", &m.agent_a.id, &m.client.id, Some(&m.property_a.id)),
        )
        .await;
    let id = case["id"].as_str().unwrap();

    let fetched = app.fetch_case(id, &m.agent_a.access_token).await;
    assert_eq!(fetched["supporter"]["display_name"], "Agent A");
    assert_eq!(fetched["property"]["property_name"], "Marina Villa");
    assert_eq!(fetched["property"]["belongs_to"], m.agent_a.hex());
}

#[tokio::test]
async fn get_missing_or_malformed_case() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let resp = app
        .auth_get(
            &format!("/api/support-cases/{}", bson::oid::ObjectId::new().to_hex()),
            &m.admin.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app
        .auth_get("/api/support-cases/xyz", &m.admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn update_appends_message_and_keeps_opener() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let case = app
        .open_case(Some(&m.client), case_body("Jane", &m.admin.id, &m.client.id, None))
        .await;
    let id = case["id"].as_str().unwrap();

    let resp = app
        .auth_put(&format!("/api/support-cases/{}", id), &m.admin.access_token)
        .json(&serde_json::json!({
            "message": { "message": "Hello Jane, how can I help?" },
            "opened_by": "agent",
            "rating": 4,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let updated: Value = resp.json().await.unwrap();

    assert_eq!(updated["opened_by"], "client");
    assert_eq!(updated["rating"], 4);
    let conversation = updated["conversation"].as_array().unwrap();
    assert_eq!(conversation.len(), 2);
    let reply = &conversation[1];
    assert_eq!(reply["message"], "Hello Jane, how can I help?");
    assert_eq!(reply["message_by"]["display_name"], "Platform Admin");
    assert_eq!(reply["message_by"]["author_id"], m.admin.hex());
    assert_eq!(reply["seen_by_admin"], true);
    assert_eq!(reply["seen_by_client"], false);
    assert!(reply["inquiry_about"].is_null());
}

#[tokio::test]
async fn close_transitions_once_and_never_reopens() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let case = app
        .open_case(
            Some(&m.client),
            case_body("Jane", &m.agent_a.id, &m.client.id, Some(&m.property_a.id)),
        )
        .await;
    let id = case["id"].as_str().unwrap();
    let path = format!("/api/support-cases/{}", id);

    // closed_by without a status change is rejected
    let resp = app
        .auth_put(&path, &m.agent_a.access_token)
        .json(&serde_json::json!({ "closed_by": "agent" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_put(&path, &m.agent_a.access_token)
        .json(&serde_json::json!({ "case_status": "closed", "closed_by": "agent" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let closed: Value = resp.json().await.unwrap();
    assert_eq!(closed["case_status"], "closed");
    assert_eq!(closed["closed_by"], "agent");

    let resp = app
        .auth_put(&path, &m.agent_a.access_token)
        .json(&serde_json::json!({ "case_status": "closed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);

    let resp = app
        .auth_put(&path, &m.admin.access_token)
        .json(&serde_json::json!({ "case_status": "open" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let sent = app.emails.wait_for(2, Duration::from_secs(5)).await;
    assert!(sent.iter().any(|e| e.subject == "Support Case Closed | Marina Villa"));
}

#[tokio::test]
async fn close_without_closed_by_records_caller_role() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let case = app
        .open_case(Some(&m.client), case_body("Jane", &m.admin.id, &m.client.id, None))
        .await;
    let id = case["id"].as_str().unwrap();

    let resp = app
        .auth_put(&format!("/api/support-cases/{}", id), &m.client.access_token)
        .json(&serde_json::json!({ "case_status": "closed" }))
        .send()
        .await
        .unwrap();
    let closed: Value = resp.json().await.unwrap();
    assert_eq!(closed["closed_by"], "client");
}

#[tokio::test]
async fn append_and_close_land_together_and_late_messages_are_kept() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let case = app
        .open_case(Some(&m.client), case_body("Jane", &m.admin.id, &m.client.id, None))
        .await;
    let path = format!("/api/support-cases/{}", case["id"].as_str().unwrap());

    let resp = app
        .auth_put(&path, &m.admin.access_token)
        .json(&serde_json::json!({
            "case_status": "closed",
            "message": { "message": "Closing, thanks!" },
        }))
        .send()
        .await
        .unwrap();
    let closed: Value = resp.json().await.unwrap();
    assert_eq!(closed["case_status"], "closed");
    assert_eq!(closed["closed_by"], "super_admin");
    assert_eq!(closed["conversation"].as_array().unwrap().len(), 2);

    let resp = app
        .auth_put(&path, &m.client.access_token)
        .json(&message_body("One more question"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let late: Value = resp.json().await.unwrap();
    assert_eq!(late["case_status"], "closed");
    assert_eq!(late["conversation"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn update_errors() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let case = app
        .open_case(Some(&m.client), case_body("Jane", &m.admin.id, &m.client.id, None))
        .await;
    let path = format!("/api/support-cases/{}", case["id"].as_str().unwrap());

    let empty = app
        .auth_put(&path, &m.admin.access_token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status().as_u16(), 400);

    let bad_rating = app
        .auth_put(&path, &m.admin.access_token)
        .json(&serde_json::json!({ "rating": 9 }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_rating.status().as_u16(), 400);

    let blank_message = app
        .auth_put(&path, &m.admin.access_token)
        .json(&message_body(""))
        .send()
        .await
        .unwrap();
    assert_eq!(blank_message.status().as_u16(), 400);

    let missing = app
        .auth_put(
            &format!("/api/support-cases/{}", bson::oid::ObjectId::new().to_hex()),
            &m.admin.access_token,
        )
        .json(&serde_json::json!({ "rating": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn concurrent_appends_both_persist() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let case = app
        .open_case(
            Some(&m.client),
            case_body("Jane", &m.agent_a.id, &m.client.id, Some(&m.property_a.id)),
        )
        .await;
    let id = case["id"].as_str().unwrap();
    let path = format!("/api/support-cases/{}", id);

    let from_client = app
        .auth_put(&path, &m.client.access_token)
        .json(&message_body("From client"))
        .send();
    let from_agent = app
        .auth_put(&path, &m.agent_a.access_token)
        .json(&message_body("From agent"))
        .send();
    let (a, b) = tokio::join!(from_client, from_agent);
    assert_eq!(a.unwrap().status().as_u16(), 200);
    assert_eq!(b.unwrap().status().as_u16(), 200);

    let fetched = app.fetch_case(id, &m.admin.access_token).await;
    let bodies: Vec<&str> = fetched["conversation"]
        .as_array()
        .unwrap()
        .iter()
        .map(|msg| msg["message"].as_str().unwrap())
        .collect();
    assert_eq!(bodies.len(), 3);
    assert!(bodies.contains(&"From client"));
    assert!(bodies.contains(&"From agent"));
}

#[tokio::test]
async fn delete_message_removes_exactly_one() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let case = app
        .open_case(Some(&m.client), case_body("Jane", &m.admin.id, &m.client.id, None))
        .await;
    let id = case["id"].as_str().unwrap().to_string();
    let path = format!("/api/support-cases/{}", id);

    for text in ["first reply", "second reply", "third reply"] {
        app.auth_put(&path, &m.admin.access_token)
            .json(&message_body(text))
            .send()
            .await
            .unwrap();
    }
    let before = app.fetch_case(&id, &m.admin.access_token).await;
    let before_msgs = before["conversation"].as_array().unwrap().clone();
    assert_eq!(before_msgs.len(), 4);
    let target = before_msgs[2]["id"].as_str().unwrap();

    let resp = app
        .auth_delete(&format!("{}/messages/{}", path, target), &m.admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let after: Value = resp.json().await.unwrap();
    let after_msgs = after["conversation"].as_array().unwrap();

    assert_eq!(after_msgs.len(), 3);
    let expected: Vec<&Value> = before_msgs.iter().filter(|m| m["id"] != target).collect();
    for (kept, original) in after_msgs.iter().zip(expected) {
        assert_eq!(kept, original);
    }

    // Same message again, and an unknown case
    let again = app
        .auth_delete(&format!("{}/messages/{}", path, target), &m.admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 404);
    let err: Value = again.json().await.unwrap();
    assert_eq!(err["message"], "Message not found in this case");

    let unknown_case = app
        .auth_delete(
            &format!(
                "/api/support-cases/{}/messages/{}",
                bson::oid::ObjectId::new().to_hex(),
                target
            ),
            &m.admin.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_case.status().as_u16(), 404);
    let err: Value = unknown_case.json().await.unwrap();
    assert_eq!(err["message"], "Support case not found");
}

#[tokio::test]
async fn only_staff_reassign_a_case() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let case = app
        .open_case(
            Some(&m.client),
            case_body("Jane", &m.agent_a.id, &m.client.id, Some(&m.property_a.id)),
        )
        .await;
    let id = case["id"].as_str().unwrap();
    let path = format!("/api/support-cases/{}", id);

    // A participating client may not move the case to another listing
    let moved = app
        .auth_put(&path, &m.client.access_token)
        .json(&serde_json::json!({ "property_id": m.property_b.hex() }))
        .send()
        .await
        .unwrap();
    assert_eq!(moved.status().as_u16(), 403);

    let rerouted = app
        .auth_put(&path, &m.client.access_token)
        .json(&serde_json::json!({
            "supporter_id": m.agent_b.hex(),
            "message": { "message": "Please hand this over" },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(rerouted.status().as_u16(), 403);

    let unchanged = app.fetch_case(id, &m.admin.access_token).await;
    assert_eq!(unchanged["property_id"], m.property_a.hex());
    assert_eq!(unchanged["supporter_id"], m.agent_a.hex());
    assert_eq!(unchanged["conversation"].as_array().unwrap().len(), 1);

    let outsider = app
        .auth_get(&path, &m.agent_b.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(outsider.status().as_u16(), 403);

    // Clients can still rate their own case
    let rated = app
        .auth_put(&path, &m.client.access_token)
        .json(&serde_json::json!({ "rating": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(rated.status().as_u16(), 200);

    // Staff reassignment goes through and changes who can read the case
    let reassigned: Value = app
        .auth_put(&path, &m.admin.access_token)
        .json(&serde_json::json!({
            "supporter_id": m.agent_b.hex(),
            "supporter_name": "Agent B",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reassigned["supporter_id"], m.agent_b.hex());
    assert_eq!(reassigned["supporter_name"], "Agent B");
    app.fetch_case(id, &m.agent_b.access_token).await;
}

#[tokio::test]
async fn opening_message_cannot_be_deleted() {
    let app = TestApp::spawn().await;
    let m = app.seed_marketplace().await;

    let case = app
        .open_case(Some(&m.client), case_body("Jane", &m.admin.id, &m.client.id, None))
        .await;
    let id = case["id"].as_str().unwrap();
    let first = case["conversation"][0]["id"].as_str().unwrap();

    let resp = app
        .auth_delete(
            &format!("/api/support-cases/{}/messages/{}", id, first),
            &m.admin.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let fetched = app.fetch_case(id, &m.admin.access_token).await;
    assert_eq!(fetched["conversation"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn health_check() {
    let app = TestApp::spawn().await;
    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
