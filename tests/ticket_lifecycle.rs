mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use simpleit::authz::Role;

#[tokio::test]
async fn priority_is_derived_on_create_and_update() -> Result<()> {
    let t = common::setup().await?;
    let (employee, _) = t.register("Ada", "ada@example.com").await?;
    let (agent, _) = t.user_with_role("Agent", "agent@example.com", Role::Agent).await?;

    let defaulted = t.create_ticket(&employee, json!({ "title": "Mouse sticks" })).await?;
    assert_eq!(defaulted["urgency"], "Medium");
    assert_eq!(defaulted["impact"], "Medium");
    assert_eq!(defaulted["priority"], "Medium");
    assert_eq!(defaulted["status"], "Open");

    let ticket = t
        .create_ticket(&employee, json!({ "title": "Server down", "urgency": "Critical", "impact": "Low" }))
        .await?;
    assert_eq!(ticket["priority"], "Critical");
    let id = common::id_of(&ticket);

    // Client-supplied priority is not part of the update contract.
    let (status, updated) = t
        .put(&format!("/tickets/{id}"), &agent, json!({ "urgency": "Low", "impact": "High" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "body: {}", updated);
    assert_eq!(updated["priority"], "High");

    let (status, updated) = t
        .put(&format!("/tickets/{id}"), &agent, json!({ "impact": "Low" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["priority"], "Low");
    Ok(())
}

#[tokio::test]
async fn employee_cannot_edit_ticket_fields() -> Result<()> {
    let t = common::setup().await?;
    let (employee, _) = t.register("Ada", "ada@example.com").await?;
    let ticket = t.create_ticket(&employee, json!({ "title": "VPN flaky" })).await?;
    let id = common::id_of(&ticket);

    let (status, body) = t
        .put(&format!("/tickets/{id}"), &employee, json!({ "urgency": "Critical" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["required"], "tickets:update");
    Ok(())
}

#[tokio::test]
async fn employee_moves_only_one_step_forward() -> Result<()> {
    let t = common::setup().await?;
    let (employee, _) = t.register("Ada", "ada@example.com").await?;
    let ticket = t.create_ticket(&employee, json!({ "title": "Printer jam" })).await?;
    let id = common::id_of(&ticket);

    let (status, body) = t.get(&format!("/tickets/{id}/transitions"), &employee).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current"], "Open");
    assert_eq!(body["available"], json!(["In Progress"]));

    let (status, body) = t
        .put(&format!("/tickets/{id}/status"), &employee, json!({ "status": "Resolved" }))
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "body: {}", body);
    assert_eq!(body["error"], "invalid_transition");
    assert_eq!(body["role"], "employee");

    let (status, body) = t
        .put(&format!("/tickets/{id}/status"), &employee, json!({ "status": "In Progress" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["status"], "In Progress");

    // Same-status moves are not transitions.
    let (status, _) = t
        .put(&format!("/tickets/{id}/status"), &employee, json!({ "status": "In Progress" }))
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn privileged_roles_jump_and_reopen() -> Result<()> {
    let t = common::setup().await?;
    let (employee, _) = t.register("Ada", "ada@example.com").await?;
    let (admin, _) = t.user_with_role("Admin", "admin@example.com", Role::Admin).await?;
    let ticket = t.create_ticket(&employee, json!({ "title": "Disk full" })).await?;
    let id = common::id_of(&ticket);

    let (status, body) = t.get(&format!("/tickets/{id}/transitions"), &admin).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], json!(["Open", "In Progress", "Resolved", "Closed"]));

    let (status, body) = t
        .put(&format!("/tickets/{id}/status"), &admin, json!({ "status": "Closed" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["status"], "Closed");

    // Closed is terminal for the submitter.
    let (_, body) = t.get(&format!("/tickets/{id}/transitions"), &employee).await?;
    assert_eq!(body["available"], json!([]));
    let (status, _) = t
        .put(&format!("/tickets/{id}/status"), &employee, json!({ "status": "Open" }))
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = t
        .put(&format!("/tickets/{id}/status"), &admin, json!({ "status": "Open" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["status"], "Open");
    Ok(())
}

#[tokio::test]
async fn unknown_target_status_is_a_bad_request() -> Result<()> {
    let t = common::setup().await?;
    let (employee, _) = t.register("Ada", "ada@example.com").await?;
    let ticket = t.create_ticket(&employee, json!({ "title": "Keyboard" })).await?;
    let id = common::id_of(&ticket);

    let (status, body) = t
        .put(&format!("/tickets/{id}/status"), &employee, json!({ "status": "Pending" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
    Ok(())
}

#[tokio::test]
async fn status_changes_are_recorded_in_history() -> Result<()> {
    let t = common::setup().await?;
    let (employee, _) = t.register("Ada", "ada@example.com").await?;
    let (agent, agent_id) = t.user_with_role("Agent", "agent@example.com", Role::Agent).await?;
    let ticket = t.create_ticket(&employee, json!({ "title": "Monitor flicker" })).await?;
    let id = common::id_of(&ticket);

    let (status, _) = t
        .put(&format!("/tickets/{id}/status"), &agent, json!({ "status": "Resolved" }))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, history) = t.get(&format!("/tickets/{id}/history"), &employee).await?;
    assert_eq!(status, StatusCode::OK);
    let entries = history.as_array().expect("history array");
    assert_eq!(entries.len(), 2, "history: {}", history);
    assert_eq!(entries[0]["field"], "status");
    assert_eq!(entries[0]["new_value"], "Open");
    assert_eq!(entries[1]["old_value"], "Open");
    assert_eq!(entries[1]["new_value"], "Resolved");
    assert_eq!(entries[1]["changed_by"], agent_id);
    Ok(())
}

#[tokio::test]
async fn assignment_requires_a_privileged_assignee() -> Result<()> {
    let t = common::setup().await?;
    let (employee, employee_id) = t.register("Ada", "ada@example.com").await?;
    let (agent, agent_id) = t.user_with_role("Agent", "agent@example.com", Role::Agent).await?;
    let ticket = t.create_ticket(&employee, json!({ "title": "No sound" })).await?;
    let id = common::id_of(&ticket);

    let (status, _) = t
        .put(&format!("/tickets/{id}/assign"), &employee, json!({ "assignee_id": agent_id }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .put(&format!("/tickets/{id}/assign"), &agent, json!({ "assignee_id": employee_id }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = t
        .put(&format!("/tickets/{id}/assign"), &agent, json!({ "assignee_id": agent_id }))
        .await?;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["assigned_to"], agent_id);
    Ok(())
}

#[tokio::test]
async fn archived_tickets_leave_the_default_listing() -> Result<()> {
    let t = common::setup().await?;
    let (employee, _) = t.register("Ada", "ada@example.com").await?;
    let (admin, _) = t.user_with_role("Admin", "admin@example.com", Role::Admin).await?;
    let ticket = t.create_ticket(&employee, json!({ "title": "Old request" })).await?;
    let id = common::id_of(&ticket);

    let (status, _) = t
        .send(axum::http::Method::DELETE, &format!("/tickets/{id}"), Some(&admin), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, listed) = t.get("/tickets", &admin).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(0));

    let (_, listed) = t.get("/tickets?include_archived=true", &admin).await?;
    let listed = listed.as_array().expect("ticket array");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["status"], "Closed");
    Ok(())
}

#[tokio::test]
async fn reopening_an_archived_ticket_restores_it_to_listings() -> Result<()> {
    let t = common::setup().await?;
    let (employee, _) = t.register("Ada", "ada@example.com").await?;
    let (admin, _) = t.user_with_role("Admin", "admin@example.com", Role::Admin).await?;
    let ticket = t.create_ticket(&employee, json!({ "title": "Came back" })).await?;
    let id = common::id_of(&ticket);

    let (status, _) = t
        .send(axum::http::Method::DELETE, &format!("/tickets/{id}"), Some(&admin), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, reopened) = t
        .put(&format!("/tickets/{id}/status"), &admin, json!({ "status": "Open" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "body: {}", reopened);
    assert_eq!(reopened["status"], "Open");
    assert!(reopened["archived_at"].is_null(), "body: {}", reopened);

    let (_, listed) = t.get("/tickets", &admin).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    let (_, listed) = t.get("/tickets", &employee).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (_, history) = t.get(&format!("/tickets/{id}/history"), &admin).await?;
    let history = history.as_array().expect("history array");
    assert!(
        history.iter().any(|e| e["field"] == "archived_at" && e["new_value"].is_null()),
        "history: {:?}",
        history
    );
    Ok(())
}

#[tokio::test]
async fn comments_are_listed_in_order() -> Result<()> {
    let t = common::setup().await?;
    let (employee, employee_id) = t.register("Ada", "ada@example.com").await?;
    let ticket = t.create_ticket(&employee, json!({ "title": "Wifi drops" })).await?;
    let id = common::id_of(&ticket);

    for body in ["First", "Second"] {
        let (status, _) = t
            .post(&format!("/tickets/{id}/comments"), &employee, json!({ "body": body }))
            .await?;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, comments) = t.get(&format!("/tickets/{id}/comments"), &employee).await?;
    assert_eq!(status, StatusCode::OK);
    let comments = comments.as_array().expect("comment array");
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["body"], "First");
    assert_eq!(comments[1]["author_id"], employee_id);
    Ok(())
}
