mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use simpleit::authz::Role;

#[tokio::test]
async fn employee_cannot_create_assets() -> Result<()> {
    let t = common::setup().await?;
    let (employee, _) = t.register("Ada", "ada@example.com").await?;

    let (status, body) = t
        .post("/assets", &employee, json!({ "asset_tag": "LT-001", "name": "ThinkPad", "category": "Laptop" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "body: {}", body);
    assert_eq!(body["error"], "forbidden");
    assert_eq!(body["required"], "assets:create");
    assert_eq!(body["role"], "employee");
    Ok(())
}

#[tokio::test]
async fn agent_can_update_but_not_create_assets() -> Result<()> {
    let t = common::setup().await?;
    let (admin, _) = t.user_with_role("Admin", "admin@example.com", Role::Admin).await?;
    let (agent, _) = t.user_with_role("Agent", "agent@example.com", Role::Agent).await?;

    let (status, asset) = t
        .post("/assets", &admin, json!({ "asset_tag": "LT-001", "name": "ThinkPad", "category": "Laptop" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "body: {}", asset);
    let asset_id = common::id_of(&asset);

    let (status, _) = t
        .post("/assets", &agent, json!({ "asset_tag": "LT-002", "name": "MacBook", "category": "Laptop" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t
        .put(&format!("/assets/{asset_id}"), &agent, json!({ "status": "Maintenance" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["status"], "Maintenance");

    let (status, _) = t
        .post("/assets", &admin, json!({ "asset_tag": "LT-001", "name": "Duplicate", "category": "Laptop" }))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn employees_only_see_their_own_tickets() -> Result<()> {
    let t = common::setup().await?;
    let (ada, _) = t.register("Ada", "ada@example.com").await?;
    let (bob, _) = t.register("Bob", "bob@example.com").await?;
    let (agent, _) = t.user_with_role("Agent", "agent@example.com", Role::Agent).await?;

    let ada_ticket = t.create_ticket(&ada, json!({ "title": "Ada's laptop" })).await?;
    t.create_ticket(&bob, json!({ "title": "Bob's phone" })).await?;
    let ada_ticket_id = common::id_of(&ada_ticket);

    let (status, listed) = t.get("/tickets", &bob).await?;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().expect("ticket array");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["title"], "Bob's phone");

    let (status, body) = t.get(&format!("/tickets/{ada_ticket_id}"), &bob).await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "body: {}", body);

    let (status, _) = t
        .post(&format!("/tickets/{ada_ticket_id}/comments"), &bob, json!({ "body": "me too" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, listed) = t.get("/tickets", &agent).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(2));

    let (_, portal) = t.get("/portal/tickets", &ada).await?;
    assert_eq!(portal.as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn status_filter_narrows_ticket_listing() -> Result<()> {
    let t = common::setup().await?;
    let (admin, _) = t.user_with_role("Admin", "admin@example.com", Role::Admin).await?;
    let first = t.create_ticket(&admin, json!({ "title": "One" })).await?;
    t.create_ticket(&admin, json!({ "title": "Two" })).await?;

    let id = common::id_of(&first);
    let (status, _) = t
        .put(&format!("/tickets/{id}/status"), &admin, json!({ "status": "Resolved" }))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, resolved) = t.get("/tickets?status=Resolved", &admin).await?;
    assert_eq!(status, StatusCode::OK);
    let resolved = resolved.as_array().expect("ticket array");
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0]["title"], "One");

    let (status, _) = t.get("/tickets?status=Waiting", &admin).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn employees_see_hardware_issued_to_them() -> Result<()> {
    let t = common::setup().await?;
    let (admin, _) = t.user_with_role("Admin", "admin@example.com", Role::Admin).await?;
    let (ada, ada_user_id) = t.register("Ada", "ada@example.com").await?;

    let (status, employee) = t
        .post("/employees", &admin, json!({ "name": "Ada Lovelace", "email": "ada@corp.example", "department": "R&D" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "body: {}", employee);
    let employee_id = common::id_of(&employee);

    let (status, _) = t
        .put(
            &format!("/users/{ada_user_id}/role"),
            &admin,
            json!({ "role": "employee", "employee_id": employee_id }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, laptop) = t
        .post("/assets", &admin, json!({ "asset_tag": "LT-001", "name": "ThinkPad", "category": "Laptop" }))
        .await?;
    let (_, monitor) = t
        .post("/assets", &admin, json!({ "asset_tag": "MN-001", "name": "Dell 27", "category": "Monitor" }))
        .await?;
    let laptop_id = common::id_of(&laptop);
    let monitor_id = common::id_of(&monitor);

    let (status, assigned) = t
        .put(&format!("/assets/{laptop_id}/assign"), &admin, json!({ "employee_id": employee_id }))
        .await?;
    assert_eq!(status, StatusCode::OK, "body: {}", assigned);
    assert_eq!(assigned["status"], "In Use");

    let (_, visible) = t.get("/assets", &ada).await?;
    let visible = visible.as_array().expect("asset array");
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0]["asset_tag"], "LT-001");

    let (_, portal) = t.get("/portal/assets", &ada).await?;
    assert_eq!(portal.as_array().map(Vec::len), Some(1));

    let (status, _) = t.get(&format!("/assets/{laptop_id}"), &ada).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = t.get(&format!("/assets/{monitor_id}"), &ada).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, own) = t.get(&format!("/employees/{employee_id}"), &ada).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(own["department"], "R&D");
    let (status, _) = t.get("/employees", &ada).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn role_changes_are_bounded_by_the_callers_level() -> Result<()> {
    let t = common::setup().await?;
    let (admin, admin_id) = t.user_with_role("Admin", "admin@example.com", Role::Admin).await?;
    let (manager, _) = t.user_with_role("Manager", "manager@example.com", Role::Manager).await?;
    let (_, ada_id) = t.register("Ada", "ada@example.com").await?;
    let (_, root_id) = t
        .user_with_role("Root", "root@example.com", Role::SuperAdmin)
        .await?;

    // Managers can view users but not manage them.
    let (status, _) = t.get("/users", &manager).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = t
        .put(&format!("/users/{ada_id}/role"), &manager, json!({ "role": "agent" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["required"], "role admin");

    let (status, body) = t
        .put(&format!("/users/{ada_id}/role"), &admin, json!({ "role": "Agent" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["role"], "agent");

    let (status, _) = t
        .put(&format!("/users/{ada_id}/role"), &admin, json!({ "role": "super_admin" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .put(&format!("/users/{root_id}/role"), &admin, json!({ "role": "employee" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .put(&format!("/users/{ada_id}/role"), &admin, json!({ "role": "wizard" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .put(
            &format!("/users/{admin_id}/role"),
            &admin,
            json!({ "role": "admin", "manager_id": admin_id }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn unlinked_employee_cannot_open_any_asset() -> Result<()> {
    let t = common::setup().await?;
    let (admin, _) = t.user_with_role("Admin", "admin@example.com", Role::Admin).await?;
    let (ada, _) = t.register("Ada", "ada@example.com").await?;

    let (_, spare) = t
        .post("/assets", &admin, json!({ "asset_tag": "LT-009", "name": "Spare", "category": "Laptop" }))
        .await?;
    let spare_id = common::id_of(&spare);

    let (status, body) = t.get(&format!("/assets/{spare_id}"), &ada).await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "body: {}", body);
    assert_eq!(body["required"], "ownership of this asset");

    let (_, listed) = t.get("/assets", &ada).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn managers_portal_includes_direct_reports_tickets() -> Result<()> {
    let t = common::setup().await?;
    let (admin, _) = t.user_with_role("Admin", "admin@example.com", Role::Admin).await?;
    let (manager, manager_id) = t.user_with_role("Manager", "manager@example.com", Role::Manager).await?;
    let (ada, ada_id) = t.register("Ada", "ada@example.com").await?;
    let (bob, _) = t.register("Bob", "bob@example.com").await?;

    let (status, _) = t
        .put(
            &format!("/users/{ada_id}/role"),
            &admin,
            json!({ "role": "employee", "manager_id": manager_id }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    t.create_ticket(&ada, json!({ "title": "Ada's badge" })).await?;
    t.create_ticket(&bob, json!({ "title": "Bob's badge" })).await?;
    t.create_ticket(&manager, json!({ "title": "Manager's dock" })).await?;

    let (status, portal) = t.get("/portal/tickets", &manager).await?;
    assert_eq!(status, StatusCode::OK);
    let mut titles: Vec<&str> = portal
        .as_array()
        .expect("ticket array")
        .iter()
        .filter_map(|t| t["title"].as_str())
        .collect();
    titles.sort_unstable();
    assert_eq!(titles, vec!["Ada's badge", "Manager's dock"]);

    // Blanket access does not turn an admin's portal into the full queue.
    let (_, portal) = t.get("/portal/tickets", &admin).await?;
    assert_eq!(portal.as_array().map(Vec::len), Some(0));

    let (_, portal) = t.get("/portal/tickets", &ada).await?;
    assert_eq!(portal.as_array().map(Vec::len), Some(1));
    Ok(())
}
