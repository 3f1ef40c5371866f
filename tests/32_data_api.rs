mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

#[tokio::test]
async fn missing_reference_is_a_field_error() -> Result<()> {
    let server = common::ensure_server().await?;
    let Some(pool) = common::database(server).await? else {
        return Ok(());
    };
    let school = common::seed_tenant(&pool, "fk").await?;
    let admin = common::seed_user(&pool, Some(school.tenant_id), &["Admin"]).await?;

    let (status, body) = common::send(
        server,
        &admin,
        Method::POST,
        "/Application",
        Some(json!({ "orgId": i32::MAX, "firstName": "Ada" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["success"], false);
    assert!(body["fieldErrors"]["orgId"].is_string(), "{body}");
    Ok(())
}

#[tokio::test]
async fn deleted_rows_disappear_from_reads() -> Result<()> {
    let server = common::ensure_server().await?;
    let Some(pool) = common::database(server).await? else {
        return Ok(());
    };
    let school = common::seed_tenant(&pool, "softdelete").await?;
    let admin = common::seed_user(&pool, Some(school.tenant_id), &["Admin"]).await?;

    let (status, created) = common::send(
        server,
        &admin,
        Method::POST,
        "/Application",
        Some(json!({ "orgId": school.org_id, "firstName": "Grace" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["formData"]["tenantId"], school.tenant_id);
    assert_eq!(created["formData"]["createdBy"], admin.user_id);
    let id = common::id_of(&created);

    let (status, deleted) = common::send(server, &admin, Method::DELETE, &format!("/Application/{}", id), None).await?;
    assert_eq!(status, StatusCode::OK, "{deleted}");
    assert!(deleted["formData"]["deletedAt"].is_string(), "{deleted}");

    let (status, _) = common::send(server, &admin, Method::GET, &format!("/Application/{}", id), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = common::send(server, &admin, Method::GET, "/Application", None).await?;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = list["formData"]
        .as_array()
        .map(|rows| rows.iter().filter_map(|r| r["id"].as_i64()).collect())
        .unwrap_or_default();
    assert!(!ids.contains(&(id as i64)), "deleted row still listed: {list}");

    let (status, _) = common::send(server, &admin, Method::DELETE, &format!("/Application/{}", id), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn put_requires_every_required_field() -> Result<()> {
    let server = common::ensure_server().await?;
    let Some(pool) = common::database(server).await? else {
        return Ok(());
    };
    let school = common::seed_tenant(&pool, "put").await?;
    let admin = common::seed_user(&pool, Some(school.tenant_id), &["Admin"]).await?;

    let (_, created) = common::send(
        server,
        &admin,
        Method::POST,
        "/Application",
        Some(json!({ "orgId": school.org_id, "firstName": "Alan" })),
    )
    .await?;
    let path = format!("/Application/{}", common::id_of(&created));

    let (status, body) = common::send(server, &admin, Method::PUT, &path, Some(json!({ "lastName": "Turing" }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["fieldErrors"]["firstName"].is_string(), "{body}");

    // the same partial body is fine as a PATCH
    let (status, body) = common::send(server, &admin, Method::PATCH, &path, Some(json!({ "lastName": "Turing" }))).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["formData"]["firstName"], "Alan");
    assert_eq!(body["formData"]["lastName"], "Turing");
    Ok(())
}

#[tokio::test]
async fn app_element_creates_its_property_rows() -> Result<()> {
    let server = common::ensure_server().await?;
    let Some(pool) = common::database(server).await? else {
        return Ok(());
    };
    let school = common::seed_tenant(&pool, "elements").await?;
    let admin = common::seed_user(&pool, Some(school.tenant_id), &["Admin"]).await?;
    let (type_id, property_ids) = common::seed_element_type(&pool, &["label", "placeholder"]).await?;

    let (status, body) = common::send(
        server,
        &admin,
        Method::POST,
        "/AppElement",
        Some(json!({ "appId": school.app_id, "elementTypeId": type_id, "name": "child_name" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let element_id = common::id_of(&body);

    let children = body["formData"]["rowFormData"].as_array().cloned().unwrap_or_default();
    assert_eq!(children.len(), 2, "{body}");
    for (child, property_id) in children.iter().zip(&property_ids) {
        assert_eq!(child["appElementId"], element_id);
        assert_eq!(child["elementTypePropertyId"], *property_id);
        assert_eq!(child["createdBy"], admin.user_id);
        assert_eq!(child["updatedBy"], admin.user_id);
    }

    let (status, listed) = common::send(
        server,
        &admin,
        Method::GET,
        &format!("/AppElementProperty?appElementId={}", element_id),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["formData"].as_array().map(Vec::len), Some(2), "{listed}");
    Ok(())
}

#[tokio::test]
async fn attendance_keeps_one_row_per_day() -> Result<()> {
    let server = common::ensure_server().await?;
    let Some(pool) = common::database(server).await? else {
        return Ok(());
    };
    let school = common::seed_tenant(&pool, "attendance").await?;
    let staff = common::seed_user(&pool, Some(school.tenant_id), &["Staff"]).await?;
    let admin = common::seed_user(&pool, Some(school.tenant_id), &["Admin"]).await?;

    let (_, child) = common::send(
        server,
        &admin,
        Method::POST,
        "/Application",
        Some(json!({ "orgId": school.org_id, "firstName": "Edsger" })),
    )
    .await?;
    let application_id = common::id_of(&child);
    let mark = |attendance_type: i32| json!({ "applicationId": application_id, "attendanceType": attendance_type, "attendanceDate": "2026-03-02" });

    let (status, checked_in) = common::send(server, &staff, Method::POST, "/Attendance", Some(mark(2))).await?;
    assert_eq!(status, StatusCode::OK, "{checked_in}");
    assert!(checked_in["formData"]["checkInTime"].is_string());
    assert_eq!(checked_in["formData"]["checkInBy"], staff.user_id);

    let (status, checked_out) = common::send(server, &staff, Method::POST, "/Attendance", Some(mark(4))).await?;
    assert_eq!(status, StatusCode::OK, "{checked_out}");
    assert_eq!(common::id_of(&checked_out), common::id_of(&checked_in));
    assert_eq!(checked_out["formData"]["attendanceType"], 4);

    let (status, body) = common::send(server, &staff, Method::POST, "/Attendance", Some(mark(2))).await?;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(body["error"], "Cannot move attendance from CheckedOut to CheckedIn");

    let (status, rows) = common::send(
        server,
        &staff,
        Method::GET,
        &format!("/Attendance?applicationId={}&fromDate=2026-03-02&toDate=2026-03-02", application_id),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let rows: Vec<Value> = rows["formData"].as_array().cloned().unwrap_or_default();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["attendanceType"], 4);
    Ok(())
}
