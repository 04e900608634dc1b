use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

use server::entity::{form_design_history, history_designer};

use crate::common::{TestApp, basic_spec, routes};

#[tokio::test]
async fn versions_are_contiguous_with_one_history_row_each() {
    let app = TestApp::spawn().await;
    let id = app.create_design("acme", &basic_spec("v1")).await;
    app.update_design("acme", &id, &basic_spec("v2")).await;
    app.update_design("acme", &id, &basic_spec("v3")).await;

    let current = app.get(&routes::design("acme", &id)).await;
    assert_eq!(current.body["version"], 3);

    let mut versions: Vec<i32> = form_design_history::Entity::find()
        .filter(form_design_history::Column::FormDesignId.eq(id.as_str()))
        .all(&app.db)
        .await
        .unwrap()
        .into_iter()
        .map(|h| h.version)
        .collect();
    versions.sort();
    assert_eq!(versions, vec![1, 2, 3]);
}

#[tokio::test]
async fn listing_returns_newest_first_with_snapshotted_children() {
    let app = TestApp::spawn().await;

    let mut spec = basic_spec("People");
    spec["designers"] = json!(["first@example.com"]);
    let id = app.create_design("acme", &spec).await;

    spec["designers"] = json!(["second@example.com"]);
    spec["name"] = json!("People v2");
    app.update_design("acme", &id, &spec).await;

    let res = app.get(&routes::versions("acme", &id)).await;
    assert_eq!(res.status, 200, "{}", res.text);

    let list = res.body.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["version"], 2);
    assert_eq!(list[1]["version"], 1);

    // Each snapshot carries the membership as of its own version, not the
    // current one.
    assert_eq!(list[0]["designers"], json!(["second@example.com"]));
    assert_eq!(list[1]["designers"], json!(["first@example.com"]));
    assert_eq!(list[1]["name"], "People");
}

#[tokio::test]
async fn history_children_record_their_form_version() {
    let app = TestApp::spawn().await;
    let id = app.create_design("acme", &basic_spec("Versioned")).await;
    app.update_design("acme", &id, &basic_spec("Versioned v2"))
        .await;

    let histories = form_design_history::Entity::find()
        .filter(form_design_history::Column::FormDesignId.eq(id.as_str()))
        .all(&app.db)
        .await
        .unwrap();

    for history in histories {
        let children = history_designer::Entity::find()
            .filter(history_designer::Column::HistoryId.eq(history.id.as_str()))
            .all(&app.db)
            .await
            .unwrap();
        assert!(!children.is_empty());
        assert!(children.iter().all(|c| c.form_version == history.version));
    }
}

#[tokio::test]
async fn each_version_resolves_to_the_spec_committed_at_it() {
    let app = TestApp::spawn().await;

    let id = app.create_design("acme", &basic_spec("First name")).await;
    app.update_design("acme", &id, &basic_spec("Second name"))
        .await;

    let v1 = app.get(&routes::version("acme", &id, 1)).await;
    let v2 = app.get(&routes::version("acme", &id, 2)).await;
    assert_eq!(v1.status, 200, "{}", v1.text);
    assert_eq!(v1.body["name"], "First name");
    assert_eq!(v2.body["name"], "Second name");
}

#[tokio::test]
async fn restore_round_trip_preserves_field_ids() {
    let app = TestApp::spawn().await;

    let spec_v1 = json!({
        "name": "Original",
        "fields": [
            { "name": "a", "datatype": "text", "tab": "T" },
            { "name": "b", "datatype": "number", "tab": "T" },
        ],
    });
    let id = app.create_design("acme", &spec_v1).await;

    let replacement = json!({
        "name": "Replaced",
        "fields": [
            { "name": "c", "datatype": "date", "tab": "T" },
        ],
    });
    app.update_design("acme", &id, &replacement).await;

    // Restore: fetch the archived version-1 spec and commit it again.
    let archived = app.get(&routes::version("acme", &id, 1)).await;
    assert_eq!(archived.status, 200, "{}", archived.text);
    let restored_ids: Vec<i64> = archived.body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_i64().unwrap())
        .collect();

    let res = app.update_design("acme", &id, &archived.body).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["version"], 3);

    let v3 = app.get(&routes::version("acme", &id, 3)).await;
    let v3_ids: Vec<i64> = v3.body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_i64().unwrap())
        .collect();

    // Ids already present in the restored spec are not regenerated.
    assert_eq!(v3_ids, restored_ids);
    assert_eq!(v3.body["name"], "Original");
}

#[tokio::test]
async fn a_version_whose_artifact_is_gone_fails_closed() {
    let app = TestApp::spawn().await;
    let id = app.create_design("acme", &basic_spec("Gappy")).await;

    // Simulate a consistency gap: relational row present, blob lost.
    std::fs::remove_file(app.artifacts_root.join(&id).join("v1.json")).unwrap();

    let res = app.get(&routes::version("acme", &id, 1)).await;
    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn unknown_versions_and_designs_are_not_found() {
    let app = TestApp::spawn().await;
    let id = app.create_design("acme", &basic_spec("Known")).await;

    let missing_version = app.get(&routes::version("acme", &id, 9)).await;
    assert_eq!(missing_version.status, 404);

    let missing_design = app.get(&routes::versions("acme", "ghost")).await;
    assert_eq!(missing_design.status, 404);
}
