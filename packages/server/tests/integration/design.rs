use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

use server::entity::{designer, form_design_tag, form_state, tag};

use crate::common::{ACTOR, TestApp, basic_spec, routes};

mod design_creation {
    use super::*;

    #[tokio::test]
    async fn first_commit_creates_version_one() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                &routes::designs("acme"),
                &json!({ "spec": basic_spec("Onboarding") }),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["version"], 1);
        assert_eq!(res.body["display_id"], 1);
        assert_eq!(res.body["name"], "Onboarding");
        assert_eq!(res.body["is_active"], true);
        assert_eq!(res.body["created_by"], ACTOR);
        assert_eq!(res.body["designers"], json!(["alice@example.com"]));
        assert_eq!(res.body["processors"], json!(["bob@example.com"]));
        assert_eq!(res.body["tags"], json!(["HR"]));
    }

    #[tokio::test]
    async fn display_ids_are_sequential_per_tenant() {
        let app = TestApp::spawn().await;

        let first = app
            .post(&routes::designs("acme"), &json!({ "spec": basic_spec("A") }))
            .await;
        let second = app
            .post(&routes::designs("acme"), &json!({ "spec": basic_spec("B") }))
            .await;
        let other_tenant = app
            .post(&routes::designs("globex"), &json!({ "spec": basic_spec("C") }))
            .await;

        assert_eq!(first.body["display_id"], 1);
        assert_eq!(second.body["display_id"], 2);
        assert_eq!(other_tenant.body["display_id"], 1);
    }

    #[tokio::test]
    async fn signed_artifact_url_is_returned_instead_of_the_raw_key() {
        let app = TestApp::spawn().await;

        let res = app
            .post(&routes::designs("acme"), &json!({ "spec": basic_spec("A") }))
            .await;

        let url = res.body["artifact_url"].as_str().unwrap();
        let id = res.body["id"].as_str().unwrap();
        assert!(url.contains(&format!("{id}/v1.json?expires=")));
        assert!(url.contains("&signature="));
        assert!(url.starts_with("http://"));
    }

    #[tokio::test]
    async fn caller_supplied_id_is_kept_on_create() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                &routes::designs("acme"),
                &json!({ "form_id": "imported-form-7", "spec": basic_spec("Imported") }),
            )
            .await;

        // An id that resolves to nothing falls into the create branch.
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["id"], "imported-form-7");
        assert_eq!(res.body["version"], 1);
    }

    #[tokio::test]
    async fn empty_field_list_is_a_valid_form() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                &routes::designs("acme"),
                &json!({ "spec": { "name": "Empty form" } }),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["version"], 1);
    }

    #[tokio::test]
    async fn malformed_form_id_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                &routes::designs("acme"),
                &json!({ "form_id": "../escape", "spec": basic_spec("A") }),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn missing_actor_header_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::designs("acme")))
            .json(&json!({ "spec": basic_spec("A") }))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn field_ids_are_assigned_in_input_order() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                &routes::designs("acme"),
                &json!({ "spec": {
                    "name": "Ids",
                    "fields": [
                        { "id": 5, "name": "a", "datatype": "text", "tab": "T" },
                        { "name": "b", "datatype": "number", "tab": "T" },
                        { "name": "c", "datatype": "amount", "tab": "T" },
                    ],
                }}),
            )
            .await;
        let id = res.body["id"].as_str().unwrap();

        let spec = app.get(&routes::version("acme", id, 1)).await;
        assert_eq!(spec.status, 200, "{}", spec.text);
        let ids: Vec<i64> = spec.body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![5, 6, 7]);

        let types: Vec<&str> = spec.body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field_type"].as_str().unwrap())
            .collect();
        assert_eq!(types, vec!["", "Integer", "Double"]);
    }
}

mod reconciliation {
    use super::*;

    async fn designer_rows(app: &TestApp, design_id: &str) -> Vec<designer::Model> {
        designer::Entity::find()
            .filter(designer::Column::FormDesignId.eq(design_id))
            .all(&app.db)
            .await
            .expect("designer query failed")
    }

    #[tokio::test]
    async fn update_increments_the_version_in_place() {
        let app = TestApp::spawn().await;
        let id = app.create_design("acme", &basic_spec("A")).await;

        let res = app.update_design("acme", &id, &basic_spec("A renamed")).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["id"], id.as_str());
        assert_eq!(res.body["version"], 2);
        assert_eq!(res.body["name"], "A renamed");
        assert_eq!(res.body["display_id"], 1);
    }

    #[tokio::test]
    async fn set_diff_removes_stale_and_adds_new_members_only() {
        let app = TestApp::spawn().await;

        let mut spec = basic_spec("Diff");
        spec["designers"] = json!(["a@example.com", "b@example.com", "c@example.com"]);
        let id = app.create_design("acme", &spec).await;

        let before = designer_rows(&app, &id).await;
        let row_id = |rows: &[designer::Model], email: &str| {
            rows.iter().find(|d| d.email == email).map(|d| d.id)
        };

        spec["designers"] = json!(["b@example.com", "c@example.com", "d@example.com"]);
        let res = app.update_design("acme", &id, &spec).await;
        assert_eq!(res.status, 200, "{}", res.text);

        let after = designer_rows(&app, &id).await;
        let mut emails: Vec<&str> = after.iter().map(|d| d.email.as_str()).collect();
        emails.sort();
        assert_eq!(
            emails,
            vec!["b@example.com", "c@example.com", "d@example.com"]
        );

        // Unchanged members keep their rows, not just their values.
        assert_eq!(
            row_id(&before, "b@example.com"),
            row_id(&after, "b@example.com")
        );
        assert_eq!(
            row_id(&before, "c@example.com"),
            row_id(&after, "c@example.com")
        );
        assert!(row_id(&after, "a@example.com").is_none());
    }

    #[tokio::test]
    async fn committing_the_same_spec_twice_is_idempotent_on_membership() {
        let app = TestApp::spawn().await;
        let spec = basic_spec("Idempotent");
        let id = app.create_design("acme", &spec).await;

        let first = designer_rows(&app, &id).await;

        let res = app.update_design("acme", &id, &spec).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["version"], 2);

        let second = designer_rows(&app, &id).await;
        assert_eq!(first.len(), second.len());
        assert_eq!(
            first.iter().map(|d| d.id).collect::<Vec<_>>(),
            second.iter().map(|d| d.id).collect::<Vec<_>>()
        );

        let states = form_state::Entity::find()
            .filter(form_state::Column::FormDesignId.eq(id.as_str()))
            .all(&app.db)
            .await
            .unwrap();
        assert_eq!(states.len(), 2);
    }

    #[tokio::test]
    async fn tag_names_fold_case_insensitively_across_designs() {
        let app = TestApp::spawn().await;

        let mut spec = basic_spec("First");
        spec["tags"] = json!(["HR", "hr", "Finance"]);
        app.create_design("acme", &spec).await;

        let mut other = basic_spec("Second");
        other["tags"] = json!(["hr", "FINANCE"]);
        app.create_design("acme", &other).await;

        let tags = tag::Entity::find().all(&app.db).await.unwrap();
        assert_eq!(tags.len(), 2, "expected HR/hr and Finance to fold: {tags:?}");
    }

    #[tokio::test]
    async fn tags_are_rebuilt_from_the_latest_spec() {
        let app = TestApp::spawn().await;

        let mut spec = basic_spec("Tagged");
        spec["tags"] = json!(["HR", "Finance"]);
        let id = app.create_design("acme", &spec).await;

        spec["tags"] = json!(["Finance", "Legal"]);
        let res = app.update_design("acme", &id, &spec).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["tags"], json!(["Finance", "Legal"]));

        // The HR tag row itself survives for other designs.
        let links = form_design_tag::Entity::find()
            .filter(form_design_tag::Column::FormDesignId.eq(id.as_str()))
            .all(&app.db)
            .await
            .unwrap();
        assert_eq!(links.len(), 2);
        let all_tags = tag::Entity::find().all(&app.db).await.unwrap();
        assert_eq!(all_tags.len(), 3);
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn delete_removes_rows_and_artifacts() {
        let app = TestApp::spawn().await;
        let id = app.create_design("acme", &basic_spec("Doomed")).await;
        app.update_design("acme", &id, &basic_spec("Doomed v2"))
            .await;

        assert!(app.artifacts_root.join(&id).join("v1.json").exists());
        assert!(app.artifacts_root.join(&id).join("v2.json").exists());

        let res = app.delete(&routes::design("acme", &id)).await;
        assert_eq!(res.status, 204);

        let gone = app.get(&routes::design("acme", &id)).await;
        assert_eq!(gone.status, 404);
        let versions = app.get(&routes::versions("acme", &id)).await;
        assert_eq!(versions.status, 404);

        assert!(!app.artifacts_root.join(&id).join("v1.json").exists());
        assert!(!app.artifacts_root.join(&id).join("v2.json").exists());

        let orphans = designer::Entity::find()
            .filter(designer::Column::FormDesignId.eq(id.as_str()))
            .all(&app.db)
            .await
            .unwrap();
        assert!(orphans.is_empty());
    }

    #[tokio::test]
    async fn deleting_an_unknown_design_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app.delete(&routes::design("acme", "nope")).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn designs_are_tenant_scoped() {
        let app = TestApp::spawn().await;
        let id = app.create_design("acme", &basic_spec("Private")).await;

        let res = app.get(&routes::design("globex", &id)).await;
        assert_eq!(res.status, 404);
    }
}

mod concurrency {
    use std::time::Duration;

    use server::models::design::DesignSpec;
    use server::versioning::reconciler;

    use super::*;

    #[tokio::test]
    async fn a_stale_commit_loses_the_version_race() {
        let app = TestApp::spawn().await;
        let id = app.create_design("acme", &basic_spec("Contended")).await;

        // Both writers read the same version-1 row.
        let stale = server::entity::form_design::Entity::find_by_id(id.clone())
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();

        // The first writer lands version 2.
        let res = app.update_design("acme", &id, &basic_spec("Winner")).await;
        assert_eq!(res.status, 200, "{}", res.text);

        // The second writer still holds the version-1 row; its commit must
        // surface as a conflict instead of silently reusing version 2.
        let spec: DesignSpec = serde_json::from_value(basic_spec("Loser")).unwrap();
        let result = reconciler::commit(
            &app.db,
            &*app.artifacts,
            spec,
            Some(stale),
            None,
            "acme",
            ACTOR,
            Duration::from_secs(60),
        )
        .await;

        assert!(matches!(
            result,
            Err(server::error::AppError::Conflict(_))
        ));

        // The winner's state is untouched by the lost race.
        let current = app.get(&routes::design("acme", &id)).await;
        assert_eq!(current.body["version"], 2);
        assert_eq!(current.body["name"], "Winner");
    }
}
