//! Integration tests for the generic object and sub-object services.

use std::collections::BTreeMap;

use chrono::Utc;
use opengeo_core::error::OpenGeoError;
use opengeo_core::models::field::{FieldType, GenericField};
use opengeo_core::models::generic_object::{CreateGenericObject, UpdateGenericObject};
use opengeo_core::models::habilitation::{
    Actor, Habilitation, HabilitationStatus, PermissionLevel,
};
use opengeo_core::models::history::HistoryAction;
use opengeo_core::models::sub_object::{CreateSubObject, UpdateSubObject};
use opengeo_core::repository::Pagination;
use opengeo_db::repository::{
    SurrealGenericObjectRepository, SurrealHistoryRepository, SurrealSubObjectRepository,
};
use opengeo_service::{ObjectService, ServiceConfig, SubObjectService};
use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Objects = ObjectService<
    SurrealGenericObjectRepository<Db>,
    SurrealSubObjectRepository<Db>,
    SurrealHistoryRepository<Db>,
>;
type SubObjects =
    SubObjectService<SurrealSubObjectRepository<Db>, SurrealGenericObjectRepository<Db>>;

/// Spin up in-memory DB, run migrations and build both services.
async fn setup() -> (Objects, SubObjects) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    opengeo_db::run_migrations(&db).await.unwrap();

    let objects = ObjectService::new(
        SurrealGenericObjectRepository::new(db.clone()),
        SurrealSubObjectRepository::new(db.clone()),
        SurrealHistoryRepository::new(db.clone()),
        ServiceConfig::default(),
    );
    let sub_objects = SubObjectService::new(
        SurrealSubObjectRepository::new(db.clone()),
        SurrealGenericObjectRepository::new(db),
        ServiceConfig::default(),
    );
    (objects, sub_objects)
}

fn admin() -> Actor {
    Actor::new("admin", true)
}

fn user_with(entity: &str, level: PermissionLevel) -> Actor {
    Actor::new("alice", false).with_habilitations(vec![Habilitation {
        id: Uuid::new_v4(),
        user: "alice".into(),
        entity: entity.into(),
        level,
        status: HabilitationStatus::Granted,
        reason: None,
        requested_at: Utc::now(),
        decided_at: Some(Utc::now()),
        decided_by: Some("admin".into()),
    }])
}

fn site(label: &str) -> CreateGenericObject {
    CreateGenericObject {
        label: label.into(),
        entity: "bretagne".into(),
        authorization: PermissionLevel::Reader,
        color: None,
        description: None,
        values: vec![
            GenericField::new("adresse", FieldType::String, json!("1 rue de Siam")),
            GenericField::new("position", FieldType::Coordinates, json!("48.39,-4.49")),
            GenericField::new("surface", FieldType::Number, json!("120")),
        ],
        children: BTreeMap::new(),
        created_by: String::new(),
    }
}

fn contact() -> CreateSubObject {
    CreateSubObject {
        label: "Contact".into(),
        entity: "bretagne".into(),
        authorization: PermissionLevel::Reader,
        color: None,
        description: None,
        values: vec![
            GenericField::new("nom", FieldType::String, serde_json::Value::Null),
            GenericField::new("téléphone", FieldType::String, serde_json::Value::Null),
        ],
        created_by: String::new(),
    }
}

// -----------------------------------------------------------------------
// Generic objects
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_coerces_values_and_records_history() {
    let (objects, _) = setup().await;
    let admin = admin();

    let object = objects.create(&admin, site("Mairie")).await.unwrap();
    assert_eq!(object.metadata.created_by, "admin");
    assert_eq!(object.values[1].value, json!([48.39, -4.49]));
    assert_eq!(object.values[2].value.as_f64(), Some(120.0));

    let history = objects
        .history(&admin, object.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(history.total, 1);
    assert_eq!(history.items[0].action, HistoryAction::Create);
    assert_eq!(history.items[0].changes[0].path, object.id.to_string());
}

#[tokio::test]
async fn update_records_differences() {
    let (objects, _) = setup().await;
    let admin = admin();
    let object = objects.create(&admin, site("Mairie")).await.unwrap();

    let mut values = object.values.clone();
    values[0].value = json!("2 rue de Siam");
    let outcome = objects
        .update(
            &admin,
            object.id,
            UpdateGenericObject {
                color: Some("#ff0000".into()),
                values: Some(values),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.affected_count, 2);
    assert_eq!(outcome.object.values[0].value, json!("2 rue de Siam"));

    let history = objects
        .history(&admin, object.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(history.total, 2);
    let latest = &history.items[0];
    assert_eq!(latest.action, HistoryAction::Update);
    assert_eq!(latest.affected_count, 2);
    let paths: Vec<&str> = latest.changes.iter().map(|c| c.path.as_str()).collect();
    assert!(paths.contains(&format!("{}.metadata.color", object.id).as_str()));
    assert!(paths.contains(&format!("{}.values[0].value", object.id).as_str()));
}

#[tokio::test]
async fn update_without_changes_writes_nothing() {
    let (objects, _) = setup().await;
    let admin = admin();
    let object = objects.create(&admin, site("Mairie")).await.unwrap();

    let outcome = objects
        .update(
            &admin,
            object.id,
            UpdateGenericObject {
                label: Some("Mairie".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.affected_count, 0);

    let history = objects
        .history(&admin, object.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(history.total, 1);
}

#[tokio::test]
async fn levels_gate_every_operation() {
    let (objects, _) = setup().await;
    let object = objects.create(&admin(), site("Mairie")).await.unwrap();

    let reader = user_with("bretagne", PermissionLevel::Reader);
    assert!(objects.get(&reader, object.id).await.is_ok());
    let denied = objects
        .update(&reader, object.id, UpdateGenericObject::default())
        .await;
    assert!(matches!(denied, Err(OpenGeoError::AuthorizationDenied { .. })));

    let editor = user_with("bretagne", PermissionLevel::Editor);
    let raise = objects
        .update(
            &editor,
            object.id,
            UpdateGenericObject {
                authorization: Some(PermissionLevel::Manager),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(raise, Err(OpenGeoError::AuthorizationDenied { .. })));
    assert!(objects.delete(&editor, object.id).await.is_err());

    let outsider = user_with("normandie", PermissionLevel::Manager);
    assert!(objects.get(&outsider, object.id).await.is_err());
    let listed = objects
        .list(&outsider, None, Pagination::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 0);
}

#[tokio::test]
async fn object_authorization_restricts_reads() {
    let (objects, _) = setup().await;
    let admin = admin();
    objects.create(&admin, site("Mairie")).await.unwrap();
    let mut command_post = site("Poste de commandement");
    command_post.authorization = PermissionLevel::Manager;
    let restricted = objects.create(&admin, command_post).await.unwrap();

    let reader = user_with("bretagne", PermissionLevel::Reader);
    assert!(matches!(
        objects.get(&reader, restricted.id).await,
        Err(OpenGeoError::AuthorizationDenied { .. })
    ));
    assert!(
        objects
            .history(&reader, restricted.id, Pagination::default())
            .await
            .is_err()
    );

    let listed = objects
        .list(&reader, Some("bretagne"), Pagination::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.items[0].metadata.label, "Mairie");
    for scope in [Some("bretagne"), None] {
        let markers = objects.map_markers(&reader, scope).await.unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].label, "Mairie");
    }

    let manager = user_with("bretagne", PermissionLevel::Manager);
    assert!(objects.get(&manager, restricted.id).await.is_ok());
    let listed = objects
        .list(&manager, None, Pagination::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 2);
}

#[tokio::test]
async fn renaming_a_field_is_recorded() {
    let (objects, _) = setup().await;
    let admin = admin();
    let object = objects.create(&admin, site("Mairie")).await.unwrap();

    let mut values = object.values.clone();
    values[0].label = "adresse postale".into();
    let outcome = objects
        .update(
            &admin,
            object.id,
            UpdateGenericObject {
                values: Some(values),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.affected_count, 1);

    let stored = objects.get(&admin, object.id).await.unwrap();
    assert_eq!(stored.values[0].label, "adresse postale");
    assert_eq!(stored.values[0].value, json!("1 rue de Siam"));

    let history = objects
        .history(&admin, object.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(history.total, 2);
    let change = &history.items[0].changes[0];
    assert_eq!(change.path, format!("{}.values[0]", object.id));
    assert_eq!(change.initial_value["label"], json!("adresse"));
}

#[tokio::test]
async fn delete_keeps_history_for_admins() {
    let (objects, _) = setup().await;
    let admin = admin();
    let object = objects.create(&admin, site("Mairie")).await.unwrap();

    objects.delete(&admin, object.id).await.unwrap();
    assert!(matches!(
        objects.get(&admin, object.id).await,
        Err(OpenGeoError::NotFound { .. })
    ));

    let history = objects
        .history(&admin, object.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(history.items[0].action, HistoryAction::Delete);
    assert_eq!(history.items[0].changes[0].value, serde_json::Value::Null);
}

#[tokio::test]
async fn map_markers_skip_objects_without_coordinates() {
    let (objects, _) = setup().await;
    let admin = admin();
    objects.create(&admin, site("Mairie")).await.unwrap();
    let mut blank = site("Sans position");
    blank.values[1].value = json!("");
    objects.create(&admin, blank).await.unwrap();

    let markers = objects.map_markers(&admin, Some("bretagne")).await.unwrap();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].label, "Mairie");
    assert_eq!(markers[0].coordinates, [48.39, -4.49]);

    let reader = user_with("bretagne", PermissionLevel::Reader);
    assert_eq!(objects.map_markers(&reader, None).await.unwrap().len(), 1);
}

// -----------------------------------------------------------------------
// Sub-objects and attachment
// -----------------------------------------------------------------------

#[tokio::test]
async fn attach_and_detach_sub_object() {
    let (objects, sub_objects) = setup().await;
    let admin = admin();
    let object = objects.create(&admin, site("Mairie")).await.unwrap();
    let sub = sub_objects
        .create(&admin, contact(), false)
        .await
        .unwrap()
        .sub_object;

    let attached = objects
        .attach_sub_object(&admin, object.id, sub.id)
        .await
        .unwrap();
    assert_eq!(attached.affected_count, 1);
    assert_eq!(attached.object.children["contact"][0].values[0].value, json!(""));

    let detached = objects
        .detach_sub_object(&admin, object.id, sub.id)
        .await
        .unwrap();
    assert!(detached.object.children.is_empty());

    let again = objects.detach_sub_object(&admin, object.id, sub.id).await;
    assert!(matches!(again, Err(OpenGeoError::NotFound { .. })));
}

#[tokio::test]
async fn supplied_children_are_filed_under_their_label() {
    let (objects, sub_objects) = setup().await;
    let admin = admin();
    let sub = sub_objects
        .create(&admin, contact(), false)
        .await
        .unwrap()
        .sub_object;

    let mut input = site("Mairie");
    input.children = BTreeMap::from([("Contact".to_string(), vec![sub.template()])]);
    let object = objects.create(&admin, input).await.unwrap();
    assert_eq!(object.children.keys().collect::<Vec<_>>(), vec!["contact"]);

    let attached = objects
        .attach_sub_object(&admin, object.id, sub.id)
        .await
        .unwrap()
        .object;
    assert_eq!(attached.children.keys().collect::<Vec<_>>(), vec!["contact"]);
    assert_eq!(attached.children["contact"].len(), 2);

    let mut foreign = sub.template();
    foreign.metadata.entity = "normandie".into();
    let mut input = site("Gare");
    input.children = BTreeMap::from([("contact".to_string(), vec![foreign])]);
    assert!(matches!(
        objects.create(&admin, input).await,
        Err(OpenGeoError::Validation { .. })
    ));
}

#[tokio::test]
async fn sub_object_labels_are_unique_ignoring_case() {
    let (_, sub_objects) = setup().await;
    let admin = admin();
    sub_objects.create(&admin, contact(), false).await.unwrap();

    let mut shouting = contact();
    shouting.label = "CONTACT".into();
    let result = sub_objects.create(&admin, shouting, false).await;
    assert!(matches!(result, Err(OpenGeoError::AlreadyExists { .. })));
}

#[tokio::test]
async fn auto_link_embeds_templates() {
    let (objects, sub_objects) = setup().await;
    let admin = admin();
    let a = objects.create(&admin, site("A")).await.unwrap();
    let b = objects.create(&admin, site("B")).await.unwrap();

    let outcome = sub_objects.create(&admin, contact(), true).await.unwrap();
    assert_eq!(outcome.affected_count, 2);

    for id in [a.id, b.id] {
        let object = objects.get(&admin, id).await.unwrap();
        assert!(object.embeds(outcome.sub_object.id));
    }
}

#[tokio::test]
async fn update_cascades_and_keeps_values() {
    let (objects, sub_objects) = setup().await;
    let admin = admin();
    let object = objects.create(&admin, site("Mairie")).await.unwrap();
    let untouched = objects.create(&admin, site("Gare")).await.unwrap();
    let sub = sub_objects
        .create(&admin, contact(), false)
        .await
        .unwrap()
        .sub_object;

    let attached = objects
        .attach_sub_object(&admin, object.id, sub.id)
        .await
        .unwrap()
        .object;
    let mut children = attached.children.clone();
    children.get_mut("contact").unwrap()[0].values[0].value = json!("Mme Le Goff");
    objects
        .update(
            &admin,
            object.id,
            UpdateGenericObject {
                children: Some(children),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let outcome = sub_objects
        .update(
            &admin,
            sub.id,
            UpdateSubObject {
                label: Some("Interlocuteur".into()),
                values: Some(vec![
                    GenericField::empty("nom", FieldType::String),
                    GenericField::empty("courriel", FieldType::String),
                ]),
                ..Default::default()
            },
            false,
        )
        .await
        .unwrap();
    assert_eq!(outcome.affected_count, 1);

    let refreshed = objects.get(&admin, object.id).await.unwrap();
    assert!(!refreshed.children.contains_key("contact"));
    let copy = &refreshed.children["interlocuteur"][0];
    assert_eq!(copy.metadata.label, "Interlocuteur");
    assert_eq!(copy.values.len(), 2);
    assert_eq!(copy.values[0].value, json!("Mme Le Goff"));
    assert_eq!(copy.values[1].label, "courriel");

    let other = objects.get(&admin, untouched.id).await.unwrap();
    assert!(other.children.is_empty());
}

#[tokio::test]
async fn update_with_auto_link_reaches_objects_without_copy() {
    let (objects, sub_objects) = setup().await;
    let admin = admin();
    let linked = objects.create(&admin, site("Mairie")).await.unwrap();
    let unlinked = objects.create(&admin, site("Gare")).await.unwrap();
    let sub = sub_objects
        .create(&admin, contact(), false)
        .await
        .unwrap()
        .sub_object;
    objects
        .attach_sub_object(&admin, linked.id, sub.id)
        .await
        .unwrap();

    let outcome = sub_objects
        .update(
            &admin,
            sub.id,
            UpdateSubObject {
                description: Some("Interlocuteur sur site".into()),
                ..Default::default()
            },
            true,
        )
        .await
        .unwrap();
    assert_eq!(outcome.affected_count, 2);

    for id in [linked.id, unlinked.id] {
        let object = objects.get(&admin, id).await.unwrap();
        let copies = &object.children["contact"];
        assert_eq!(copies.len(), 1);
        assert_eq!(
            copies[0].metadata.description.as_deref(),
            Some("Interlocuteur sur site")
        );
    }
}

#[tokio::test]
async fn delete_sub_object_removes_copies() {
    let (objects, sub_objects) = setup().await;
    let admin = admin();
    let object = objects.create(&admin, site("Mairie")).await.unwrap();
    let sub = sub_objects
        .create(&admin, contact(), true)
        .await
        .unwrap()
        .sub_object;

    let affected = sub_objects.delete(&admin, sub.id).await.unwrap();
    assert_eq!(affected, 1);
    assert!(sub_objects.get(&admin, sub.id).await.is_err());

    let object = objects.get(&admin, object.id).await.unwrap();
    assert!(object.children.is_empty());
}

#[tokio::test]
async fn managing_sub_objects_requires_manager() {
    let (_, sub_objects) = setup().await;
    let editor = user_with("bretagne", PermissionLevel::Editor);
    let result = sub_objects.create(&editor, contact(), false).await;
    assert!(matches!(result, Err(OpenGeoError::AuthorizationDenied { .. })));
}
