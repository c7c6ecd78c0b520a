//! Integration tests for the generic object and sub-object repository
//! implementations using in-memory SurrealDB.

use std::collections::BTreeMap;

use opengeo_core::models::field::{FieldType, GenericField};
use opengeo_core::models::generic_object::CreateGenericObject;
use opengeo_core::models::habilitation::PermissionLevel;
use opengeo_core::models::sub_object::CreateSubObject;
use opengeo_core::repository::{
    EntityFilter, GenericObjectRepository, Pagination, SubObjectRepository,
};
use opengeo_db::repository::{SurrealGenericObjectRepository, SurrealSubObjectRepository};
use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    opengeo_db::run_migrations(&db).await.unwrap();
    db
}

fn site(label: &str, entity: &str) -> CreateGenericObject {
    CreateGenericObject {
        label: label.into(),
        entity: entity.into(),
        authorization: PermissionLevel::Reader,
        color: Some("#0055a4".into()),
        description: None,
        values: vec![
            GenericField::new("adresse", FieldType::String, json!("1 rue de Siam")),
            GenericField::new("position", FieldType::Coordinates, json!([48.39, -4.49])),
            GenericField::new("surface", FieldType::Number, serde_json::Value::Null),
        ],
        children: BTreeMap::new(),
        created_by: "admin".into(),
    }
}

fn contact(entity: &str) -> CreateSubObject {
    CreateSubObject {
        label: "Contact".into(),
        entity: entity.into(),
        authorization: PermissionLevel::Reader,
        color: None,
        description: Some("Interlocuteur sur site".into()),
        values: vec![
            GenericField::empty("nom", FieldType::String),
            GenericField::empty("téléphone", FieldType::String),
        ],
        created_by: "admin".into(),
    }
}

// -----------------------------------------------------------------------
// Generic objects
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_generic_object() {
    let db = setup().await;
    let repo = SurrealGenericObjectRepository::new(db);

    let object = repo.create(site("Mairie de Brest", "bretagne")).await.unwrap();
    assert_eq!(object.metadata.label, "Mairie de Brest");
    assert_eq!(object.metadata.created_by, "admin");
    assert_eq!(object.values.len(), 3);

    let fetched = repo.get_by_id(object.id).await.unwrap();
    assert_eq!(fetched.id, object.id);
    assert_eq!(fetched.values, object.values);
    assert_eq!(fetched.coordinates(), Some([48.39, -4.49]));
    assert_eq!(fetched.metadata.color.as_deref(), Some("#0055a4"));
}

#[tokio::test]
async fn replace_persists_children_and_stamps_author() {
    let db = setup().await;
    let objects = SurrealGenericObjectRepository::new(db.clone());
    let subs = SurrealSubObjectRepository::new(db);

    let sub = subs.create(contact("bretagne")).await.unwrap();
    let mut object = objects.create(site("Gare", "bretagne")).await.unwrap();
    let created_at = object.metadata.updated_at;

    object.embed(sub.clone());
    object.values[0].value = json!("Place du 19e RI");
    let replaced = objects.replace(object.clone(), "editeur").await.unwrap();

    assert_eq!(replaced.metadata.updated_by, "editeur");
    assert!(replaced.metadata.updated_at >= created_at);

    let fetched = objects.get_by_id(object.id).await.unwrap();
    assert_eq!(fetched.children["contact"].len(), 1);
    assert_eq!(fetched.children["contact"][0].id, sub.id);
    assert_eq!(fetched.values[0].value, json!("Place du 19e RI"));
}

#[tokio::test]
async fn delete_generic_object() {
    let db = setup().await;
    let repo = SurrealGenericObjectRepository::new(db);

    let object = repo.create(site("À supprimer", "bretagne")).await.unwrap();
    repo.delete(object.id).await.unwrap();

    let result = repo.get_by_id(object.id).await;
    assert!(result.is_err(), "should not find deleted object");
}

#[tokio::test]
async fn list_filters_by_entity_with_pagination() {
    let db = setup().await;
    let repo = SurrealGenericObjectRepository::new(db);

    for i in 0..3 {
        repo.create(site(&format!("Site {i}"), "bretagne")).await.unwrap();
    }
    repo.create(site("Rouen", "normandie")).await.unwrap();

    let all = repo
        .list(EntityFilter::all(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 4);

    let page = repo
        .list(
            EntityFilter::only(vec!["bretagne".into()]),
            Pagination {
                offset: 0,
                limit: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert!(page.items.iter().all(|o| o.metadata.entity == "bretagne"));

    let none = repo
        .list(EntityFilter::only(Vec::new()), Pagination::default())
        .await
        .unwrap();
    assert_eq!(none.total, 0);
    assert!(none.items.is_empty());
}

#[tokio::test]
async fn list_hides_documents_above_clearance() {
    let db = setup().await;
    let repo = SurrealGenericObjectRepository::new(db);

    repo.create(site("Mairie", "bretagne")).await.unwrap();
    let mut restricted = site("Poste de commandement", "bretagne");
    restricted.authorization = PermissionLevel::Manager;
    repo.create(restricted).await.unwrap();

    let reader = repo
        .list(
            EntityFilter::only(vec!["bretagne".into()])
                .with_clearance(vec![("bretagne".into(), PermissionLevel::Reader)]),
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(reader.total, 1);
    assert_eq!(reader.items[0].metadata.label, "Mairie");

    let manager = repo
        .list(
            EntityFilter::only(vec!["bretagne".into()])
                .with_clearance(vec![("bretagne".into(), PermissionLevel::Manager)]),
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(manager.total, 2);
}

#[tokio::test]
async fn replace_many_counts_written_documents() {
    let db = setup().await;
    let repo = SurrealGenericObjectRepository::new(db);

    let a = repo.create(site("A", "bretagne")).await.unwrap();
    let b = repo.create(site("B", "bretagne")).await.unwrap();

    let objects = repo.list_by_entity("bretagne").await.unwrap();
    assert_eq!(objects.len(), 2);

    let written = repo.replace_many(vec![a, b], "admin").await.unwrap();
    assert_eq!(written, 2);
}

// -----------------------------------------------------------------------
// Sub-objects
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_update_and_list_sub_objects() {
    let db = setup().await;
    let repo = SurrealSubObjectRepository::new(db);

    let sub = repo.create(contact("bretagne")).await.unwrap();
    assert_eq!(sub.key(), "contact");
    assert_eq!(sub.values.len(), 2);

    let mut changed = sub.clone();
    changed.values.push(GenericField::empty("courriel", FieldType::String));
    changed.metadata.description = Some(String::new());
    let updated = repo.replace(changed, "admin").await.unwrap();
    assert_eq!(updated.values.len(), 3);
    assert_eq!(updated.metadata.description, None);

    let listed = repo
        .list(EntityFilter::only(vec!["bretagne".into()]), Pagination::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.items[0].id, sub.id);
}

#[tokio::test]
async fn duplicate_sub_object_label_is_rejected() {
    let db = setup().await;
    let repo = SurrealSubObjectRepository::new(db);

    repo.create(contact("bretagne")).await.unwrap();
    assert!(repo.create(contact("bretagne")).await.is_err());
    // Same label in another entity is fine.
    assert!(repo.create(contact("normandie")).await.is_ok());
}
