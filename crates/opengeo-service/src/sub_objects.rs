//! Sub-object service.
//!
//! Generic objects hold snapshot copies of sub-objects, so every change to
//! a sub-object is pushed to the objects of its entity that embed it. The
//! cascade writes object by object: a failure leaves the objects already
//! rewritten in their new state and is reported in the logs.

use opengeo_core::error::{OpenGeoError, OpenGeoResult};
use opengeo_core::models::document::children_key;
use opengeo_core::models::field::{GenericField, coerce_fields};
use opengeo_core::models::generic_object::GenericObject;
use opengeo_core::models::habilitation::{Actor, PermissionLevel};
use opengeo_core::models::sub_object::{CreateSubObject, SubObject, UpdateSubObject};
use opengeo_core::repository::{
    EntityFilter, GenericObjectRepository, PaginatedResult, Pagination, SubObjectRepository,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::access;
use crate::config::ServiceConfig;

/// A written sub-object and the number of generic objects rewritten.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeOutcome {
    pub sub_object: SubObject,
    pub affected_count: u64,
}

/// Missing values take their type's empty value, the rest is coerced.
fn normalize_values(values: Vec<GenericField>) -> OpenGeoResult<Vec<GenericField>> {
    let values = values
        .into_iter()
        .map(|field| {
            if field.value.is_null() {
                GenericField::empty(field.label, field.field_type)
            } else {
                field
            }
        })
        .collect();
    coerce_fields(values)
}

fn apply_update(current: &SubObject, input: UpdateSubObject) -> OpenGeoResult<SubObject> {
    let mut updated = current.clone();
    if let Some(label) = input.label {
        updated.metadata.label = access::label(&label)?;
    }
    if let Some(authorization) = input.authorization {
        updated.metadata.authorization = authorization;
    }
    if let Some(color) = input.color {
        updated.metadata.color = Some(color).filter(|c| !c.is_empty());
    }
    if let Some(description) = input.description {
        updated.metadata.description = Some(description).filter(|d| !d.is_empty());
    }
    if let Some(values) = input.values {
        updated.values = normalize_values(values)?;
    }
    Ok(updated)
}

/// Refresh the copies of `sub` held by `object`; with `auto_link`, embed
/// a template when the object holds none. Returns whether `object` changed.
fn propagate(object: &mut GenericObject, sub: &SubObject, auto_link: bool) -> bool {
    if object.refresh_embedded(sub) {
        return true;
    }
    if auto_link {
        object.embed(sub.template());
        return true;
    }
    false
}

/// Sub-object service.
pub struct SubObjectService<S, G>
where
    S: SubObjectRepository,
    G: GenericObjectRepository,
{
    sub_objects: S,
    objects: G,
    config: ServiceConfig,
}

impl<S, G> SubObjectService<S, G>
where
    S: SubObjectRepository,
    G: GenericObjectRepository,
{
    pub fn new(sub_objects: S, objects: G, config: ServiceConfig) -> Self {
        Self {
            sub_objects,
            objects,
            config,
        }
    }

    /// Create a sub-object. With `auto_link`, an empty copy is embedded in
    /// every generic object of the entity.
    pub async fn create(
        &self,
        actor: &Actor,
        mut input: CreateSubObject,
        auto_link: bool,
    ) -> OpenGeoResult<CascadeOutcome> {
        access::require(actor, &input.entity, PermissionLevel::Manager)?;
        input.label = access::label(&input.label)?;
        self.ensure_unique(&input.entity, &input.label, None).await?;
        input.values = normalize_values(input.values)?;
        input.created_by = actor.user.clone();

        let sub_object = self.sub_objects.create(input).await?;
        info!(
            sub_object_id = %sub_object.id,
            entity = %sub_object.metadata.entity,
            user = %actor.user,
            "sub-object created"
        );

        let affected_count = if auto_link {
            self.cascade(actor, &sub_object, |object, sub| propagate(object, sub, true))
                .await?
        } else {
            0
        };

        Ok(CascadeOutcome {
            sub_object,
            affected_count,
        })
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> OpenGeoResult<SubObject> {
        let sub_object = self.sub_objects.get_by_id(id).await?;
        access::require_on(actor, &sub_object.metadata, PermissionLevel::Reader)?;
        Ok(sub_object)
    }

    pub async fn list(
        &self,
        actor: &Actor,
        entity: Option<&str>,
        pagination: Pagination,
    ) -> OpenGeoResult<PaginatedResult<SubObject>> {
        let filter = access::readable_scope(actor, entity)?;
        self.sub_objects
            .list(filter, access::clamp(pagination, &self.config))
            .await
    }

    /// Update a sub-object and refresh its copies.
    ///
    /// Copies take the new metadata and field list and keep the value of
    /// every field whose label and type did not change; they move to the
    /// new children key on rename. With `auto_link`, objects without a
    /// copy receive an empty one.
    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        input: UpdateSubObject,
        auto_link: bool,
    ) -> OpenGeoResult<CascadeOutcome> {
        let current = self.sub_objects.get_by_id(id).await?;
        access::require_on(actor, &current.metadata, PermissionLevel::Manager)?;

        let updated = apply_update(&current, input)?;
        if updated.key() != current.key() {
            self.ensure_unique(&updated.metadata.entity, &updated.metadata.label, Some(id))
                .await?;
        }

        let sub_object = self.sub_objects.replace(updated, &actor.user).await?;
        info!(sub_object_id = %id, user = %actor.user, "sub-object updated");

        let affected_count = self
            .cascade(actor, &sub_object, |object, sub| propagate(object, sub, auto_link))
            .await?;

        Ok(CascadeOutcome {
            sub_object,
            affected_count,
        })
    }

    /// Delete a sub-object and every embedded copy of it. Returns the
    /// number of generic objects rewritten.
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> OpenGeoResult<u64> {
        let sub_object = self.sub_objects.get_by_id(id).await?;
        access::require_on(actor, &sub_object.metadata, PermissionLevel::Manager)?;

        let affected_count = self
            .cascade(actor, &sub_object, |object, sub| object.detach(sub.id) > 0)
            .await?;
        self.sub_objects.delete(id).await?;

        info!(sub_object_id = %id, user = %actor.user, affected_count, "sub-object deleted");
        Ok(affected_count)
    }

    /// Labels are unique per entity, ignoring case.
    async fn ensure_unique(
        &self,
        entity: &str,
        label: &str,
        except: Option<Uuid>,
    ) -> OpenGeoResult<()> {
        let key = children_key(label);
        let existing = self
            .sub_objects
            .list(
                EntityFilter::only(vec![entity.to_string()]),
                Pagination {
                    offset: 0,
                    limit: self.config.scan_limit,
                },
            )
            .await?;

        if existing
            .items
            .iter()
            .any(|s| s.key() == key && Some(s.id) != except)
        {
            return Err(OpenGeoError::AlreadyExists {
                entity: "sub_object".into(),
            });
        }
        Ok(())
    }

    /// Apply `change` to every generic object of the sub-object's entity
    /// and write back those it modified.
    async fn cascade<F>(&self, actor: &Actor, sub: &SubObject, change: F) -> OpenGeoResult<u64>
    where
        F: Fn(&mut GenericObject, &SubObject) -> bool,
    {
        let objects = self.objects.list_by_entity(&sub.metadata.entity).await?;
        let scanned = objects.len();

        let changed: Vec<GenericObject> = objects
            .into_iter()
            .filter_map(|mut object| change(&mut object, sub).then_some(object))
            .collect();
        let expected = changed.len() as u64;
        if changed.is_empty() {
            return Ok(0);
        }

        let written = self.objects.replace_many(changed, &actor.user).await?;
        if written < expected {
            warn!(
                sub_object_id = %sub.id,
                expected,
                written,
                "sub-object cascade left some generic objects unchanged"
            );
        }
        info!(sub_object_id = %sub.id, scanned, written, "sub-object cascade applied");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use opengeo_core::models::field::FieldType;

    use super::*;

    #[test]
    fn missing_values_become_empty() {
        let values = normalize_values(vec![
            GenericField::new("nom", FieldType::String, serde_json::Value::Null),
            GenericField::new("actif", FieldType::Boolean, serde_json::Value::Null),
            GenericField::new("surface", FieldType::Number, json!("3,5")),
        ])
        .unwrap();

        assert_eq!(values[0].value, FieldType::String.empty_value());
        assert_eq!(values[1].value, FieldType::Boolean.empty_value());
        assert_eq!(values[2].value, json!(3.5));
    }
}
