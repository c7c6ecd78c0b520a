//! SurrealDB implementation of [`GenericObjectRepository`].

use opengeo_core::error::OpenGeoResult;
use opengeo_core::models::document::Metadata;
use opengeo_core::models::generic_object::{CreateGenericObject, GenericObject};
use opengeo_core::repository::{
    EntityFilter, GenericObjectRepository, PaginatedResult, Pagination,
};
use surrealdb::{Connection, Surreal};
use tracing::{info, warn};
use uuid::Uuid;

use super::document::{
    CountRow, DocumentBody, DocumentRow, DocumentRowWithId, filter_clause, non_empty,
    visible_pairs,
};
use crate::error::DbError;

fn assemble(id: Uuid, metadata: Metadata, body: DocumentBody) -> GenericObject {
    GenericObject {
        id,
        metadata,
        values: body.values,
        children: body.children,
    }
}

/// SurrealDB implementation of the generic object repository.
#[derive(Clone)]
pub struct SurrealGenericObjectRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealGenericObjectRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> GenericObjectRepository for SurrealGenericObjectRepository<C> {
    async fn create(&self, input: CreateGenericObject) -> OpenGeoResult<GenericObject> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let body = DocumentBody {
            values: input.values,
            children: input.children,
        }
        .to_json()?;

        let result = self
            .db
            .query(
                "CREATE type::record('generic_object', $id) SET \
                 label = $label, entity = $entity, \
                 authorization = $authorization, \
                 color = $color, description = $description, \
                 body = $body, \
                 created_by = $author, updated_by = $author",
            )
            .bind(("id", id_str.clone()))
            .bind(("label", input.label))
            .bind(("entity", input.entity))
            .bind(("authorization", input.authorization.as_str().to_string()))
            .bind(("color", non_empty(input.color)))
            .bind(("description", non_empty(input.description)))
            .bind(("body", body))
            .bind(("author", input.created_by))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<DocumentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "generic_object".into(),
            id: id_str,
        })?;

        let (metadata, body) = row.into_parts()?;
        info!(%id, entity = %metadata.entity, "generic object created");
        Ok(assemble(id, metadata, body))
    }

    async fn get_by_id(&self, id: Uuid) -> OpenGeoResult<GenericObject> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('generic_object', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DocumentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "generic_object".into(),
            id: id_str,
        })?;

        let (metadata, body) = row.into_parts()?;
        Ok(assemble(id, metadata, body))
    }

    async fn replace(&self, object: GenericObject, updated_by: &str) -> OpenGeoResult<GenericObject> {
        let id = object.id;
        let id_str = id.to_string();
        let body = DocumentBody {
            values: object.values,
            children: object.children,
        }
        .to_json()?;

        let result = self
            .db
            .query(
                "UPDATE type::record('generic_object', $id) SET \
                 label = $label, entity = $entity, \
                 authorization = $authorization, \
                 color = $color, description = $description, \
                 body = $body, \
                 updated_by = $updated_by, updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("label", object.metadata.label))
            .bind(("entity", object.metadata.entity))
            .bind(("authorization", object.metadata.authorization.as_str().to_string()))
            .bind(("color", non_empty(object.metadata.color)))
            .bind(("description", non_empty(object.metadata.description)))
            .bind(("body", body))
            .bind(("updated_by", updated_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<DocumentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "generic_object".into(),
            id: id_str,
        })?;

        let (metadata, body) = row.into_parts()?;
        Ok(assemble(id, metadata, body))
    }

    async fn delete(&self, id: Uuid) -> OpenGeoResult<()> {
        self.db
            .query("DELETE type::record('generic_object', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(
        &self,
        filter: EntityFilter,
        pagination: Pagination,
    ) -> OpenGeoResult<PaginatedResult<GenericObject>> {
        let clause = filter_clause(&filter);
        let visible = serde_json::json!(visible_pairs(&filter));
        let entities = serde_json::json!(filter.entities.unwrap_or_default());

        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM generic_object {clause} GROUP ALL"
            ))
            .bind(("entities", entities.clone()))
            .bind(("visible", visible.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * \
                 FROM generic_object {clause} \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("entities", entities))
            .bind(("visible", visible))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DocumentRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.into_parts().map(|(id, m, b)| assemble(id, m, b)))
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_by_entity(&self, entity: &str) -> OpenGeoResult<Vec<GenericObject>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM generic_object WHERE entity = $entity \
                 ORDER BY created_at ASC",
            )
            .bind(("entity", entity.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DocumentRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.into_parts().map(|(id, m, b)| assemble(id, m, b)))
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(items)
    }

    async fn replace_many(&self, objects: Vec<GenericObject>, updated_by: &str) -> OpenGeoResult<u64> {
        let requested = objects.len();
        let mut written = 0u64;
        for object in objects {
            let id = object.id;
            match self.replace(object, updated_by).await {
                Ok(_) => written += 1,
                Err(e) => warn!(%id, error = %e, "bulk replace skipped a generic object"),
            }
        }
        info!(requested, written, "bulk replace of generic objects finished");
        Ok(written)
    }
}
