//! SurrealDB implementation of [`SubObjectRepository`].

use opengeo_core::error::OpenGeoResult;
use opengeo_core::models::document::Metadata;
use opengeo_core::models::sub_object::{CreateSubObject, SubObject};
use opengeo_core::repository::{EntityFilter, PaginatedResult, Pagination, SubObjectRepository};
use surrealdb::{Connection, Surreal};
use uuid::Uuid;

use super::document::{
    CountRow, DocumentBody, DocumentRow, DocumentRowWithId, filter_clause, non_empty,
    visible_pairs,
};
use crate::error::DbError;

fn assemble(id: Uuid, metadata: Metadata, body: DocumentBody) -> SubObject {
    SubObject {
        id,
        metadata,
        values: body.values,
    }
}

fn body_of(values: Vec<opengeo_core::models::field::GenericField>) -> Result<serde_json::Value, DbError> {
    DocumentBody {
        values,
        ..Default::default()
    }
    .to_json()
}

/// SurrealDB implementation of the sub-object repository.
#[derive(Clone)]
pub struct SurrealSubObjectRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSubObjectRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SubObjectRepository for SurrealSubObjectRepository<C> {
    async fn create(&self, input: CreateSubObject) -> OpenGeoResult<SubObject> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('sub_object', $id) SET \
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
            .bind(("body", body_of(input.values)?))
            .bind(("author", input.created_by))
            .await
            .map_err(DbError::from)?;

        // A duplicate (entity, label) pair trips the unique index here.
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<DocumentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "sub_object".into(),
            id: id_str,
        })?;

        let (metadata, body) = row.into_parts()?;
        Ok(assemble(id, metadata, body))
    }

    async fn get_by_id(&self, id: Uuid) -> OpenGeoResult<SubObject> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('sub_object', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DocumentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "sub_object".into(),
            id: id_str,
        })?;

        let (metadata, body) = row.into_parts()?;
        Ok(assemble(id, metadata, body))
    }

    async fn replace(&self, sub_object: SubObject, updated_by: &str) -> OpenGeoResult<SubObject> {
        let id = sub_object.id;
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('sub_object', $id) SET \
                 label = $label, authorization = $authorization, \
                 color = $color, description = $description, \
                 body = $body, \
                 updated_by = $updated_by, updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("label", sub_object.metadata.label))
            .bind(("authorization", sub_object.metadata.authorization.as_str().to_string()))
            .bind(("color", non_empty(sub_object.metadata.color)))
            .bind(("description", non_empty(sub_object.metadata.description)))
            .bind(("body", body_of(sub_object.values)?))
            .bind(("updated_by", updated_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<DocumentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "sub_object".into(),
            id: id_str,
        })?;

        let (metadata, body) = row.into_parts()?;
        Ok(assemble(id, metadata, body))
    }

    async fn delete(&self, id: Uuid) -> OpenGeoResult<()> {
        self.db
            .query("DELETE type::record('sub_object', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(
        &self,
        filter: EntityFilter,
        pagination: Pagination,
    ) -> OpenGeoResult<PaginatedResult<SubObject>> {
        let clause = filter_clause(&filter);
        let visible = serde_json::json!(visible_pairs(&filter));
        let entities = serde_json::json!(filter.entities.unwrap_or_default());

        // Count and page in one round trip.
        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM sub_object {clause} GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM sub_object {clause} \
                 ORDER BY label ASC \
                 LIMIT $limit START $offset;"
            ))
            .bind(("entities", entities))
            .bind(("visible", visible))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<DocumentRowWithId> = result.take(1).map_err(DbError::from)?;
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
}
