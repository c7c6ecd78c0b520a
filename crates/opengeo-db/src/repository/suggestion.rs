//! SurrealDB implementation of [`SuggestionRepository`].

use chrono::{DateTime, Utc};
use opengeo_core::error::OpenGeoResult;
use opengeo_core::models::suggestion::{CreateSuggestion, Suggestion, SuggestionStatus};
use opengeo_core::repository::{SuggestionFilter, SuggestionRepository};
use serde_json::{Value, json};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::document::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SuggestionRowWithId {
    record_id: String,
    object_id: String,
    entity: String,
    path: String,
    proposal: serde_json::Value,
    comment: Option<String>,
    author: String,
    status: String,
    created_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
    reviewed_by: Option<String>,
}

impl SuggestionRowWithId {
    fn try_into_suggestion(self) -> Result<Suggestion, DbError> {
        // NULL members may be dropped by the store; treat them as null.
        let take = |key: &str| self.proposal.get(key).cloned().unwrap_or(Value::Null);
        Ok(Suggestion {
            id: parse_uuid(&self.record_id, "suggestion")?,
            object_id: parse_uuid(&self.object_id, "object")?,
            initial_value: take("initial_value"),
            value: take("value"),
            entity: self.entity,
            path: self.path,
            comment: self.comment,
            author: self.author,
            status: SuggestionStatus::parse(&self.status)
                .ok_or_else(|| DbError::Decode(format!("unknown suggestion status: {}", self.status)))?,
            created_at: self.created_at,
            reviewed_at: self.reviewed_at,
            reviewed_by: self.reviewed_by,
        })
    }
}

const SELECT_ONE: &str = "SELECT meta::id(id) AS record_id, * \
                          FROM type::record('suggestion', $id);";

/// SurrealDB implementation of the suggestion repository.
#[derive(Clone)]
pub struct SurrealSuggestionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSuggestionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SuggestionRepository for SurrealSuggestionRepository<C> {
    async fn create(&self, input: CreateSuggestion) -> OpenGeoResult<Suggestion> {
        let id_str = Uuid::new_v4().to_string();
        let proposal = json!({
            "initial_value": input.initial_value,
            "value": input.value,
        });

        let result = self
            .db
            .query(format!(
                "CREATE type::record('suggestion', $id) SET \
                 object_id = $object_id, entity = $entity, \
                 path = $path, proposal = $proposal, \
                 comment = $comment, author = $author, \
                 status = 'Pending'; \
                 {SELECT_ONE}"
            ))
            .bind(("id", id_str.clone()))
            .bind(("object_id", input.object_id.to_string()))
            .bind(("entity", input.entity))
            .bind(("path", input.path))
            .bind(("proposal", proposal))
            .bind(("comment", input.comment))
            .bind(("author", input.author))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<SuggestionRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "suggestion".into(),
            id: id_str,
        })?;

        Ok(row.try_into_suggestion()?)
    }

    async fn get_by_id(&self, id: Uuid) -> OpenGeoResult<Suggestion> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(SELECT_ONE)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SuggestionRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "suggestion".into(),
            id: id_str,
        })?;

        Ok(row.try_into_suggestion()?)
    }

    async fn review(
        &self,
        id: Uuid,
        status: SuggestionStatus,
        reviewed_by: &str,
    ) -> OpenGeoResult<Suggestion> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(format!(
                "UPDATE type::record('suggestion', $id) SET \
                 status = $status, reviewed_by = $reviewed_by, \
                 reviewed_at = time::now(); \
                 {SELECT_ONE}"
            ))
            .bind(("id", id_str.clone()))
            .bind(("status", status.as_str().to_string()))
            .bind(("reviewed_by", reviewed_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<SuggestionRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "suggestion".into(),
            id: id_str,
        })?;

        Ok(row.try_into_suggestion()?)
    }

    async fn list(&self, filter: SuggestionFilter) -> OpenGeoResult<Vec<Suggestion>> {
        let mut conditions = Vec::new();
        if filter.object_id.is_some() {
            conditions.push("object_id = $object_id");
        }
        if filter.entities.is_some() {
            conditions.push("entity IN $entities");
        }
        if filter.status.is_some() {
            conditions.push("status = $status");
        }
        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM suggestion {clause} \
             ORDER BY created_at ASC"
        );

        let mut builder = self.db.query(&query);
        if let Some(object_id) = filter.object_id {
            builder = builder.bind(("object_id", object_id.to_string()));
        }
        if let Some(entities) = filter.entities {
            builder = builder.bind(("entities", json!(entities)));
        }
        if let Some(status) = filter.status {
            builder = builder.bind(("status", status.as_str().to_string()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<SuggestionRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(SuggestionRowWithId::try_into_suggestion)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(items)
    }
}
