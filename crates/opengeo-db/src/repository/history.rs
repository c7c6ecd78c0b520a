//! SurrealDB implementation of [`HistoryRepository`].

use chrono::{DateTime, Utc};
use opengeo_core::diff::Difference;
use opengeo_core::error::OpenGeoResult;
use opengeo_core::models::history::{CreateHistoryEntry, HistoryAction, HistoryEntry};
use opengeo_core::repository::{HistoryFilter, HistoryRepository, PaginatedResult, Pagination};
use serde::{Deserialize, Serialize};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::document::{CountRow, parse_uuid};
use crate::error::DbError;

/// Content of the `diff` column.
#[derive(Debug, Default, Serialize, Deserialize)]
struct DiffColumn {
    #[serde(default)]
    changes: Vec<Difference>,
}

#[derive(Debug, SurrealValue)]
struct HistoryRowWithId {
    record_id: String,
    object_id: String,
    entity: String,
    action: String,
    author: String,
    diff: serde_json::Value,
    affected_count: u64,
    created_at: DateTime<Utc>,
}

impl HistoryRowWithId {
    fn try_into_entry(self) -> Result<HistoryEntry, DbError> {
        let diff: DiffColumn = serde_json::from_value(self.diff)
            .map_err(|e| DbError::Decode(format!("history diff: {e}")))?;
        Ok(HistoryEntry {
            id: parse_uuid(&self.record_id, "history")?,
            object_id: parse_uuid(&self.object_id, "object")?,
            entity: self.entity,
            action: HistoryAction::parse(&self.action)
                .ok_or_else(|| DbError::Decode(format!("unknown history action: {}", self.action)))?,
            author: self.author,
            changes: diff.changes,
            affected_count: self.affected_count,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the history repository.
#[derive(Clone)]
pub struct SurrealHistoryRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealHistoryRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> HistoryRepository for SurrealHistoryRepository<C> {
    async fn append(&self, input: CreateHistoryEntry) -> OpenGeoResult<HistoryEntry> {
        let id_str = Uuid::new_v4().to_string();
        let affected_count = input.affected_count();
        let diff = serde_json::to_value(DiffColumn {
            changes: input.changes,
        })
        .map_err(|e| DbError::Decode(format!("history diff: {e}")))?;

        let result = self
            .db
            .query(
                "CREATE type::record('history', $id) SET \
                 object_id = $object_id, entity = $entity, \
                 action = $action, author = $author, \
                 diff = $diff, affected_count = $affected_count; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('history', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("object_id", input.object_id.to_string()))
            .bind(("entity", input.entity))
            .bind(("action", input.action.as_str().to_string()))
            .bind(("author", input.author))
            .bind(("diff", diff))
            .bind(("affected_count", affected_count))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        // Statement 0 is the CREATE, statement 1 reads it back with its id.
        let rows: Vec<HistoryRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "history".into(),
            id: id_str,
        })?;

        Ok(row.try_into_entry()?)
    }

    async fn list(
        &self,
        filter: HistoryFilter,
        pagination: Pagination,
    ) -> OpenGeoResult<PaginatedResult<HistoryEntry>> {
        let mut conditions = Vec::new();
        if filter.object_id.is_some() {
            conditions.push("object_id = $object_id");
        }
        if filter.entity.is_some() {
            conditions.push("entity = $entity");
        }
        if filter.author.is_some() {
            conditions.push("author = $author");
        }
        if filter.action.is_some() {
            conditions.push("action = $action");
        }
        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT count() AS total FROM history {clause} GROUP ALL; \
             SELECT meta::id(id) AS record_id, * FROM history {clause} \
             ORDER BY created_at DESC \
             LIMIT $limit START $offset;"
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));

        if let Some(object_id) = filter.object_id {
            builder = builder.bind(("object_id", object_id.to_string()));
        }
        if let Some(entity) = filter.entity {
            builder = builder.bind(("entity", entity));
        }
        if let Some(author) = filter.author {
            builder = builder.bind(("author", author));
        }
        if let Some(action) = filter.action {
            builder = builder.bind(("action", action.as_str().to_string()));
        }

        let mut result = builder.await.map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<HistoryRowWithId> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(HistoryRowWithId::try_into_entry)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
