//! SurrealDB implementation of [`HabilitationRepository`].

use chrono::{DateTime, Utc};
use opengeo_core::error::OpenGeoResult;
use opengeo_core::models::habilitation::{CreateHabilitation, Habilitation, HabilitationStatus};
use opengeo_core::repository::{HabilitationFilter, HabilitationRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::document::{parse_level, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct HabilitationRowWithId {
    record_id: String,
    login: String,
    entity: String,
    level: String,
    status: String,
    reason: Option<String>,
    requested_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
    decided_by: Option<String>,
}

fn parse_status(s: &str) -> Result<HabilitationStatus, DbError> {
    HabilitationStatus::parse(s)
        .ok_or_else(|| DbError::Decode(format!("unknown habilitation status: {s}")))
}

impl HabilitationRowWithId {
    fn try_into_habilitation(self) -> Result<Habilitation, DbError> {
        Ok(Habilitation {
            id: parse_uuid(&self.record_id, "habilitation")?,
            user: self.login,
            entity: self.entity,
            level: parse_level(&self.level)?,
            status: parse_status(&self.status)?,
            reason: self.reason,
            requested_at: self.requested_at,
            decided_at: self.decided_at,
            decided_by: self.decided_by,
        })
    }
}

fn collect(rows: Vec<HabilitationRowWithId>) -> Result<Vec<Habilitation>, DbError> {
    rows.into_iter()
        .map(HabilitationRowWithId::try_into_habilitation)
        .collect()
}

/// SurrealDB implementation of the habilitation repository.
#[derive(Clone)]
pub struct SurrealHabilitationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealHabilitationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> HabilitationRepository for SurrealHabilitationRepository<C> {
    async fn create(&self, input: CreateHabilitation) -> OpenGeoResult<Habilitation> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('habilitation', $id) SET \
                 login = $login, entity = $entity, level = $level, \
                 status = 'Pending', reason = $reason; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('habilitation', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("login", input.user))
            .bind(("entity", input.entity))
            .bind(("level", input.level.as_str().to_string()))
            .bind(("reason", input.reason))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<HabilitationRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "habilitation".into(),
            id: id_str,
        })?;

        Ok(row.try_into_habilitation()?)
    }

    async fn get_by_id(&self, id: Uuid) -> OpenGeoResult<Habilitation> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('habilitation', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HabilitationRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "habilitation".into(),
            id: id_str,
        })?;

        Ok(row.try_into_habilitation()?)
    }

    async fn decide(
        &self,
        id: Uuid,
        status: HabilitationStatus,
        decided_by: &str,
    ) -> OpenGeoResult<Habilitation> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('habilitation', $id) SET \
                 status = $status, decided_by = $decided_by, \
                 decided_at = time::now(); \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('habilitation', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("status", status.as_str().to_string()))
            .bind(("decided_by", decided_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<HabilitationRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "habilitation".into(),
            id: id_str,
        })?;

        Ok(row.try_into_habilitation()?)
    }

    async fn list_for_user(&self, user: &str) -> OpenGeoResult<Vec<Habilitation>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM habilitation \
                 WHERE login = $login ORDER BY requested_at ASC",
            )
            .bind(("login", user.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HabilitationRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(collect(rows)?)
    }

    async fn list(&self, filter: HabilitationFilter) -> OpenGeoResult<Vec<Habilitation>> {
        let mut conditions = Vec::new();
        if filter.status.is_some() {
            conditions.push("status = $status");
        }
        if filter.entity.is_some() {
            conditions.push("entity = $entity");
        }
        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM habilitation {clause} \
             ORDER BY requested_at ASC"
        );

        let mut builder = self.db.query(&query);
        if let Some(status) = filter.status {
            builder = builder.bind(("status", status.as_str().to_string()));
        }
        if let Some(entity) = filter.entity {
            builder = builder.bind(("entity", entity));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<HabilitationRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(collect(rows)?)
    }
}
