//! REST handlers, one module per resource.

pub mod generic_object;
pub mod habilitation;
pub mod health;
pub mod sub_object;
pub mod suggestion;
pub mod synthese;

use opengeo_core::repository::Pagination;
use serde::Deserialize;

fn pagination(offset: Option<u64>, limit: Option<u64>) -> Pagination {
    let default = Pagination::default();
    Pagination {
        offset: offset.unwrap_or(default.offset),
        limit: limit.unwrap_or(default.limit),
    }
}

/// `?offset=&limit=` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        pagination(self.offset, self.limit)
    }
}

/// `?entity=&offset=&limit=` query parameters of document listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub entity: Option<String>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl ListQuery {
    pub fn pagination(&self) -> Pagination {
        pagination(self.offset, self.limit)
    }
}
