use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted note or todo. The two resources are structurally identical
/// and differ only in which table backs them.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Record {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Maximum title length, from the original `VARCHAR(100)` column.
pub const MAX_TITLE_LEN: usize = 100;

/// Which record table a store or service operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Notes,
    Todos,
}

impl Resource {
    pub fn table(&self) -> &'static str {
        match self {
            Resource::Notes => "notes",
            Resource::Todos => "todos",
        }
    }

    /// Route segment under `/api/v1`.
    pub fn route(&self) -> &'static str {
        self.table()
    }
}

impl std::str::FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notes" => Ok(Resource::Notes),
            "todos" => Ok(Resource::Todos),
            other => Err(format!("unknown resource '{other}' (expected notes or todos)")),
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}
