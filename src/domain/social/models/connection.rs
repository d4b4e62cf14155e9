//! Connection model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type};
use uuid::Uuid;

/// Whether a connection belongs to one user or to the organization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Ownership {
    Personal,
    Org,
}

impl Ownership {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ownership::Personal => "personal",
            Ownership::Org => "org",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "org" => Ownership::Org,
            _ => Ownership::Personal,
        }
    }

    /// Synthetic aggregation-service username for a user under this
    /// ownership, e.g. `personal_user-1` or `org_user-1`
    pub fn external_username(&self, user_id: &str) -> String {
        format!("{}_{}", self.as_str(), user_id)
    }
}

// sqlx Type/Decode/Encode for Ownership to enable FromRow on Connection
impl Type<Postgres> for Ownership {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Ownership {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <String as Decode<Postgres>>::decode(value)?;
        Ok(Ownership::from_str(&s))
    }
}

impl Encode<'_, Postgres> for Ownership {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <String as Encode<Postgres>>::encode_by_ref(&self.as_str().to_owned(), buf)
    }
}

/// A platform account reachable through the aggregation service.
/// Unique on (user_id, platform, ownership); disconnects soft-delete via
/// `active` so dispatch history stays intact.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Connection {
    pub id: Uuid,
    pub user_id: String,
    pub platform: String,
    pub ownership: Ownership,
    /// Aggregation-side profile this account lives under
    pub external_username: Option<String>,
    /// Human-readable account name when the platform reports one
    pub platform_username: Option<String>,
    pub platform_user_id: Option<String>,
    pub active: bool,
    pub connected_at: DateTime<Utc>,
    pub last_successful_post_at: Option<DateTime<Utc>>,
    pub last_error_message: Option<String>,
    pub profile_data: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_username() {
        assert_eq!(Ownership::Personal.external_username("u1"), "personal_u1");
        assert_eq!(Ownership::Org.external_username("u1"), "org_u1");
    }
}
