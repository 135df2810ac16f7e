use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Doctor => write!(f, "doctor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Request-scoped identity handed to every workflow call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    /// Supabase issues `role: authenticated` for every signed-in user, so the
    /// application role falls back to `user_metadata.role`.
    pub fn from_user(user: &User) -> Result<Self, AppError> {
        let id = Uuid::parse_str(&user.id)
            .map_err(|_| AppError::Auth("Invalid user id in token".to_string()))?;

        let claimed = user.role.as_deref().filter(|role| *role != "authenticated");
        let metadata_role = user
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.get("role"))
            .and_then(|role| role.as_str());

        let role = claimed
            .or(metadata_role)
            .ok_or_else(|| AppError::Forbidden("User role is not set".to_string()))?
            .parse::<Role>()
            .map_err(AppError::Forbidden)?;

        Ok(Self { id, role })
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("Access denied. {} role required", role)))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(role: Option<&str>, metadata: Option<serde_json::Value>) -> User {
        User {
            id: Uuid::new_v4().to_string(),
            email: Some("someone@example.com".to_string()),
            role: role.map(str::to_string),
            metadata,
            created_at: None,
        }
    }

    #[test]
    fn test_actor_from_role_claim() {
        let actor = Actor::from_user(&user(Some("doctor"), None)).unwrap();
        assert_eq!(actor.role, Role::Doctor);
    }

    #[test]
    fn test_actor_falls_back_to_metadata_role() {
        let actor = Actor::from_user(&user(
            Some("authenticated"),
            Some(json!({ "role": "patient" })),
        ))
        .unwrap();
        assert_eq!(actor.role, Role::Patient);
    }

    #[test]
    fn test_actor_rejects_unknown_role() {
        let result = Actor::from_user(&user(Some("nurse"), None));
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_actor_rejects_non_uuid_subject() {
        let mut user = user(Some("admin"), None);
        user.id = "not-a-uuid".to_string();
        assert!(matches!(Actor::from_user(&user), Err(AppError::Auth(_))));
    }

    #[test]
    fn test_require_role() {
        let actor = Actor::new(Uuid::new_v4(), Role::Patient);
        assert!(actor.require_role(Role::Patient).is_ok());
        match actor.require_role(Role::Doctor) {
            Err(AppError::Forbidden(msg)) => assert_eq!(msg, "Access denied. doctor role required"),
            other => panic!("Expected Forbidden, got {:?}", other),
        }
    }
}
