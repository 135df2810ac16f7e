use thiserror::Error;

/// Failures reported by PostgREST that callers need to tell apart.
/// Attached to `anyhow::Error` so stores can `downcast_ref` them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid header value for {0}")]
    InvalidHeader(String),
}

impl DatabaseError {
    /// PostgREST answers a unique violation with 409 and Postgres code 23505.
    pub fn from_response(status: u16, body: &str) -> Self {
        match status {
            409 => DatabaseError::UniqueViolation(body.to_string()),
            400 if body.contains("23505") => DatabaseError::UniqueViolation(body.to_string()),
            401 | 403 => DatabaseError::Auth(body.to_string()),
            404 => DatabaseError::NotFound(body.to_string()),
            _ => DatabaseError::Api { status, message: body.to_string() },
        }
    }

    pub fn is_unique_violation(error: &anyhow::Error) -> bool {
        matches!(
            error.downcast_ref::<DatabaseError>(),
            Some(DatabaseError::UniqueViolation(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_maps_conflict() {
        let err = DatabaseError::from_response(409, r#"{"code":"23505"}"#);
        assert!(matches!(err, DatabaseError::UniqueViolation(_)));
    }

    #[test]
    fn test_from_response_maps_other_statuses() {
        assert!(matches!(DatabaseError::from_response(401, ""), DatabaseError::Auth(_)));
        assert!(matches!(DatabaseError::from_response(404, ""), DatabaseError::NotFound(_)));
        assert_eq!(
            DatabaseError::from_response(500, "boom"),
            DatabaseError::Api { status: 500, message: "boom".to_string() }
        );
    }

    #[test]
    fn test_is_unique_violation_through_anyhow() {
        let err = anyhow::Error::new(DatabaseError::UniqueViolation("dup".into()));
        assert!(DatabaseError::is_unique_violation(&err));
        assert!(!DatabaseError::is_unique_violation(&anyhow::anyhow!("other")));
    }
}
