use std::collections::HashSet;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::errors::AppError;
use crate::jwt::Claims;

/// Principal represents the authenticated caller and the grants its token carries
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
    pub roles: HashSet<String>,
    pub permissions: HashSet<String>,
}

impl Principal {
    pub fn new(user_id: i64, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            roles: HashSet::new(),
            permissions: HashSet::new(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = String>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    pub fn with_permissions(mut self, perms: impl IntoIterator<Item = String>) -> Self {
        self.permissions = perms.into_iter().collect();
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

impl TryFrom<Claims> for Principal {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = claims
            .user_id
            .parse::<i64>()
            .map_err(|_| AppError::token("userId claim is not numeric"))?;

        Ok(Principal::new(user_id, claims.email)
            .with_roles(claims.roles)
            .with_permissions(claims.permissions))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(user_id: &str) -> Claims {
        Claims {
            user_id: user_id.to_string(),
            email: "jane@example.com".to_string(),
            roles: vec!["User".to_string()],
            permissions: vec!["Order_GetAll".to_string()],
            iss: "iss".to_string(),
            aud: "aud".to_string(),
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn principal_carries_token_grants() {
        let principal = Principal::try_from(claims("9")).unwrap();
        assert_eq!(principal.user_id, 9);
        assert!(principal.roles.contains("User"));
        assert!(principal.has_permission("Order_GetAll"));
        assert!(!principal.has_permission("Order_Delete"));
    }

    #[test]
    fn non_numeric_user_id_is_a_token_error() {
        let err = Principal::try_from(claims("abc")).unwrap_err();
        assert!(matches!(err, AppError::Token(_)));
    }
}
