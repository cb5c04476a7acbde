use std::sync::Arc;

use async_trait::async_trait;

use super::permission::Permission;
use super::principal::Principal;

/// Policy evaluator trait for pluggable authorization logic
#[async_trait]
pub trait PolicyEvaluator: Send + Sync {
    /// Check if the principal holds the permission
    async fn can(&self, principal: &Principal, permission: Permission) -> bool;
}

/// Allows exactly when the principal's token carries a matching `permission` claim.
///
/// The model is flat: no wildcard, no role bypass, and `AdminPermission`
/// satisfies only itself.
#[derive(Debug, Clone, Default)]
pub struct ClaimPolicyEvaluator;

impl ClaimPolicyEvaluator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PolicyEvaluator for ClaimPolicyEvaluator {
    async fn can(&self, principal: &Principal, permission: Permission) -> bool {
        principal.has_permission(permission.as_str())
    }
}

/// Outcome of checking a request against a permission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// No authenticated session (401).
    Unauthenticated,
    /// Authenticated but lacking the permission (403).
    Forbidden,
}

/// The policy registered for one catalog member.
pub struct PermissionPolicy {
    permission: Permission,
    evaluator: Arc<dyn PolicyEvaluator>,
}

impl PermissionPolicy {
    pub fn permission(&self) -> Permission {
        self.permission
    }

    pub async fn evaluate(&self, principal: Option<&Principal>) -> Decision {
        let Some(principal) = principal else {
            tracing::debug!(permission = %self.permission, "no authenticated session");
            return Decision::Unauthenticated;
        };

        if self.evaluator.can(principal, self.permission).await {
            tracing::debug!(
                user_id = principal.user_id,
                permission = %self.permission,
                "permission granted"
            );
            Decision::Allow
        } else {
            tracing::info!(
                user_id = principal.user_id,
                permission = %self.permission,
                "permission denied"
            );
            Decision::Forbidden
        }
    }
}

impl std::fmt::Debug for PermissionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionPolicy").field("permission", &self.permission).finish()
    }
}

/// One policy per catalog member, registered at startup.
#[derive(Debug)]
pub struct PolicyRegistry {
    policies: Vec<Arc<PermissionPolicy>>,
}

impl PolicyRegistry {
    pub fn from_catalog() -> Self {
        Self::with_evaluator(Arc::new(ClaimPolicyEvaluator::new()))
    }

    pub fn with_evaluator(evaluator: Arc<dyn PolicyEvaluator>) -> Self {
        let policies = Permission::ALL
            .iter()
            .map(|&permission| {
                Arc::new(PermissionPolicy {
                    permission,
                    evaluator: Arc::clone(&evaluator),
                })
            })
            .collect();

        Self { policies }
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn policy(&self, permission: Permission) -> Arc<PermissionPolicy> {
        Arc::clone(&self.policies[permission.index()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal_with(perms: &[&str]) -> Principal {
        Principal::new(1, "a@b.io").with_permissions(perms.iter().map(|p| p.to_string()))
    }

    #[test]
    fn registry_holds_one_policy_per_permission() {
        let registry = PolicyRegistry::from_catalog();
        assert_eq!(registry.len(), Permission::ALL.len());

        for &permission in Permission::ALL {
            let policy = registry.policy(permission);
            assert_eq!(policy.permission(), permission);
        }
    }

    #[tokio::test]
    async fn test_denies_other_permission() {
        let registry = PolicyRegistry::from_catalog();
        let principal = principal_with(&["Order_GetAll"]);

        let decision = registry.policy(Permission::OrderDelete).evaluate(Some(&principal)).await;
        assert_eq!(decision, Decision::Forbidden);

        let decision = registry.policy(Permission::OrderGetAll).evaluate(Some(&principal)).await;
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn test_admin_permission_does_not_imply_others() {
        let registry = PolicyRegistry::from_catalog();
        let principal = principal_with(&["AdminPermission"]).with_roles(vec!["Admin".to_string()]);

        assert_eq!(
            registry.policy(Permission::AdminPermission).evaluate(Some(&principal)).await,
            Decision::Allow
        );
        assert_eq!(
            registry.policy(Permission::ProductDelete).evaluate(Some(&principal)).await,
            Decision::Forbidden
        );
    }

    #[tokio::test]
    async fn test_missing_session_is_unauthenticated() {
        let registry = PolicyRegistry::from_catalog();
        let decision = registry.policy(Permission::ProductGetAll).evaluate(None).await;
        assert_eq!(decision, Decision::Unauthenticated);
    }

    struct AllowAll;

    #[async_trait]
    impl PolicyEvaluator for AllowAll {
        async fn can(&self, _principal: &Principal, _permission: Permission) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_custom_evaluator_is_used_by_every_policy() {
        let registry = PolicyRegistry::with_evaluator(Arc::new(AllowAll));
        let principal = principal_with(&[]);
        assert_eq!(
            registry.policy(Permission::UserDelete).evaluate(Some(&principal)).await,
            Decision::Allow
        );
    }
}
