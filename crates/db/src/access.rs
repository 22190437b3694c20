//! Who may change what.

use std::sync::Arc;

use async_trait::async_trait;
use haulage_shared::types::{OrganizationId, UserId};
use haulage_shared::{AppError, AppResult};

use crate::directory::Directory;

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// Acting user.
    pub user_id: UserId,
    /// Organisation the caller is working in.
    pub organization_id: OrganizationId,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub const fn new(user_id: UserId, organization_id: OrganizationId) -> Self {
        Self {
            user_id,
            organization_id,
        }
    }
}

/// Inputs to an edit-permission decision.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest {
    /// Organisation owning the entity.
    pub entity_organization: OrganizationId,
    /// Author of the remark being changed, for remark edits.
    pub remark_author: Option<UserId>,
    /// Acting user.
    pub user_id: UserId,
}

/// Edit-permission decisions.
#[async_trait]
pub trait AccessPolicy: Send + Sync {
    /// Returns true if the request is allowed.
    async fn can_edit(&self, request: AccessRequest) -> AppResult<bool>;
}

/// Members may edit their organisation's entities; remarks only by their
/// author.
#[derive(Clone)]
pub struct MembershipPolicy {
    directory: Arc<dyn Directory>,
}

impl std::fmt::Debug for MembershipPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipPolicy").finish_non_exhaustive()
    }
}

impl MembershipPolicy {
    /// Creates the policy over a directory.
    #[must_use]
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl AccessPolicy for MembershipPolicy {
    async fn can_edit(&self, request: AccessRequest) -> AppResult<bool> {
        if let Some(author) = request.remark_author {
            if author != request.user_id {
                return Ok(false);
            }
        }
        Ok(self
            .directory
            .is_member(request.entity_organization, request.user_id)
            .await?)
    }
}

/// Fails with `Forbidden` unless the policy allows the request.
pub async fn ensure_can_edit(policy: &dyn AccessPolicy, request: AccessRequest) -> AppResult<()> {
    if policy.can_edit(request).await? {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "user {} may not edit entities of organization {}",
            request.user_id, request.entity_organization
        )))
    }
}
