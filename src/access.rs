//! Actor context and access policy
//!
//! Role checks live in one policy table consulted at the guard boundary,
//! instead of ad hoc conditionals scattered through the writer. A rule grants
//! an `(role, action)` pair a scope; absence of a rule denies the action.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{OnboardingError, OnboardingResult};

/// Actor context supplied by the authentication layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
    /// None for global actors
    pub branch_id: Option<i64>,
}

impl Actor {
    pub fn global_admin(id: Uuid) -> Self {
        Self {
            id,
            role: ActorRole::GlobalAdmin,
            branch_id: None,
        }
    }

    pub fn branch_admin(id: Uuid, branch_id: i64) -> Self {
        Self {
            id,
            role: ActorRole::BranchAdmin,
            branch_id: Some(branch_id),
        }
    }

    pub fn staff(id: Uuid, branch_id: i64) -> Self {
        Self {
            id,
            role: ActorRole::Staff,
            branch_id: Some(branch_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    BranchAdmin,
    GlobalAdmin,
    Staff,
}

/// Operations gated by the policy table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Edit,
    SetStatus,
    Delete,
    Import,
    Export,
    ViewHistory,
}

impl Action {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Edit => "edit",
            Self::SetStatus => "set_status",
            Self::Delete => "delete",
            Self::Import => "import",
            Self::Export => "export",
            Self::ViewHistory => "view_history",
        }
    }
}

/// How far a granted action reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Any branch
    Global,
    /// Only the actor's own branch
    OwnBranch,
}

/// The full policy. Global admins act everywhere; branch admins act inside
/// their branch; staff handle the review flow but cannot import or delete.
const POLICY: &[(ActorRole, Action, Scope)] = &[
    (ActorRole::GlobalAdmin, Action::Create, Scope::Global),
    (ActorRole::GlobalAdmin, Action::Edit, Scope::Global),
    (ActorRole::GlobalAdmin, Action::SetStatus, Scope::Global),
    (ActorRole::GlobalAdmin, Action::Delete, Scope::Global),
    (ActorRole::GlobalAdmin, Action::Import, Scope::Global),
    (ActorRole::GlobalAdmin, Action::Export, Scope::Global),
    (ActorRole::GlobalAdmin, Action::ViewHistory, Scope::Global),
    (ActorRole::BranchAdmin, Action::Create, Scope::OwnBranch),
    (ActorRole::BranchAdmin, Action::Edit, Scope::OwnBranch),
    (ActorRole::BranchAdmin, Action::SetStatus, Scope::OwnBranch),
    (ActorRole::BranchAdmin, Action::Delete, Scope::OwnBranch),
    (ActorRole::BranchAdmin, Action::Import, Scope::OwnBranch),
    (ActorRole::BranchAdmin, Action::Export, Scope::OwnBranch),
    (ActorRole::BranchAdmin, Action::ViewHistory, Scope::OwnBranch),
    (ActorRole::Staff, Action::Create, Scope::OwnBranch),
    (ActorRole::Staff, Action::Edit, Scope::OwnBranch),
    (ActorRole::Staff, Action::SetStatus, Scope::OwnBranch),
    (ActorRole::Staff, Action::Export, Scope::OwnBranch),
    (ActorRole::Staff, Action::ViewHistory, Scope::OwnBranch),
];

/// Check an actor against the policy table for an action on a target branch.
///
/// `target_branch` is None for operations without a single target (a global
/// export, a cross-branch delete) — those require Global scope.
pub fn authorize(actor: &Actor, action: Action, target_branch: Option<i64>) -> OnboardingResult<()> {
    let scope = POLICY
        .iter()
        .find(|(role, act, _)| *role == actor.role && *act == action)
        .map(|(_, _, scope)| *scope);

    let allowed = match scope {
        None => false,
        Some(Scope::Global) => true,
        Some(Scope::OwnBranch) => match (actor.branch_id, target_branch) {
            (Some(own), Some(target)) => own == target,
            // Branch-scoped actor without a target branch never qualifies
            _ => false,
        },
    };

    if allowed {
        Ok(())
    } else {
        Err(OnboardingError::AccessDenied {
            details: format!(
                "role {:?} may not {} on branch {:?}",
                actor.role,
                action.as_str(),
                target_branch
            ),
        })
    }
}

/// Whether the actor sees every branch (used to relax filters on reads).
pub fn is_global(actor: &Actor) -> bool {
    actor.role == ActorRole::GlobalAdmin
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch_admin(branch: i64) -> Actor {
        Actor::branch_admin(Uuid::new_v4(), branch)
    }

    #[test]
    fn global_admin_passes_everywhere() {
        let actor = Actor::global_admin(Uuid::new_v4());
        assert!(authorize(&actor, Action::Edit, Some(5)).is_ok());
        assert!(authorize(&actor, Action::Delete, None).is_ok());
    }

    #[test]
    fn branch_admin_is_scoped_to_own_branch() {
        let actor = branch_admin(2);
        assert!(authorize(&actor, Action::Edit, Some(2)).is_ok());
        let err = authorize(&actor, Action::Edit, Some(5)).unwrap_err();
        assert_eq!(err.kind(), "access_denied");
    }

    #[test]
    fn branch_admin_cannot_run_unscoped_operations() {
        let actor = branch_admin(2);
        assert!(authorize(&actor, Action::Delete, None).is_err());
    }

    #[test]
    fn staff_cannot_import_or_delete() {
        let actor = Actor::staff(Uuid::new_v4(), 1);
        assert!(authorize(&actor, Action::Import, Some(1)).is_err());
        assert!(authorize(&actor, Action::Delete, Some(1)).is_err());
        assert!(authorize(&actor, Action::SetStatus, Some(1)).is_ok());
    }
}
