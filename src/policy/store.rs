//! Write side of the policy: every administrative change to a
//! [`PolicyConfiguration`] goes through these operations, which keep the
//! assignments consistent with the restricted-role set.

use crate::policy::errors::{ConflictError, NotFoundError, RejectedAssignment};
use crate::policy::types::{
    join_roles, sanitize_roles, AssignmentCandidate, PolicyConfiguration, RedirectTarget,
    RoleAssignment, RoleSet, Submission,
};

/// Replace the restricted-role set.
///
/// Fails, leaving the configuration untouched, when a role that would stop
/// being restricted is still referenced by an assignment. The administrator
/// role is never kept in the requested set.
pub fn set_restricted_roles(
    config: &mut PolicyConfiguration,
    requested: RoleSet,
) -> Result<RoleSet, ConflictError> {
    let requested: RoleSet = requested
        .into_iter()
        .filter(|r| !r.is_administrator())
        .collect();

    let in_use = config.roles_in_use();
    let conflicting: RoleSet = config
        .global
        .restricted_roles
        .difference(&requested)
        .filter(|r| in_use.contains(*r))
        .cloned()
        .collect();

    if !conflicting.is_empty() {
        tracing::warn!(roles = %join_roles(&conflicting), "Refusing to un-restrict roles in use");
        return Err(ConflictError { roles: conflicting });
    }

    config.global.restricted_roles = requested.clone();
    Ok(requested)
}

/// Append a role assignment. The redirect of the candidate is validated;
/// an invalid redirect is stored as `Home` rather than failing the call.
pub fn add_assignment(
    config: &mut PolicyConfiguration,
    candidate: AssignmentCandidate,
) -> Result<RoleAssignment, RejectedAssignment> {
    let roles = sanitize_roles(&candidate.roles);
    if roles.is_empty() {
        return Err(RejectedAssignment::EmptyRoles);
    }

    let unrestricted: RoleSet = roles
        .difference(config.global.restricted_roles())
        .cloned()
        .collect();
    if !unrestricted.is_empty() {
        return Err(RejectedAssignment::UnrestrictedRoles {
            roles: unrestricted,
        });
    }

    let assignment = RoleAssignment {
        roles,
        redirect: RedirectTarget::from_input(&candidate.redirect),
    };
    tracing::debug!(
        roles = %join_roles(&assignment.roles),
        redirect = %assignment.redirect,
        "Added role assignment"
    );
    config.assignments.push(assignment.clone());
    Ok(assignment)
}

/// Remove the assignment at `index`; later assignments shift down by one.
pub fn remove_assignment(
    config: &mut PolicyConfiguration,
    index: usize,
) -> Result<RoleAssignment, NotFoundError> {
    if index >= config.assignments.len() {
        return Err(NotFoundError {
            index,
            len: config.assignments.len(),
        });
    }
    Ok(config.assignments.remove(index))
}

/// Result of applying one settings-form post.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub config: PolicyConfiguration,
    /// Human-readable errors for the administrator
    pub notices: Vec<String>,
}

/// Apply a settings-form post to a copy of `current`.
///
/// Removal runs first, then the global fields, then the restricted roles,
/// then the new assignments, which are checked against the restricted set
/// that resulted from the previous step. Each failure becomes a notice and
/// leaves the affected part of the configuration as it was.
pub fn apply_submission(
    current: &PolicyConfiguration,
    submission: Submission,
) -> SubmissionOutcome {
    let mut config = current.clone();
    let mut notices = Vec::new();

    if let Some(index) = submission.remove_assignment {
        if let Err(e) = remove_assignment(&mut config, index) {
            notices.push(e.to_string());
        }
    }

    config.global.enabled = submission.enabled;
    config.global.default_redirect = RedirectTarget::from_input(&submission.redirect);

    if let Err(e) = set_restricted_roles(&mut config, sanitize_roles(&submission.restricted_roles)) {
        notices.push(e.to_string());
    }

    for raw in &submission.role_assignments {
        let candidate = match decode_candidate(raw) {
            Ok(c) => c,
            Err(msg) => {
                notices.push(msg);
                continue;
            }
        };
        if let Err(e) = add_assignment(&mut config, candidate) {
            notices.push(e.to_string());
        }
    }

    if !notices.is_empty() {
        tracing::info!(count = notices.len(), "Settings submission produced notices");
    }

    SubmissionOutcome { config, notices }
}

/// Decode one URL-escaped JSON assignment candidate.
pub fn decode_candidate(raw: &str) -> Result<AssignmentCandidate, String> {
    let decoded = urlencoding::decode(raw)
        .map_err(|e| format!("Ignoring role assignment that is not valid UTF-8: {e}"))?;
    serde_json::from_str(&decoded)
        .map_err(|e| format!("Ignoring malformed role assignment: {e}"))
}
