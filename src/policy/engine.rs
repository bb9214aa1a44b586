use crate::policy::types::{
    AccessOutcome, Decision, PolicyConfiguration, RedirectTarget, RequestKind, UserContext,
};

/// Resolve the effective policy for `user`.
///
/// The first assignment (in insertion order) sharing a role with the user
/// supplies the redirect; otherwise the global default is used. The chosen
/// target is validated again here, and a target that no longer validates
/// becomes `Home`.
pub fn resolve(config: &PolicyConfiguration, user: &UserContext) -> Decision {
    let global = &config.global;

    if !global.enabled || global.restricted_roles().is_empty() {
        return Decision::Allowed;
    }

    if !user.is_authenticated {
        return Decision::Allowed;
    }

    // Checked before any override, whatever the restricted set says.
    if user.is_administrator() {
        return Decision::Allowed;
    }

    if user.roles.is_disjoint(global.restricted_roles()) {
        return Decision::Allowed;
    }

    let target = match config.assignments().iter().position(|a| a.matches(&user.roles)) {
        Some(index) => {
            tracing::debug!(assignment = index, "Role assignment matched");
            config.assignments()[index].redirect()
        }
        None => &global.default_redirect,
    };

    Decision::Denied(checked(target))
}

fn checked(target: &RedirectTarget) -> RedirectTarget {
    let revalidated = target.revalidated();
    if &revalidated != target {
        tracing::warn!(%target, "Redirect target failed revalidation, using home");
    }
    revalidated
}

/// Whether the admin bar should be shown to `user`.
pub fn admin_bar_visible(config: &PolicyConfiguration, user: &UserContext) -> bool {
    resolve(config, user).is_allowed()
}

/// Whether a request into the admin area may proceed. Background requests
/// made by the admin UI itself are never redirected.
pub fn access_decision(
    config: &PolicyConfiguration,
    user: &UserContext,
    kind: RequestKind,
) -> AccessOutcome {
    if kind == RequestKind::Async {
        return AccessOutcome::Continue;
    }

    match resolve(config, user) {
        Decision::Allowed => AccessOutcome::Continue,
        Decision::Denied(target) => AccessOutcome::Redirect(target),
    }
}
