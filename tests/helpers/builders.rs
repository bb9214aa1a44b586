use gatehouse::policy::store::{add_assignment, set_restricted_roles};
use gatehouse::policy::types::{AssignmentCandidate, PolicyConfiguration, RedirectInput, RedirectTarget, RoleId};

/// Builder for policy configurations, going through the same write-side
/// operations an administrator would.
pub struct ConfigBuilder {
    enabled: bool,
    restricted: Vec<String>,
    default_redirect: RedirectInput,
    assignments: Vec<(Vec<String>, RedirectInput)>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            enabled: true,
            restricted: Vec::new(),
            default_redirect: RedirectInput::home(),
            assignments: Vec::new(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn restrict(mut self, roles: &[&str]) -> Self {
        self.restricted = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn default_redirect(mut self, redirect: RedirectInput) -> Self {
        self.default_redirect = redirect;
        self
    }

    pub fn assign(mut self, roles: &[&str], redirect: RedirectInput) -> Self {
        self.assignments
            .push((roles.iter().map(|r| r.to_string()).collect(), redirect));
        self
    }

    pub fn build(self) -> PolicyConfiguration {
        let mut config = PolicyConfiguration::default();
        config.global.enabled = self.enabled;
        config.global.default_redirect = RedirectTarget::from_input(&self.default_redirect);
        set_restricted_roles(
            &mut config,
            self.restricted.into_iter().map(RoleId::from).collect(),
        )
        .expect("Failed to set restricted roles");
        for (roles, redirect) in self.assignments {
            add_assignment(&mut config, AssignmentCandidate::new(roles, redirect))
                .expect("Failed to add role assignment");
        }
        config
    }
}

/// Redirect target for a validated relative path.
pub fn path(p: &str) -> RedirectTarget {
    let target = RedirectTarget::from_input(&RedirectInput::path(p));
    assert_ne!(target, RedirectTarget::Home, "test path `{p}` does not validate");
    target
}
