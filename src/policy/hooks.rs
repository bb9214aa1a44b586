//! Wiring between the decision engine and the host's request pipeline.

use crate::policy::engine;
use crate::policy::errors::StoreError;
use crate::policy::persist::ConfigStore;
use crate::policy::types::{
    AccessOutcome, AccessView, DecideRequest, DecideResponse, RequestKind, RoleId, UserContext,
};

/// Services the host platform provides to the policy core.
///
/// When [`on_request`] returns a [`StoreError`] no decision was made. The
/// host must then treat the request as denied: hide the admin bar and
/// redirect to the site home.
pub trait Host {
    fn current_user(&self) -> UserContext;
    fn hide_admin_bar(&mut self);
    /// Send the browser to `location`. Request handling stops after this.
    fn redirect(&mut self, location: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFlow {
    Continue,
    Halt { location: String },
}

/// Run both policy decisions for one request.
///
/// The configuration is loaded fresh for each decision so that a change
/// saved by an administrator is visible immediately. A load failure is
/// returned as is; see [`Host`] for how it must be handled.
pub fn on_request<S, H>(
    store: &S,
    host: &mut H,
    kind: RequestKind,
    site_url: &str,
) -> Result<RequestFlow, StoreError>
where
    S: ConfigStore + ?Sized,
    H: Host,
{
    let user = host.current_user();

    let config = store.load()?;
    if !engine::admin_bar_visible(&config, &user) {
        host.hide_admin_bar();
    }

    let config = store.load()?;
    match engine::access_decision(&config, &user, kind) {
        AccessOutcome::Continue => Ok(RequestFlow::Continue),
        AccessOutcome::Redirect(target) => {
            let location = target.location(site_url);
            tracing::info!(%location, ?kind, "Redirecting restricted user away from admin area");
            host.redirect(&location);
            Ok(RequestFlow::Halt { location })
        }
    }
}

/// Host that only records what the policy asked for; used to answer
/// decision queries from out-of-process hosts.
#[derive(Debug, Clone)]
pub struct RecordingHost {
    user: UserContext,
    pub admin_bar_hidden: bool,
    pub redirected_to: Option<String>,
}

impl RecordingHost {
    pub fn new(user: UserContext) -> Self {
        Self {
            user,
            admin_bar_hidden: false,
            redirected_to: None,
        }
    }
}

impl Host for RecordingHost {
    fn current_user(&self) -> UserContext {
        self.user.clone()
    }

    fn hide_admin_bar(&mut self) {
        self.admin_bar_hidden = true;
    }

    fn redirect(&mut self, location: &str) {
        self.redirected_to = Some(location.to_string());
    }
}

/// Answer a [`DecideRequest`] against the current configuration.
pub fn decide<S>(
    store: &S,
    request: &DecideRequest,
    site_url: &str,
    async_prefixes: &[String],
) -> Result<DecideResponse, StoreError>
where
    S: ConfigStore + ?Sized,
{
    let user = UserContext {
        roles: request.roles.iter().map(|r| RoleId::from(r.trim())).collect(),
        is_authenticated: request.authenticated,
    };
    let kind = request
        .path
        .as_deref()
        .map(|p| RequestKind::from_path(p, async_prefixes))
        .unwrap_or_default();

    let mut host = RecordingHost::new(user);
    let flow = on_request(store, &mut host, kind, site_url)?;

    let access = match flow {
        RequestFlow::Continue => AccessView {
            allowed: true,
            location: None,
        },
        RequestFlow::Halt { location } => AccessView {
            allowed: false,
            location: Some(location),
        },
    };

    Ok(DecideResponse {
        admin_bar_visible: !host.admin_bar_hidden,
        access,
    })
}
