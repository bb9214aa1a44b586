use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

use crate::policy::validator::{validate_path, validate_url, SafePath, SafeUrl};

/// The privileged role that is never subject to restriction.
pub const ADMINISTRATOR_ROLE: &str = "administrator";

/// Opaque role identifier, e.g. "editor".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(String);

impl RoleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_administrator(&self) -> bool {
        self.0 == ADMINISTRATOR_ROLE
    }
}

impl From<&str> for RoleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RoleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for RoleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type RoleSet = BTreeSet<RoleId>;

/// Normalize role ids coming from administrative input: trim whitespace,
/// drop empty ids and the administrator role.
pub fn sanitize_roles<I, S>(raw: I) -> RoleSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .map(|r| r.as_ref().trim().to_string())
        .filter(|r| !r.is_empty() && r != ADMINISTRATOR_ROLE)
        .map(RoleId::from)
        .collect()
}

/// Comma separated role list for human-readable messages.
pub fn join_roles(roles: &RoleSet) -> String {
    roles
        .iter()
        .map(RoleId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------- Redirect targets ----------

/// Where a restricted user is sent instead of the admin area.
///
/// `Path` and `Url` only hold values produced by the validator. Stored
/// targets are re-validated when deserialized and again at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "value",
    rename_all = "snake_case",
    from = "StoredRedirect"
)]
pub enum RedirectTarget {
    #[default]
    Home,
    Path(SafePath),
    Url(SafeUrl),
}

/// Persisted shape of a redirect target before it is trusted.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
enum StoredRedirect {
    Home,
    Path(String),
    Url(String),
}

impl From<StoredRedirect> for RedirectTarget {
    fn from(stored: StoredRedirect) -> Self {
        let checked = match &stored {
            StoredRedirect::Home => return RedirectTarget::Home,
            StoredRedirect::Path(raw) => validate_path(raw).map(RedirectTarget::Path),
            StoredRedirect::Url(raw) => validate_url(raw).map(RedirectTarget::Url),
        };
        checked.unwrap_or_else(|reason| {
            tracing::warn!(?stored, %reason, "Stored redirect target failed validation, using home");
            RedirectTarget::Home
        })
    }
}

impl RedirectTarget {
    /// Build a target from settings-form input. Anything that does not
    /// validate degrades to `Home`.
    pub fn from_input(input: &RedirectInput) -> Self {
        match input.redirect_type.as_str() {
            "custom_path" => validate_path(&input.custom_path)
                .map(RedirectTarget::Path)
                .unwrap_or_default(),
            "full_url" => validate_url(&input.full_url)
                .map(RedirectTarget::Url)
                .unwrap_or_default(),
            _ => RedirectTarget::Home,
        }
    }

    /// Run the validator again over the held value.
    pub fn revalidated(&self) -> Self {
        match self {
            RedirectTarget::Home => RedirectTarget::Home,
            RedirectTarget::Path(p) => validate_path(p.as_str())
                .map(RedirectTarget::Path)
                .unwrap_or_default(),
            RedirectTarget::Url(u) => validate_url(u.as_str())
                .map(RedirectTarget::Url)
                .unwrap_or_default(),
        }
    }

    /// Concrete location to send the browser to.
    ///
    /// Paths are joined to `site_url` and get a trailing slash unless they
    /// end in a file extension.
    pub fn location(&self, site_url: &str) -> String {
        let base = site_url.trim_end_matches('/');
        match self {
            RedirectTarget::Home => format!("{base}/"),
            RedirectTarget::Path(p) => {
                let path = p.as_str().trim_start_matches('/');
                if has_file_extension(path) {
                    format!("{base}/{path}")
                } else {
                    format!("{base}/{}/", path.trim_end_matches('/'))
                }
            }
            RedirectTarget::Url(u) => u.as_str().to_string(),
        }
    }
}

fn has_file_extension(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or(path);
    match last.rsplit_once('.') {
        Some((_, ext)) => !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()),
        None => false,
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectTarget::Home => f.write_str("home"),
            RedirectTarget::Path(p) => write!(f, "path:{p}"),
            RedirectTarget::Url(u) => write!(f, "url:{u}"),
        }
    }
}

/// Redirect as described by the settings form: a type selector plus the
/// two free-text fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectInput {
    /// "home", "custom_path" or "full_url"
    pub redirect_type: String,
    pub custom_path: String,
    pub full_url: String,
}

impl RedirectInput {
    pub fn home() -> Self {
        Self {
            redirect_type: "home".into(),
            ..Default::default()
        }
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self {
            redirect_type: "custom_path".into(),
            custom_path: path.into(),
            ..Default::default()
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self {
            redirect_type: "full_url".into(),
            full_url: url.into(),
            ..Default::default()
        }
    }
}

// ---------- Policy configuration ----------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalPolicy {
    /// Master switch; nothing is restricted while false.
    pub enabled: bool,
    pub(crate) restricted_roles: RoleSet,
    pub default_redirect: RedirectTarget,
}

impl GlobalPolicy {
    pub fn restricted_roles(&self) -> &RoleSet {
        &self.restricted_roles
    }
}

/// Override that sends users holding any of `roles` to its own target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub(crate) roles: RoleSet,
    pub(crate) redirect: RedirectTarget,
}

impl RoleAssignment {
    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    pub fn redirect(&self) -> &RedirectTarget {
        &self.redirect
    }

    pub fn matches(&self, roles: &RoleSet) -> bool {
        !self.roles.is_disjoint(roles)
    }
}

/// Global policy plus the ordered role overrides. This is the unit that is
/// loaded and persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfiguration {
    pub global: GlobalPolicy,
    pub(crate) assignments: Vec<RoleAssignment>,
}

impl PolicyConfiguration {
    pub fn assignments(&self) -> &[RoleAssignment] {
        &self.assignments
    }

    /// Union of the roles referenced by any assignment.
    pub fn roles_in_use(&self) -> RoleSet {
        self.assignments
            .iter()
            .flat_map(|a| a.roles.iter().cloned())
            .collect()
    }

    /// Re-establish the structural invariants on a configuration that came
    /// from storage: no administrator anywhere, assignments reference only
    /// restricted roles, and no assignment is left without roles.
    pub fn sanitized(mut self) -> Self {
        self.global.restricted_roles.retain(|r| !r.is_administrator());
        let restricted = &self.global.restricted_roles;
        let before = self.assignments.len();
        for assignment in &mut self.assignments {
            assignment.roles.retain(|r| restricted.contains(r));
        }
        self.assignments.retain(|a| !a.roles.is_empty());
        if self.assignments.len() != before {
            tracing::warn!(
                dropped = before - self.assignments.len(),
                "Discarded role assignments without restricted roles"
            );
        }
        self
    }
}

// ---------- Request side ----------

/// Identity of the current requester, supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserContext {
    pub roles: RoleSet,
    pub is_authenticated: bool,
}

impl UserContext {
    pub fn authenticated<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RoleId>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            is_authenticated: true,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_administrator(&self) -> bool {
        self.roles.contains(ADMINISTRATOR_ROLE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(RedirectTarget),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Requests issued by the admin UI itself in the background are exempt from
/// the access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestKind {
    #[default]
    Page,
    Async,
}

impl RequestKind {
    pub fn from_path(path: &str, async_prefixes: &[String]) -> Self {
        if async_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && path.starts_with(prefix.as_str()))
        {
            RequestKind::Async
        } else {
            RequestKind::Page
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    Continue,
    Redirect(RedirectTarget),
}

// ---------- API request/response types ----------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DecideRequest {
    /// Roles held by the user, e.g. ["editor"]
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default = "default_authenticated")]
    pub authenticated: bool,
    /// Request path, used to recognise background API calls
    #[serde(default)]
    pub path: Option<String>,
}

fn default_authenticated() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecideResponse {
    pub admin_bar_visible: bool,
    pub access: AccessView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessView {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A role assignment as posted by the settings form (JSON, URL-escaped).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentCandidate {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(flatten)]
    pub redirect: RedirectInput,
}

impl AssignmentCandidate {
    pub fn new<I, S>(roles: I, redirect: RedirectInput) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            redirect,
        }
    }
}

/// One post of the settings form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Submission {
    pub enabled: bool,
    pub restricted_roles: Vec<String>,
    pub redirect: RedirectInput,
    /// URL-escaped JSON `AssignmentCandidate`s
    pub role_assignments: Vec<String>,
    pub remove_assignment: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResponse {
    pub config: PolicyConfiguration,
    pub notices: Vec<String>,
}
