mod helpers;

use gatehouse::policy::engine::{access_decision, admin_bar_visible, resolve};
use gatehouse::policy::hooks::{on_request, Host, RequestFlow};
use gatehouse::policy::persist::ConfigStore;
use gatehouse::policy::store::{apply_submission, set_restricted_roles};
use gatehouse::policy::types::{
    AccessOutcome, Decision, RedirectInput, RedirectTarget, RequestKind, RoleId, RoleSet, Submission,
    UserContext,
};
use helpers::builders::path;
use helpers::{ConfigBuilder, TestStore};

/// Host double that records every callback.
struct PageRequest {
    user: UserContext,
    hidden: bool,
    redirects: Vec<String>,
}

impl PageRequest {
    fn as_user(roles: &[&str]) -> Self {
        Self {
            user: UserContext::authenticated(roles.iter().copied()),
            hidden: false,
            redirects: Vec::new(),
        }
    }
}

impl Host for PageRequest {
    fn current_user(&self) -> UserContext {
        self.user.clone()
    }

    fn hide_admin_bar(&mut self) {
        self.hidden = true;
    }

    fn redirect(&mut self, location: &str) {
        self.redirects.push(location.to_string());
    }
}

#[test]
fn scenario_a_single_restricted_role_goes_home() {
    let config = ConfigBuilder::new().restrict(&["editor"]).build();
    let editor = UserContext::authenticated(["editor"]);

    assert_eq!(
        access_decision(&config, &editor, RequestKind::Page),
        AccessOutcome::Redirect(RedirectTarget::Home)
    );
    assert!(!admin_bar_visible(&config, &editor));
}

#[test]
fn scenario_b_assignment_overrides_default() {
    let config = ConfigBuilder::new()
        .restrict(&["editor", "author"])
        .assign(&["author"], RedirectInput::path("dashboard"))
        .build();

    assert_eq!(
        resolve(&config, &UserContext::authenticated(["author"])),
        Decision::Denied(path("dashboard"))
    );
    assert_eq!(
        resolve(&config, &UserContext::authenticated(["editor"])),
        Decision::Denied(RedirectTarget::Home)
    );
}

#[test]
fn scenario_c_unrestricting_role_in_use_is_refused() {
    let config = ConfigBuilder::new()
        .restrict(&["editor", "author"])
        .assign(&["author"], RedirectInput::path("dashboard"))
        .build();
    let test_store = TestStore::with(&config);

    let mut working = test_store.store.load().unwrap();
    let err = set_restricted_roles(
        &mut working,
        [RoleId::from("editor")].into_iter().collect(),
    )
    .unwrap_err();

    assert_eq!(err.roles, [RoleId::from("author")].into_iter().collect::<RoleSet>());
    assert_eq!(working, config);
    assert_eq!(test_store.store.load().unwrap(), config);
}

#[test]
fn lifecycle_redirects_restricted_user_to_site_path() {
    let config = ConfigBuilder::new()
        .restrict(&["editor", "author"])
        .assign(&["author"], RedirectInput::path("/members/dashboard/"))
        .default_redirect(RedirectInput::url("https://portal.example.org/start"))
        .build();
    let test_store = TestStore::with(&config);

    let mut author = PageRequest::as_user(&["author"]);
    let flow = on_request(&test_store.store, &mut author, RequestKind::Page, "https://blog.example.com/").unwrap();
    assert_eq!(
        flow,
        RequestFlow::Halt {
            location: "https://blog.example.com/members/dashboard/".into()
        }
    );
    assert!(author.hidden);
    assert_eq!(author.redirects.len(), 1);

    let mut editor = PageRequest::as_user(&["editor"]);
    on_request(&test_store.store, &mut editor, RequestKind::Page, "https://blog.example.com").unwrap();
    assert_eq!(editor.redirects, vec!["https://portal.example.org/start"]);
}

#[test]
fn lifecycle_sees_saved_changes_immediately() {
    let test_store = TestStore::with(&ConfigBuilder::new().restrict(&["editor"]).build());

    let mut first = PageRequest::as_user(&["editor"]);
    let flow = on_request(&test_store.store, &mut first, RequestKind::Page, "https://site.example").unwrap();
    assert!(matches!(flow, RequestFlow::Halt { .. }));

    // An administrator switches the feature off.
    test_store
        .store
        .save(&ConfigBuilder::new().restrict(&["editor"]).disabled().build())
        .unwrap();

    let mut second = PageRequest::as_user(&["editor"]);
    let flow = on_request(&test_store.store, &mut second, RequestKind::Page, "https://site.example").unwrap();
    assert_eq!(flow, RequestFlow::Continue);
    assert!(!second.hidden);
}

#[test]
fn lifecycle_never_touches_administrators_or_visitors() {
    let test_store = TestStore::with(&ConfigBuilder::new().restrict(&["editor"]).build());

    let mut admin = PageRequest::as_user(&["administrator", "editor"]);
    let flow = on_request(&test_store.store, &mut admin, RequestKind::Page, "https://site.example").unwrap();
    assert_eq!(flow, RequestFlow::Continue);
    assert!(!admin.hidden);

    let mut visitor = PageRequest {
        user: UserContext::anonymous(),
        hidden: false,
        redirects: Vec::new(),
    };
    let flow = on_request(&test_store.store, &mut visitor, RequestKind::Page, "https://site.example").unwrap();
    assert_eq!(flow, RequestFlow::Continue);
}

#[test]
fn submission_round_trip_through_store() {
    let test_store = TestStore::new();
    let candidate = urlencoding::encode(
        r#"{"roles":["author"],"redirect_type":"full_url","custom_path":"","full_url":"https://example.com/authors"}"#,
    )
    .into_owned();

    let current = test_store.store.load().unwrap();
    let outcome = apply_submission(
        &current,
        Submission {
            enabled: true,
            restricted_roles: vec!["author".into(), "editor".into()],
            redirect: RedirectInput::path("welcome"),
            role_assignments: vec![candidate],
            remove_assignment: None,
        },
    );
    assert!(outcome.notices.is_empty());
    test_store.store.save(&outcome.config).unwrap();

    let reloaded = test_store.store.load().unwrap();
    assert_eq!(reloaded, outcome.config);
    assert_eq!(
        resolve(&reloaded, &UserContext::authenticated(["author"])),
        Decision::Denied(
            RedirectTarget::from_input(&RedirectInput::url("https://example.com/authors"))
        )
    );
    assert_eq!(
        resolve(&reloaded, &UserContext::authenticated(["editor"])),
        Decision::Denied(path("welcome"))
    );
}
