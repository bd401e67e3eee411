//! Permission store, session cache and guard behaviour against SQLite

mod common;

use biolinker::config::StaticConfig;
use biolinker::errors::BiolinkerError;
use biolinker::rbac::{NameResolution, SaveRoleRequest, perms};
use biolinker::runtime::modes::create_user;
use biolinker::storage::NewUser;
use biolinker::utils::hash_password;

use common::{StubGeo, TEST_PASSWORD, setup, setup_with};

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn role_request(id: Option<i64>, name: &str, permissions: &[&str]) -> SaveRoleRequest {
    SaveRoleRequest {
        id,
        name: name.to_string(),
        description: String::new(),
        permissions: names(permissions),
    }
}

// =============================================================================
// Effective permissions
// =============================================================================

#[tokio::test]
async fn user_without_roles_has_no_permissions() {
    let env = setup().await;
    let user = env.user("nobody@example.com").await;

    let store = &env.state.permissions;
    assert!(store.get_effective_permissions(user).await.unwrap().is_empty());
    assert!(!store.has_permission(user, perms::USERS_VIEW).await.unwrap());
}

#[tokio::test]
async fn super_admin_holds_every_seeded_permission() {
    let env = setup().await;
    let admin = env.admin().await;

    let granted = env.state.permissions.get_effective_permissions(admin).await.unwrap();
    assert_eq!(granted.len(), 19);
    let mut sorted = granted.clone();
    sorted.sort();
    assert_eq!(granted, sorted, "effective permissions come back sorted");
    assert!(granted.iter().any(|p| p == perms::LOGS_MANAGE));
}

#[tokio::test]
async fn overlapping_roles_yield_distinct_union() {
    let env = setup().await;
    let admin_guard = env.guard(env.admin().await);
    let user = env.user("mixed@example.com").await;

    env.state
        .permissions
        .assign_roles(&admin_guard, user, &names(&["Support", "Editor"]))
        .await
        .unwrap();

    let granted = env.state.permissions.get_effective_permissions(user).await.unwrap();
    let links_view = granted.iter().filter(|p| *p == "links:view").count();
    assert_eq!(links_view, 1);
    assert!(granted.iter().any(|p| p == "seo:manage"));
    assert!(granted.iter().any(|p| p == "logs:view"));
}

// =============================================================================
// save_role
// =============================================================================

#[tokio::test]
async fn editor_scenario() {
    let env = setup().await;
    let admin_guard = env.guard(env.admin().await);
    let store = &env.state.permissions;

    let editor_id = store
        .list_roles()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.name == "Editor")
        .map(|r| r.id)
        .expect("Editor is seeded");

    store
        .save_role(
            &admin_guard,
            role_request(Some(editor_id), "Editor", &["links:create", "links:view"]),
        )
        .await
        .unwrap();

    let user = env.user("editor@example.com").await;
    store
        .assign_roles(&admin_guard, user, &names(&["Editor"]))
        .await
        .unwrap();

    assert!(store.has_permission(user, "links:create").await.unwrap());
    assert!(!store.has_permission(user, "billing:manage").await.unwrap());
}

#[tokio::test]
async fn saved_role_lists_exactly_known_permissions() {
    let env = setup().await;
    let admin_guard = env.guard(env.admin().await);
    let store = &env.state.permissions;

    let saved = store
        .save_role(
            &admin_guard,
            role_request(
                None,
                "Auditor",
                &["logs:view", "links:teleport", "analytics:view", " "],
            ),
        )
        .await
        .unwrap();
    assert_eq!(saved.unresolved, vec!["links:teleport".to_string()]);

    let auditor = store
        .list_roles()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.id == saved.role_id)
        .unwrap();
    assert_eq!(auditor.permissions, names(&["analytics:view", "logs:view"]));

    // Saving again replaces, never merges
    store
        .save_role(
            &admin_guard,
            role_request(Some(saved.role_id), "Auditor", &["users:view"]),
        )
        .await
        .unwrap();
    let auditor = store
        .list_roles()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.id == saved.role_id)
        .unwrap();
    assert_eq!(auditor.permissions, names(&["users:view"]));
}

#[tokio::test]
async fn strict_policy_rejects_unknown_permission() {
    let env = setup_with(StubGeo::berlin(), |c: &mut StaticConfig| {
        c.rbac.name_resolution = NameResolution::Strict;
    })
    .await;
    let admin_guard = env.guard(env.admin().await);

    let err = env
        .state
        .permissions
        .save_role(&admin_guard, role_request(None, "Typo", &["logs:veiw"]))
        .await
        .unwrap_err();
    assert!(matches!(err, BiolinkerError::Validation(ref m) if m.contains("logs:veiw")));
    assert!(
        !env.state
            .permissions
            .list_roles()
            .await
            .unwrap()
            .iter()
            .any(|r| r.name == "Typo")
    );
}

#[tokio::test]
async fn blank_role_name_is_rejected() {
    let env = setup().await;
    let admin_guard = env.guard(env.admin().await);

    let err = env
        .state
        .permissions
        .save_role(&admin_guard, role_request(None, "   ", &["logs:view"]))
        .await
        .unwrap_err();
    assert!(matches!(err, BiolinkerError::Validation(_)));
}

#[tokio::test]
async fn updating_missing_role_is_not_found() {
    let env = setup().await;
    let admin_guard = env.guard(env.admin().await);

    let err = env
        .state
        .permissions
        .save_role(&admin_guard, role_request(Some(9999), "Ghost", &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, BiolinkerError::NotFound(_)));
}

// =============================================================================
// assign_roles
// =============================================================================

#[tokio::test]
async fn reassigning_replaces_previous_roles() {
    let env = setup().await;
    let admin_guard = env.guard(env.admin().await);
    let store = &env.state.permissions;
    let user = env.user("shifting@example.com").await;

    store
        .assign_roles(&admin_guard, user, &names(&["Support"]))
        .await
        .unwrap();
    assert!(store.has_permission(user, "logs:view").await.unwrap());

    store
        .assign_roles(&admin_guard, user, &names(&["Editor"]))
        .await
        .unwrap();
    assert!(!store.has_permission(user, "logs:view").await.unwrap());
    assert!(store.has_permission(user, "seo:manage").await.unwrap());
    assert_eq!(store.roles_of(user).await.unwrap(), names(&["Editor"]));
}

#[tokio::test]
async fn assigning_same_roles_twice_is_idempotent() {
    let env = setup().await;
    let admin_guard = env.guard(env.admin().await);
    let store = &env.state.permissions;
    let user = env.user("stable@example.com").await;

    store
        .assign_roles(&admin_guard, user, &names(&["Manager"]))
        .await
        .unwrap();
    let first = store.get_effective_permissions(user).await.unwrap();
    store
        .assign_roles(&admin_guard, user, &names(&["Manager"]))
        .await
        .unwrap();
    assert_eq!(store.get_effective_permissions(user).await.unwrap(), first);
}

#[tokio::test]
async fn unknown_role_is_reported_not_assigned() {
    let env = setup().await;
    let admin_guard = env.guard(env.admin().await);
    let user = env.user("typo@example.com").await;

    let assigned = env
        .state
        .permissions
        .assign_roles(&admin_guard, user, &names(&["Support", "Suport"]))
        .await
        .unwrap();
    assert_eq!(assigned.roles, names(&["Support"]));
    assert_eq!(assigned.unresolved, names(&["Suport"]));
}

#[tokio::test]
async fn users_edit_may_assign_roles() {
    let env = setup().await;
    let manager = env.user_in_role("manager@example.com", "Manager").await;
    let user = env.user("managed@example.com").await;

    env.state
        .permissions
        .assign_roles(&env.guard(manager), user, &names(&["User"]))
        .await
        .unwrap();
    assert!(
        env.state
            .permissions
            .has_permission(user, "links:create")
            .await
            .unwrap()
    );
}

// =============================================================================
// Guard and session cache
// =============================================================================

#[tokio::test]
async fn anonymous_and_unprivileged_callers_are_refused() {
    let env = setup().await;
    let plain = env.user_in_role("plain@example.com", "User").await;
    let target = env.user("target@example.com").await;
    let store = &env.state.permissions;

    let anon = env.anonymous();
    assert!(matches!(
        store.save_role(&anon, role_request(None, "X", &[])).await,
        Err(BiolinkerError::Unauthenticated(_))
    ));
    assert!(matches!(
        store.assign_roles(&anon, target, &names(&["User"])).await,
        Err(BiolinkerError::Unauthenticated(_))
    ));
    assert!(matches!(
        env.state.audit.purge(&anon).await,
        Err(BiolinkerError::Unauthenticated(_))
    ));
    assert!(matches!(
        env.state.blocklist.block(&anon, "203.0.113.9", None).await,
        Err(BiolinkerError::Unauthenticated(_))
    ));

    let weak = env.guard(plain);
    assert!(matches!(
        store.save_role(&weak, role_request(None, "X", &[])).await,
        Err(BiolinkerError::Forbidden(_))
    ));
    assert!(matches!(
        store.assign_roles(&weak, target, &names(&["SuperAdmin"])).await,
        Err(BiolinkerError::Forbidden(_))
    ));
    assert!(matches!(
        env.state.audit.purge(&weak).await,
        Err(BiolinkerError::Forbidden(_))
    ));
    assert!(matches!(
        env.state.blocklist.unblock(&weak, "203.0.113.9").await,
        Err(BiolinkerError::Forbidden(_))
    ));
    assert!(store.roles_of(target).await.unwrap().is_empty());
}

#[tokio::test]
async fn assignment_invalidates_acting_session_cache() {
    let env = setup().await;
    let admin = env.admin().await;
    let admin_guard = env.guard(admin);
    let user = env.user("cached@example.com").await;

    // Prime the admin session's view of the user
    assert!(admin_guard.permissions_of(user).await.unwrap().is_empty());
    assert!(admin_guard.cache().get(user).is_some());

    env.state
        .permissions
        .assign_roles(&admin_guard, user, &names(&["Support"]))
        .await
        .unwrap();
    assert!(admin_guard.cache().get(user).is_none());
    assert!(
        admin_guard
            .permissions_of(user)
            .await
            .unwrap()
            .iter()
            .any(|p| p == "logs:view")
    );
}

#[tokio::test]
async fn other_sessions_keep_stale_permissions_until_invalidated() {
    let env = setup().await;
    let admin_guard = env.guard(env.admin().await);
    let user = env.user("stale@example.com").await;
    let user_session = env.guard(user);

    assert!(user_session.permissions().await.unwrap().is_empty());
    env.state
        .permissions
        .assign_roles(&admin_guard, user, &names(&["Support"]))
        .await
        .unwrap();

    // The user's own session still serves its cached set
    assert!(user_session.permissions().await.unwrap().is_empty());
    user_session
        .cache()
        .invalidate(biolinker::rbac::CacheScope::User(user));
    assert!(user_session.has(perms::LOGS_VIEW).await.unwrap());
}

#[tokio::test]
async fn deactivated_account_loses_access_on_next_lookup() {
    let env = setup().await;
    let support = env.user_in_role("support@example.com", "Support").await;
    let session = env.guard(support);
    assert!(session.has(perms::LOGS_VIEW).await.unwrap());

    env.storage.set_user_status(support, "inactive").await.unwrap();
    session
        .cache()
        .invalidate(biolinker::rbac::CacheScope::User(support));
    assert!(matches!(
        session.require_permission(perms::LOGS_VIEW).await,
        Err(BiolinkerError::Unauthenticated(_))
    ));

    // A brand new session gets nothing either
    assert!(matches!(
        env.guard(support).permissions().await,
        Err(BiolinkerError::Unauthenticated(_))
    ));
}

// =============================================================================
// Legacy flat role and account creation
// =============================================================================

#[tokio::test]
async fn legacy_admin_is_migrated_once() {
    let env = setup().await;
    let legacy = env.user_with_role("old@example.com", "admin").await;
    let account = env.storage.find_user(legacy).await.unwrap().unwrap();

    assert!(env.state.legacy.provision(&account).await.unwrap());
    // the stale row still says admin, the database no longer does
    assert!(!env.state.legacy.provision(&account).await.unwrap());
    assert_eq!(
        env.state.permissions.roles_of(legacy).await.unwrap(),
        names(&["SuperAdmin"])
    );
    let migrated = env.storage.find_user(legacy).await.unwrap().unwrap();
    assert_eq!(migrated.role, "user");
}

#[tokio::test]
async fn demoted_legacy_admin_stays_demoted_after_next_login() {
    let env = setup().await;
    let admin_guard = env.guard(env.admin().await);
    let legacy = env.user_with_role("old@example.com", "admin").await;

    let first_login = env.storage.find_user(legacy).await.unwrap().unwrap();
    assert!(env.state.legacy.provision(&first_login).await.unwrap());

    env.state
        .permissions
        .assign_roles(&admin_guard, legacy, &names(&["User"]))
        .await
        .unwrap();

    let next_login = env.storage.find_user(legacy).await.unwrap().unwrap();
    assert!(!env.state.legacy.provision(&next_login).await.unwrap());
    assert_eq!(
        env.state.permissions.roles_of(legacy).await.unwrap(),
        names(&["User"])
    );
    assert!(
        !env.state
            .permissions
            .has_permission(legacy, perms::RBAC_MANAGE)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn account_and_first_role_are_written_together() {
    let env = setup().await;
    let new_user = |email: &str| NewUser {
        email: email.to_string(),
        password_hash: hash_password(TEST_PASSWORD).unwrap(),
        display_name: "x".into(),
        role: "user".into(),
    };

    let err = env
        .storage
        .create_user_with_role(new_user("orphan@example.com"), "NoSuchRole")
        .await
        .unwrap_err();
    assert!(matches!(err, BiolinkerError::NotFound(_)));
    assert!(
        env.storage
            .find_user_by_email("orphan@example.com")
            .await
            .unwrap()
            .is_none()
    );

    let created = env
        .storage
        .create_user_with_role(new_user("Member@Example.com"), "User")
        .await
        .unwrap();
    assert_eq!(created.email, "member@example.com");
    assert_eq!(
        env.state.permissions.roles_of(created.id).await.unwrap(),
        names(&["User"])
    );
}

#[tokio::test]
async fn cli_admin_account_is_super_admin_without_flat_flag() {
    let env = setup().await;

    let id = create_user(
        &env.config,
        "boss@example.com",
        Some("Boss".into()),
        Some(TEST_PASSWORD.into()),
        false,
        true,
    )
    .await
    .unwrap();

    assert_eq!(
        env.state.permissions.roles_of(id).await.unwrap(),
        names(&["SuperAdmin"])
    );
    let account = env.storage.find_user(id).await.unwrap().unwrap();
    assert_eq!(account.role, "user");
    assert_eq!(account.display_name, "Boss");
    assert!(!env.state.legacy.provision(&account).await.unwrap());

    let plain = create_user(
        &env.config,
        "plain@example.com",
        None,
        Some(TEST_PASSWORD.into()),
        false,
        false,
    )
    .await
    .unwrap();
    assert_eq!(
        env.state.permissions.roles_of(plain).await.unwrap(),
        names(&["User"])
    );

    assert!(
        create_user(&env.config, "short@example.com", None, Some("abc".into()), false, false)
            .await
            .is_err()
    );
}

// =============================================================================
// Audit log
// =============================================================================

#[tokio::test]
async fn role_changes_leave_warning_entries() {
    let env = setup().await;
    let admin = env.admin().await;
    let admin_guard = env.guard(admin);
    let member = env.user("member@example.com").await;

    env.state
        .permissions
        .save_role(&admin_guard, role_request(None, "Auditor", &[perms::LOGS_VIEW]))
        .await
        .unwrap();
    env.state
        .permissions
        .assign_roles(&admin_guard, member, &names(&["Auditor"]))
        .await
        .unwrap();

    let log = env.state.audit.list(&admin_guard, 10).await.unwrap();
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|e| e.severity == "warning"));
    assert!(log.iter().all(|e| e.actor_id == Some(admin)));
    // newest first
    assert!(log[0].message.contains(&format!("Roles of user {}", member)));
    assert!(log[1].message.contains("Auditor"));
}

#[tokio::test]
async fn purge_empties_the_log_and_records_itself() {
    let env = setup().await;
    let admin = env.admin().await;
    let admin_guard = env.guard(admin);

    for ip in ["203.0.113.1", "203.0.113.2", "203.0.113.3"] {
        env.state
            .blocklist
            .block(&admin_guard, ip, None)
            .await
            .unwrap();
    }
    let before = env.state.audit.list(&admin_guard, 100).await.unwrap().len() as u64;
    assert_eq!(before, 3);

    let removed = env.state.audit.purge(&admin_guard).await.unwrap();
    assert_eq!(removed, before);

    let log = env.state.audit.list(&admin_guard, 100).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].severity, "critical");
    assert_eq!(log[0].actor_id, Some(admin));
    assert!(log[0].message.contains("3 entries"));
}
