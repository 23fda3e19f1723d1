//! # Checklist Lifecycle Tests
//!
//! End-to-end behaviour of credentials, initialization and optimistic
//! toggles against the in-process store.

use checklist_core::{
    seed, ChecklistError, ConnectionStatus, InitializeOutcome, Progress, TableName, TaskBoard,
    TaskScope,
};
use checklist_server::auth::CredentialStore;
use checklist_server::controller::ChecklistController;
use checklist_server::errors::ServerError;
use checklist_server::store::{ChecklistStore, MemoryStore, StoreHandle};

fn credentials(memory: &MemoryStore) -> CredentialStore {
    CredentialStore::new(Some(StoreHandle::memory(memory.clone())))
}

async fn controller(memory: &MemoryStore, scope: TaskScope) -> ChecklistController {
    let mut controller = ChecklistController::new(Some(StoreHandle::memory(memory.clone())), scope);
    controller.start().await;
    controller
}

fn checklist_error(err: ServerError) -> ChecklistError {
    match err {
        ServerError::Checklist(e) => e,
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_register_then_login_returns_same_user() {
    let memory = MemoryStore::new();
    let credentials = credentials(&memory);

    for (username, password) in [("alice", "secret1"), ("bob_the_builder", "p@ssw0rd!"), ("Ünïcode", "пароль123")] {
        let registered = credentials.register(username, password).await.unwrap();
        let logged_in = credentials.login(username, password).await.unwrap();
        assert_eq!(registered.id, logged_in.id);
        assert_eq!(logged_in.username, username);
    }
}

#[tokio::test]
async fn test_duplicate_username_is_exact_match() {
    let memory = MemoryStore::new();
    let credentials = credentials(&memory);

    credentials.register("alice", "secret1").await.unwrap();

    let err = checklist_error(credentials.register("alice", "another1").await.unwrap_err());
    assert_eq!(err, ChecklistError::DuplicateUsername);

    credentials.register("alice2", "secret1").await.unwrap();
    credentials.register("ALICE", "secret1").await.unwrap();
    assert_eq!(memory.user_count(), 3);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let memory = MemoryStore::new();
    let credentials = credentials(&memory);
    credentials.register("alice", "secret1").await.unwrap();

    let wrong_password = checklist_error(credentials.login("alice", "secret2").await.unwrap_err());
    let unknown_user = checklist_error(credentials.login("mallory", "secret1").await.unwrap_err());

    assert_eq!(wrong_password, ChecklistError::InvalidCredentials);
    assert_eq!(wrong_password, unknown_user);
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
}

#[tokio::test]
async fn test_registration_seeds_personal_checklist() {
    let memory = MemoryStore::new();
    memory
        .upsert_seed(&seed::seed_sections(), &seed::seed_tasks(TaskScope::Shared), None)
        .await
        .unwrap();

    let user = credentials(&memory).register("alice", "secret1").await.unwrap();
    let controller = controller(&memory, TaskScope::Owner(user.id)).await;

    assert_eq!(controller.status(), ConnectionStatus::Connected);
    assert_eq!(controller.board().task_count(), 9);
    let expected = format!("task1_user{}", user.id);
    assert!(controller.board().task("phase1", &expected).is_some());
}

#[test]
fn test_progress_bounds() {
    let empty = Progress::new(0, 0);
    assert_eq!(empty.percent, 0);
    assert!(!empty.is_all_completed());

    let full = Progress::new(9, 9);
    assert_eq!(full.percent, 100);
    assert!(full.is_all_completed());
}

#[tokio::test]
async fn test_missing_tables_show_default_dataset() {
    let memory = MemoryStore::without_tables();
    let controller = controller(&memory, TaskScope::Shared).await;

    assert_eq!(controller.status(), ConnectionStatus::NeedsInit);
    assert_eq!(controller.board(), &TaskBoard::default_dataset());
    assert_eq!(controller.board().sections.len(), 3);
    assert_eq!(controller.board().task_count(), 9);

    let message = controller.message().unwrap();
    assert!(message.contains(TableName::TaskSections.as_str()));
    assert!(message.contains(TableName::Tasks.as_str()));
}

#[tokio::test]
async fn test_failed_write_keeps_local_flip_and_diverges() {
    let memory = MemoryStore::new();
    let mut controller = controller(&memory, TaskScope::Shared).await;
    controller.initialize().await.unwrap();
    assert_eq!(controller.status(), ConnectionStatus::Connected);

    memory.fail_writes(Some("permission denied for table tasks"));
    let toggled = controller.toggle("phase2", "task5").await.unwrap();
    toggled.write.unwrap().await.unwrap();

    // the local flip stays
    assert!(controller.board().task("phase2", "task5").unwrap().completed);
    let entry = controller
        .reconciliation()
        .await
        .into_iter()
        .find(|entry| entry.task_id == "task5")
        .unwrap();
    assert!(entry.attempted);
    assert!(!entry.synced);
    assert!(entry.last_error.unwrap().contains("permission denied"));

    // a full reload shows what the store really holds
    memory.fail_writes(None);
    controller.load().await;
    assert!(!controller.board().task("phase2", "task5").unwrap().completed);
}

#[tokio::test]
async fn test_initialize_twice_never_duplicates() {
    let memory = MemoryStore::new();
    let mut controller = controller(&memory, TaskScope::Shared).await;

    assert_eq!(controller.initialize().await.unwrap(), InitializeOutcome::Seeded);
    assert_eq!(memory.section_count(), 3);
    assert_eq!(memory.task_count(), 9);

    // connected now, so a second initialize is refused outright
    let err = controller.initialize().await.unwrap_err();
    assert!(matches!(err, ChecklistError::InvalidTransition { .. }));

    // a second session seeing the same store reports a no-op
    let mut other = ChecklistController::new(Some(StoreHandle::memory(memory.clone())), TaskScope::Shared);
    other.start().await;
    assert_eq!(other.status(), ConnectionStatus::Connected);

    assert_eq!(memory.section_count(), 3);
    assert_eq!(memory.task_count(), 9);
}

#[tokio::test]
async fn test_manual_script_path() {
    let memory = MemoryStore::without_tables();
    let mut controller = controller(&memory, TaskScope::Shared).await;
    assert!(seed::SETUP_SCRIPT.contains("CREATE TABLE IF NOT EXISTS task_sections"));

    // the user runs the script out of band
    memory.create_tables();
    memory
        .upsert_seed(&seed::seed_sections(), &seed::seed_tasks(TaskScope::Shared), None)
        .await
        .unwrap();

    controller.complete_manual_setup().await;
    assert_eq!(controller.status(), ConnectionStatus::Connected);
}
