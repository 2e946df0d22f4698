use bizpulse_core::{
    Client, CrmRepository, CrmService, FixedClock, Lead, MemoryStore, NewObjective,
    NewProgressEntry, ObjectiveRepository, ObjectiveService, ServiceError, SpacePatch,
    SpaceRepository, SpaceService, SqliteStore, Store, ValidationError,
};
use chrono::{TimeZone, Utc};

fn spaces<'a>(store: &'a (dyn Store + 'a), hour: u32) -> SpaceService<'a, dyn Store + 'a> {
    let now = Utc.with_ymd_and_hms(2025, 4, 1, hour, 0, 0).unwrap();
    SpaceService::with_clock(store, Box::new(FixedClock(now)))
}

fn create_derives_slug_and_default_description(store: &dyn Store) {
    let space = spaces(store, 9)
        .create_space("  Açaí & Café Brasil ", "")
        .unwrap();
    assert_eq!(space.id, "acai-cafe-brasil");
    assert_eq!(space.label, "Açaí & Café Brasil");
    assert_eq!(space.description, "Space Açaí & Café Brasil");

    let fetched = spaces(store, 9).get_space("acai-cafe-brasil").unwrap();
    assert_eq!(fetched, space);
}

fn labels_with_same_slug_conflict(store: &dyn Store) {
    spaces(store, 9).create_space("Acme Corp", "").unwrap();
    let err = spaces(store, 10)
        .create_space("acme-corp", "duplicate")
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict { entity: "space", .. }));
}

fn unusable_labels_are_rejected(store: &dyn Store) {
    let service = spaces(store, 9);
    assert!(matches!(
        service.create_space("   ", "").unwrap_err(),
        ServiceError::Validation(ValidationError::Required(_))
    ));
    assert!(matches!(
        service.create_space("!!!", "").unwrap_err(),
        ServiceError::Validation(ValidationError::Required(_))
    ));
    assert!(service.list_spaces().unwrap().is_empty());
}

fn list_is_oldest_first(store: &dyn Store) {
    spaces(store, 11).create_space("Zeta", "").unwrap();
    spaces(store, 8).create_space("Alpha", "").unwrap();
    spaces(store, 11).create_space("Beta", "").unwrap();

    let ids: Vec<String> = spaces(store, 12)
        .list_spaces()
        .unwrap()
        .into_iter()
        .map(|space| space.id)
        .collect();
    assert_eq!(ids, vec!["alpha", "zeta", "beta"]);
    assert!(matches!(
        spaces(store, 12).get_space("gamma").unwrap_err(),
        ServiceError::NotFound { entity: "space", .. }
    ));
}

fn update_keeps_id_and_creation_time(store: &dyn Store) {
    let created = spaces(store, 9).create_space("Acme", "Head office").unwrap();

    let updated = spaces(store, 10)
        .update_space(
            "acme",
            SpacePatch {
                label: Some("  Acme Holding ".to_string()),
                color: Some("bg-blue-600".to_string()),
                ..SpacePatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.id, "acme");
    assert_eq!(updated.label, "Acme Holding");
    assert_eq!(updated.description, "Head office");
    assert_eq!(updated.color, "bg-blue-600");
    assert_eq!(updated.created_at, created.created_at);

    let updated = spaces(store, 11)
        .update_space(
            "acme",
            SpacePatch {
                description: Some("   ".to_string()),
                ..SpacePatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.description, "Space Acme Holding");

    assert!(matches!(
        spaces(store, 11)
            .update_space(
                "acme",
                SpacePatch {
                    label: Some(" ".to_string()),
                    ..SpacePatch::default()
                },
            )
            .unwrap_err(),
        ServiceError::Validation(ValidationError::Required("label"))
    ));
    assert!(matches!(
        spaces(store, 11)
            .update_space("globex", SpacePatch::default())
            .unwrap_err(),
        ServiceError::NotFound { entity: "space", .. }
    ));
    assert_eq!(spaces(store, 12).get_space("acme").unwrap().label, "Acme Holding");
}

fn delete_removes_everything_scoped_to_space(store: &dyn Store) {
    spaces(store, 9).create_space("Acme", "").unwrap();
    spaces(store, 9).create_space("Globex", "").unwrap();

    let crm = CrmService::new(store);
    let objectives = ObjectiveService::new(store);
    let now = chrono::Utc::now();
    let lead = crm.create_lead(Lead::new("acme", "Ana", now)).unwrap();
    let client = crm.create_client(Client::new("acme", "Wayne", now)).unwrap();
    crm.record_nps(client.id, Some(8), None, None, None).unwrap();
    let objective = objectives
        .create_objective(NewObjective::new("acme", "Contracts"))
        .unwrap()
        .objective;
    objectives
        .add_entry(objective.id, NewProgressEntry::new(1.0))
        .unwrap();
    let kept = crm.create_lead(Lead::new("globex", "Bruno", now)).unwrap();

    spaces(store, 10).delete_space("acme").unwrap();

    assert!(store.get_space("acme").unwrap().is_none());
    assert!(store.get_lead(lead.id).unwrap().is_none());
    assert!(store.get_client(client.id).unwrap().is_none());
    assert!(store.list_space_nps_records("acme").unwrap().is_empty());
    assert!(store.get_objective(objective.id).unwrap().is_none());
    assert!(store.list_progress_entries(objective.id).unwrap().is_empty());
    assert!(store.get_lead(kept.id).unwrap().is_some());

    assert!(matches!(
        spaces(store, 10).delete_space("acme").unwrap_err(),
        ServiceError::NotFound { entity: "space", .. }
    ));
}

fn last_space_cannot_be_deleted(store: &dyn Store) {
    spaces(store, 9).create_space("Acme", "").unwrap();
    assert!(matches!(
        spaces(store, 10).delete_space("acme").unwrap_err(),
        ServiceError::LastSpace(id) if id == "acme"
    ));
    assert_eq!(spaces(store, 10).list_spaces().unwrap().len(), 1);
}

#[test]
fn memory_create_derives_slug_and_default_description() {
    create_derives_slug_and_default_description(&MemoryStore::new());
}

#[test]
fn sqlite_create_derives_slug_and_default_description() {
    create_derives_slug_and_default_description(&SqliteStore::open_in_memory().unwrap());
}

#[test]
fn memory_labels_with_same_slug_conflict() {
    labels_with_same_slug_conflict(&MemoryStore::new());
}

#[test]
fn sqlite_labels_with_same_slug_conflict() {
    labels_with_same_slug_conflict(&SqliteStore::open_in_memory().unwrap());
}

#[test]
fn memory_unusable_labels_are_rejected() {
    unusable_labels_are_rejected(&MemoryStore::new());
}

#[test]
fn sqlite_unusable_labels_are_rejected() {
    unusable_labels_are_rejected(&SqliteStore::open_in_memory().unwrap());
}

#[test]
fn memory_list_is_oldest_first() {
    list_is_oldest_first(&MemoryStore::new());
}

#[test]
fn sqlite_list_is_oldest_first() {
    list_is_oldest_first(&SqliteStore::open_in_memory().unwrap());
}

#[test]
fn memory_update_keeps_id_and_creation_time() {
    update_keeps_id_and_creation_time(&MemoryStore::new());
}

#[test]
fn sqlite_update_keeps_id_and_creation_time() {
    update_keeps_id_and_creation_time(&SqliteStore::open_in_memory().unwrap());
}

#[test]
fn memory_delete_removes_everything_scoped_to_space() {
    delete_removes_everything_scoped_to_space(&MemoryStore::new());
}

#[test]
fn sqlite_delete_removes_everything_scoped_to_space() {
    delete_removes_everything_scoped_to_space(&SqliteStore::open_in_memory().unwrap());
}

#[test]
fn memory_last_space_cannot_be_deleted() {
    last_space_cannot_be_deleted(&MemoryStore::new());
}

#[test]
fn sqlite_last_space_cannot_be_deleted() {
    last_space_cannot_be_deleted(&SqliteStore::open_in_memory().unwrap());
}
