use bizpulse_core::model::client::NpsRecord;
use bizpulse_core::{
    Client, ClientStatus, CrmRepository, Lead, LeadStatus, LeadTemperature, MemoryStore,
    RepoError, Space, SpaceRepository, SqliteStore, Store,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, day, 10, 0, 0).unwrap()
}

fn seed_spaces(store: &dyn Store) {
    store.create_space(&Space::new("Acme", "", at(1))).unwrap();
    store
        .create_space(&Space::new("Globex", "Holding", at(2)))
        .unwrap();
}

fn nps(client: &Client, score: Option<u8>, recorded_at: DateTime<Utc>) -> NpsRecord {
    NpsRecord {
        id: Uuid::new_v4(),
        client_id: client.id,
        space_id: client.space_id.clone(),
        score,
        feedback: None,
        recorded_at,
        created_by: None,
    }
}

fn lead_round_trips_every_field(store: &dyn Store) {
    seed_spaces(store);
    let mut lead = Lead::new("acme", "  Ana Souza ", at(3));
    lead.company = Some("Souza Ltda".to_string());
    lead.email = Some("ana@souza.com.br".to_string());
    lead.phone = Some("(11) 98765-4321".to_string());
    lead.status = LeadStatus::MeetingScheduled;
    lead.source = Some("referral".to_string());
    lead.value = Some(12_500.5);
    lead.temperature = LeadTemperature::Hot;
    lead.notes = Some("Follow up next week".to_string());
    lead.created_by = Some("owner".to_string());
    store.create_lead(&lead).unwrap();

    let loaded = store.get_lead(lead.id).unwrap().unwrap();
    assert_eq!(loaded.name, "Ana Souza");
    assert_eq!(loaded.status, LeadStatus::MeetingScheduled);
    assert_eq!(loaded.temperature, LeadTemperature::Hot);
    assert_eq!(loaded.value, Some(12_500.5));
    assert_eq!(loaded.phone, lead.phone);
    assert_eq!(loaded.created_at, at(3));
}

fn lists_are_scoped_by_space_and_ordered(store: &dyn Store) {
    seed_spaces(store);
    let later = Lead::new("acme", "Later", at(5));
    let earlier = Lead::new("acme", "Earlier", at(4));
    store.create_lead(&later).unwrap();
    store.create_lead(&earlier).unwrap();
    store
        .create_lead(&Lead::new("globex", "Elsewhere", at(4)))
        .unwrap();

    let names: Vec<String> = store
        .list_leads("acme")
        .unwrap()
        .into_iter()
        .map(|lead| lead.name)
        .collect();
    assert_eq!(names, vec!["Earlier", "Later"]);
    assert_eq!(store.list_leads("globex").unwrap().len(), 1);
    assert!(store.list_leads("initech").unwrap().is_empty());
}

fn updates_keep_creation_metadata(store: &dyn Store) {
    seed_spaces(store);
    let mut client = Client::new("acme", "Wayne", at(3));
    client.created_by = Some("owner".to_string());
    client.contract_start = NaiveDate::from_ymd_opt(2024, 11, 1);
    store.create_client(&client).unwrap();

    client.status = ClientStatus::Inactive;
    client.monthly_value = Some(900.0);
    client.created_at = at(20);
    client.created_by = None;
    client.updated_at = at(21);
    store.update_client(&client).unwrap();

    let loaded = store.get_client(client.id).unwrap().unwrap();
    assert_eq!(loaded.status, ClientStatus::Inactive);
    assert_eq!(loaded.monthly_value, Some(900.0));
    assert_eq!(loaded.contract_start, NaiveDate::from_ymd_opt(2024, 11, 1));
    assert_eq!(loaded.created_at, at(3));
    assert_eq!(loaded.created_by.as_deref(), Some("owner"));
    assert_eq!(loaded.updated_at, at(21));
}

fn missing_records_are_not_found(store: &dyn Store) {
    seed_spaces(store);
    let lead = Lead::new("acme", "Ghost", at(3));
    assert!(matches!(
        store.update_lead(&lead).unwrap_err(),
        RepoError::NotFound { entity: "lead", .. }
    ));
    assert!(matches!(
        store.delete_client(Uuid::new_v4()).unwrap_err(),
        RepoError::NotFound { entity: "client", .. }
    ));
    assert!(store.get_lead(lead.id).unwrap().is_none());
}

fn invalid_records_are_rejected_before_write(store: &dyn Store) {
    seed_spaces(store);
    let mut lead = Lead::new("acme", "Ana", at(3));
    lead.email = Some("not-an-email".to_string());
    assert!(matches!(
        store.create_lead(&lead).unwrap_err(),
        RepoError::Validation(_)
    ));

    let mut client = Client::new("acme", "Wayne", at(3));
    client.monthly_value = Some(-1.0);
    assert!(matches!(
        store.create_client(&client).unwrap_err(),
        RepoError::Validation(_)
    ));
    assert!(store.list_leads("acme").unwrap().is_empty());
    assert!(store.list_clients("acme").unwrap().is_empty());
}

fn nps_history_follows_client(store: &dyn Store) {
    seed_spaces(store);
    let client = Client::new("acme", "Wayne", at(3));
    let other = Client::new("acme", "Stark", at(3));
    store.create_client(&client).unwrap();
    store.create_client(&other).unwrap();

    let first = nps(&client, Some(6), at(5));
    store.add_nps_record(&nps(&client, Some(10), at(5) + Duration::days(3)))
        .unwrap();
    store.add_nps_record(&first).unwrap();
    store.add_nps_record(&nps(&other, None, at(6))).unwrap();

    let history = store.list_nps_records(client.id).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].score, Some(6));
    assert_eq!(store.list_space_nps_records("acme").unwrap().len(), 3);

    assert!(matches!(
        store.delete_nps_record(other.id, first.id).unwrap_err(),
        RepoError::NotFound { .. }
    ));
    store.delete_nps_record(client.id, first.id).unwrap();
    assert_eq!(store.list_nps_records(client.id).unwrap().len(), 1);

    store.delete_client(client.id).unwrap();
    assert!(store.list_nps_records(client.id).unwrap().is_empty());
    assert_eq!(store.list_space_nps_records("acme").unwrap().len(), 1);
}

#[test]
fn sqlite_lead_round_trips_every_field() {
    lead_round_trips_every_field(&SqliteStore::open_in_memory().unwrap());
}

#[test]
fn memory_lead_round_trips_every_field() {
    lead_round_trips_every_field(&MemoryStore::new());
}

#[test]
fn sqlite_lists_are_scoped_by_space_and_ordered() {
    lists_are_scoped_by_space_and_ordered(&SqliteStore::open_in_memory().unwrap());
}

#[test]
fn memory_lists_are_scoped_by_space_and_ordered() {
    lists_are_scoped_by_space_and_ordered(&MemoryStore::new());
}

#[test]
fn sqlite_updates_keep_creation_metadata() {
    updates_keep_creation_metadata(&SqliteStore::open_in_memory().unwrap());
}

#[test]
fn memory_updates_keep_creation_metadata() {
    updates_keep_creation_metadata(&MemoryStore::new());
}

#[test]
fn sqlite_missing_records_are_not_found() {
    missing_records_are_not_found(&SqliteStore::open_in_memory().unwrap());
}

#[test]
fn memory_missing_records_are_not_found() {
    missing_records_are_not_found(&MemoryStore::new());
}

#[test]
fn sqlite_invalid_records_are_rejected_before_write() {
    invalid_records_are_rejected_before_write(&SqliteStore::open_in_memory().unwrap());
}

#[test]
fn memory_invalid_records_are_rejected_before_write() {
    invalid_records_are_rejected_before_write(&MemoryStore::new());
}

#[test]
fn sqlite_nps_history_follows_client() {
    nps_history_follows_client(&SqliteStore::open_in_memory().unwrap());
}

#[test]
fn memory_nps_history_follows_client() {
    nps_history_follows_client(&MemoryStore::new());
}

#[test]
fn sqlite_rejects_corrupted_rows_on_read() {
    let store = SqliteStore::open_in_memory().unwrap();
    seed_spaces(&store);
    let client = Client::new("acme", "Wayne", at(3));
    store.create_client(&client).unwrap();

    store
        .connection()
        .execute(
            "UPDATE clients SET contract_start = '01/11/2024' WHERE uuid = ?1;",
            [client.id.to_string()],
        )
        .unwrap();

    let err = store.get_client(client.id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}
