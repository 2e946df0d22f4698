//! Lead/client/NPS repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist CRM records scoped by space.
//! - Serve the per-space lead/client reads the auto-metric resolver consumes.
//!
//! # Invariants
//! - List queries never return rows from another space.
//! - Deleting a client removes its NPS records.

use crate::model::client::{Client, ClientId, ClientStatus, NpsRecord, NpsRecordId};
use crate::model::lead::{Lead, LeadId, LeadStatus, LeadTemperature};
use crate::repo::events::{ChangeAction, ChangeEvent, EntityKind};
use crate::repo::sqlite_store::{
    date_to_db, from_epoch_ms, parse_date, parse_enum, parse_uuid, to_epoch_ms, SqliteStore,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Row};

const LEAD_SELECT_SQL: &str = "SELECT
    uuid,
    space_id,
    name,
    company,
    email,
    phone,
    status,
    source,
    value,
    temperature,
    notes,
    created_by,
    created_at,
    updated_at
FROM leads";

const CLIENT_SELECT_SQL: &str = "SELECT
    uuid,
    space_id,
    name,
    company,
    email,
    phone,
    segment,
    status,
    monthly_value,
    contract_start,
    package,
    notes,
    created_by,
    created_at,
    updated_at
FROM clients";

const NPS_SELECT_SQL: &str = "SELECT
    uuid,
    client_uuid,
    space_id,
    score,
    feedback,
    recorded_at,
    created_by
FROM nps_records";

/// Repository interface for CRM records.
pub trait CrmRepository {
    fn create_lead(&self, lead: &Lead) -> RepoResult<LeadId>;
    fn update_lead(&self, lead: &Lead) -> RepoResult<()>;
    fn get_lead(&self, id: LeadId) -> RepoResult<Option<Lead>>;
    /// Leads of one space, oldest first.
    fn list_leads(&self, space_id: &str) -> RepoResult<Vec<Lead>>;
    fn delete_lead(&self, id: LeadId) -> RepoResult<()>;

    fn create_client(&self, client: &Client) -> RepoResult<ClientId>;
    fn update_client(&self, client: &Client) -> RepoResult<()>;
    fn get_client(&self, id: ClientId) -> RepoResult<Option<Client>>;
    /// Clients of one space, oldest first.
    fn list_clients(&self, space_id: &str) -> RepoResult<Vec<Client>>;
    /// Deletes a client and its NPS history.
    fn delete_client(&self, id: ClientId) -> RepoResult<()>;

    fn add_nps_record(&self, record: &NpsRecord) -> RepoResult<NpsRecordId>;
    /// NPS records of one client, oldest first.
    fn list_nps_records(&self, client_id: ClientId) -> RepoResult<Vec<NpsRecord>>;
    /// NPS records of every client in a space.
    fn list_space_nps_records(&self, space_id: &str) -> RepoResult<Vec<NpsRecord>>;
    fn delete_nps_record(&self, client_id: ClientId, record_id: NpsRecordId) -> RepoResult<()>;
}

impl CrmRepository for SqliteStore {
    fn create_lead(&self, lead: &Lead) -> RepoResult<LeadId> {
        lead.validate()?;

        self.conn.execute(
            "INSERT INTO leads (
                uuid,
                space_id,
                name,
                company,
                email,
                phone,
                status,
                source,
                value,
                temperature,
                notes,
                created_by,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
            params![
                lead.id.to_string(),
                lead.space_id,
                lead.name.trim(),
                lead.company.as_deref(),
                lead.email.as_deref(),
                lead.phone.as_deref(),
                lead.status.as_str(),
                lead.source.as_deref(),
                lead.value,
                lead.temperature.as_str(),
                lead.notes.as_deref(),
                lead.created_by.as_deref(),
                to_epoch_ms(lead.created_at),
                to_epoch_ms(lead.updated_at),
            ],
        )?;

        self.publish(ChangeEvent::new(
            lead.space_id.as_str(),
            EntityKind::Lead,
            lead.id,
            ChangeAction::Created,
        ));
        Ok(lead.id)
    }

    fn update_lead(&self, lead: &Lead) -> RepoResult<()> {
        lead.validate()?;

        let changed = self.conn.execute(
            "UPDATE leads
             SET
                name = ?1,
                company = ?2,
                email = ?3,
                phone = ?4,
                status = ?5,
                source = ?6,
                value = ?7,
                temperature = ?8,
                notes = ?9,
                updated_at = ?10
             WHERE uuid = ?11
               AND space_id = ?12;",
            params![
                lead.name.trim(),
                lead.company.as_deref(),
                lead.email.as_deref(),
                lead.phone.as_deref(),
                lead.status.as_str(),
                lead.source.as_deref(),
                lead.value,
                lead.temperature.as_str(),
                lead.notes.as_deref(),
                to_epoch_ms(lead.updated_at),
                lead.id.to_string(),
                lead.space_id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("lead", lead.id));
        }

        self.publish(ChangeEvent::new(
            lead.space_id.as_str(),
            EntityKind::Lead,
            lead.id,
            ChangeAction::Updated,
        ));
        Ok(())
    }

    fn get_lead(&self, id: LeadId) -> RepoResult<Option<Lead>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LEAD_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_lead_row(row)?));
        }
        Ok(None)
    }

    fn list_leads(&self, space_id: &str) -> RepoResult<Vec<Lead>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LEAD_SELECT_SQL} WHERE space_id = ?1 ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([space_id])?;
        let mut leads = Vec::new();
        while let Some(row) = rows.next()? {
            leads.push(parse_lead_row(row)?);
        }
        Ok(leads)
    }

    fn delete_lead(&self, id: LeadId) -> RepoResult<()> {
        let lead = self
            .get_lead(id)?
            .ok_or_else(|| RepoError::not_found("lead", id))?;
        self.conn
            .execute("DELETE FROM leads WHERE uuid = ?1;", [id.to_string()])?;

        self.publish(ChangeEvent::new(
            lead.space_id,
            EntityKind::Lead,
            id,
            ChangeAction::Deleted,
        ));
        Ok(())
    }

    fn create_client(&self, client: &Client) -> RepoResult<ClientId> {
        client.validate()?;

        self.conn.execute(
            "INSERT INTO clients (
                uuid,
                space_id,
                name,
                company,
                email,
                phone,
                segment,
                status,
                monthly_value,
                contract_start,
                package,
                notes,
                created_by,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15);",
            params![
                client.id.to_string(),
                client.space_id,
                client.name.trim(),
                client.company.as_deref(),
                client.email.as_deref(),
                client.phone.as_deref(),
                client.segment.as_deref(),
                client.status.as_str(),
                client.monthly_value,
                date_to_db(client.contract_start),
                client.package.as_deref(),
                client.notes.as_deref(),
                client.created_by.as_deref(),
                to_epoch_ms(client.created_at),
                to_epoch_ms(client.updated_at),
            ],
        )?;

        self.publish(ChangeEvent::new(
            client.space_id.as_str(),
            EntityKind::Client,
            client.id,
            ChangeAction::Created,
        ));
        Ok(client.id)
    }

    fn update_client(&self, client: &Client) -> RepoResult<()> {
        client.validate()?;

        let changed = self.conn.execute(
            "UPDATE clients
             SET
                name = ?1,
                company = ?2,
                email = ?3,
                phone = ?4,
                segment = ?5,
                status = ?6,
                monthly_value = ?7,
                contract_start = ?8,
                package = ?9,
                notes = ?10,
                updated_at = ?11
             WHERE uuid = ?12
               AND space_id = ?13;",
            params![
                client.name.trim(),
                client.company.as_deref(),
                client.email.as_deref(),
                client.phone.as_deref(),
                client.segment.as_deref(),
                client.status.as_str(),
                client.monthly_value,
                date_to_db(client.contract_start),
                client.package.as_deref(),
                client.notes.as_deref(),
                to_epoch_ms(client.updated_at),
                client.id.to_string(),
                client.space_id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("client", client.id));
        }

        self.publish(ChangeEvent::new(
            client.space_id.as_str(),
            EntityKind::Client,
            client.id,
            ChangeAction::Updated,
        ));
        Ok(())
    }

    fn get_client(&self, id: ClientId) -> RepoResult<Option<Client>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CLIENT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_client_row(row)?));
        }
        Ok(None)
    }

    fn list_clients(&self, space_id: &str) -> RepoResult<Vec<Client>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CLIENT_SELECT_SQL} WHERE space_id = ?1 ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([space_id])?;
        let mut clients = Vec::new();
        while let Some(row) = rows.next()? {
            clients.push(parse_client_row(row)?);
        }
        Ok(clients)
    }

    fn delete_client(&self, id: ClientId) -> RepoResult<()> {
        let client = self
            .get_client(id)?
            .ok_or_else(|| RepoError::not_found("client", id))?;
        // nps_records go with it through ON DELETE CASCADE.
        self.conn
            .execute("DELETE FROM clients WHERE uuid = ?1;", [id.to_string()])?;

        self.publish(ChangeEvent::new(
            client.space_id,
            EntityKind::Client,
            id,
            ChangeAction::Deleted,
        ));
        Ok(())
    }

    fn add_nps_record(&self, record: &NpsRecord) -> RepoResult<NpsRecordId> {
        record.validate()?;

        self.conn.execute(
            "INSERT INTO nps_records (
                uuid,
                client_uuid,
                space_id,
                score,
                feedback,
                recorded_at,
                created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                record.id.to_string(),
                record.client_id.to_string(),
                record.space_id,
                record.score,
                record.feedback.as_deref(),
                to_epoch_ms(record.recorded_at),
                record.created_by.as_deref(),
            ],
        )?;

        self.publish(ChangeEvent::new(
            record.space_id.as_str(),
            EntityKind::NpsRecord,
            record.id,
            ChangeAction::Created,
        ));
        Ok(record.id)
    }

    fn list_nps_records(&self, client_id: ClientId) -> RepoResult<Vec<NpsRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NPS_SELECT_SQL} WHERE client_uuid = ?1 ORDER BY recorded_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([client_id.to_string()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_nps_row(row)?);
        }
        Ok(records)
    }

    fn list_space_nps_records(&self, space_id: &str) -> RepoResult<Vec<NpsRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NPS_SELECT_SQL} WHERE space_id = ?1 ORDER BY recorded_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([space_id])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_nps_row(row)?);
        }
        Ok(records)
    }

    fn delete_nps_record(&self, client_id: ClientId, record_id: NpsRecordId) -> RepoResult<()> {
        let mut stmt = self.conn.prepare(&format!(
            "{NPS_SELECT_SQL} WHERE uuid = ?1 AND client_uuid = ?2;"
        ))?;
        let mut rows = stmt.query([record_id.to_string(), client_id.to_string()])?;
        let record = match rows.next()? {
            Some(row) => parse_nps_row(row)?,
            None => return Err(RepoError::not_found("nps record", record_id)),
        };
        drop(rows);

        self.conn.execute(
            "DELETE FROM nps_records WHERE uuid = ?1;",
            [record_id.to_string()],
        )?;

        self.publish(ChangeEvent::new(
            record.space_id,
            EntityKind::NpsRecord,
            record_id,
            ChangeAction::Deleted,
        ));
        Ok(())
    }
}

fn parse_lead_row(row: &Row<'_>) -> RepoResult<Lead> {
    let uuid_text: String = row.get("uuid")?;
    let status_text: String = row.get("status")?;
    let temperature_text: String = row.get("temperature")?;

    let lead = Lead {
        id: parse_uuid(&uuid_text, "leads.uuid")?,
        space_id: row.get("space_id")?,
        name: row.get("name")?,
        company: row.get("company")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        status: parse_enum(&status_text, "leads.status", LeadStatus::parse)?,
        source: row.get("source")?,
        value: row.get("value")?,
        temperature: parse_enum(&temperature_text, "leads.temperature", LeadTemperature::parse)?,
        notes: row.get("notes")?,
        created_by: row.get("created_by")?,
        created_at: from_epoch_ms(row.get("created_at")?, "leads.created_at")?,
        updated_at: from_epoch_ms(row.get("updated_at")?, "leads.updated_at")?,
    };
    lead.validate()?;
    Ok(lead)
}

fn parse_client_row(row: &Row<'_>) -> RepoResult<Client> {
    let uuid_text: String = row.get("uuid")?;
    let status_text: String = row.get("status")?;

    let client = Client {
        id: parse_uuid(&uuid_text, "clients.uuid")?,
        space_id: row.get("space_id")?,
        name: row.get("name")?,
        company: row.get("company")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        segment: row.get("segment")?,
        status: parse_enum(&status_text, "clients.status", ClientStatus::parse)?,
        monthly_value: row.get("monthly_value")?,
        contract_start: parse_date(row.get("contract_start")?, "clients.contract_start")?,
        package: row.get("package")?,
        notes: row.get("notes")?,
        created_by: row.get("created_by")?,
        created_at: from_epoch_ms(row.get("created_at")?, "clients.created_at")?,
        updated_at: from_epoch_ms(row.get("updated_at")?, "clients.updated_at")?,
    };
    client.validate()?;
    Ok(client)
}

fn parse_nps_row(row: &Row<'_>) -> RepoResult<NpsRecord> {
    let uuid_text: String = row.get("uuid")?;
    let client_text: String = row.get("client_uuid")?;

    let record = NpsRecord {
        id: parse_uuid(&uuid_text, "nps_records.uuid")?,
        client_id: parse_uuid(&client_text, "nps_records.client_uuid")?,
        space_id: row.get("space_id")?,
        score: row.get("score")?,
        feedback: row.get("feedback")?,
        recorded_at: from_epoch_ms(row.get("recorded_at")?, "nps_records.recorded_at")?,
        created_by: row.get("created_by")?,
    };
    record.validate()?;
    Ok(record)
}
