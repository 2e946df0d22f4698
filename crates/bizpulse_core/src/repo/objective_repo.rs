//! Objective and progress ledger repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist objectives and their append-only progress entries.
//! - Write a ledger mutation and the owning objective's derived
//!   `current_value`/`status` in one transaction.
//!
//! # Invariants
//! - Entries are returned in insertion order; presentation order is decided
//!   by the ledger rules, not by SQL.
//! - Entries are never updated, only inserted or deleted.
//! - Deleting an objective removes its entries.

use crate::model::objective::{
    AutoMetricSource, Objective, ObjectiveId, ObjectiveStatus, ObjectiveUnit, ProgressEntry,
    ProgressEntryId,
};
use crate::repo::events::{ChangeAction, ChangeEvent, EntityKind};
use crate::repo::sqlite_store::{
    bool_to_int, date_to_db, from_epoch_ms, int_to_bool, parse_date, parse_enum, parse_uuid,
    to_epoch_ms, SqliteStore,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, OptionalExtension, Row, Transaction, TransactionBehavior};

const OBJECTIVE_SELECT_SQL: &str = "SELECT
    uuid,
    space_id,
    title,
    description,
    category,
    unit,
    target_value,
    current_value,
    start_date,
    end_date,
    status,
    is_commercial,
    auto_source,
    created_by,
    created_at,
    updated_at
FROM objectives";

const ENTRY_SELECT_SQL: &str = "SELECT
    uuid,
    objective_uuid,
    value,
    note,
    logged_at,
    created_by
FROM progress_logs";

/// Repository interface for objectives and their progress ledgers.
pub trait ObjectiveRepository {
    fn create_objective(&self, objective: &Objective) -> RepoResult<ObjectiveId>;
    /// Replaces every mutable column of an existing objective.
    fn update_objective(&self, objective: &Objective) -> RepoResult<()>;
    fn get_objective(&self, id: ObjectiveId) -> RepoResult<Option<Objective>>;
    /// Objectives of one space, oldest first.
    fn list_objectives(&self, space_id: &str) -> RepoResult<Vec<Objective>>;
    fn delete_objective(&self, id: ObjectiveId) -> RepoResult<()>;

    /// Entries of one objective in insertion order.
    fn list_progress_entries(&self, objective_id: ObjectiveId) -> RepoResult<Vec<ProgressEntry>>;
    /// Inserts `entry` and stores `objective`'s derived value, status and
    /// `updated_at`, atomically.
    fn insert_progress_entry(&self, entry: &ProgressEntry, objective: &Objective)
        -> RepoResult<()>;
    /// Deletes one entry and stores `objective`'s derived value, status and
    /// `updated_at`, atomically.
    fn delete_progress_entry(&self, entry_id: ProgressEntryId, objective: &Objective)
        -> RepoResult<()>;
}

impl ObjectiveRepository for SqliteStore {
    fn create_objective(&self, objective: &Objective) -> RepoResult<ObjectiveId> {
        objective.validate()?;

        self.conn.execute(
            "INSERT INTO objectives (
                uuid,
                space_id,
                title,
                description,
                category,
                unit,
                target_value,
                current_value,
                start_date,
                end_date,
                status,
                is_commercial,
                auto_source,
                created_by,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16);",
            params![
                objective.id.to_string(),
                objective.space_id,
                objective.title.trim(),
                objective.description.as_deref(),
                objective.category.as_deref(),
                objective.unit.symbol(),
                objective.target_value,
                objective.current_value,
                date_to_db(objective.start_date),
                date_to_db(objective.end_date),
                objective.status.as_str(),
                bool_to_int(objective.is_commercial),
                objective.auto_source.as_str(),
                objective.created_by.as_deref(),
                to_epoch_ms(objective.created_at),
                to_epoch_ms(objective.updated_at),
            ],
        )?;

        self.publish(ChangeEvent::new(
            objective.space_id.as_str(),
            EntityKind::Objective,
            objective.id,
            ChangeAction::Created,
        ));
        Ok(objective.id)
    }

    fn update_objective(&self, objective: &Objective) -> RepoResult<()> {
        objective.validate()?;

        let changed = self.conn.execute(
            "UPDATE objectives
             SET
                title = ?1,
                description = ?2,
                category = ?3,
                unit = ?4,
                target_value = ?5,
                current_value = ?6,
                start_date = ?7,
                end_date = ?8,
                status = ?9,
                is_commercial = ?10,
                auto_source = ?11,
                updated_at = ?12
             WHERE uuid = ?13
               AND space_id = ?14;",
            params![
                objective.title.trim(),
                objective.description.as_deref(),
                objective.category.as_deref(),
                objective.unit.symbol(),
                objective.target_value,
                objective.current_value,
                date_to_db(objective.start_date),
                date_to_db(objective.end_date),
                objective.status.as_str(),
                bool_to_int(objective.is_commercial),
                objective.auto_source.as_str(),
                to_epoch_ms(objective.updated_at),
                objective.id.to_string(),
                objective.space_id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("objective", objective.id));
        }

        self.publish(ChangeEvent::new(
            objective.space_id.as_str(),
            EntityKind::Objective,
            objective.id,
            ChangeAction::Updated,
        ));
        Ok(())
    }

    fn get_objective(&self, id: ObjectiveId) -> RepoResult<Option<Objective>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{OBJECTIVE_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_objective_row(row)?));
        }
        Ok(None)
    }

    fn list_objectives(&self, space_id: &str) -> RepoResult<Vec<Objective>> {
        let mut stmt = self.conn.prepare(&format!(
            "{OBJECTIVE_SELECT_SQL} WHERE space_id = ?1 ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([space_id])?;
        let mut objectives = Vec::new();
        while let Some(row) = rows.next()? {
            objectives.push(parse_objective_row(row)?);
        }
        Ok(objectives)
    }

    fn delete_objective(&self, id: ObjectiveId) -> RepoResult<()> {
        let objective = self
            .get_objective(id)?
            .ok_or_else(|| RepoError::not_found("objective", id))?;
        self.conn
            .execute("DELETE FROM objectives WHERE uuid = ?1;", [id.to_string()])?;

        self.publish(ChangeEvent::new(
            objective.space_id,
            EntityKind::Objective,
            id,
            ChangeAction::Deleted,
        ));
        Ok(())
    }

    fn list_progress_entries(&self, objective_id: ObjectiveId) -> RepoResult<Vec<ProgressEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT_SQL} WHERE objective_uuid = ?1 ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query([objective_id.to_string()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }
        Ok(entries)
    }

    fn insert_progress_entry(
        &self,
        entry: &ProgressEntry,
        objective: &Objective,
    ) -> RepoResult<()> {
        entry.validate()?;
        objective.validate()?;
        if entry.objective_id != objective.id {
            return Err(RepoError::InvalidData(format!(
                "progress entry {} belongs to objective {}, not {}",
                entry.id, entry.objective_id, objective.id
            )));
        }

        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO progress_logs (
                uuid,
                objective_uuid,
                value,
                note,
                logged_at,
                created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                entry.id.to_string(),
                entry.objective_id.to_string(),
                entry.value,
                entry.note.as_deref(),
                to_epoch_ms(entry.logged_at),
                entry.created_by.as_deref(),
            ],
        )?;
        write_derived_in_tx(&tx, objective)?;
        tx.commit()?;

        self.publish(ChangeEvent::new(
            objective.space_id.as_str(),
            EntityKind::ProgressEntry,
            entry.id,
            ChangeAction::Created,
        ));
        self.publish(ChangeEvent::new(
            objective.space_id.as_str(),
            EntityKind::Objective,
            objective.id,
            ChangeAction::Updated,
        ));
        Ok(())
    }

    fn delete_progress_entry(
        &self,
        entry_id: ProgressEntryId,
        objective: &Objective,
    ) -> RepoResult<()> {
        objective.validate()?;

        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let deleted = tx.execute(
            "DELETE FROM progress_logs WHERE uuid = ?1 AND objective_uuid = ?2;",
            params![entry_id.to_string(), objective.id.to_string()],
        )?;
        if deleted == 0 {
            return Err(RepoError::not_found("progress entry", entry_id));
        }
        write_derived_in_tx(&tx, objective)?;
        tx.commit()?;

        self.publish(ChangeEvent::new(
            objective.space_id.as_str(),
            EntityKind::ProgressEntry,
            entry_id,
            ChangeAction::Deleted,
        ));
        self.publish(ChangeEvent::new(
            objective.space_id.as_str(),
            EntityKind::Objective,
            objective.id,
            ChangeAction::Updated,
        ));
        Ok(())
    }
}

fn write_derived_in_tx(tx: &Transaction<'_>, objective: &Objective) -> RepoResult<()> {
    let space_id: Option<String> = tx
        .query_row(
            "SELECT space_id FROM objectives WHERE uuid = ?1;",
            [objective.id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    match space_id {
        Some(space_id) if space_id == objective.space_id => {}
        _ => return Err(RepoError::not_found("objective", objective.id)),
    }

    tx.execute(
        "UPDATE objectives
         SET
            current_value = ?1,
            status = ?2,
            updated_at = ?3
         WHERE uuid = ?4;",
        params![
            objective.current_value,
            objective.status.as_str(),
            to_epoch_ms(objective.updated_at),
            objective.id.to_string(),
        ],
    )?;
    Ok(())
}

fn parse_objective_row(row: &Row<'_>) -> RepoResult<Objective> {
    let uuid_text: String = row.get("uuid")?;
    let unit_text: String = row.get("unit")?;
    let status_text: String = row.get("status")?;
    let source_text: String = row.get("auto_source")?;

    let objective = Objective {
        id: parse_uuid(&uuid_text, "objectives.uuid")?,
        space_id: row.get("space_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        category: row.get("category")?,
        unit: parse_enum(&unit_text, "objectives.unit", ObjectiveUnit::parse)?,
        target_value: row.get("target_value")?,
        current_value: row.get("current_value")?,
        start_date: parse_date(row.get("start_date")?, "objectives.start_date")?,
        end_date: parse_date(row.get("end_date")?, "objectives.end_date")?,
        status: parse_enum(&status_text, "objectives.status", ObjectiveStatus::parse)?,
        is_commercial: int_to_bool(row.get("is_commercial")?, "objectives.is_commercial")?,
        auto_source: AutoMetricSource::parse(&source_text),
        created_by: row.get("created_by")?,
        created_at: from_epoch_ms(row.get("created_at")?, "objectives.created_at")?,
        updated_at: from_epoch_ms(row.get("updated_at")?, "objectives.updated_at")?,
    };
    objective.validate()?;
    Ok(objective)
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<ProgressEntry> {
    let uuid_text: String = row.get("uuid")?;
    let objective_text: String = row.get("objective_uuid")?;

    let entry = ProgressEntry {
        id: parse_uuid(&uuid_text, "progress_logs.uuid")?,
        objective_id: parse_uuid(&objective_text, "progress_logs.objective_uuid")?,
        value: row.get("value")?,
        note: row.get("note")?,
        logged_at: from_epoch_ms(row.get("logged_at")?, "progress_logs.logged_at")?,
        created_by: row.get("created_by")?,
    };
    entry.validate()?;
    Ok(entry)
}
