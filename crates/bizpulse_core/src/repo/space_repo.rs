//! Space repository contract and SQLite implementation.

use crate::model::space::Space;
use crate::repo::events::{ChangeAction, ChangeEvent, EntityKind};
use crate::repo::sqlite_store::{from_epoch_ms, to_epoch_ms, SqliteStore};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, OptionalExtension, Row};

const SPACE_SELECT_SQL: &str = "SELECT id, label, description, color, created_at FROM spaces";

pub trait SpaceRepository {
    /// Inserts a space; `Conflict` when its id is taken.
    fn create_space(&self, space: &Space) -> RepoResult<()>;
    fn get_space(&self, id: &str) -> RepoResult<Option<Space>>;
    /// Lists spaces oldest first.
    fn list_spaces(&self) -> RepoResult<Vec<Space>>;
    /// Rewrites label, description and color. The id and `created_at` stay.
    fn update_space(&self, space: &Space) -> RepoResult<()>;
    /// Deletes a space together with every record scoped to it.
    fn delete_space(&self, id: &str) -> RepoResult<()>;
}

impl SpaceRepository for SqliteStore {
    fn create_space(&self, space: &Space) -> RepoResult<()> {
        space.validate()?;
        if self.get_space(&space.id)?.is_some() {
            return Err(RepoError::conflict("space", &space.id));
        }

        self.conn.execute(
            "INSERT INTO spaces (id, label, description, color, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                space.id,
                space.label,
                space.description,
                space.color,
                to_epoch_ms(space.created_at),
            ],
        )?;

        self.publish(ChangeEvent::new(
            space.id.as_str(),
            EntityKind::Space,
            &space.id,
            ChangeAction::Created,
        ));
        Ok(())
    }

    fn get_space(&self, id: &str) -> RepoResult<Option<Space>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SPACE_SELECT_SQL} WHERE id = ?1;"))?;
        let raw = stmt.query_row([id], read_raw_space).optional()?;
        raw.map(RawSpace::into_space).transpose()
    }

    fn list_spaces(&self) -> RepoResult<Vec<Space>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SPACE_SELECT_SQL} ORDER BY created_at ASC, rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut spaces = Vec::new();
        while let Some(row) = rows.next()? {
            spaces.push(read_raw_space(row)?.into_space()?);
        }
        Ok(spaces)
    }

    fn update_space(&self, space: &Space) -> RepoResult<()> {
        space.validate()?;
        let changed = self.conn.execute(
            "UPDATE spaces SET label = ?2, description = ?3, color = ?4 WHERE id = ?1;",
            params![space.id, space.label, space.description, space.color],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("space", &space.id));
        }

        self.publish(ChangeEvent::new(
            space.id.as_str(),
            EntityKind::Space,
            &space.id,
            ChangeAction::Updated,
        ));
        Ok(())
    }

    fn delete_space(&self, id: &str) -> RepoResult<()> {
        // Leads, clients, NPS records, objectives and progress logs go with
        // it through ON DELETE CASCADE.
        let changed = self.conn.execute("DELETE FROM spaces WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("space", id));
        }

        self.publish(ChangeEvent::new(
            id,
            EntityKind::Space,
            id,
            ChangeAction::Deleted,
        ));
        Ok(())
    }
}

struct RawSpace {
    id: String,
    label: String,
    description: String,
    color: String,
    created_at: i64,
}

impl RawSpace {
    fn into_space(self) -> RepoResult<Space> {
        let space = Space {
            id: self.id,
            label: self.label,
            description: self.description,
            color: self.color,
            created_at: from_epoch_ms(self.created_at, "spaces.created_at")?,
        };
        space.validate()?;
        Ok(space)
    }
}

fn read_raw_space(row: &Row<'_>) -> rusqlite::Result<RawSpace> {
    Ok(RawSpace {
        id: row.get("id")?,
        label: row.get("label")?,
        description: row.get("description")?,
        color: row.get("color")?,
        created_at: row.get("created_at")?,
    })
}
