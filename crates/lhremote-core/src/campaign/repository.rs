//! Campaign tables in the account database.
//!
//! The instance owns the schema:
//!
//! ```text
//! campaigns(id, name, is_paused, is_archived, is_valid)
//! actions(id, campaign_id, action_type, position)
//! action_target_people(action_id, person_id, state)   -- queued | processing | successful | failed
//! action_results(id, action_id, person_id, result, created_at)
//! ```

use crate::model::{ActionCounts, CampaignState, RetryReport};
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Transaction, params};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignRecord {
    pub id: i64,
    pub name: String,
    pub state: CampaignState,
    pub is_paused: bool,
}

pub fn find_campaign(conn: &Connection, campaign_id: i64) -> Result<Option<CampaignRecord>> {
    let record = conn
        .query_row(
            "SELECT id, name, is_paused, is_archived, is_valid FROM campaigns WHERE id = ?1",
            params![campaign_id],
            |row| {
                let is_paused: bool = row.get(2)?;
                let is_archived: bool = row.get(3)?;
                let is_valid: bool = row.get(4)?;
                let state = if is_archived {
                    CampaignState::Archived
                } else if !is_valid {
                    CampaignState::Invalid
                } else if is_paused {
                    CampaignState::Paused
                } else {
                    CampaignState::Active
                };
                Ok(CampaignRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    state,
                    is_paused,
                })
            },
        )
        .optional()?;
    Ok(record)
}

pub fn require_campaign(conn: &Connection, campaign_id: i64) -> Result<CampaignRecord> {
    find_campaign(conn, campaign_id)?.ok_or(Error::CampaignNotFound { campaign_id })
}

/// Queue progress of every action, in execution order
pub fn action_counts(conn: &Connection, campaign_id: i64) -> Result<Vec<ActionCounts>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.action_type,
                COALESCE(SUM(t.state = 'queued'), 0),
                COALESCE(SUM(t.state = 'processing'), 0),
                COALESCE(SUM(t.state = 'successful'), 0),
                COALESCE(SUM(t.state = 'failed'), 0)
         FROM actions a
         LEFT JOIN action_target_people t ON t.action_id = a.id
         WHERE a.campaign_id = ?1
         GROUP BY a.id, a.action_type
         ORDER BY a.position, a.id",
    )?;

    let rows = stmt.query_map(params![campaign_id], |row| {
        Ok(ActionCounts {
            action_id: row.get(0)?,
            action_type: row.get(1)?,
            queued: row.get::<_, i64>(2)? as u64,
            processing: row.get::<_, i64>(3)? as u64,
            successful: row.get::<_, i64>(4)? as u64,
            failed: row.get::<_, i64>(5)? as u64,
        })
    })?;

    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn first_action(tx: &Transaction<'_>, campaign_id: i64) -> Result<Option<i64>> {
    let id = tx
        .query_row(
            "SELECT id FROM actions WHERE campaign_id = ?1 ORDER BY position, id LIMIT 1",
            params![campaign_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Drop prior results and queue entries of `person_ids` across the
/// campaign's actions, then queue them again on the first action.
///
/// Runs inside the caller's transaction.
pub fn reset_persons(
    tx: &Transaction<'_>,
    campaign_id: i64,
    person_ids: &[i64],
) -> Result<RetryReport> {
    let Some(first_action_id) = first_action(tx, campaign_id)? else {
        return Err(Error::CampaignExecution {
            campaign_id,
            message: "campaign has no actions".to_string(),
        });
    };

    let mut clear_results = tx.prepare(
        "DELETE FROM action_results
         WHERE person_id = ?1
           AND action_id IN (SELECT id FROM actions WHERE campaign_id = ?2)",
    )?;
    let mut clear_queue = tx.prepare(
        "DELETE FROM action_target_people
         WHERE person_id = ?1
           AND action_id IN (SELECT id FROM actions WHERE campaign_id = ?2)",
    )?;
    let mut requeue = tx.prepare(
        "INSERT INTO action_target_people (action_id, person_id, state)
         VALUES (?1, ?2, 'queued')",
    )?;

    let mut report = RetryReport {
        persons_requeued: 0,
        results_cleared: 0,
    };
    for &person_id in person_ids {
        report.results_cleared += clear_results.execute(params![person_id, campaign_id])?;
        clear_queue.execute(params![person_id, campaign_id])?;
        report.persons_requeued += requeue.execute(params![first_action_id, person_id])?;
    }
    Ok(report)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use rusqlite::Connection;

    pub const SCHEMA: &str = "
        CREATE TABLE campaigns (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            is_paused INTEGER NOT NULL DEFAULT 0,
            is_archived INTEGER NOT NULL DEFAULT 0,
            is_valid INTEGER NOT NULL DEFAULT 1
        );
        CREATE TABLE actions (
            id INTEGER PRIMARY KEY,
            campaign_id INTEGER NOT NULL REFERENCES campaigns(id),
            action_type TEXT NOT NULL,
            position INTEGER NOT NULL
        );
        CREATE TABLE action_target_people (
            action_id INTEGER NOT NULL REFERENCES actions(id),
            person_id INTEGER NOT NULL,
            state TEXT NOT NULL
        );
        CREATE TABLE action_results (
            id INTEGER PRIMARY KEY,
            action_id INTEGER NOT NULL REFERENCES actions(id),
            person_id INTEGER NOT NULL,
            result TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
    ";

    /// Campaign 10 ("Outreach"): visit (11) then invite (12).
    /// Campaign 20 (archived): a single message action (21).
    pub const SEED: &str = "
        INSERT INTO campaigns (id, name, is_paused) VALUES (10, 'Outreach', 1);
        INSERT INTO campaigns (id, name, is_archived) VALUES (20, 'Old', 1);
        INSERT INTO actions (id, campaign_id, action_type, position) VALUES
            (12, 10, 'InvitePerson', 2),
            (11, 10, 'VisitAndExtract', 1),
            (21, 20, 'MessageToPerson', 1);
        INSERT INTO action_target_people (action_id, person_id, state) VALUES
            (11, 100, 'successful'),
            (12, 100, 'failed'),
            (11, 101, 'successful'),
            (12, 101, 'processing'),
            (11, 102, 'queued'),
            (21, 100, 'successful');
        INSERT INTO action_results (action_id, person_id, result) VALUES
            (11, 100, 'ok'),
            (12, 100, 'error'),
            (11, 101, 'ok'),
            (21, 100, 'ok');
    ";

    pub fn seeded(conn: &Connection) {
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute_batch(SEED).unwrap();
    }
}
