//! Session lifecycle: a table gets at most one open session at a time; a
//! session leaves `Open` exactly once, to `Paid` or `Canceled`, and is then
//! immutable history.

use chrono::Utc;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::SqliteConnection;
use diesel::{insert_into, prelude::*, update};
use serde::Serialize;
use tracing::info;

use crate::error::LedgerError;
use crate::models::{
    DiningTable, NewTableSession, SessionStatus, TableSession, TableSessionItem,
};
use crate::schema::{table_session_items, table_sessions, tables};

/// A session together with its line items, the shape the display layer works
/// with.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct SessionWithItems {
    pub session: TableSession,
    pub items: Vec<TableSessionItem>,
}

fn find_table(
    conn: &mut SqliteConnection,
    region_id: i32,
    table_no: i32,
) -> Result<Option<DiningTable>, DieselError> {
    tables::table
        .filter(tables::region_id.eq(region_id))
        .filter(tables::table_no.eq(table_no))
        .select(DiningTable::as_select())
        .first(conn)
        .optional()
}

fn open_session_for(
    conn: &mut SqliteConnection,
    table_id: i32,
) -> Result<Option<SessionWithItems>, LedgerError> {
    let session = table_sessions::table
        .filter(table_sessions::table_id.eq(table_id))
        .filter(table_sessions::status.eq(SessionStatus::Open))
        .select(TableSession::as_select())
        .first(conn)
        .optional()?;
    match session {
        Some(session) => {
            let items = TableSessionItem::belonging_to(&session)
                .select(TableSessionItem::as_select())
                .order(table_session_items::name.asc())
                .load(conn)?;
            Ok(Some(SessionWithItems { session, items }))
        }
        None => Ok(None),
    }
}

/// Open the table numbered `table_no` in `region_id`. Returns the existing
/// open session if there is one, so repeated taps on an occupied table never
/// create a duplicate; otherwise creates a fresh session with an empty bill.
/// The check-and-create runs in a write transaction, and the partial unique
/// index on open sessions backstops it.
pub fn open_table(
    conn: &mut SqliteConnection,
    region_id: i32,
    table_no: i32,
) -> Result<SessionWithItems, LedgerError> {
    conn.immediate_transaction(|conn| {
        let table =
            find_table(conn, region_id, table_no)?.ok_or(LedgerError::NotFound("table"))?;

        if let Some(existing) = open_session_for(conn, table.id)? {
            return Ok(existing);
        }

        let session = insert_into(table_sessions::table)
            .values(NewTableSession {
                table_id: table.id,
                status: SessionStatus::Open,
                total_cents: 0,
                opened_at: Utc::now().naive_utc(),
            })
            .returning(TableSession::as_returning())
            .get_result(conn)
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    LedgerError::Constraint(format!(
                        "table {} already has an open session",
                        table.id
                    ))
                }
                e => e.into(),
            })?;
        info!(session.id, table.id, "session opened");
        Ok(SessionWithItems {
            session,
            items: Vec::new(),
        })
    })
}

/// Read-only lookup of the open session on `(region_id, table_no)`. A missing
/// table or an unoccupied one is `None`, not an error.
pub fn get_open_session(
    conn: &mut SqliteConnection,
    region_id: i32,
    table_no: i32,
) -> Result<Option<SessionWithItems>, LedgerError> {
    match find_table(conn, region_id, table_no)? {
        Some(table) => open_session_for(conn, table.id),
        None => Ok(None),
    }
}

/// Settle the bill: `Open` → `Paid`, recording the payment method and the
/// closing time.
pub fn pay(
    conn: &mut SqliteConnection,
    session_id: i32,
    payment_method: &str,
) -> Result<TableSession, LedgerError> {
    close(conn, session_id, SessionStatus::Paid, Some(payment_method))
}

/// Abandon the bill: `Open` → `Canceled`.
pub fn cancel(conn: &mut SqliteConnection, session_id: i32) -> Result<TableSession, LedgerError> {
    close(conn, session_id, SessionStatus::Canceled, None)
}

fn close(
    conn: &mut SqliteConnection,
    session_id: i32,
    to: SessionStatus,
    payment_method: Option<&str>,
) -> Result<TableSession, LedgerError> {
    conn.immediate_transaction(|conn| {
        let session = table_sessions::table
            .find(session_id)
            .select(TableSession::as_select())
            .first(conn)
            .optional()?
            .ok_or(LedgerError::NotFound("session"))?;
        if session.status.is_terminal() {
            return Err(LedgerError::InvalidState {
                current: session.status,
                expect: SessionStatus::Open,
            });
        }

        let session = update(table_sessions::table.find(session_id))
            .set((
                table_sessions::status.eq(to),
                table_sessions::payment_method.eq(payment_method),
                table_sessions::closed_at.eq(Some(Utc::now().naive_utc())),
            ))
            .returning(TableSession::as_returning())
            .get_result(conn)?;
        info!(session.id, status = ?session.status, "session closed");
        Ok(session)
    })
}

/// Paid sessions with their items, most recently closed first.
pub fn list_paid(conn: &mut SqliteConnection) -> Result<Vec<SessionWithItems>, LedgerError> {
    list_closed(conn, SessionStatus::Paid)
}

/// Canceled sessions with their items, most recently closed first.
pub fn list_canceled(conn: &mut SqliteConnection) -> Result<Vec<SessionWithItems>, LedgerError> {
    list_closed(conn, SessionStatus::Canceled)
}

fn list_closed(
    conn: &mut SqliteConnection,
    status: SessionStatus,
) -> Result<Vec<SessionWithItems>, LedgerError> {
    // NULL closed_at cannot arise through this module, but if a row carries
    // one anyway it sorts last here.
    let sessions = table_sessions::table
        .filter(table_sessions::status.eq(status))
        .select(TableSession::as_select())
        .order(table_sessions::closed_at.desc())
        .load(conn)?;
    let items = TableSessionItem::belonging_to(&sessions)
        .select(TableSessionItem::as_select())
        .load(conn)?
        .grouped_by(&sessions);
    Ok(sessions
        .into_iter()
        .zip(items)
        .map(|(session, items)| SessionWithItems { session, items })
        .collect())
}
