//! Order reconciliation: make a session's stored line items match the desired
//! set and keep the cached total in step. Only open sessions are writable.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::SqliteConnection;
use diesel::{delete, insert_into, prelude::*, update};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LedgerError;
use crate::models::{NewTableSessionItem, SessionStatus, TableSession, TableSessionItem};
use crate::schema::{table_session_items, table_sessions};
use crate::sessions::SessionWithItems;

/// One desired line of an order: the catalog snapshot plus the chosen
/// quantity. Quantity zero means "not ordered", so callers may hand over a
/// whole catalog's worth of lines unfiltered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub name: String,
    pub price_cents: i64,
    pub quantity: i32,
}

fn require_open(
    conn: &mut SqliteConnection,
    session_id: i32,
) -> Result<TableSession, LedgerError> {
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
    Ok(session)
}

fn store_total(
    conn: &mut SqliteConnection,
    session_id: i32,
) -> Result<SessionWithItems, LedgerError> {
    let items = table_session_items::table
        .filter(table_session_items::table_session_id.eq(session_id))
        .select(TableSessionItem::as_select())
        .order(table_session_items::name.asc())
        .load(conn)?;
    let total: i64 = items
        .iter()
        .map(|i| i.price_cents * i64::from(i.quantity))
        .sum();
    let session = update(table_sessions::table.find(session_id))
        .set(table_sessions::total_cents.eq(total))
        .returning(TableSession::as_returning())
        .get_result(conn)?;
    debug!(session.id, total, "session total recomputed");
    Ok(SessionWithItems { session, items })
}

/// Replace the session's items wholesale with the positive-quantity subset of
/// `lines` and recompute the total. One transaction: the delete, the inserts
/// and the total update land together or not at all. An all-zero `lines`
/// leaves an empty bill with `total = 0`.
pub fn reconcile_items(
    conn: &mut SqliteConnection,
    session_id: i32,
    lines: &[OrderLine],
) -> Result<SessionWithItems, LedgerError> {
    conn.immediate_transaction(|conn| {
        let session = require_open(conn, session_id)?;

        delete(
            table_session_items::table
                .filter(table_session_items::table_session_id.eq(session.id)),
        )
        .execute(conn)?;

        let rows: Vec<NewTableSessionItem> = lines
            .iter()
            .filter(|line| line.quantity > 0)
            .map(|line| NewTableSessionItem {
                table_session_id: session.id,
                name: &line.name,
                price_cents: line.price_cents,
                quantity: line.quantity,
            })
            .collect();
        if !rows.is_empty() {
            insert_into(table_session_items::table)
                .values(&rows)
                .execute(conn)
                .map_err(|e| match e {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        LedgerError::Constraint("duplicate item name in order lines".into())
                    }
                    e => e.into(),
                })?;
        }

        store_total(conn, session.id)
    })
}

/// Set (or clear, at quantity zero) a single line by name, then recompute the
/// total. Re-ordering an item merges into its existing line rather than
/// duplicating it.
pub fn set_item(
    conn: &mut SqliteConnection,
    session_id: i32,
    name: &str,
    price_cents: i64,
    quantity: i32,
) -> Result<SessionWithItems, LedgerError> {
    conn.immediate_transaction(|conn| {
        let session = require_open(conn, session_id)?;

        if quantity <= 0 {
            delete(
                table_session_items::table
                    .filter(table_session_items::table_session_id.eq(session.id))
                    .filter(table_session_items::name.eq(name)),
            )
            .execute(conn)?;
        } else {
            insert_into(table_session_items::table)
                .values(NewTableSessionItem {
                    table_session_id: session.id,
                    name,
                    price_cents,
                    quantity,
                })
                .on_conflict((
                    table_session_items::table_session_id,
                    table_session_items::name,
                ))
                .do_update()
                .set((
                    table_session_items::price_cents.eq(price_cents),
                    table_session_items::quantity.eq(quantity),
                ))
                .execute(conn)?;
        }

        store_total(conn, session.id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{add_table, create_region};
    use crate::sessions::{open_table, pay};
    use crate::Store;

    fn line(name: &str, price_cents: i64, quantity: i32) -> OrderLine {
        OrderLine {
            name: name.into(),
            price_cents,
            quantity,
        }
    }

    fn open_session(conn: &mut SqliteConnection) -> i32 {
        let region = create_region(conn, "Main").unwrap();
        let table = add_table(conn, region.id).unwrap();
        open_table(conn, region.id, table.table_no).unwrap().session.id
    }

    #[test]
    fn zero_quantities_are_omitted_and_total_is_exact() {
        let mut store = Store::open_in_memory().unwrap();
        let conn = store.conn();
        let session_id = open_session(conn);

        let result =
            reconcile_items(conn, session_id, &[line("A", 10, 2), line("B", 5, 0)]).unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].name, "A");
        assert_eq!(result.items[0].quantity, 2);
        assert_eq!(result.session.total_cents, 20);
    }

    #[test]
    fn reconcile_replaces_rather_than_merges() {
        let mut store = Store::open_in_memory().unwrap();
        let conn = store.conn();
        let session_id = open_session(conn);

        reconcile_items(conn, session_id, &[line("A", 10, 2)]).unwrap();
        let result =
            reconcile_items(conn, session_id, &[line("A", 10, 0), line("B", 5, 3)]).unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].name, "B");
        assert_eq!(result.session.total_cents, 15);
    }

    #[test]
    fn all_zero_lines_leave_an_empty_bill() {
        let mut store = Store::open_in_memory().unwrap();
        let conn = store.conn();
        let session_id = open_session(conn);
        reconcile_items(conn, session_id, &[line("A", 10, 2)]).unwrap();

        let result = reconcile_items(conn, session_id, &[line("A", 10, 0)]).unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.session.total_cents, 0);
    }

    #[test]
    fn reconcile_guards_missing_and_closed_sessions() {
        let mut store = Store::open_in_memory().unwrap();
        let conn = store.conn();
        assert!(matches!(
            reconcile_items(conn, 404, &[]),
            Err(LedgerError::NotFound("session"))
        ));

        let session_id = open_session(conn);
        pay(conn, session_id, "cash").unwrap();
        assert!(matches!(
            reconcile_items(conn, session_id, &[line("A", 10, 1)]),
            Err(LedgerError::InvalidState { .. })
        ));
    }

    #[test]
    fn duplicate_names_in_one_reconcile_are_rejected_whole() {
        let mut store = Store::open_in_memory().unwrap();
        let conn = store.conn();
        let session_id = open_session(conn);
        reconcile_items(conn, session_id, &[line("A", 10, 1)]).unwrap();

        let result = reconcile_items(
            conn,
            session_id,
            &[line("B", 5, 1), line("B", 5, 2)],
        );
        assert!(matches!(result, Err(LedgerError::Constraint(_))));

        // The failed transaction rolled back; the previous bill survives.
        let reread = crate::sessions::get_open_session(conn, 1, 1).unwrap().unwrap();
        assert_eq!(reread.items.len(), 1);
        assert_eq!(reread.items[0].name, "A");
        assert_eq!(reread.session.total_cents, 10);
    }

    #[test]
    fn set_item_merges_updates_and_clears_by_name() {
        let mut store = Store::open_in_memory().unwrap();
        let conn = store.conn();
        let session_id = open_session(conn);

        set_item(conn, session_id, "Coffee", 350, 2).unwrap();
        let merged = set_item(conn, session_id, "Coffee", 350, 5).unwrap();
        assert_eq!(merged.items.len(), 1);
        assert_eq!(merged.items[0].quantity, 5);
        assert_eq!(merged.session.total_cents, 1750);

        let with_tea = set_item(conn, session_id, "Tea", 250, 1).unwrap();
        assert_eq!(with_tea.items.len(), 2);
        assert_eq!(with_tea.session.total_cents, 2000);

        let cleared = set_item(conn, session_id, "Coffee", 350, 0).unwrap();
        assert_eq!(cleared.items.len(), 1);
        assert_eq!(cleared.items[0].name, "Tea");
        assert_eq!(cleared.session.total_cents, 250);
    }
}
