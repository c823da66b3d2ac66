//! Read-side view for the floor display.

use std::collections::HashMap;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;

use crate::directory;
use crate::error::LedgerError;
use crate::models::{DiningTable, SessionStatus, TableSession, TableSessionItem};
use crate::schema::{table_session_items, table_sessions};
use crate::sessions::SessionWithItems;

/// Every table of a region plus, keyed by table surrogate id, the open
/// session of the tables that have one.
#[derive(Debug, Serialize)]
pub struct RegionView {
    pub tables: Vec<DiningTable>,
    pub sessions: HashMap<i32, SessionWithItems>,
}

/// Snapshot of a region in a fixed number of queries (tables, open sessions,
/// their items) instead of one lookup per table. The reads are not linearized
/// against concurrent writes; a session opened in between may be missing
/// until the next refresh, which is fine for a display that polls.
pub fn region_tables_and_sessions(
    conn: &mut SqliteConnection,
    region_id: i32,
) -> Result<RegionView, LedgerError> {
    let tables = directory::list_tables(conn, region_id)?;

    let sessions = table_sessions::table
        .filter(table_sessions::table_id.eq_any(tables.iter().map(|t| t.id)))
        .filter(table_sessions::status.eq(SessionStatus::Open))
        .select(TableSession::as_select())
        .load(conn)?;
    let items = TableSessionItem::belonging_to(&sessions)
        .select(TableSessionItem::as_select())
        .order(table_session_items::name.asc())
        .load(conn)?
        .grouped_by(&sessions);

    let sessions = sessions
        .into_iter()
        .zip(items)
        .map(|(session, items)| (session.table_id, SessionWithItems { session, items }))
        .collect();
    Ok(RegionView { tables, sessions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{add_table, create_region};
    use crate::orders::{reconcile_items, OrderLine};
    use crate::sessions::open_table;
    use crate::Store;

    #[test]
    fn empty_region_yields_empty_view() {
        let mut store = Store::open_in_memory().unwrap();
        let conn = store.conn();
        let region = create_region(conn, "Main").unwrap();

        let view = region_tables_and_sessions(conn, region.id).unwrap();
        assert!(view.tables.is_empty());
        assert!(view.sessions.is_empty());
    }

    #[test]
    fn only_occupied_tables_appear_in_the_session_map() {
        let mut store = Store::open_in_memory().unwrap();
        let conn = store.conn();
        let region = create_region(conn, "Main").unwrap();
        let other = create_region(conn, "Terrace").unwrap();
        let t1 = add_table(conn, region.id).unwrap();
        let t2 = add_table(conn, region.id).unwrap();
        let elsewhere = add_table(conn, other.id).unwrap();

        let opened = open_table(conn, region.id, t1.table_no).unwrap();
        reconcile_items(
            conn,
            opened.session.id,
            &[OrderLine {
                name: "Coffee".into(),
                price_cents: 350,
                quantity: 2,
            }],
        )
        .unwrap();
        open_table(conn, other.id, elsewhere.table_no).unwrap();

        let view = region_tables_and_sessions(conn, region.id).unwrap();
        assert_eq!(view.tables.len(), 2);
        assert_eq!(view.sessions.len(), 1);
        assert!(!view.sessions.contains_key(&t2.id));

        let occupied = &view.sessions[&t1.id];
        assert_eq!(occupied.session.total_cents, 700);
        assert_eq!(occupied.items.len(), 1);
        assert_eq!(occupied.items[0].name, "Coffee");
    }
}
