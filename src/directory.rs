//! Region/table directory: which regions exist and which numbered tables
//! stand in each.

use diesel::{delete, insert_into, prelude::*};
use diesel::sqlite::SqliteConnection;
use tracing::debug;

use crate::error::LedgerError;
use crate::models::{DiningTable, NewDiningTable, NewRegion, Region};
use crate::schema::{regions, table_sessions, tables};

/// All regions, ordered by name for display.
pub fn list_regions(conn: &mut SqliteConnection) -> Result<Vec<Region>, LedgerError> {
    Ok(regions::table
        .select(Region::as_select())
        .order(regions::name.asc())
        .load(conn)?)
}

/// Duplicate names are allowed; keeping them distinguishable is a display
/// concern.
pub fn create_region(conn: &mut SqliteConnection, name: &str) -> Result<Region, LedgerError> {
    let region = insert_into(regions::table)
        .values(NewRegion { name })
        .returning(Region::as_returning())
        .get_result(conn)?;
    debug!(region.id, region.name = %region.name, "region created");
    Ok(region)
}

/// Tables of one region, ordered by their sequence number.
pub fn list_tables(
    conn: &mut SqliteConnection,
    region_id: i32,
) -> Result<Vec<DiningTable>, LedgerError> {
    Ok(tables::table
        .filter(tables::region_id.eq(region_id))
        .select(DiningTable::as_select())
        .order(tables::table_no.asc())
        .load(conn)?)
}

/// Every table across all regions, each paired with its region.
pub fn list_all_tables(
    conn: &mut SqliteConnection,
) -> Result<Vec<(DiningTable, Region)>, LedgerError> {
    Ok(tables::table
        .inner_join(regions::table)
        .select((DiningTable::as_select(), Region::as_select()))
        .order(tables::table_no.asc())
        .load(conn)?)
}

/// Add a table to `region_id`, numbered `max(table_no) + 1` within the
/// region (1 for an empty region).
pub fn add_table(
    conn: &mut SqliteConnection,
    region_id: i32,
) -> Result<DiningTable, LedgerError> {
    conn.immediate_transaction(|conn| {
        regions::table
            .find(region_id)
            .select(Region::as_select())
            .first(conn)
            .optional()?
            .ok_or(LedgerError::NotFound("region"))?;

        let next_no = tables::table
            .filter(tables::region_id.eq(region_id))
            .select(diesel::dsl::max(tables::table_no))
            .first::<Option<i32>>(conn)?
            .map_or(1, |n| n + 1);

        let table = insert_into(tables::table)
            .values(NewDiningTable {
                table_no: next_no,
                region_id,
            })
            .returning(DiningTable::as_returning())
            .get_result(conn)?;
        debug!(table.id, table.table_no, region_id, "table added");
        Ok(table)
    })
}

/// Remove a table by its surrogate id. Rejected while any session row still
/// references the table, so billing history is never orphaned.
pub fn delete_table(conn: &mut SqliteConnection, table_db_id: i32) -> Result<(), LedgerError> {
    conn.immediate_transaction(|conn| {
        let table = tables::table
            .find(table_db_id)
            .select(DiningTable::as_select())
            .first(conn)
            .optional()?
            .ok_or(LedgerError::NotFound("table"))?;

        let sessions: i64 = table_sessions::table
            .filter(table_sessions::table_id.eq(table.id))
            .count()
            .get_result(conn)?;
        if sessions > 0 {
            return Err(LedgerError::Constraint(format!(
                "table {} has {} recorded session(s)",
                table.id, sessions
            )));
        }

        delete(tables::table.find(table.id)).execute(conn)?;
        debug!(table.id, "table deleted");
        Ok(())
    })
}
