use chrono::NaiveDateTime;
use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    prelude::*,
    serialize::{self, IsNull, Output, ToSql},
    sql_types::Text,
    sqlite::{Sqlite, SqliteValue},
};
use serde::{Deserialize, Serialize};

use crate::schema::{products, regions, table_session_items, table_sessions, tables};

#[derive(FromSqlRow, AsExpression, Serialize, Deserialize, PartialEq, Eq, Copy, Clone, Debug)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Paid,
    Canceled,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Paid => "paid",
            SessionStatus::Canceled => "canceled",
        }
    }

    /// Terminal sessions are immutable history.
    pub fn is_terminal(self) -> bool {
        self != SessionStatus::Open
    }
}

impl ToSql<Text, Sqlite> for SessionStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(self.as_str());
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Sqlite> for SessionStatus {
    fn from_sql(bytes: SqliteValue<'_, '_, '_>) -> deserialize::Result<Self> {
        match <String as FromSql<Text, Sqlite>>::from_sql(bytes)?.as_str() {
            "open" => Ok(SessionStatus::Open),
            "paid" => Ok(SessionStatus::Paid),
            "canceled" => Ok(SessionStatus::Canceled),
            _ => Err("Unrecognized session status".into()),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, PartialEq, Clone)]
#[diesel(table_name = regions)]
pub struct Region {
    pub id: i32,
    pub name: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = regions)]
pub struct NewRegion<'a> {
    pub name: &'a str,
}

/// A physical table. `table_no` is the per-region sequence number shown to
/// staff; `id` is the surrogate key everything else references.
#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, PartialEq, Clone)]
#[diesel(belongs_to(Region))]
#[diesel(table_name = tables)]
pub struct DiningTable {
    pub id: i32,
    pub table_no: i32,
    pub region_id: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = tables)]
pub struct NewDiningTable {
    pub table_no: i32,
    pub region_id: i32,
}

/// One occupancy/billing cycle of a table. `total_cents` is a cached value,
/// recomputed whenever the items change; `closed_at` is set exactly when the
/// session leaves `Open`.
#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, PartialEq, Clone)]
#[diesel(belongs_to(DiningTable, foreign_key = table_id))]
#[diesel(table_name = table_sessions)]
pub struct TableSession {
    pub id: i32,
    pub table_id: i32,
    pub status: SessionStatus,
    pub total_cents: i64,
    pub payment_method: Option<String>,
    pub opened_at: NaiveDateTime,
    pub closed_at: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = table_sessions)]
pub struct NewTableSession {
    pub table_id: i32,
    pub status: SessionStatus,
    pub total_cents: i64,
    pub opened_at: NaiveDateTime,
}

/// A line on the bill. Name and price are snapshotted from the catalog at
/// order time so later product edits leave history untouched. Unique per
/// `(table_session_id, name)`.
#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, PartialEq, Clone)]
#[diesel(belongs_to(TableSession))]
#[diesel(table_name = table_session_items)]
pub struct TableSessionItem {
    pub id: i32,
    pub table_session_id: i32,
    pub name: String,
    pub price_cents: i64,
    pub quantity: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = table_session_items)]
pub struct NewTableSessionItem<'a> {
    pub table_session_id: i32,
    pub name: &'a str,
    pub price_cents: i64,
    pub quantity: i32,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, PartialEq, Clone)]
#[diesel(table_name = products)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub price_cents: i64,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = products)]
pub struct NewProduct<'a> {
    pub name: &'a str,
    pub price_cents: i64,
}
