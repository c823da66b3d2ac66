//! Product catalog. Sessions snapshot name/price at order time, so nothing
//! here touches session history.

use diesel::{delete, insert_into, prelude::*};
use diesel::sqlite::SqliteConnection;
use tracing::debug;

use crate::error::LedgerError;
use crate::models::{NewProduct, Product};
use crate::schema::products;

pub fn list_products(conn: &mut SqliteConnection) -> Result<Vec<Product>, LedgerError> {
    Ok(products::table
        .select(Product::as_select())
        .order(products::name.asc())
        .load(conn)?)
}

pub fn create_product(
    conn: &mut SqliteConnection,
    name: &str,
    price_cents: i64,
) -> Result<Product, LedgerError> {
    let product = insert_into(products::table)
        .values(NewProduct { name, price_cents })
        .returning(Product::as_returning())
        .get_result(conn)?;
    debug!(product.id, product.name = %product.name, "product created");
    Ok(product)
}

pub fn delete_product(conn: &mut SqliteConnection, product_id: i32) -> Result<(), LedgerError> {
    let deleted = delete(products::table.find(product_id)).execute(conn)?;
    if deleted == 0 {
        return Err(LedgerError::NotFound("product"));
    }
    debug!(product_id, "product deleted");
    Ok(())
}
