use sqlx::SqlitePool;

use crate::errors::AppResult;
use crate::models::product::{Product, ProductRequest};
use crate::utils::utc_now;

const PRODUCT_COLUMNS: &str = "id, name, description, price, stock, category_id, is_deleted, created_at, updated_at";

pub async fn list(pool: &SqlitePool) -> AppResult<Vec<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE is_deleted = 0 ORDER BY id");
    let products = sqlx::query_as::<_, Product>(&sql).fetch_all(pool).await?;
    Ok(products)
}

pub async fn find(pool: &SqlitePool, id: i64) -> AppResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ? AND is_deleted = 0");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(product)
}

pub async fn create(pool: &SqlitePool, req: &ProductRequest) -> AppResult<Product> {
    let now = utc_now();
    let id = sqlx::query(
        "INSERT INTO products (name, description, price, stock, category_id, is_deleted, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 0, ?, ?)",
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.price)
    .bind(req.stock)
    .bind(req.category_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(Product {
        id,
        name: req.name.clone(),
        description: req.description.clone(),
        price: req.price,
        stock: req.stock,
        category_id: req.category_id,
        is_deleted: false,
        created_at: now,
        updated_at: now,
    })
}

pub async fn update(pool: &SqlitePool, id: i64, req: &ProductRequest) -> AppResult<Option<Product>> {
    let result = sqlx::query(
        "UPDATE products SET name = ?, description = ?, price = ?, stock = ?, category_id = ?, updated_at = ? \
         WHERE id = ? AND is_deleted = 0",
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.price)
    .bind(req.stock)
    .bind(req.category_id)
    .bind(utc_now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    find(pool, id).await
}

/// Soft delete. Returns the row as it was before deletion.
pub async fn soft_delete(pool: &SqlitePool, id: i64) -> AppResult<Option<Product>> {
    let Some(product) = find(pool, id).await? else {
        return Ok(None);
    };

    sqlx::query("UPDATE products SET is_deleted = 1, updated_at = ? WHERE id = ?")
        .bind(utc_now())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(Some(product))
}
