//! Catalog retrieval: filtered nearest-neighbor search over
//! `catalog_items`.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::debug;

use concierge_core::{CatalogItem, CatalogRepository, Error, Modality, PriceFilter, Result};

/// PostgreSQL implementation of [`CatalogRepository`].
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    /// Create a new PgCatalogRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Build the similarity query for one modality and price filter.
///
/// Pure so the generated SQL is unit-testable. `$1` is the encoded
/// query vector, `$2` the row limit; price bounds bind from `$3` on,
/// in the order they appear in the returned vec. Results are ordered
/// by ascending cosine distance with `unique_id` as a deterministic
/// tie-break.
fn build_search_query(modality: Modality, price: &PriceFilter) -> (String, Vec<f64>) {
    let column = modality.column();

    let mut predicates = Vec::new();
    let mut params = Vec::new();

    if let Some(min) = price.min_price {
        params.push(min);
        predicates.push(format!("price >= ${}", params.len() + 2));
    }
    if let Some(max) = price.max_price {
        params.push(max);
        predicates.push(format!("price <= ${}", params.len() + 2));
    }

    let where_clause = if predicates.is_empty() {
        String::new()
    } else {
        format!("WHERE {}\n        ", predicates.join(" AND "))
    };

    let query = format!(
        r#"
        SELECT
            unique_id    AS id,
            title_desc   AS title,
            img_url      AS img,
            product_url  AS product,
            stars::float4 AS stars,
            price::float8 AS price,
            1 - ({column} <=> $1::vector) AS similarity
        FROM catalog_items
        {where_clause}ORDER BY {column} <=> $1::vector, unique_id
        LIMIT $2
        "#
    );

    (query, params)
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn search(
        &self,
        encoded_vector: &str,
        modality: Modality,
        limit: i64,
        price: &PriceFilter,
    ) -> Result<Vec<CatalogItem>> {
        let start = Instant::now();
        let (query, params) = build_search_query(modality, price);

        let mut q = sqlx::query(&query).bind(encoded_vector).bind(limit);
        for param in params {
            q = q.bind(param);
        }

        let rows = q.fetch_all(&self.pool).await.map_err(Error::Database)?;

        let items: Vec<CatalogItem> = rows
            .into_iter()
            .map(|row| CatalogItem {
                id: row.get("id"),
                title: row.get("title"),
                img_url: row.get("img"),
                product_url: row.get("product"),
                stars: row.get("stars"),
                price: row.get("price"),
                similarity: row.get("similarity"),
            })
            .collect();

        debug!(
            subsystem = "db",
            component = "catalog",
            op = "search",
            modality = %modality,
            result_count = items.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Catalog similarity search complete"
        );

        Ok(items)
    }
}
