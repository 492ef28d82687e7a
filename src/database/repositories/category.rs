//! Category repository implementation
//!
//! Category administration lives outside this crate; the core only needs
//! reference lookups.

use sqlx::PgPool;

use crate::models::category::Category;
use crate::utils::errors::Result;

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find category by ID
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Category>> {
        let category =
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(category)
    }
}
