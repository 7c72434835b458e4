//! Authors repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};

use super::{restricted_delete, AuthorFilter, AuthorStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorInput},
        pagination::Pagination,
    },
};

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn push_where(builder: &mut QueryBuilder<'_, Postgres>, filter: &AuthorFilter) {
    builder.push(" WHERE 1=1");
    if let Some(ref name) = filter.name_contains {
        let pattern = name.to_lowercase();
        builder
            .push(" AND (POSITION(")
            .push_bind(pattern.clone())
            .push(" IN LOWER(first_name)) > 0 OR POSITION(")
            .push_bind(pattern)
            .push(" IN LOWER(last_name)) > 0)");
    }
}

#[async_trait]
impl AuthorStore for AuthorsRepository {
    async fn count(&self, filter: &AuthorFilter) -> AppResult<i64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM authors");
        push_where(&mut builder, filter);
        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn list(&self, filter: &AuthorFilter, page: Pagination) -> AppResult<(Vec<Author>, i64)> {
        let total = self.count(filter).await?;

        let mut builder = QueryBuilder::new(
            "SELECT id, first_name, last_name, date_of_birth, date_of_death FROM authors",
        );
        push_where(&mut builder, filter);
        builder
            .push(" ORDER BY last_name, first_name, id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let authors = builder
            .build_query_as::<Author>()
            .fetch_all(&self.pool)
            .await?;

        Ok((authors, total))
    }

    async fn get(&self, id: i32) -> AppResult<Author> {
        sqlx::query_as::<_, Author>(
            "SELECT id, first_name, last_name, date_of_birth, date_of_death FROM authors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    async fn create(&self, input: &AuthorInput) -> AppResult<Author> {
        let author = sqlx::query_as::<_, Author>(
            r#"
            INSERT INTO authors (first_name, last_name, date_of_birth, date_of_death)
            VALUES ($1, $2, $3, $4)
            RETURNING id, first_name, last_name, date_of_birth, date_of_death
            "#,
        )
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(input.date_of_birth)
        .bind(input.date_of_death)
        .fetch_one(&self.pool)
        .await?;

        Ok(author)
    }

    async fn update(&self, id: i32, input: &AuthorInput) -> AppResult<Author> {
        sqlx::query_as::<_, Author>(
            r#"
            UPDATE authors
            SET first_name = $2, last_name = $3, date_of_birth = $4, date_of_death = $5
            WHERE id = $1
            RETURNING id, first_name, last_name, date_of_birth, date_of_death
            "#,
        )
        .bind(id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(input.date_of_birth)
        .bind(input.date_of_death)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE author_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        if books > 0 {
            return Err(AppError::Conflict(format!(
                "Author {} still has {} book(s)",
                id, books
            )));
        }

        // A book inserted after the count still blocks the delete
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| restricted_delete(e, || format!("Author {} still has book(s)", id)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}
