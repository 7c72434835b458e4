//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder, Row};

use super::{BookFilter, BookStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookInput, BookRow, BookSummary, GENRE_DISPLAY_LIMIT},
        genre::Genre,
        pagination::Pagination,
    },
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn get_genres<'e, E>(&self, executor: E, book_id: i32) -> AppResult<Vec<Genre>>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let genres = sqlx::query_as::<_, Genre>(
            r#"
            SELECT g.id, g.name
            FROM book_genres bg
            JOIN genres g ON g.id = bg.genre_id
            WHERE bg.book_id = $1
            ORDER BY g.name, g.id
            "#,
        )
        .bind(book_id)
        .fetch_all(executor)
        .await?;

        Ok(genres)
    }
}

fn push_where(builder: &mut QueryBuilder<'_, Postgres>, filter: &BookFilter) {
    builder.push(" WHERE 1=1");
    if let Some(ref title) = filter.title_contains {
        builder
            .push(" AND POSITION(")
            .push_bind(title.to_lowercase())
            .push(" IN LOWER(b.title)) > 0");
    }
    if let Some(author_id) = filter.author_id {
        builder.push(" AND b.author_id = ").push_bind(author_id);
    }
    if let Some(genre_id) = filter.genre_id {
        builder
            .push(" AND EXISTS (SELECT 1 FROM book_genres bg WHERE bg.book_id = b.id AND bg.genre_id = ")
            .push_bind(genre_id)
            .push(")");
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn count(&self, filter: &BookFilter) -> AppResult<i64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM books b");
        push_where(&mut builder, filter);
        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn list(&self, filter: &BookFilter, page: Pagination) -> AppResult<(Vec<BookSummary>, i64)> {
        let total = self.count(filter).await?;

        let mut builder = QueryBuilder::new(
            r#"
            SELECT b.id, b.title, b.author_id, a.first_name, a.last_name,
                   COALESCE((
                       SELECT STRING_AGG(t.name, ', ' ORDER BY t.name, t.id)
                       FROM (
                           SELECT g.id, g.name
                           FROM book_genres bg
                           JOIN genres g ON g.id = bg.genre_id
                           WHERE bg.book_id = b.id
                           ORDER BY g.name, g.id
                           LIMIT "#,
        );
        builder.push_bind(GENRE_DISPLAY_LIMIT as i64);
        builder.push(
            r#"
                       ) t
                   ), '') AS genre_display
            FROM books b
            JOIN authors a ON a.id = b.author_id"#,
        );
        push_where(&mut builder, filter);
        builder
            .push(" ORDER BY b.title, b.id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = builder.build().fetch_all(&self.pool).await?;

        let books = rows
            .into_iter()
            .map(|row| {
                let last_name: String = row.get("last_name");
                let first_name: String = row.get("first_name");
                BookSummary {
                    id: row.get("id"),
                    title: row.get("title"),
                    author_id: row.get("author_id"),
                    author_name: format!("{}, {}", last_name, first_name),
                    genre_display: row.get("genre_display"),
                }
            })
            .collect();

        Ok((books, total))
    }

    async fn get(&self, id: i32) -> AppResult<Book> {
        let row = sqlx::query_as::<_, BookRow>(
            "SELECT id, title, author_id, summary, isbn FROM books WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let genres = self.get_genres(&self.pool, id).await?;
        Ok(row.with_genres(genres))
    }

    async fn create(&self, input: &BookInput) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BookRow>(
            r#"
            INSERT INTO books (title, author_id, summary, isbn)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, author_id, summary, isbn
            "#,
        )
        .bind(&input.title)
        .bind(input.author_id)
        .bind(&input.summary)
        .bind(&input.isbn)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO book_genres (book_id, genre_id) SELECT $1, UNNEST($2::int[]) ON CONFLICT DO NOTHING",
        )
        .bind(row.id)
        .bind(&input.genre_ids)
        .execute(&mut *tx)
        .await?;

        let genres = self.get_genres(&mut *tx, row.id).await?;
        tx.commit().await?;

        Ok(row.with_genres(genres))
    }

    async fn update(&self, id: i32, input: &BookInput) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BookRow>(
            r#"
            UPDATE books
            SET title = $2, author_id = $3, summary = $4, isbn = $5
            WHERE id = $1
            RETURNING id, title, author_id, summary, isbn
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(input.author_id)
        .bind(&input.summary)
        .bind(&input.isbn)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        sqlx::query("DELETE FROM book_genres WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO book_genres (book_id, genre_id) SELECT $1, UNNEST($2::int[]) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(&input.genre_ids)
        .execute(&mut *tx)
        .await?;

        let genres = self.get_genres(&mut *tx, id).await?;
        tx.commit().await?;

        Ok(row.with_genres(genres))
    }

    async fn delete(&self, id: i32, cascade: bool) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS copies,
                   COUNT(*) FILTER (WHERE status = 'o') AS on_loan
            FROM book_instances
            WHERE book_id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let copies: i64 = row.get("copies");
        let on_loan: i64 = row.get("on_loan");

        if copies > 0 && !cascade {
            return Err(AppError::Conflict(format!(
                "Book {} still has {} copy(ies); pass force=true to delete them too",
                id, copies
            )));
        }

        if on_loan > 0 {
            return Err(AppError::Conflict(format!(
                "Book {} has {} copy(ies) on loan",
                id, on_loan
            )));
        }

        sqlx::query("DELETE FROM book_instances WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Deleted book {} and {} copy(ies)", id, copies);
        Ok(())
    }
}
