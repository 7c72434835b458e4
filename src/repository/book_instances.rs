//! Book instances repository for database operations

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgRow, Pool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::BookInstanceStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        book_instance::{
            BookInstance, BookInstanceDetails, BookInstanceInput, InstanceFilter, InstanceOrder, LoanStatus,
        },
        pagination::Pagination,
        user::Borrower,
    },
};

const DETAILS_SELECT: &str = r#"
    SELECT bi.id, bi.book_id, b.title AS book_title, bi.imprint, bi.due_back, bi.status,
           l.name AS language,
           u.id AS borrower_id, u.login AS borrower_login,
           u.first_name AS borrower_first_name, u.last_name AS borrower_last_name
    FROM book_instances bi
    JOIN books b ON b.id = bi.book_id
    LEFT JOIN languages l ON l.id = bi.language_id
    LEFT JOIN users u ON u.id = bi.borrower_id"#;

#[derive(Clone)]
pub struct BookInstancesRepository {
    pool: Pool<Postgres>,
}

impl BookInstancesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn push_where(builder: &mut QueryBuilder<'_, Postgres>, filter: &InstanceFilter) {
    builder.push(" WHERE 1=1");
    if let Some(status) = filter.status {
        builder.push(" AND bi.status = ").push_bind(status);
    }
    if let Some(borrower_id) = filter.borrower_id {
        builder.push(" AND bi.borrower_id = ").push_bind(borrower_id);
    }
    if let Some(book_id) = filter.book_id {
        builder.push(" AND bi.book_id = ").push_bind(book_id);
    }
    if let Some(due_before) = filter.due_before {
        builder.push(" AND bi.due_back < ").push_bind(due_before);
    }
}

fn details_from_row(row: &PgRow) -> BookInstanceDetails {
    let borrower_id: Option<i32> = row.get("borrower_id");
    let borrower = borrower_id.map(|id| Borrower {
        id,
        login: row.get("borrower_login"),
        first_name: row.get("borrower_first_name"),
        last_name: row.get("borrower_last_name"),
    });

    BookInstanceDetails {
        id: row.get("id"),
        book_id: row.get("book_id"),
        book_title: row.get("book_title"),
        imprint: row.get("imprint"),
        due_back: row.get("due_back"),
        status: row.get::<LoanStatus, _>("status"),
        language: row.get("language"),
        borrower,
        is_overdue: false,
    }
}

#[async_trait]
impl BookInstanceStore for BookInstancesRepository {
    async fn count(&self, filter: &InstanceFilter) -> AppResult<i64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM book_instances bi");
        push_where(&mut builder, filter);
        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn list(
        &self,
        filter: &InstanceFilter,
        order: InstanceOrder,
        page: Pagination,
    ) -> AppResult<(Vec<BookInstanceDetails>, i64)> {
        let total = self.count(filter).await?;

        let mut builder = QueryBuilder::new(DETAILS_SELECT);
        push_where(&mut builder, filter);
        builder.push(match order {
            InstanceOrder::DueBack => " ORDER BY bi.due_back ASC NULLS LAST, bi.id",
            InstanceOrder::DueBackThenBorrower => {
                " ORDER BY bi.due_back ASC NULLS LAST, u.last_name ASC NULLS LAST, bi.id"
            }
        });
        builder
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok((rows.iter().map(details_from_row).collect(), total))
    }

    async fn get(&self, id: Uuid) -> AppResult<BookInstance> {
        sqlx::query_as::<_, BookInstance>(
            r#"
            SELECT id, book_id, imprint, due_back, status, borrower_id, language_id
            FROM book_instances
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    async fn get_details(&self, id: Uuid) -> AppResult<BookInstanceDetails> {
        let mut builder = QueryBuilder::new(DETAILS_SELECT);
        builder.push(" WHERE bi.id = ").push_bind(id);

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))?;

        Ok(details_from_row(&row))
    }

    async fn create(&self, input: &BookInstanceInput) -> AppResult<BookInstance> {
        let instance = sqlx::query_as::<_, BookInstance>(
            r#"
            INSERT INTO book_instances (id, book_id, imprint, due_back, status, borrower_id, language_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, book_id, imprint, due_back, status, borrower_id, language_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.book_id)
        .bind(&input.imprint)
        .bind(input.due_back)
        .bind(input.status)
        .bind(input.borrower_id)
        .bind(input.language_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(instance)
    }

    async fn update(&self, id: Uuid, input: &BookInstanceInput) -> AppResult<BookInstance> {
        sqlx::query_as::<_, BookInstance>(
            r#"
            UPDATE book_instances
            SET book_id = $2, imprint = $3, due_back = $4, status = $5, borrower_id = $6, language_id = $7
            WHERE id = $1
            RETURNING id, book_id, imprint, due_back, status, borrower_id, language_id
            "#,
        )
        .bind(id)
        .bind(input.book_id)
        .bind(&input.imprint)
        .bind(input.due_back)
        .bind(input.status)
        .bind(input.borrower_id)
        .bind(input.language_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM book_instances WHERE id = $1 AND status <> 'o'")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            // Tell "on loan" apart from "missing"
            let instance = self.get(id).await?;
            return Err(AppError::Conflict(format!(
                "Book instance {} is {}",
                id, instance.status
            )));
        }
        Ok(())
    }

    async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<BookInstance> {
        sqlx::query_as::<_, BookInstance>(
            r#"
            UPDATE book_instances SET due_back = $2
            WHERE id = $1
            RETURNING id, book_id, imprint, due_back, status, borrower_id, language_id
            "#,
        )
        .bind(id)
        .bind(due_back)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    async fn check_out(&self, id: Uuid, borrower_id: i32, due_back: NaiveDate) -> AppResult<Option<BookInstance>> {
        let instance = sqlx::query_as::<_, BookInstance>(
            r#"
            UPDATE book_instances SET status = 'o', borrower_id = $2, due_back = $3
            WHERE id = $1 AND status = 'a'
            RETURNING id, book_id, imprint, due_back, status, borrower_id, language_id
            "#,
        )
        .bind(id)
        .bind(borrower_id)
        .bind(due_back)
        .fetch_optional(&self.pool)
        .await?;

        Ok(instance)
    }

    async fn check_in(&self, id: Uuid) -> AppResult<Option<BookInstance>> {
        let instance = sqlx::query_as::<_, BookInstance>(
            r#"
            UPDATE book_instances SET status = 'a', borrower_id = NULL, due_back = NULL
            WHERE id = $1 AND status = 'o'
            RETURNING id, book_id, imprint, due_back, status, borrower_id, language_id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(instance)
    }
}
