//! In-memory catalog store
//!
//! Mirrors the PostgreSQL repositories (ordering, filtering, deletion rules)
//! behind a single lock. Used by the test-suite and by the `memory` storage
//! backend.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{
    AuthorFilter, AuthorStore, BookFilter, BookInstanceStore, BookStore, BorrowerStore, GenreStore,
    LanguageStore,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorInput},
        book::{Book, BookInput, BookSummary},
        book_instance::{
            BookInstance, BookInstanceDetails, BookInstanceInput, InstanceFilter, InstanceOrder, LoanStatus,
        },
        genre::{Genre, GenreInput},
        language::{Language, LanguageInput},
        pagination::Pagination,
        user::Borrower,
    },
};

#[derive(Debug, Clone)]
struct StoredBook {
    id: i32,
    title: String,
    author_id: i32,
    summary: String,
    isbn: String,
    genre_ids: BTreeSet<i32>,
}

#[derive(Default)]
struct Tables {
    sequence: i32,
    authors: BTreeMap<i32, Author>,
    books: BTreeMap<i32, StoredBook>,
    genres: BTreeMap<i32, Genre>,
    languages: BTreeMap<i32, Language>,
    instances: HashMap<Uuid, BookInstance>,
    borrowers: BTreeMap<i32, Borrower>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.sequence += 1;
        self.sequence
    }

    fn author(&self, id: i32) -> AppResult<&Author> {
        self.authors
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    fn instance(&self, id: Uuid) -> AppResult<&BookInstance> {
        self.instances
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    fn genres_of(&self, book: &StoredBook) -> Vec<Genre> {
        let mut genres: Vec<Genre> = book
            .genre_ids
            .iter()
            .filter_map(|id| self.genres.get(id).cloned())
            .collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        genres
    }

    fn book(&self, id: i32) -> AppResult<Book> {
        let stored = self
            .books
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        Ok(Book {
            id: stored.id,
            title: stored.title.clone(),
            author_id: stored.author_id,
            summary: stored.summary.clone(),
            isbn: stored.isbn.clone(),
            genres: self.genres_of(stored),
        })
    }

    fn book_matches(&self, book: &StoredBook, filter: &BookFilter) -> bool {
        filter
            .title_contains
            .as_ref()
            .map_or(true, |t| book.title.to_lowercase().contains(&t.to_lowercase()))
            && filter.author_id.map_or(true, |a| book.author_id == a)
            && filter.genre_id.map_or(true, |g| book.genre_ids.contains(&g))
    }

    fn details(&self, instance: &BookInstance) -> BookInstanceDetails {
        BookInstanceDetails {
            id: instance.id,
            book_id: instance.book_id,
            book_title: self
                .books
                .get(&instance.book_id)
                .map(|b| b.title.clone())
                .unwrap_or_default(),
            imprint: instance.imprint.clone(),
            due_back: instance.due_back,
            status: instance.status,
            language: instance
                .language_id
                .and_then(|id| self.languages.get(&id))
                .map(|l| l.name.clone()),
            borrower: instance
                .borrower_id
                .and_then(|id| self.borrowers.get(&id))
                .cloned(),
            is_overdue: false,
        }
    }
}

fn author_matches(author: &Author, filter: &AuthorFilter) -> bool {
    filter.name_contains.as_ref().map_or(true, |name| {
        let name = name.to_lowercase();
        author.first_name.to_lowercase().contains(&name) || author.last_name.to_lowercase().contains(&name)
    })
}

/// `None` sorts after every value, like `NULLS LAST`
fn cmp_nulls_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn name_taken<'a>(mut names: impl Iterator<Item = &'a str>, name: &str) -> bool {
    names.any(|existing| existing.eq_ignore_ascii_case(name))
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

#[async_trait]
impl AuthorStore for InMemoryStore {
    async fn count(&self, filter: &AuthorFilter) -> AppResult<i64> {
        let tables = self.tables.read();
        Ok(tables.authors.values().filter(|a| author_matches(a, filter)).count() as i64)
    }

    async fn list(&self, filter: &AuthorFilter, page: Pagination) -> AppResult<(Vec<Author>, i64)> {
        let tables = self.tables.read();
        let mut authors: Vec<Author> = tables
            .authors
            .values()
            .filter(|a| author_matches(a, filter))
            .cloned()
            .collect();
        authors.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
                .then(a.id.cmp(&b.id))
        });
        let total = authors.len() as i64;
        Ok((page.apply(authors), total))
    }

    async fn get(&self, id: i32) -> AppResult<Author> {
        self.tables.read().author(id).cloned()
    }

    async fn create(&self, input: &AuthorInput) -> AppResult<Author> {
        let mut tables = self.tables.write();
        let author = Author {
            id: tables.next_id(),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            date_of_birth: input.date_of_birth,
            date_of_death: input.date_of_death,
        };
        tables.authors.insert(author.id, author.clone());
        Ok(author)
    }

    async fn update(&self, id: i32, input: &AuthorInput) -> AppResult<Author> {
        let mut tables = self.tables.write();
        let author = tables
            .authors
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))?;
        author.first_name = input.first_name.clone();
        author.last_name = input.last_name.clone();
        author.date_of_birth = input.date_of_birth;
        author.date_of_death = input.date_of_death;
        Ok(author.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.write();
        let books = tables.books.values().filter(|b| b.author_id == id).count();
        if books > 0 {
            return Err(AppError::Conflict(format!(
                "Author {} still has {} book(s)",
                id, books
            )));
        }
        tables
            .authors
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }
}

#[async_trait]
impl BookStore for InMemoryStore {
    async fn count(&self, filter: &BookFilter) -> AppResult<i64> {
        let tables = self.tables.read();
        Ok(tables.books.values().filter(|b| tables.book_matches(b, filter)).count() as i64)
    }

    async fn list(&self, filter: &BookFilter, page: Pagination) -> AppResult<(Vec<BookSummary>, i64)> {
        let tables = self.tables.read();
        let mut books: Vec<&StoredBook> = tables
            .books
            .values()
            .filter(|b| tables.book_matches(b, filter))
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        let total = books.len() as i64;

        let summaries = page
            .apply(books)
            .into_iter()
            .map(|stored| {
                let book = tables.book(stored.id)?;
                let author = tables.author(stored.author_id)?;
                Ok(BookSummary::new(&book, author))
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok((summaries, total))
    }

    async fn get(&self, id: i32) -> AppResult<Book> {
        self.tables.read().book(id)
    }

    async fn create(&self, input: &BookInput) -> AppResult<Book> {
        let mut tables = self.tables.write();
        let id = tables.next_id();
        let genre_ids = input
            .genre_ids
            .iter()
            .copied()
            .filter(|g| tables.genres.contains_key(g))
            .collect();
        tables.books.insert(
            id,
            StoredBook {
                id,
                title: input.title.clone(),
                author_id: input.author_id,
                summary: input.summary.clone(),
                isbn: input.isbn.clone(),
                genre_ids,
            },
        );
        tables.book(id)
    }

    async fn update(&self, id: i32, input: &BookInput) -> AppResult<Book> {
        let mut tables = self.tables.write();
        let genre_ids: BTreeSet<i32> = input
            .genre_ids
            .iter()
            .copied()
            .filter(|g| tables.genres.contains_key(g))
            .collect();
        let stored = tables
            .books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        stored.title = input.title.clone();
        stored.author_id = input.author_id;
        stored.summary = input.summary.clone();
        stored.isbn = input.isbn.clone();
        stored.genre_ids = genre_ids;
        tables.book(id)
    }

    async fn delete(&self, id: i32, cascade: bool) -> AppResult<()> {
        let mut tables = self.tables.write();
        if !tables.books.contains_key(&id) {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        let copies: Vec<&BookInstance> = tables.instances.values().filter(|i| i.book_id == id).collect();
        let on_loan = copies.iter().filter(|i| i.status == LoanStatus::OnLoan).count();

        if !copies.is_empty() && !cascade {
            return Err(AppError::Conflict(format!(
                "Book {} still has {} copy(ies); pass force=true to delete them too",
                id,
                copies.len()
            )));
        }
        if on_loan > 0 {
            return Err(AppError::Conflict(format!(
                "Book {} has {} copy(ies) on loan",
                id, on_loan
            )));
        }

        tables.instances.retain(|_, i| i.book_id != id);
        tables.books.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl GenreStore for InMemoryStore {
    async fn count(&self) -> AppResult<i64> {
        Ok(self.tables.read().genres.len() as i64)
    }

    async fn list(&self) -> AppResult<Vec<Genre>> {
        let mut genres: Vec<Genre> = self.tables.read().genres.values().cloned().collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(genres)
    }

    async fn get(&self, id: i32) -> AppResult<Genre> {
        self.tables
            .read()
            .genres
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))
    }

    async fn create(&self, input: &GenreInput) -> AppResult<Genre> {
        let mut tables = self.tables.write();
        let name = input.name.trim();
        if name_taken(tables.genres.values().map(|g| g.name.as_str()), name) {
            return Err(AppError::Conflict(format!("Genre '{}' already exists", name)));
        }
        let genre = Genre {
            id: tables.next_id(),
            name: name.to_string(),
        };
        tables.genres.insert(genre.id, genre.clone());
        Ok(genre)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.write();
        tables
            .genres
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))?;
        for book in tables.books.values_mut() {
            book.genre_ids.remove(&id);
        }
        Ok(())
    }
}

#[async_trait]
impl LanguageStore for InMemoryStore {
    async fn list(&self) -> AppResult<Vec<Language>> {
        let mut languages: Vec<Language> = self.tables.read().languages.values().cloned().collect();
        languages.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(languages)
    }

    async fn get(&self, id: i32) -> AppResult<Language> {
        self.tables
            .read()
            .languages
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Language with id {} not found", id)))
    }

    async fn create(&self, input: &LanguageInput) -> AppResult<Language> {
        let mut tables = self.tables.write();
        let name = input.name.trim();
        if name_taken(tables.languages.values().map(|l| l.name.as_str()), name) {
            return Err(AppError::Conflict(format!("Language '{}' already exists", name)));
        }
        let language = Language {
            id: tables.next_id(),
            name: name.to_string(),
        };
        tables.languages.insert(language.id, language.clone());
        Ok(language)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.write();
        tables
            .languages
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Language with id {} not found", id)))?;
        for instance in tables.instances.values_mut() {
            if instance.language_id == Some(id) {
                instance.language_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BookInstanceStore for InMemoryStore {
    async fn count(&self, filter: &InstanceFilter) -> AppResult<i64> {
        let tables = self.tables.read();
        Ok(tables.instances.values().filter(|i| filter.matches(i)).count() as i64)
    }

    async fn list(
        &self,
        filter: &InstanceFilter,
        order: InstanceOrder,
        page: Pagination,
    ) -> AppResult<(Vec<BookInstanceDetails>, i64)> {
        let tables = self.tables.read();
        let mut details: Vec<BookInstanceDetails> = tables
            .instances
            .values()
            .filter(|i| filter.matches(i))
            .map(|i| tables.details(i))
            .collect();

        details.sort_by(|a, b| {
            let by_due = cmp_nulls_last(a.due_back, b.due_back);
            let by_borrower = match order {
                InstanceOrder::DueBack => Ordering::Equal,
                InstanceOrder::DueBackThenBorrower => cmp_nulls_last(
                    a.borrower.as_ref().map(|u| u.last_name.as_str()),
                    b.borrower.as_ref().map(|u| u.last_name.as_str()),
                ),
            };
            by_due.then(by_borrower).then(a.id.cmp(&b.id))
        });

        let total = details.len() as i64;
        Ok((page.apply(details), total))
    }

    async fn get(&self, id: Uuid) -> AppResult<BookInstance> {
        self.tables.read().instance(id).cloned()
    }

    async fn get_details(&self, id: Uuid) -> AppResult<BookInstanceDetails> {
        let tables = self.tables.read();
        let instance = tables.instance(id)?;
        Ok(tables.details(instance))
    }

    async fn create(&self, input: &BookInstanceInput) -> AppResult<BookInstance> {
        let instance = BookInstance {
            id: Uuid::new_v4(),
            book_id: input.book_id,
            imprint: input.imprint.clone(),
            due_back: input.due_back,
            status: input.status,
            borrower_id: input.borrower_id,
            language_id: input.language_id,
        };
        self.tables.write().instances.insert(instance.id, instance.clone());
        Ok(instance)
    }

    async fn update(&self, id: Uuid, input: &BookInstanceInput) -> AppResult<BookInstance> {
        let mut tables = self.tables.write();
        let instance = tables
            .instances
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))?;
        instance.book_id = input.book_id;
        instance.imprint = input.imprint.clone();
        instance.due_back = input.due_back;
        instance.status = input.status;
        instance.borrower_id = input.borrower_id;
        instance.language_id = input.language_id;
        Ok(instance.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write();
        let status = tables.instance(id)?.status;
        if status == LoanStatus::OnLoan {
            return Err(AppError::Conflict(format!("Book instance {} is {}", id, status)));
        }
        tables.instances.remove(&id);
        Ok(())
    }

    async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<BookInstance> {
        let mut tables = self.tables.write();
        let instance = tables
            .instances
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))?;
        instance.due_back = Some(due_back);
        Ok(instance.clone())
    }

    async fn check_out(&self, id: Uuid, borrower_id: i32, due_back: NaiveDate) -> AppResult<Option<BookInstance>> {
        let mut tables = self.tables.write();
        match tables.instances.get_mut(&id) {
            Some(instance) if instance.status == LoanStatus::Available => {
                instance.status = LoanStatus::OnLoan;
                instance.borrower_id = Some(borrower_id);
                instance.due_back = Some(due_back);
                Ok(Some(instance.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn check_in(&self, id: Uuid) -> AppResult<Option<BookInstance>> {
        let mut tables = self.tables.write();
        match tables.instances.get_mut(&id) {
            Some(instance) if instance.status == LoanStatus::OnLoan => {
                instance.status = LoanStatus::Available;
                instance.borrower_id = None;
                instance.due_back = None;
                Ok(Some(instance.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl BorrowerStore for InMemoryStore {
    async fn get(&self, id: i32) -> AppResult<Borrower> {
        self.tables
            .read()
            .borrowers
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn create(&self, login: &str, first_name: &str, last_name: &str) -> AppResult<Borrower> {
        let mut tables = self.tables.write();
        if name_taken(tables.borrowers.values().map(|b| b.login.as_str()), login) {
            return Err(AppError::Conflict(format!("Login '{}' already exists", login)));
        }
        let borrower = Borrower {
            id: tables.next_id(),
            login: login.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };
        tables.borrowers.insert(borrower.id, borrower.clone());
        Ok(borrower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Repository;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    async fn seed_book(repo: &Repository, title: &str, genres: Vec<i32>) -> Book {
        let author = repo
            .authors
            .create(&AuthorInput {
                first_name: "Iain".into(),
                last_name: "Banks".into(),
                date_of_birth: None,
                date_of_death: None,
            })
            .await
            .unwrap();
        repo.books
            .create(&BookInput {
                title: title.into(),
                author_id: author.id,
                summary: String::new(),
                isbn: "9780316005388".into(),
                genre_ids: genres,
            })
            .await
            .unwrap()
    }

    async fn seed_copy(repo: &Repository, book_id: i32, status: LoanStatus, due: Option<NaiveDate>, borrower: Option<i32>) -> BookInstance {
        repo.instances
            .create(&BookInstanceInput {
                book_id,
                imprint: "Orbit".into(),
                due_back: due,
                status,
                borrower_id: borrower,
                language_id: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn title_filter_is_case_insensitive_and_paged() {
        let repo = Repository::in_memory();
        seed_book(&repo, "Consider Phlebas", vec![]).await;
        seed_book(&repo, "The Player of Games", vec![]).await;
        seed_book(&repo, "Use of Weapons", vec![]).await;

        let filter = BookFilter {
            title_contains: Some("OF".into()),
            ..BookFilter::default()
        };
        assert_eq!(repo.books.count(&filter).await.unwrap(), 2);

        let (page, total) = repo.books.list(&filter, Pagination::new(Some(2), Some(1))).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "Use of Weapons");
        assert_eq!(page[0].author_name, "Banks, Iain");
    }

    #[tokio::test]
    async fn duplicate_genre_names_conflict() {
        let repo = Repository::in_memory();
        repo.genres.create(&GenreInput { name: "Fantasy".into() }).await.unwrap();
        let dup = repo.genres.create(&GenreInput { name: " fantasy ".into() }).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn deleting_genre_unlinks_books() {
        let repo = Repository::in_memory();
        let sf = repo.genres.create(&GenreInput { name: "Science Fiction".into() }).await.unwrap();
        let book = seed_book(&repo, "Excession", vec![sf.id]).await;
        assert_eq!(book.genres, vec![sf.clone()]);

        repo.genres.delete(sf.id).await.unwrap();
        assert!(repo.books.get(book.id).await.unwrap().genres.is_empty());
    }

    #[tokio::test]
    async fn author_with_books_cannot_be_deleted() {
        let repo = Repository::in_memory();
        let book = seed_book(&repo, "Feersum Endjinn", vec![]).await;
        let result = repo.authors.delete(book.author_id).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        repo.books.delete(book.id, false).await.unwrap();
        repo.authors.delete(book.author_id).await.unwrap();
        assert!(matches!(repo.authors.get(book.author_id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn book_delete_needs_force_when_copies_exist() {
        let repo = Repository::in_memory();
        let book = seed_book(&repo, "Inversions", vec![]).await;
        seed_copy(&repo, book.id, LoanStatus::Available, None, None).await;

        assert!(matches!(repo.books.delete(book.id, false).await, Err(AppError::Conflict(_))));
        repo.books.delete(book.id, true).await.unwrap();
        assert_eq!(repo.instances.count(&InstanceFilter::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn forced_book_delete_refuses_copies_on_loan() {
        let repo = Repository::in_memory();
        let book = seed_book(&repo, "Matter", vec![]).await;
        let patron = repo.borrowers.create("patron", "Pat", "Ron").await.unwrap();
        seed_copy(&repo, book.id, LoanStatus::OnLoan, Some(day(5)), Some(patron.id)).await;

        assert!(matches!(repo.books.delete(book.id, true).await, Err(AppError::Conflict(_))));
        assert!(repo.books.get(book.id).await.is_ok());
    }

    #[tokio::test]
    async fn instances_order_by_due_date_then_borrower() {
        let repo = Repository::in_memory();
        let book = seed_book(&repo, "Surface Detail", vec![]).await;
        let zed = repo.borrowers.create("zed", "Zed", "Zimmer").await.unwrap();
        let amy = repo.borrowers.create("amy", "Amy", "Adams").await.unwrap();

        seed_copy(&repo, book.id, LoanStatus::OnLoan, Some(day(9)), Some(amy.id)).await;
        seed_copy(&repo, book.id, LoanStatus::OnLoan, Some(day(3)), Some(zed.id)).await;
        seed_copy(&repo, book.id, LoanStatus::OnLoan, Some(day(3)), Some(amy.id)).await;
        seed_copy(&repo, book.id, LoanStatus::Available, None, None).await;

        let (loans, total) = repo
            .instances
            .list(&InstanceFilter::on_loan(), InstanceOrder::DueBackThenBorrower, Pagination::default())
            .await
            .unwrap();

        assert_eq!(total, 3);
        let order: Vec<(NaiveDate, &str)> = loans
            .iter()
            .map(|l| (l.due_back.unwrap(), l.borrower.as_ref().unwrap().last_name.as_str()))
            .collect();
        assert_eq!(order, vec![(day(3), "Adams"), (day(3), "Zimmer"), (day(9), "Adams")]);
    }

    #[tokio::test]
    async fn check_out_only_from_available() {
        let repo = Repository::in_memory();
        let book = seed_book(&repo, "Transition", vec![]).await;
        let patron = repo.borrowers.create("patron", "Pat", "Ron").await.unwrap();
        let copy = seed_copy(&repo, book.id, LoanStatus::Maintenance, None, None).await;

        assert!(repo.instances.check_out(copy.id, patron.id, day(20)).await.unwrap().is_none());

        let mut input = BookInstanceInput {
            book_id: book.id,
            imprint: copy.imprint.clone(),
            due_back: None,
            status: LoanStatus::Available,
            borrower_id: None,
            language_id: None,
        };
        repo.instances.update(copy.id, &input).await.unwrap();

        let lent = repo.instances.check_out(copy.id, patron.id, day(20)).await.unwrap().unwrap();
        assert_eq!(lent.status, LoanStatus::OnLoan);
        assert_eq!(lent.borrower_id, Some(patron.id));
        assert!(repo.instances.check_out(copy.id, patron.id, day(21)).await.unwrap().is_none());

        let back = repo.instances.check_in(copy.id).await.unwrap().unwrap();
        assert_eq!(back.status, LoanStatus::Available);
        assert_eq!(back.due_back, None);
        assert_eq!(back.borrower_id, None);

        input.status = LoanStatus::Reserved;
        repo.instances.update(copy.id, &input).await.unwrap();
        assert!(repo.instances.check_in(copy.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_language_clears_copies() {
        let repo = Repository::in_memory();
        let book = seed_book(&repo, "Walking on Glass", vec![]).await;
        let english = repo.languages.create(&LanguageInput { name: "English".into() }).await.unwrap();
        let copy = repo
            .instances
            .create(&BookInstanceInput {
                book_id: book.id,
                imprint: "Macmillan".into(),
                due_back: None,
                status: LoanStatus::Available,
                borrower_id: None,
                language_id: Some(english.id),
            })
            .await
            .unwrap();
        assert_eq!(
            repo.instances.get_details(copy.id).await.unwrap().language.as_deref(),
            Some("English")
        );

        repo.languages.delete(english.id).await.unwrap();
        assert_eq!(repo.instances.get(copy.id).await.unwrap().language_id, None);
    }
}
