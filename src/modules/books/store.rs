use bookshelf_db::Database;
use sqlx::{QueryBuilder, Sqlite};

use super::models::{Book, BookChanges, NewBook, Page, SearchFilter};

const BOOK_COLUMNS: &str = "id, title, author, year";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Book with id {0} is not found")]
    NotFound(i64),

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

/// Keyed storage for [`Book`] records in the `books` table.
///
/// Each call checks a connection out of the pool and returns it on every
/// exit path.
#[derive(Clone)]
pub struct BookStore {
    db: Database,
}

impl BookStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, book: NewBook) -> Result<Book, StoreError> {
        let created = sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO books (title, author, year) VALUES (?, ?, ?) RETURNING {BOOK_COLUMNS}"
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.year)
        .fetch_one(self.db.pool())
        .await?;

        tracing::debug!(id = created.id, "book created");
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> Result<Book, StoreError> {
        sqlx::query_as::<_, Book>(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    /// One page in id order
    pub async fn list(&self, page: Page) -> Result<Vec<Book>, StoreError> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books ORDER BY id LIMIT ? OFFSET ?"
        ))
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(self.db.pool())
        .await?;
        Ok(books)
    }

    /// `instr` keeps text matching case-sensitive, unlike SQLite's `LIKE`.
    pub async fn search(&self, filter: &SearchFilter) -> Result<Vec<Book>, StoreError> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {BOOK_COLUMNS} FROM books WHERE 1 = 1"));

        if let Some(title) = &filter.title {
            query.push(" AND instr(title, ").push_bind(title).push(") > 0");
        }
        if let Some(author) = &filter.author {
            query.push(" AND instr(author, ").push_bind(author).push(") > 0");
        }
        if let Some(year) = filter.year {
            query.push(" AND year = ").push_bind(year);
        }
        query.push(" ORDER BY id");

        let books = query
            .build_query_as::<Book>()
            .fetch_all(self.db.pool())
            .await?;
        Ok(books)
    }

    /// Patch the supplied fields in a single `UPDATE`, so the write lock is
    /// taken by the first statement and concurrent writers queue on SQLite's
    /// busy handler instead of failing a lock upgrade.
    pub async fn update(&self, id: i64, changes: BookChanges) -> Result<Book, StoreError> {
        if changes.is_empty() {
            return self.get(id).await;
        }

        let updated = sqlx::query_as::<_, Book>(&format!(
            "UPDATE books SET \
                title = COALESCE(?, title), \
                author = COALESCE(?, author), \
                year = CASE WHEN ? THEN ? ELSE year END \
             WHERE id = ? RETURNING {BOOK_COLUMNS}"
        ))
        .bind(changes.title.as_deref())
        .bind(changes.author.as_deref())
        .bind(changes.year.is_some())
        .bind(changes.year.flatten())
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(StoreError::NotFound(id))?;

        tracing::debug!(id, "book updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        tracing::debug!(id, "book deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::migrations;
    use bookshelf_kernel::settings::DatabaseSettings;

    async fn store() -> BookStore {
        let db = Database::in_memory().await.unwrap();
        let pending: Vec<(String, bookshelf_kernel::Migration)> = migrations()
            .into_iter()
            .map(|m| ("books".to_string(), m))
            .collect();
        db.apply_migrations(&pending).await.unwrap();
        BookStore::new(db)
    }

    fn new_book(title: &str, author: &str, year: Option<i32>) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: author.to_string(),
            year,
        }
    }

    #[tokio::test]
    async fn create_assigns_fresh_ids() {
        let store = store().await;
        let first = store.create(new_book("Dune", "Frank Herbert", Some(1965))).await.unwrap();
        let second = store.create(new_book("Emma", "Jane Austen", None)).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.get(first.id).await.unwrap(), first);
        assert_eq!(second.year, None);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = store().await;
        let first = store.create(new_book("A", "B", None)).await.unwrap();
        store.delete(first.id).await.unwrap();
        let second = store.create(new_book("C", "D", None)).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let store = store().await;
        assert!(matches!(store.get(42).await, Err(StoreError::NotFound(42))));
        assert!(matches!(
            store.update(42, BookChanges::default()).await,
            Err(StoreError::NotFound(42))
        ));
        assert!(matches!(store.delete(42).await, Err(StoreError::NotFound(42))));
    }

    #[tokio::test]
    async fn pages_do_not_overlap() {
        let store = store().await;
        for title in ["One", "Two", "Three"] {
            store.create(new_book(title, "Author", None)).await.unwrap();
        }

        let first = store.list(Page { skip: 0, limit: 1 }).await.unwrap();
        let second = store.list(Page { skip: 1, limit: 1 }).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert!(first[0].id < second[0].id);

        let past_end = store.list(Page { skip: 10, limit: 5 }).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn search_is_case_sensitive_and_anded() {
        let store = store().await;
        store.create(new_book("Dune", "Frank Herbert", Some(1965))).await.unwrap();
        store.create(new_book("Dune Messiah", "Frank Herbert", Some(1969))).await.unwrap();
        store.create(new_book("dune lowercase", "Someone", Some(1965))).await.unwrap();

        let all = store.search(&SearchFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let dune = store
            .search(&SearchFilter {
                title: Some("Dune".to_string()),
                ..SearchFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(dune.len(), 2);
        assert!(dune.iter().all(|b| b.title.contains("Dune")));

        let narrowed = store
            .search(&SearchFilter {
                title: Some("Dune".to_string()),
                author: Some("Herbert".to_string()),
                year: Some(1965),
            })
            .await
            .unwrap();
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].title, "Dune");
    }

    #[tokio::test]
    async fn update_touches_only_supplied_fields() {
        let store = store().await;
        let book = store.create(new_book("Dune", "Frank Herbert", Some(1965))).await.unwrap();

        let updated = store
            .update(
                book.id,
                BookChanges {
                    year: Some(Some(1999)),
                    ..BookChanges::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Dune");
        assert_eq!(updated.author, "Frank Herbert");
        assert_eq!(updated.year, Some(1999));
        assert_eq!(store.get(book.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn update_clears_year_and_keeps_absent_fields() {
        let store = store().await;
        let book = store.create(new_book("Dune", "Frank Herbert", Some(1965))).await.unwrap();

        let retitled = store
            .update(
                book.id,
                BookChanges {
                    title: Some("Dune Messiah".to_string()),
                    ..BookChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(retitled.title, "Dune Messiah");
        assert_eq!(retitled.year, Some(1965));

        let cleared = store
            .update(
                book.id,
                BookChanges {
                    year: Some(None),
                    ..BookChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.title, "Dune Messiah");
        assert_eq!(cleared.year, None);

        let unchanged = store.update(book.id, BookChanges::default()).await.unwrap();
        assert_eq!(unchanged, cleared);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writes_on_file_database_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(&DatabaseSettings {
            url: format!("sqlite://{}", dir.path().join("books.db").display()),
            ..DatabaseSettings::default()
        })
        .await
        .unwrap();
        let pending: Vec<(String, bookshelf_kernel::Migration)> = migrations()
            .into_iter()
            .map(|m| ("books".to_string(), m))
            .collect();
        db.apply_migrations(&pending).await.unwrap();
        let store = BookStore::new(db.clone());

        let mut ids = Vec::new();
        for n in 0..5 {
            let book = store.create(new_book(&format!("Book {n}"), "Author", None)).await.unwrap();
            ids.push(book.id);
        }

        let mut tasks = Vec::new();
        for n in 0..200 {
            let store = store.clone();
            let id = ids[n % ids.len()];
            let year = 1800 + n as i32;
            tasks.push(tokio::spawn(async move {
                if n % 10 == 0 {
                    store
                        .create(new_book("Extra", "Author", Some(year)))
                        .await
                        .map(|_| ())
                } else {
                    store
                        .update(
                            id,
                            BookChanges {
                                year: Some(Some(year)),
                                ..BookChanges::default()
                            },
                        )
                        .await
                        .map(|_| ())
                }
            }));
        }

        let mut failures = 0;
        for task in tasks {
            if task.await.unwrap().is_err() {
                failures += 1;
            }
        }
        assert_eq!(failures, 0);

        for id in ids {
            let book = store.get(id).await.unwrap();
            let year = book.year.unwrap();
            assert!((1800..2000).contains(&year));
        }
        assert_eq!(store.list(Page { skip: 0, limit: 1000 }).await.unwrap().len(), 25);
        db.close().await;
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let store = store().await;
        let book = store.create(new_book("Dune", "Frank Herbert", None)).await.unwrap();
        store.delete(book.id).await.unwrap();
        assert!(matches!(store.get(book.id).await, Err(StoreError::NotFound(_))));
    }
}
