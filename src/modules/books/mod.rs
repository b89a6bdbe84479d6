pub mod models;
pub mod routes;
pub mod store;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_db::Database;
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use store::BookStore;
use validation::{AUTHOR_MAX_CHARS, MAX_LIMIT, TITLE_MAX_CHARS};

/// Book collection: CRUD and search over the `books` table
pub struct BooksModule {
    store: BookStore,
}

impl BooksModule {
    pub fn new(store: BookStore) -> Self {
        Self { store }
    }
}

/// Schema for the `books` table
pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_init",
        up: r#"
            CREATE TABLE IF NOT EXISTS books (
                id     INTEGER PRIMARY KEY AUTOINCREMENT,
                title  TEXT    NOT NULL CHECK (length(trim(title)) > 0),
                author TEXT    NOT NULL CHECK (length(trim(author)) > 0),
                year   INTEGER
            );
            CREATE INDEX IF NOT EXISTS ix_books_title ON books (title);
            "#,
    }]
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.store.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error_response = json!({
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                }
            }
        });
        let with_description = |description: &str| {
            let mut response = error_response.clone();
            response["description"] = json!(description);
            response
        };
        let book = json!({
            "description": "Book",
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/Book" }
                }
            }
        });
        let book_list = json!({
            "description": "List of books",
            "content": {
                "application/json": {
                    "schema": {
                        "type": "array",
                        "items": { "$ref": "#/components/schemas/Book" }
                    }
                }
            }
        });
        let book_id = json!({
            "name": "book_id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer", "format": "int64" }
        });
        let query = |name: &str, schema: serde_json::Value, description: &str| {
            json!({
                "name": name,
                "in": "query",
                "required": false,
                "description": description,
                "schema": schema
            })
        };

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "API information",
                        "tags": ["Books"],
                        "responses": { "200": { "description": "Service metadata" } }
                    }
                },
                "/books/": {
                    "get": {
                        "summary": "Get all books",
                        "tags": ["Books"],
                        "parameters": [
                            query("skip", json!({ "type": "integer", "minimum": 0, "default": 0 }), "Entries skipped"),
                            query("limit", json!({ "type": "integer", "minimum": 1, "maximum": MAX_LIMIT, "default": 100 }), "Entries returned")
                        ],
                        "responses": {
                            "200": book_list.clone(),
                            "422": with_description("Invalid pagination")
                        }
                    },
                    "post": {
                        "summary": "Add new book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookCreate" }
                                }
                            }
                        },
                        "responses": {
                            "200": book.clone(),
                            "422": with_description("Validation error")
                        }
                    }
                },
                "/books/search/": {
                    "get": {
                        "summary": "Book search",
                        "tags": ["Books"],
                        "parameters": [
                            query("title", json!({ "type": "string" }), "Title search (case-sensitive partial match)"),
                            query("author", json!({ "type": "string" }), "Author search (case-sensitive partial match)"),
                            query("year", json!({ "type": "integer", "minimum": 0, "maximum": 9999 }), "Publication year")
                        ],
                        "responses": {
                            "200": book_list,
                            "422": with_description("Invalid year filter")
                        }
                    }
                },
                "/books/{book_id}": {
                    "get": {
                        "summary": "Get book by id",
                        "tags": ["Books"],
                        "parameters": [book_id.clone()],
                        "responses": {
                            "200": book.clone(),
                            "404": with_description("Book not found")
                        }
                    },
                    "put": {
                        "summary": "Update book info",
                        "tags": ["Books"],
                        "parameters": [book_id.clone()],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookUpdate" }
                                }
                            }
                        },
                        "responses": {
                            "200": book,
                            "404": with_description("Book not found"),
                            "422": with_description("Validation error")
                        }
                    },
                    "delete": {
                        "summary": "Delete book",
                        "tags": ["Books"],
                        "parameters": [book_id],
                        "responses": {
                            "200": { "description": "Deletion confirmation" },
                            "404": with_description("Book not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "year": { "type": ["integer", "null"] }
                        },
                        "required": ["id", "title", "author", "year"]
                    },
                    "BookCreate": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "minLength": 1, "maxLength": TITLE_MAX_CHARS },
                            "author": { "type": "string", "minLength": 1, "maxLength": AUTHOR_MAX_CHARS },
                            "year": { "type": ["integer", "null"], "description": "Not later than the current year" }
                        },
                        "required": ["title", "author"]
                    },
                    "BookUpdate": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "minLength": 1, "maxLength": TITLE_MAX_CHARS },
                            "author": { "type": "string", "minLength": 1, "maxLength": AUTHOR_MAX_CHARS },
                            "year": { "type": ["integer", "null"], "description": "null clears the year" }
                        }
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        migrations()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(db: Database) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(BookStore::new(db)))
}
