//! HTTP handlers for the Books module.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use bookshelf_http::{error::AppError, router::API_VERSION};

use super::models::{Book, CreateBook, DeleteResponse, ListParams, SearchParams, UpdateBook};
use super::store::{BookStore, StoreError};
use super::validation::{validate_create, validate_page, validate_search, validate_update};
use crate::utils;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            err @ StoreError::NotFound(_) => AppError::not_found(err.to_string()),
            StoreError::Database(db_err) => AppError::Internal(
                anyhow::Error::new(db_err).context("book store operation failed"),
            ),
        }
    }
}

/// Routes for `/`, `/books/...`. Collection paths answer with and without
/// the trailing slash.
pub fn router(store: BookStore) -> Router {
    Router::new()
        .route("/", get(api_info))
        .route("/books/", get(list_books).post(create_book))
        .route("/books", get(list_books).post(create_book))
        .route("/books/search/", get(search_books))
        .route("/books/search", get(search_books))
        .route(
            "/books/{book_id}",
            get(read_book).put(update_book).delete(delete_book),
        )
        .with_state(store)
}

/// Static service metadata
async fn api_info() -> Json<Value> {
    Json(json!({
        "message": "Book Collection API",
        "version": API_VERSION,
        "docs": "/swagger-ui",
        "openapi": "/docs/openapi.json",
        "endpoints": {
            "POST /books/": "Add new book",
            "GET /books/": "Get all books",
            "GET /books/{id}": "Get book by id",
            "PUT /books/{id}": "Update book info",
            "DELETE /books/{id}": "Delete book",
            "GET /books/search/": "Book search"
        }
    }))
}

async fn create_book(
    State(store): State<BookStore>,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Json(payload) = payload?;
    let new_book =
        validate_create(payload, utils::current_year()).map_err(AppError::invalid_fields)?;

    let book = store.create(new_book).await?;
    tracing::info!(book_id = book.id, "book added");
    Ok(Json(book))
}

async fn list_books(
    State(store): State<BookStore>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let Query(params) = params?;
    let page = validate_page(&params).map_err(AppError::invalid_fields)?;

    Ok(Json(store.list(page).await?))
}

async fn search_books(
    State(store): State<BookStore>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let Query(params) = params?;
    let filter = validate_search(params).map_err(AppError::invalid_fields)?;

    Ok(Json(store.search(&filter).await?))
}

async fn read_book(
    State(store): State<BookStore>,
    book_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(book_id) = book_id?;
    Ok(Json(store.get(book_id).await?))
}

async fn update_book(
    State(store): State<BookStore>,
    book_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateBook>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(book_id) = book_id?;
    let Json(payload) = payload?;
    let changes =
        validate_update(payload, utils::current_year()).map_err(AppError::invalid_fields)?;

    let book = store.update(book_id, changes).await?;
    tracing::info!(book_id, "book updated");
    Ok(Json(book))
}

async fn delete_book(
    State(store): State<BookStore>,
    book_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteResponse>, AppError> {
    let Path(book_id) = book_id?;
    store.delete(book_id).await?;

    tracing::info!(book_id, "book deleted");
    Ok(Json(DeleteResponse {
        message: format!("Book with id {book_id} successfully deleted"),
    }))
}
