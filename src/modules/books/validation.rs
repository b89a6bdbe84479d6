//! Input contracts for the books API.
//!
//! Every check runs before storage is touched; all violations are collected
//! and returned together.

use std::ops::RangeInclusive;

use bookshelf_http::error::FieldError;

use super::models::{
    BookChanges, CreateBook, ListParams, NewBook, Page, SearchFilter, SearchParams, UpdateBook,
};

pub const TITLE_MAX_CHARS: usize = 500;
pub const AUTHOR_MAX_CHARS: usize = 200;
pub const DEFAULT_SKIP: i64 = 0;
pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;
pub const SEARCH_YEAR_RANGE: RangeInclusive<i32> = 0..=9999;

const REQUIRED: &str = "field required";
const NOT_NULL: &str = "may not be null";

/// Unicode whitespace plus the ASCII information separators U+001C..=U+001F,
/// which clients commonly treat as blank.
fn is_blank(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// Length is checked on the submitted value, emptiness on the trimmed one.
fn check_text(
    field: &str,
    value: &str,
    max_chars: usize,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let chars = value.chars().count();
    if chars == 0 {
        errors.push(FieldError::new(field, "must be at least 1 character"));
        return None;
    }
    if chars > max_chars {
        errors.push(FieldError::new(
            field,
            format!("must be at most {max_chars} characters"),
        ));
        return None;
    }

    let trimmed = value.trim_matches(is_blank);
    if trimmed.is_empty() {
        errors.push(FieldError::new(field, "must not be empty or whitespace"));
        return None;
    }
    Some(trimmed.to_string())
}

fn check_year(year: i32, current_year: i32, errors: &mut Vec<FieldError>) -> Option<i32> {
    if year > current_year {
        errors.push(FieldError::new(
            "year",
            format!("must not be later than {current_year}"),
        ));
        return None;
    }
    Some(year)
}

/// Create contract: `title` and `author` required, `year` optional
pub fn validate_create(input: CreateBook, current_year: i32) -> Result<NewBook, Vec<FieldError>> {
    let mut errors = Vec::new();

    let title = match input.title {
        Some(title) => check_text("title", &title, TITLE_MAX_CHARS, &mut errors),
        None => {
            errors.push(FieldError::new("title", REQUIRED));
            None
        }
    };
    let author = match input.author {
        Some(author) => check_text("author", &author, AUTHOR_MAX_CHARS, &mut errors),
        None => {
            errors.push(FieldError::new("author", REQUIRED));
            None
        }
    };
    let year = match input.year {
        Some(year) => check_year(year, current_year, &mut errors).map(Some),
        None => Some(None),
    };

    match (title, author, year) {
        (Some(title), Some(author), Some(year)) if errors.is_empty() => {
            Ok(NewBook { title, author, year })
        }
        _ => Err(errors),
    }
}

/// Update contract: every field optional, supplied ones checked like create
pub fn validate_update(
    input: UpdateBook,
    current_year: i32,
) -> Result<BookChanges, Vec<FieldError>> {
    let mut errors = Vec::new();
    let mut changes = BookChanges::default();

    match input.title {
        Some(Some(title)) => {
            changes.title = check_text("title", &title, TITLE_MAX_CHARS, &mut errors);
        }
        Some(None) => errors.push(FieldError::new("title", NOT_NULL)),
        None => {}
    }

    match input.author {
        Some(Some(author)) => {
            changes.author = check_text("author", &author, AUTHOR_MAX_CHARS, &mut errors);
        }
        Some(None) => errors.push(FieldError::new("author", NOT_NULL)),
        None => {}
    }

    match input.year {
        Some(Some(year)) => {
            changes.year = check_year(year, current_year, &mut errors).map(Some);
        }
        Some(None) => changes.year = Some(None),
        None => {}
    }

    if errors.is_empty() {
        Ok(changes)
    } else {
        Err(errors)
    }
}

/// `skip >= 0`, `1 <= limit <= 1000`, defaults 0/100
pub fn validate_page(params: &ListParams) -> Result<Page, Vec<FieldError>> {
    let mut errors = Vec::new();
    let skip = params.skip.unwrap_or(DEFAULT_SKIP);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

    if skip < 0 {
        errors.push(FieldError::new("skip", "must be greater than or equal to 0"));
    }
    if !(1..=MAX_LIMIT).contains(&limit) {
        errors.push(FieldError::new(
            "limit",
            format!("must be between 1 and {MAX_LIMIT}"),
        ));
    }

    if errors.is_empty() {
        Ok(Page { skip, limit })
    } else {
        Err(errors)
    }
}

/// Empty text filters are dropped; `year` must lie in 0..=9999
pub fn validate_search(params: SearchParams) -> Result<SearchFilter, Vec<FieldError>> {
    if let Some(year) = params.year {
        if !SEARCH_YEAR_RANGE.contains(&year) {
            return Err(vec![FieldError::new(
                "year",
                format!(
                    "must be between {} and {}",
                    SEARCH_YEAR_RANGE.start(),
                    SEARCH_YEAR_RANGE.end()
                ),
            )]);
        }
    }

    Ok(SearchFilter {
        title: params.title.filter(|title| !title.is_empty()),
        author: params.author.filter(|author| !author.is_empty()),
        year: params.year,
    })
}
