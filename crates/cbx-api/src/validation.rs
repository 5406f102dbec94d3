//! Input checks shared by the deck, card and training handlers.

use cbx_db::models::Page;

use crate::error::ApiError;

pub const MAX_TITLE_LENGTH: usize = 120;
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;
pub const MAX_CARD_TEXT_LENGTH: usize = 4000;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Trim `title` and check it is neither blank nor too long
///
/// # Examples
/// ```
/// use cbx_api::validation::validate_deck_title;
///
/// assert_eq!(validate_deck_title("  Rust basics ").unwrap(), "Rust basics");
/// assert!(validate_deck_title("   ").is_err());
/// ```
pub fn validate_deck_title(title: &str) -> Result<&str, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Title cannot be empty".to_string()));
    }

    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::Validation(format!(
            "Title must be at most {MAX_TITLE_LENGTH} characters long"
        )));
    }

    Ok(title)
}

pub fn validate_description(description: &str) -> Result<&str, ApiError> {
    let description = description.trim();
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ApiError::Validation(format!(
            "Description must be at most {MAX_DESCRIPTION_LENGTH} characters long"
        )));
    }

    Ok(description)
}

/// Trim one side of a card; `field` names it in the error message
pub fn validate_card_text<'a>(field: &str, text: &'a str) -> Result<&'a str, ApiError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::Validation(format!("{field} cannot be empty")));
    }

    if text.chars().count() > MAX_CARD_TEXT_LENGTH {
        return Err(ApiError::Validation(format!(
            "{field} must be at most {MAX_CARD_TEXT_LENGTH} characters long"
        )));
    }

    Ok(text)
}

pub fn validate_rating(value: i16) -> Result<i16, ApiError> {
    if !(1..=5).contains(&value) {
        return Err(ApiError::Validation(
            "Rating must be between 1 and 5".to_string(),
        ));
    }

    Ok(value)
}

/// Build a [`Page`] from optional query values, capping the page size
pub fn page_from_query(limit: Option<i64>, offset: Option<i64>) -> Result<Page, ApiError> {
    let default = Page::default();
    let limit = limit.unwrap_or(default.limit);
    let offset = offset.unwrap_or(default.offset);

    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(ApiError::Validation(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    if offset < 0 {
        return Err(ApiError::Validation(
            "offset must not be negative".to_string(),
        ));
    }

    Ok(Page { limit, offset })
}
