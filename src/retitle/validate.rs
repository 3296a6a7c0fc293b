use crate::error::RetitleError;
use crate::store::Store;

/// Why a proposed title cannot be used, if anything.
///
/// `exclude_logical_id` is the item being edited, so it may keep its own title.
pub fn check_title(
    store: &dyn Store,
    title: &str,
    exclude_logical_id: Option<i64>,
) -> Result<(), RetitleError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(RetitleError::EmptyTitle);
    }

    let reserved = store
        .reserved_path_list()
        .map_err(RetitleError::Persistence)?;
    if reserved.iter().any(|r| r.matches(title)) {
        return Err(RetitleError::ReservedTitle(title.to_string()));
    }

    match store.content_title_taken(title, exclude_logical_id) {
        Ok(false) => Ok(()),
        Ok(true) => Err(RetitleError::DuplicateTitle(title.to_string())),
        Err(e) => Err(RetitleError::Persistence(e)),
    }
}

/// Fails closed: a store error counts as invalid.
pub fn validate_title(store: &dyn Store, title: &str, exclude_logical_id: Option<i64>) -> bool {
    check_title(store, title, exclude_logical_id).is_ok()
}
