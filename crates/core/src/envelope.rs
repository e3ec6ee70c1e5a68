//! The JSON envelope every API response is wrapped in.

use serde::{Deserialize, Serialize};

use crate::catalog::PageInfo;
use crate::validation::FieldError;

/// `{ success, data?, message?, ... }`.
///
/// Paging fields are only present on list responses and `errors` only on
/// validation failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_next_page: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_prev_page: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl<T> ApiResponse<T> {
    fn empty(success: bool) -> Self {
        Self {
            success,
            data: None,
            message: None,
            count: None,
            total: None,
            page: None,
            total_pages: None,
            has_next_page: None,
            has_prev_page: None,
            errors: Vec::new(),
        }
    }

    /// Successful response carrying `data`.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            ..Self::empty(true)
        }
    }

    /// Successful response carrying `data` and a message.
    #[must_use]
    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    /// Failure with a readable message and optional per-field errors.
    #[must_use]
    pub fn failure(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self {
            message: Some(message.into()),
            errors,
            ..Self::empty(false)
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    /// Successful list response with paging metadata.
    #[must_use]
    pub fn paged(data: Vec<T>, info: PageInfo) -> Self {
        Self {
            count: Some(data.len() as u64),
            total: Some(info.total),
            page: Some(info.page),
            total_pages: Some(info.total_pages),
            has_next_page: Some(info.has_next_page),
            has_prev_page: Some(info.has_prev_page),
            ..Self::ok(data)
        }
    }
}
