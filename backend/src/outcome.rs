//! Success/failure envelope returned by every API endpoint.
//!
//! On the wire an outcome looks like
//! `{"isSuccess":true,"value":{...},"errors":[]}`; `value` is omitted when
//! there is none (failures and empty successes).

use serde::{Deserialize, Serialize};

use crate::services::{ServiceError, ServiceResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome<T = ()> {
    pub is_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl<T> Outcome<T> {
    pub fn success(value: T) -> Self {
        Self {
            is_success: true,
            value: Some(value),
            errors: Vec::new(),
        }
    }

    /// Success without a payload (e.g. after a delete).
    pub fn success_empty() -> Self {
        Self {
            is_success: true,
            value: None,
            errors: Vec::new(),
        }
    }

    pub fn failure(errors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            is_success: false,
            value: None,
            errors: errors.into_iter().map(Into::into).collect(),
        }
    }

    pub fn failure_message(message: impl Into<String>) -> Self {
        Self::failure([message.into()])
    }

    pub fn from_result(result: ServiceResult<T>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(err) => Self::from_error(&err),
        }
    }

    pub fn from_error(err: &ServiceError) -> Self {
        Self::failure(err.messages().iter().cloned())
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            is_success: self.is_success,
            value: self.value.map(f),
            errors: self.errors,
        }
    }

    /// First error message, if any.
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }

    /// Convert back into a plain result. A success without a value is an
    /// error here; use [`Outcome::is_success`] for empty successes.
    pub fn into_result(self) -> Result<T, Vec<String>> {
        match (self.is_success, self.value) {
            (true, Some(value)) => Ok(value),
            (true, None) => Err(vec!["Outcome has no value".to_string()]),
            (false, _) => Err(self.errors),
        }
    }
}

impl<T> From<ServiceResult<T>> for Outcome<T> {
    fn from(result: ServiceResult<T>) -> Self {
        Outcome::from_result(result)
    }
}
