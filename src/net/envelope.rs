//! The backend's uniform `{ code, data, message }` response wrapper.

#[cfg(test)]
#[path = "envelope_test.rs"]
mod envelope_test;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Result code for a successful call.
pub const SUCCESS_CODE: i32 = 0;
/// Reserved result code meaning "no authenticated session".
pub const NOT_LOGIN_CODE: i32 = 40100;

/// Envelope returned by every JSON endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaseResponse<T> {
    pub code: i32,
    pub data: Option<T>,
    #[serde(default)]
    pub message: String,
}

impl<T> BaseResponse<T> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    #[must_use]
    pub fn is_not_login(&self) -> bool {
        self.code == NOT_LOGIN_CODE
    }

    /// Unwrap the payload, mapping result codes to errors.
    ///
    /// # Errors
    ///
    /// Returns `AuthExpired` for 40100, `Application` for any other non-zero
    /// code, and `EmptyPayload` when a successful envelope has no data.
    pub fn into_result(self) -> Result<T, ApiError> {
        self.into_optional()?.ok_or(ApiError::EmptyPayload)
    }

    /// Like [`BaseResponse::into_result`] but tolerates a missing payload.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-zero result code.
    pub fn into_optional(self) -> Result<Option<T>, ApiError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(ApiError::from_code(self.code, self.message))
        }
    }
}

impl BaseResponse<serde_json::Value> {
    /// Re-type a loosely parsed envelope into the caller's payload type.
    ///
    /// # Errors
    ///
    /// Returns `Decode` when `data` does not match `T`.
    pub fn typed<T: DeserializeOwned>(self) -> Result<BaseResponse<T>, ApiError> {
        let data = match self.data {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => Some(serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))?),
        };
        Ok(BaseResponse { code: self.code, data, message: self.message })
    }
}

/// One page of a paginated listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub current: u64,
    #[serde(default)]
    pub size: u64,
}
