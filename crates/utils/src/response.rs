use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// JSON envelope returned by every HTTP handler.
#[derive(Debug, Serialize, Deserialize, TS)]
pub struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: &str) -> Self {
        ApiResponse {
            success: false,
            data: None,
            message: Some(message.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_has_no_data() {
        let response = ApiResponse::<u32>::error("boom");
        assert!(!response.is_success());
        assert_eq!(response.message(), Some("boom"));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["data"].is_null());
    }

    #[test]
    fn success_envelope_carries_data() {
        let response = ApiResponse::success(vec![1, 2, 3]);
        assert!(response.is_success());
        assert_eq!(response.into_data(), Some(vec![1, 2, 3]));
    }
}
