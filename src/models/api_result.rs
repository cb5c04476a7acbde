use serde::{Deserialize, Serialize};

/// Uniform response envelope returned by every endpoint.
///
/// `errors` is empty on success; `data` is `null` on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResult<T> {
    pub data: Option<T>,
    pub succeeded: bool,
    pub errors: String,
}

impl<T> ApiResult<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            succeeded: true,
            errors: String::new(),
        }
    }

    pub fn failure(errors: impl Into<String>) -> Self {
        Self {
            data: None,
            succeeded: false,
            errors: errors.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_serializes_with_null_data() {
        let result = ApiResult::<String>::failure("User already exists.");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["data"], serde_json::Value::Null);
        assert_eq!(value["succeeded"], false);
        assert_eq!(value["errors"], "User already exists.");
    }

    #[test]
    fn success_has_empty_errors() {
        let result = ApiResult::success(42);
        assert!(result.is_success());
        assert_eq!(result.errors, "");
        assert_eq!(result.data, Some(42));
    }
}
