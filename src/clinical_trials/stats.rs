// /stats and /version endpoints

use super::client::ClinicalTrialsClient;
use crate::error::{ApiError, ApiResult};
use serde_json::Value;

/// Field types accepted by `/stats/field/values`
pub const FIELD_TYPES: [&str; 6] = ["ENUM", "STRING", "DATE", "INTEGER", "NUMBER", "BOOLEAN"];

fn joined(name: &str, values: Option<&[String]>) -> ApiResult<Option<(String, String)>> {
    let Some(values) = values else {
        return Ok(None);
    };
    let kept: Vec<&str> = values.iter().map(|v| v.as_str()).filter(|v| !v.is_empty()).collect();
    if kept.is_empty() {
        return Err(ApiError::invalid(format!("`{}` must be a non-empty list when provided", name)));
    }
    Ok(Some((name.to_string(), kept.join(","))))
}

/// The API answers with an array; anything else becomes a one-element list
fn as_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

impl ClinicalTrialsClient {
    /// Study JSON size statistics
    pub async fn size_stats(&self) -> ApiResult<Value> {
        self.request_json("/stats/size", Vec::new()).await
    }

    /// Value statistics of leaf fields
    pub async fn field_values(&self, fields: Option<&[String]>, types: Option<&[String]>) -> ApiResult<Vec<Value>> {
        if let Some(bad) = types
            .unwrap_or_default()
            .iter()
            .find(|t| !t.is_empty() && !FIELD_TYPES.contains(&t.to_ascii_uppercase().as_str()))
        {
            return Err(ApiError::invalid(format!("unknown field type '{}'", bad)));
        }
        let pairs: Vec<(String, String)> = [joined("fields", fields)?, joined("types", types)?]
            .into_iter()
            .flatten()
            .collect();
        Ok(as_list(self.request_json("/stats/field/values", pairs).await?))
    }

    /// Size statistics of list fields
    pub async fn field_sizes(&self, fields: Option<&[String]>) -> ApiResult<Vec<Value>> {
        let pairs: Vec<(String, String)> = joined("fields", fields)?.into_iter().collect();
        Ok(as_list(self.request_json("/stats/field/sizes", pairs).await?))
    }

    pub async fn version(&self) -> ApiResult<Value> {
        self.request_json("/version", Vec::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_joined_validation() {
        assert_eq!(joined("fields", None).unwrap(), None);
        let fields = vec!["Phase".to_string(), "".to_string(), "Condition".to_string()];
        assert_eq!(
            joined("fields", Some(&fields)).unwrap(),
            Some(("fields".to_string(), "Phase,Condition".to_string()))
        );
        assert!(joined("types", Some(&[])).is_err());
    }

    #[test]
    fn test_as_list() {
        assert_eq!(as_list(json!([1, 2])).len(), 2);
        assert!(as_list(Value::Null).is_empty());
        assert_eq!(as_list(json!({"a": 1})), vec![json!({"a": 1})]);
    }
}
