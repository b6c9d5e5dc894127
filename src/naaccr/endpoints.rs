// Data Dictionary endpoints

use super::client::{NaaccrClient, Page};
use crate::error::{ApiError, ApiResult};
use log::debug;
use serde_json::{Map, Value};
use std::time::Duration;

/// Attributes accepted by `/data_item/{id}/history/`
pub const ALLOWED_ATTRIBUTES: [&str; 23] = [
    "ItemName",
    "ItemLength",
    "YearImplemented",
    "VersionImplemented",
    "YearRetired",
    "VersionRetired",
    "Section",
    "SourceOfStandard",
    "DateCreated",
    "DateModified",
    "Description",
    "Rationale",
    "Clarification",
    "GeneralNotes",
    "NpcrCollect",
    "CocCollect",
    "SeerCollect",
    "CccrCollect",
    "Format",
    "CodeDescription",
    "CodeNote",
    "ItemDataType",
    "AllowableValues",
];

/// Compact view of a data item
pub const ITEM_SUMMARY_FIELDS: [&str; 8] = [
    "ItemNumber",
    "ItemName",
    "ItemLength",
    "YearImplemented",
    "VersionImplemented",
    "XmlNaaccrId",
    "Section",
    "SourceOfStandard",
];

fn format_json() -> Vec<(String, String)> {
    vec![("format".to_string(), "json".to_string())]
}

/// ItemNumber, else XmlNaaccrId
pub fn item_id(record: &Value) -> Option<String> {
    ["ItemNumber", "XmlNaaccrId"].iter().find_map(|k| match &record[*k] {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Keep only `ITEM_SUMMARY_FIELDS` (missing ones as null)
pub fn summarize_item(record: &Value) -> Value {
    let mut out = Map::new();
    for key in ITEM_SUMMARY_FIELDS {
        out.insert(key.to_string(), record.get(key).cloned().unwrap_or(Value::Null));
    }
    Value::Object(out)
}

impl NaaccrClient {
    pub async fn list_versions(&self) -> ApiResult<Vec<Value>> {
        let value = self.request_json("/naaccr_versions/", format_json(), false).await?;
        Ok(Page::from_value(value).results)
    }

    /// One item by ItemNumber or XmlNaaccrId
    pub async fn get_data_item(&self, version: &str, item: &str, minimize_results: bool) -> ApiResult<Value> {
        let path = format!("/data_item/{}/{}/", version.trim(), item.trim());
        self.request_json(&path, format_json(), minimize_results).await
    }

    /// Items matching `q`, following `next` for up to `pages` pages with `delay` between them
    pub async fn search_data_items(
        &self,
        version: &str,
        q: Option<&str>,
        minimize_results: bool,
        pages: usize,
        delay: Duration,
    ) -> ApiResult<Vec<Value>> {
        let mut pairs = format_json();
        if let Some(q) = q.map(str::trim).filter(|q| !q.is_empty()) {
            pairs.push(("q".to_string(), q.to_string()));
        }
        let path = format!("/data_item/{}/", version.trim());
        let first = Page::from_value(self.request_json(&path, pairs, minimize_results).await?);
        let mut items = first.results;
        let mut next = first.next;

        let mut remaining = pages.max(1) - 1;
        while remaining > 0 {
            let Some(url) = next.take() else {
                break;
            };
            tokio::time::sleep(delay).await;
            debug!("[naaccr] following {}", url);
            let page = Page::from_value(self.get_url(&url).await?);
            items.extend(page.results);
            next = page.next;
            remaining -= 1;
        }
        Ok(items)
    }

    /// History of one attribute across versions
    pub async fn get_attribute_history(&self, item: &str, attribute: &str) -> ApiResult<Vec<Value>> {
        if !ALLOWED_ATTRIBUTES.contains(&attribute) {
            let mut allowed = ALLOWED_ATTRIBUTES.to_vec();
            allowed.sort();
            return Err(ApiError::invalid(format!(
                "Invalid attribute '{}'. Must be one of: {}",
                attribute,
                allowed.join(", ")
            )));
        }
        let mut pairs = vec![("attribute".to_string(), attribute.to_string())];
        pairs.extend(format_json());
        let path = format!("/data_item/{}/history/", item.trim());
        Ok(Page::from_value(self.request_json(&path, pairs, false).await?).results)
    }

    /// Operation, ModifiedAttribute, OldValue, NewValue rows for an item in a version
    pub async fn get_operation_history(&self, version: &str, item: &str) -> ApiResult<Vec<Value>> {
        let path = format!("/data_item/operation_history/{}/{}/", version.trim(), item.trim());
        Ok(Page::from_value(self.request_json(&path, format_json(), false).await?).results)
    }
}
