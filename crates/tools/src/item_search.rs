//! Item search tool: looks up products in the Coco Retails catalog.
//!
//! With a configured search endpoint this performs a real HTTP lookup.
//! Without one it answers from a small built-in sample catalog, so the
//! assistant works end-to-end offline and in tests.

use std::time::Duration;

use async_trait::async_trait;
use cocochat_config::ItemSearchConfig;
use cocochat_core::error::ToolError;
use cocochat_core::tool::Tool;
use serde_json::{Value, json};
use tracing::{error, info};

const TOOL_NAME: &str = "item_search";

enum Catalog {
    Sample,
    Remote {
        client: reqwest::Client,
        url: String,
        api_key: Option<String>,
        limit: u32,
    },
}

pub struct ItemSearchTool {
    catalog: Catalog,
}

impl ItemSearchTool {
    /// A tool backed by the built-in sample catalog.
    pub fn sample() -> Self {
        Self {
            catalog: Catalog::Sample,
        }
    }

    /// Build the tool from configuration: remote when `api_url` is set.
    pub fn from_config(config: &ItemSearchConfig) -> Result<Self, ToolError> {
        let Some(url) = config.api_url.clone() else {
            return Ok(Self::sample());
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: TOOL_NAME.into(),
                reason: format!("HTTP client: {e}"),
            })?;

        Ok(Self {
            catalog: Catalog::Remote {
                client,
                url,
                api_key: config.api_key.clone(),
                limit: config.limit,
            },
        })
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.catalog, Catalog::Remote { .. })
    }
}

fn failed(reason: impl Into<String>) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: TOOL_NAME.into(),
        reason: reason.into(),
    }
}

#[async_trait]
impl Tool for ItemSearchTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Use this tool only for searching items in Coco Retails. \
         Searches items in the Coco Retails catalog by name keyword and category. \
         Both parameters accept English keywords only."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "title": "Name",
                    "description": "The keyword of item name to search for"
                },
                "category": {
                    "type": "string",
                    "title": "Category",
                    "description": "The category of items to search in"
                }
            },
            "required": ["name", "category"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let name = arguments["name"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'name' argument".into()))?;
        let category = arguments["category"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'category' argument".into()))?
            .to_uppercase();

        info!(name = %name, category = %category, "Item searching");

        match &self.catalog {
            Catalog::Sample => Ok(sample_items()),
            Catalog::Remote {
                client,
                url,
                api_key,
                limit,
            } => {
                let mut request = client.get(url).query(&[
                    ("name", name.to_string()),
                    ("category", category),
                    ("limit", limit.to_string()),
                ]);
                if let Some(key) = api_key {
                    request = request.header("Authorization", key);
                }

                let response = request.send().await.map_err(|e| {
                    error!(error = %e, "Item search request failed");
                    failed(e.to_string())
                })?;

                let status = response.status();
                if !status.is_success() {
                    error!(status = status.as_u16(), "Item search returned error status");
                    return Err(failed(format!("search endpoint returned {status}")));
                }

                let mut body: Value = response
                    .json()
                    .await
                    .map_err(|e| failed(format!("invalid JSON from search endpoint: {e}")))?;

                if let Some(err) = body.get("error") {
                    error!(error = %err, "Item search reported an error");
                }

                match body.get_mut("content").map(Value::take) {
                    Some(content) if content.is_array() => Ok(content),
                    _ => Err(failed("search response has no 'content' list")),
                }
            }
        }
    }
}

/// The two-item catalog served when no search endpoint is configured.
fn sample_items() -> Value {
    json!([
        {
            "id": 1,
            "gender": "Men",
            "masterCategory": "Apparel",
            "subCategory": "Topwear",
            "articleType": "Shirts",
            "baseColour": "Navy Blue",
            "season": "Fall",
            "year": 2011
        },
        {
            "id": 2,
            "gender": "Men",
            "masterCategory": "Apparel",
            "subCategory": "Bottomwear",
            "articleType": "Jeans",
            "baseColour": "Blue",
            "season": "Summer",
            "year": 2012,
            "usage": "Casual",
            "productDisplayName": "Peter England Men Party Blue Jeans"
        }
    ])
}
