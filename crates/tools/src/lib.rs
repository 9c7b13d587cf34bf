//! Built-in tool implementations for cocochat.
//!
//! Tools give the assistant the ability to look things up on the user's
//! behalf. Currently that is catalog search.

pub mod item_search;

use cocochat_config::AppConfig;
use cocochat_core::error::ToolError;
use cocochat_core::tool::ToolRegistry;

pub use item_search::ItemSearchTool;

/// Create the tool registry for a configuration.
///
/// Every tool's parameter schema is compiled here, so a broken schema
/// fails at startup rather than on the first call.
pub fn default_registry(config: &AppConfig) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    let item_search = ItemSearchTool::from_config(&config.tools.item_search)?;
    tracing::info!(remote = item_search.is_remote(), "Item search tool ready");
    registry.register(Box::new(item_search))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_item_search() {
        let registry = default_registry(&AppConfig::default()).unwrap();
        assert_eq!(registry.names(), vec!["item_search"]);
        let defs = registry.definitions();
        assert_eq!(defs[0].parameters["required"][0], "name");
    }

    #[test]
    fn registry_validates_item_search_arguments() {
        let registry = default_registry(&AppConfig::default()).unwrap();
        let ok = serde_json::json!({"name": "jeans", "category": "bottomwear"});
        assert!(registry.validate_arguments("item_search", &ok).is_ok());

        let bad = serde_json::json!({"name": 42});
        let err = registry.validate_arguments("item_search", &bad).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
