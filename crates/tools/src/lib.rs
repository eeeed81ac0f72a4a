//! Built-in tools and intent routing for Ragline.
//!
//! Tools are deterministic capabilities run alongside the language model:
//! arithmetic and weather lookup. The intent router decides which one, if
//! any, a query calls for.

pub mod intent;
pub mod math;
pub mod weather;

use std::sync::Arc;
use std::time::Duration;

use ragline_config::ToolsConfig;
use ragline_core::error::ToolError;
use ragline_core::tool::ToolRegistry;

pub use intent::IntentRouter;
pub use math::MathTool;
pub use weather::WeatherTool;

/// Create a registry with the built-in tools, configured from `config`.
pub fn default_registry(config: &ToolsConfig) -> Result<ToolRegistry, ToolError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let mut registry = ToolRegistry::new().with_timeout(timeout);
    registry.register(Arc::new(MathTool));
    registry.register(Arc::new(WeatherTool::new(
        config.weather_api_key.clone(),
        &config.weather_api_url,
        timeout,
    )?));
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_builtins() {
        let registry = default_registry(&ToolsConfig::default()).unwrap();
        assert_eq!(registry.names(), vec!["math", "weather"]);
    }

    #[tokio::test]
    async fn default_registry_runs_math() {
        let registry = default_registry(&ToolsConfig::default()).unwrap();
        let result = registry.execute("math", "what is 6 * 7").await;
        assert!(result.success);
        assert_eq!(result.data.unwrap()["result"], 42);
    }
}
