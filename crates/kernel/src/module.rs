use async_trait::async_trait;
use axum::Router;

/// Context provided to modules during initialization
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Schema change contributed by a module.
///
/// `up` and `down` are plain SQL scripts and may contain several statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

/// A self-contained slice of the service: routes, docs, schema and lifecycle hooks.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module, also its path segment under the API prefix
    fn name(&self) -> &'static str;

    /// Called during application startup before migrations
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Router for this module's routes, mounted under `{api_prefix}/{name}`
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment (`paths` and `components`) merged into the service document
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Migrations are executed in ascending id order
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Called after migrations, right before the server starts accepting requests
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during application shutdown
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
