//! Book stock manager application library
//!
//! Application modules, shared utilities and the bootstrap used by both binaries.

pub mod modules;
pub mod utils;

use anyhow::Context;
use bookstock_db::MigrationDirection;
use bookstock_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use sqlx::PgPool;

/// Registry holding every application module, wired to `pool`.
pub fn build_registry(pool: &PgPool, settings: &Settings) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, pool, settings);
    tracing::debug!(modules = registry.len(), "module registry built");
    registry
}

/// Connect, run the module lifecycle and serve HTTP until a shutdown signal.
///
/// Expects logging to be initialized by the caller.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = settings.environment.as_str(),
        version = %settings.service.version,
        "book stock manager starting"
    );

    let pool = bookstock_db::connect(&settings.database).await?;
    let registry = build_registry(&pool, &settings);
    anyhow::ensure!(!registry.is_empty(), "no modules registered");
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_all(&ctx).await?;

    if settings.database.migrate_on_start {
        let applied = bookstock_db::run_migrations(
            &pool,
            &registry.collect_migrations(),
            MigrationDirection::Up,
        )
        .await
        .context("startup migrations failed")?;
        tracing::info!(applied, "startup migrations complete");
    }

    registry.start_all(&ctx).await?;

    let served = bookstock_http::start_server(&registry, &settings).await;

    let stopped = registry.stop_all().await;
    pool.close().await;
    tracing::info!("book stock manager stopped");

    served?;
    stopped
}

/// Apply or revert every module migration; returns how many ran.
pub async fn migrate(settings: &Settings, direction: MigrationDirection) -> anyhow::Result<usize> {
    let pool = bookstock_db::connect(&settings.database).await?;
    let registry = build_registry(&pool, settings);

    let result = bookstock_db::run_migrations(&pool, &registry.collect_migrations(), direction)
        .await
        .with_context(|| format!("migrate {direction} failed"));

    pool.close().await;
    result
}
