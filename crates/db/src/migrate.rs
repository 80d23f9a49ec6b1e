//! Module migration runner backed by a `schema_migrations` bookkeeping table.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use bookstock_kernel::Migration;
use sqlx::PgPool;

const CREATE_BOOKKEEPING: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    module     TEXT        NOT NULL,
    id         TEXT        NOT NULL,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (module, id)
)"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    Up,
    Down,
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

impl FromStr for MigrationDirection {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(anyhow!("invalid migration direction '{other}'; use 'up' or 'down'")),
        }
    }
}

type AppliedSet = HashSet<(String, String)>;

/// Migrations not yet recorded as applied, in the given (sorted) order.
pub fn pending<'a>(
    migrations: &'a [(String, Migration)],
    applied: &AppliedSet,
) -> Vec<&'a (String, Migration)> {
    migrations
        .iter()
        .filter(|(module, migration)| !applied.contains(&(module.clone(), migration.id.to_string())))
        .collect()
}

/// Applied migrations in reverse order, i.e. the order they must be reverted in.
pub fn rollback_plan<'a>(
    migrations: &'a [(String, Migration)],
    applied: &AppliedSet,
) -> Vec<&'a (String, Migration)> {
    migrations
        .iter()
        .rev()
        .filter(|(module, migration)| applied.contains(&(module.clone(), migration.id.to_string())))
        .collect()
}

async fn applied_migrations(pool: &PgPool) -> anyhow::Result<AppliedSet> {
    sqlx::raw_sql(CREATE_BOOKKEEPING)
        .execute(pool)
        .await
        .context("failed to create schema_migrations table")?;

    let rows: Vec<(String, String)> = sqlx::query_as("SELECT module, id FROM schema_migrations")
        .fetch_all(pool)
        .await
        .context("failed to read schema_migrations")?;

    Ok(rows.into_iter().collect())
}

/// Apply or revert migrations; returns how many ran.
///
/// Each migration runs in its own transaction together with its bookkeeping row.
pub async fn run_migrations(
    pool: &PgPool,
    migrations: &[(String, Migration)],
    direction: MigrationDirection,
) -> anyhow::Result<usize> {
    let applied = applied_migrations(pool).await?;

    let plan = match direction {
        MigrationDirection::Up => pending(migrations, &applied),
        MigrationDirection::Down => rollback_plan(migrations, &applied),
    };

    if plan.is_empty() {
        tracing::info!(target: "bookstock-db", %direction, "no changes to apply");
        return Ok(0);
    }

    for (module, migration) in &plan {
        let mut tx = pool.begin().await.context("failed to open migration transaction")?;

        match direction {
            MigrationDirection::Up => {
                sqlx::raw_sql(migration.up)
                    .execute(&mut *tx)
                    .await
                    .with_context(|| format!("migration {module}/{} failed", migration.id))?;
                sqlx::query("INSERT INTO schema_migrations (module, id) VALUES ($1, $2)")
                    .bind(module.as_str())
                    .bind(migration.id)
                    .execute(&mut *tx)
                    .await?;
            }
            MigrationDirection::Down => {
                sqlx::raw_sql(migration.down)
                    .execute(&mut *tx)
                    .await
                    .with_context(|| format!("rollback {module}/{} failed", migration.id))?;
                sqlx::query("DELETE FROM schema_migrations WHERE module = $1 AND id = $2")
                    .bind(module.as_str())
                    .bind(migration.id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await.context("failed to commit migration")?;
        tracing::info!(target: "bookstock-db", %direction, module = %module, id = migration.id, "migration applied");
    }

    Ok(plan.len())
}
