use anyhow::Context;
use bookstock_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    bookstock_telemetry::init(&settings.telemetry)?;

    bookstock::serve(settings).await
}
