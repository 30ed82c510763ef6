use anyhow::{Context, Result};
use std::{io::ErrorKind, sync::Arc, time::Duration};
use microgrid_droop::{config, readings, site, telemetry, DeviceKind};
use config::Config;
use readings::{CommandReadingSource, ReadingSource};
use site::{DroopSession, InMemoryConfigStore, SiteConfig};
use telemetry::{init_tracing, shutdown_signal};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;
    init_tracing(&cfg.log);

    let store = match tokio::fs::read_to_string(&cfg.site.config_path).await {
        Ok(raw) => InMemoryConfigStore::with_config(
            SiteConfig::from_json_str(&raw)
                .with_context(|| format!("parsing {}", cfg.site.config_path.display()))?,
        ),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %cfg.site.config_path.display(), "site config not found, using defaults");
            InMemoryConfigStore::new()
        }
        Err(e) => {
            return Err(e).with_context(|| format!("reading {}", cfg.site.config_path.display()));
        }
    };

    let session = DroopSession::open(Arc::new(store), &SiteConfig::defaults()).await?;
    let scale = cfg.chart.scale();
    let mut curves = Vec::new();
    for device in DeviceKind::droop_modeled() {
        match session.curve(device, &scale) {
            Ok(curve) => curves.push(curve),
            Err(e) => warn!(device = %device, error = %e, "droop curve skipped"),
        }
    }
    for curve in &curves {
        if curve.degenerate {
            warn!(device = %curve.device, "droop curve has no extent, chart floor applied");
        }
        info!(
            device = %curve.device,
            upper = ?curve.points[0],
            middle = ?curve.points[1],
            lower = ?curve.points[2],
            "droop curve"
        );
    }
    println!("{}", serde_json::to_string_pretty(&curves)?);

    if !cfg.readings.enabled {
        info!("live readings disabled");
        return Ok(());
    }

    let source = CommandReadingSource::from_config(&cfg.readings);
    let every = Duration::from_secs(cfg.readings.poll_seconds.max(1));
    info!(program = %cfg.readings.program, every_secs = every.as_secs(), "polling live readings");

    tokio::select! {
        _ = poll_readings(&source, every) => {},
        _ = shutdown_signal() => {},
    }

    info!("shutdown complete");
    Ok(())
}

async fn poll_readings(source: &dyn ReadingSource, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        match source.fetch_live_readings().await {
            Ok(readings) => {
                info!(count = readings.len(), "live readings");
                for reading in &readings {
                    debug!(name = %reading.name, value = reading.value, "reading");
                }
            }
            Err(e) => warn!(error = %e, "live readings failed"),
        }
    }
}
