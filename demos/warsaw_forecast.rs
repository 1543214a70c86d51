use anyhow::{Context, Result};
use meteo_forecast::{Client, ForecastConfig, Model};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // RUST_LOG=meteo_forecast=debug shows every request.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Configure the key via METEO_API_KEY or a `.meteorc` file.
    let client = Client::from_env()
        .context("failed to configure meteo.pl client")?
        .with_location(52.2297, 21.0122)
        .with_progress(true);

    let config = ForecastConfig::new(
        Model::Wrf,
        "d02_XLONG_XLAT",
        [("T2", 0), ("RAINNC", 0), ("WSPD10MAX", 0)],
    );
    let forecast = client
        .get_forecast(None, None, Some(&config))
        .context("forecast request failed")?;

    for (time, record) in forecast.iter() {
        println!(
            "{time}  T2={:>8.2}  RAINNC={:>6.2}  WSPD10MAX={:>6.2}",
            record.get_f64("T2").unwrap_or(f64::NAN),
            record.get_f64("RAINNC").unwrap_or(f64::NAN),
            record.get_f64("WSPD10MAX").unwrap_or(f64::NAN),
        );
    }
    Ok(())
}
