pub mod domain;
pub mod engine;
pub mod error;
pub mod ingest;

pub mod config {
    use crate::engine::EngineParams;
    use anyhow::Context;

    const DEFAULT_CACHE_CAPACITY: usize = 256;
    const DEFAULT_PORT: u16 = 3000;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub sentry_dsn: Option<String>,
        pub rsi_period: Option<String>,
        pub forecast_window: Option<String>,
        pub cache_capacity: Option<String>,
        pub port: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                rsi_period: std::env::var("KIJIN_RSI_PERIOD").ok(),
                forecast_window: std::env::var("KIJIN_FORECAST_WINDOW").ok(),
                cache_capacity: std::env::var("KIJIN_CACHE_CAPACITY").ok(),
                port: std::env::var("PORT").ok(),
            })
        }

        pub fn engine_params(&self) -> anyhow::Result<EngineParams> {
            let defaults = EngineParams::default();

            let rsi_period = parse_or(self.rsi_period.as_deref(), defaults.rsi_period)
                .context("KIJIN_RSI_PERIOD must be a positive integer")?;
            anyhow::ensure!(rsi_period >= 1, "KIJIN_RSI_PERIOD must be >= 1 (got {rsi_period})");

            let forecast_window =
                parse_or(self.forecast_window.as_deref(), defaults.forecast_window)
                    .context("KIJIN_FORECAST_WINDOW must be a positive integer")?;
            anyhow::ensure!(
                forecast_window >= 1,
                "KIJIN_FORECAST_WINDOW must be >= 1 (got {forecast_window})"
            );

            Ok(EngineParams {
                rsi_period,
                forecast_window,
            })
        }

        pub fn cache_capacity(&self) -> anyhow::Result<usize> {
            parse_or(self.cache_capacity.as_deref(), DEFAULT_CACHE_CAPACITY)
                .context("KIJIN_CACHE_CAPACITY must be a non-negative integer")
        }

        pub fn port(&self) -> anyhow::Result<u16> {
            parse_or(self.port.as_deref(), DEFAULT_PORT).context("PORT must be a valid port number")
        }
    }

    fn parse_or<T>(raw: Option<&str>, default: T) -> anyhow::Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Ok(s.parse::<T>()?),
            None => Ok(default),
        }
    }

}
