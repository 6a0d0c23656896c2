use clap::Parser;
use simfaas_common::{FaasError, FunctionConfig, Result};
use simfaas_platform::PlatformConfig;
use std::net::SocketAddr;
use std::time::Duration;

/// A very simple mock of a FaaS platform: every function sleeps, with
/// simulated cold starts and keep-warm retention.
#[derive(Parser, Debug, Clone)]
#[command(name = "simfission", version)]
pub struct Cli {
    /// The default cold start duration
    #[arg(long, env = "SIMFAAS_COLD_START_DURATION", default_value = "0s", value_parser = parse_duration)]
    pub cold_start_duration: Duration,

    /// How long the function should be kept warm after an execution
    #[arg(long, env = "SIMFAAS_KEEP_WARM_DURATION", default_value = "0s", value_parser = parse_duration)]
    pub keep_warm_duration: Duration,

    /// Runtime of a call that does not specify one
    #[arg(long, env = "SIMFAAS_RUNTIME_DURATION", default_value = "0s", value_parser = parse_duration)]
    pub runtime_duration: Duration,

    /// How often idle instances are looked for
    #[arg(long, env = "SIMFAAS_REAP_INTERVAL", default_value = "1s", value_parser = parse_duration)]
    pub reap_interval: Duration,

    /// Address to bind the server to
    #[arg(long, env = "SIMFAAS_ADDR", default_value = "0.0.0.0:8888")]
    pub addr: SocketAddr,

    /// Reject calls to functions that were not defined up front
    #[arg(long, env = "SIMFAAS_NO_AUTO_CREATE")]
    pub no_auto_create: bool,
}

impl Cli {
    pub fn function_config(&self) -> FunctionConfig {
        FunctionConfig::new(
            self.cold_start_duration,
            self.keep_warm_duration,
            self.runtime_duration,
        )
    }

    pub fn platform_config(&self) -> Result<PlatformConfig> {
        if self.reap_interval.is_zero() {
            return Err(FaasError::Config("reap interval must be positive".to_string()));
        }
        Ok(PlatformConfig {
            reap_interval: self.reap_interval,
        })
    }

    pub fn cold_starts_enabled(&self) -> bool {
        !self.cold_start_duration.is_zero() || !self.keep_warm_duration.is_zero()
    }
}

/// Parses `250ms`, `2s`, `1m30s`, `1.5h` (units ns, us/µs, ms, s, m, h) or
/// a bare number of seconds.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = |reason: &str| FaasError::Config(format!("invalid duration {input:?}: {reason}"));

    let s = input.trim();
    if s.is_empty() {
        return Err(invalid("empty"));
    }
    if let Ok(seconds) = s.parse::<f64>() {
        return Duration::try_from_secs_f64(seconds).map_err(|e| invalid(&e.to_string()));
    }

    let mut nanos = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_end == 0 {
            return Err(invalid("expected a number"));
        }
        let value: f64 = rest[..number_end]
            .parse()
            .map_err(|_| invalid("malformed number"))?;
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(invalid("missing unit")),
            _ => return Err(invalid("unknown unit")),
        };
        nanos += value * scale;
        rest = &rest[unit_end..];
    }

    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return Err(invalid("out of range"));
    }
    Ok(Duration::from_nanos(nanos.round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("10us").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("10µs").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("7ns").unwrap(), Duration::from_nanos(7));
    }

    #[test]
    fn test_parse_duration_bare_seconds() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("1.043").unwrap(), Duration::from_secs_f64(1.043));
    }

    #[test]
    fn test_parse_duration_errors() {
        for input in ["", "s", "5x", "1.2.3s", "-1", "ms5"] {
            assert!(
                matches!(parse_duration(input), Err(FaasError::Config(_))),
                "{input:?} should not parse"
            );
        }
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["simfission"]).unwrap();
        assert_eq!(cli.addr, "0.0.0.0:8888".parse().unwrap());
        assert_eq!(cli.reap_interval, Duration::from_secs(1));
        assert!(!cli.cold_starts_enabled());
        assert!(!cli.no_auto_create);
        assert_eq!(cli.function_config(), FunctionConfig::default());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "simfission",
            "--cold-start-duration",
            "2s",
            "--keep-warm-duration",
            "5s",
            "--addr",
            "127.0.0.1:9000",
        ])
        .unwrap();
        assert!(cli.cold_starts_enabled());
        assert_eq!(
            cli.function_config(),
            FunctionConfig::new(Duration::from_secs(2), Duration::from_secs(5), Duration::ZERO)
        );
        assert_eq!(cli.platform_config().unwrap().reap_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_zero_reap_interval_rejected() {
        let cli = Cli::try_parse_from(["simfission", "--reap-interval", "0s"]).unwrap();
        assert!(matches!(cli.platform_config(), Err(FaasError::Config(_))));
    }
}
