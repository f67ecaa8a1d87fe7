//! Prometheus metrics flags and server.

use crate::CliResult;
use clap::Args;
use std::net::IpAddr;
#[cfg(feature = "metrics")]
use std::net::SocketAddr;

/// Prometheus metrics flags.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct MetricsArgs {
    /// Serves Prometheus metrics.
    #[arg(long = "metrics.enabled", env = "FERRY_METRICS_ENABLED")]
    pub enabled: bool,
    /// The metrics listen address.
    #[arg(long = "metrics.addr", default_value = "0.0.0.0", env = "FERRY_METRICS_ADDR")]
    pub addr: IpAddr,
    /// The metrics listen port. Zero picks a free port.
    #[arg(long = "metrics.port", default_value_t = 9090, env = "FERRY_METRICS_PORT")]
    pub port: u16,
}

impl MetricsArgs {
    /// Starts the metrics server if enabled and registers the ferry metrics.
    #[cfg(feature = "metrics")]
    pub fn init_metrics(&self) -> CliResult<()> {
        if !self.enabled {
            return Ok(());
        }
        init_prometheus_server(self.addr, self.port)?;
        ferry_messages::Metrics::init();
        ferry_providers_alloy::Metrics::init();
        Ok(())
    }

    /// Metrics support is compiled out. Warns if metrics were requested anyway.
    #[cfg(not(feature = "metrics"))]
    pub fn init_metrics(&self) -> CliResult<()> {
        if self.enabled {
            tracing::warn!(
                target: "prometheus",
                "Metrics requested but the metrics feature is off"
            );
        }
        Ok(())
    }
}

/// Resolves the address the metrics server listens on.
///
/// A zero port is resolved by binding an ephemeral port and releasing it, because the exporter
/// only accepts an address. Another process can claim the port before the exporter binds it, in
/// which case installing the exporter fails.
#[cfg(feature = "metrics")]
fn listen_addr(addr: IpAddr, port: u16) -> CliResult<SocketAddr> {
    if port != 0 {
        return Ok(SocketAddr::from((addr, port)));
    }
    Ok(std::net::TcpListener::bind((addr, 0))?.local_addr()?)
}

/// Starts a Prometheus metrics server on `addr:port` and returns the bound address.
///
/// A zero port picks a free port, see [`listen_addr`].
#[cfg(feature = "metrics")]
pub fn init_prometheus_server(addr: IpAddr, port: u16) -> CliResult<SocketAddr> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use metrics_process::Collector;
    use std::{thread, time::Duration};

    let listen = listen_addr(addr, port)?;
    PrometheusBuilder::new().with_http_listener(listen).install()?;

    let collector = Collector::default();
    collector.describe();
    thread::spawn(move || {
        loop {
            collector.collect();
            thread::sleep(Duration::from_secs(60));
        }
    });

    tracing::info!(target: "prometheus", "Serving metrics at: http://{listen}");
    Ok(listen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug, Clone)]
    #[command(about = "Mock command")]
    struct MockCommand {
        #[clap(flatten)]
        pub metrics: MetricsArgs,
    }

    #[test]
    fn test_metrics_args_listen_enabled() {
        let args = MockCommand::parse_from(["test", "--metrics.enabled"]);
        assert!(args.metrics.enabled);

        let args = MockCommand::parse_from(["test"]);
        assert!(!args.metrics.enabled);
    }

    #[test]
    fn test_metrics_args_listen_addr_and_port() {
        let args = MockCommand::parse_from([
            "test",
            "--metrics.addr",
            "127.0.0.1",
            "--metrics.port",
            "1234",
        ]);
        let expected: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(args.metrics.addr, expected);
        assert_eq!(args.metrics.port, 1234);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_listen_addr_resolves_zero_port() {
        let loopback: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(listen_addr(loopback, 9090).unwrap(), SocketAddr::from((loopback, 9090)));

        let resolved = listen_addr(loopback, 0).unwrap();
        assert_eq!(resolved.ip(), loopback);
        assert_ne!(resolved.port(), 0);
    }

    #[test]
    fn test_disabled_metrics_is_a_no_op() {
        let args = MockCommand::parse_from(["test"]);
        args.metrics.init_metrics().unwrap();
    }
}
