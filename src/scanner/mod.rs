//! Core functionality for actual probing behaviour.
use crate::codec::CidrBlock;
use crate::input::{PortRange, Protocol};
use log::debug;

use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::Arc,
    time::Duration,
};

use colored::Colorize;
use futures::future;
use futures::stream::{self, StreamExt};
use tokio::{
    io::AsyncWriteExt,
    net::{TcpStream, UdpSocket},
    time,
};

/// Outcome of one connection attempt against one endpoint.
///
/// `reachable` is true iff the attempt completed within the timeout
/// without error. Exactly one result exists per (address, protocol,
/// port) triple of a scan; nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    /// Probed address in integer form.
    pub addr: u32,
    /// Transport the attempt was issued over.
    pub protocol: Protocol,
    /// Probed port.
    pub port: u16,
    /// Whether the connection attempt succeeded within the timeout.
    pub reachable: bool,
}

/// Read-only probe configuration shared by every concurrently running
/// per-address unit. Never mutated after the scan begins.
#[derive(Debug)]
struct ProbeConnector {
    protocols: Vec<Protocol>,
    ports: PortRange,
    timeout: Duration,
    greppable: bool,
    accessible: bool,
}

impl ProbeConnector {
    /// Runs the full protocol x port sweep for one address: protocols
    /// in configured order, ports strictly ascending, one attempt per
    /// endpoint, sequentially. A sibling's outcome never short-circuits
    /// the rest of the sweep.
    async fn probe_address(&self, addr: u32) -> Vec<ProbeResult> {
        let ip = Ipv4Addr::from(addr);
        // Saturate so a directly built reversed range cannot
        // underflow; the port loop below is already empty for it.
        let attempts = self.protocols.len()
            * (usize::from(self.ports.end.saturating_sub(self.ports.start)) + 1);
        let mut results = Vec::with_capacity(attempts);

        for &protocol in &self.protocols {
            for port in self.ports.start..=self.ports.end {
                let socket = SocketAddr::V4(SocketAddrV4::new(ip, port));
                let reachable = match protocol {
                    Protocol::Tcp => self.tcp_probe(socket).await,
                    Protocol::Udp => self.udp_probe(socket).await,
                };
                debug!("probed {protocol}://{socket} reachable={reachable}");
                if reachable {
                    self.fmt_endpoint(protocol, socket);
                }
                results.push(ProbeResult {
                    addr,
                    protocol,
                    port,
                    reachable,
                });
            }
        }

        results
    }

    /// Performs a TCP connection to the socket bounded by the
    /// configured timeout. A connection that completes in time is
    /// shut down immediately; no data is exchanged.
    async fn tcp_probe(&self, socket: SocketAddr) -> bool {
        match time::timeout(self.timeout, TcpStream::connect(socket)).await {
            Ok(Ok(mut stream)) => {
                debug!("connection was successful, shutting down stream {}", &socket);
                if let Err(e) = stream.shutdown().await {
                    debug!("shutdown stream error {}", &e);
                }
                true
            }
            Ok(Err(e)) => {
                debug!("connection to {socket} failed: {e}");
                false
            }
            Err(_) => false,
        }
    }

    /// Performs a UDP "dial" to the socket bounded by the configured
    /// timeout.
    ///
    /// UDP is connectionless, so a successful connect validates little
    /// more than local routing and says nothing about a listener on
    /// the far side. The verdict is approximate and heavy on false
    /// positives; it is reported as-is rather than papered over.
    async fn udp_probe(&self, socket: SocketAddr) -> bool {
        let local = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        let attempt = async {
            let udp_socket = UdpSocket::bind(local).await?;
            udp_socket.connect(socket).await
        };

        match time::timeout(self.timeout, attempt).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!("udp dial to {socket} failed: {e}");
                false
            }
            Err(_) => false,
        }
    }

    /// Formats and prints one reachable endpoint as it is found.
    fn fmt_endpoint(&self, protocol: Protocol, socket: SocketAddr) {
        if !self.greppable {
            let endpoint = format!("{protocol}://{socket}");
            if self.accessible {
                println!("Reachable {endpoint}");
            } else {
                println!("Reachable {}", endpoint.purple());
            }
        }
    }
}

/// The class for the scanner.
///
/// Holds one scan target: the CIDR block to expand plus the protocol
/// list, port range and per-attempt timeout shared by all probes.
/// `batch_size` caps how many addresses are in flight at once; within
/// one address all attempts run sequentially. Every configuration
/// value is immutable once the scanner is built.
#[derive(Debug)]
pub struct Scanner {
    block: CidrBlock,
    batch_size: u16,
    connector: Arc<ProbeConnector>,
}

impl Scanner {
    /// Builds a scanner for one CIDR block.
    #[must_use]
    pub fn new(
        block: CidrBlock,
        protocols: &[Protocol],
        ports: PortRange,
        timeout: Duration,
        batch_size: u16,
        greppable: bool,
        accessible: bool,
    ) -> Self {
        Self {
            block,
            batch_size,
            connector: Arc::new(ProbeConnector {
                protocols: protocols.to_vec(),
                ports,
                timeout,
                greppable,
                accessible,
            }),
        }
    }

    /// Expands the block and probes every (address, protocol, port)
    /// triple exactly once, returning the reachable endpoints.
    ///
    /// Addresses are enumerated lazily and fanned out up to
    /// `batch_size` concurrent per-address units; the future resolves
    /// only once the last unit has completed. Results for different
    /// addresses complete in no particular order.
    pub async fn run(&self) -> Vec<ProbeResult> {
        let attempts_per_addr = self.connector.protocols.len() as u64
            * (u64::from(self.ports().end.saturating_sub(self.ports().start)) + 1);
        debug!(
            "start probing block {}: {} address(es), {} attempt(s) per address, batch size {}",
            self.block,
            self.block.size(),
            attempts_per_addr,
            self.batch_size
        );

        // A zero batch would stall the stream forever.
        let batch_size = usize::from(self.batch_size).max(1);

        let reachable = stream::iter(self.block.iter())
            .map(|addr| {
                let connector = Arc::clone(&self.connector);
                async move { connector.probe_address(addr).await }
            })
            .buffer_unordered(batch_size)
            .flat_map(stream::iter)
            .filter(|result| future::ready(result.reachable))
            .collect::<Vec<_>>()
            .await;

        debug!("reachable endpoints found: {:?}", &reachable);
        reachable
    }

    /// The port range this scanner probes.
    #[must_use]
    pub fn ports(&self) -> PortRange {
        self.connector.ports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::to_integer;
    use std::net::TcpListener;
    use std::time::Instant;

    fn scanner_for(block: &str, protocols: &[Protocol], start: u16, end: u16) -> Scanner {
        Scanner::new(
            block.parse().unwrap(),
            protocols,
            PortRange { start, end },
            Duration::from_millis(500),
            100,
            true,
            true,
        )
    }

    #[tokio::test]
    async fn scanner_runs() {
        // Makes sure the program still runs and doesn't panic
        let scanner = scanner_for("127.0.0.1/32", &[Protocol::Tcp], 1, 1_000);
        scanner.run().await;
    }

    #[tokio::test]
    async fn udp_scanner_runs() {
        // Makes sure the program still runs and doesn't panic
        let scanner = scanner_for("127.0.0.1/32", &[Protocol::Udp], 1, 100);
        scanner.run().await;
    }

    #[tokio::test]
    async fn small_block_scanner_runs() {
        let scanner = scanner_for("127.0.0.0/29", &[Protocol::Tcp], 80, 85);
        scanner.run().await;
    }

    #[tokio::test]
    async fn listening_tcp_port_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let scanner = scanner_for("127.0.0.1/32", &[Protocol::Tcp], port, port);
        let results = scanner.run().await;

        assert_eq!(
            results,
            vec![ProbeResult {
                addr: to_integer("127.0.0.1").unwrap(),
                protocol: Protocol::Tcp,
                port,
                reachable: true,
            }]
        );
    }

    #[tokio::test]
    async fn closed_tcp_port_is_unreachable_within_timeout() {
        // Bind then drop to find a port nothing is listening on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let scanner = scanner_for("127.0.0.1/32", &[Protocol::Tcp], port, port);
        let started = Instant::now();
        let results = scanner.run().await;

        assert!(results.is_empty());
        // The attempt completes, it does not hang past the timeout.
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn udp_dial_reports_reachable_without_a_listener() {
        // Documents the approximate UDP verdict: the dial succeeds
        // even though nothing is listening.
        let scanner = scanner_for("127.0.0.1/32", &[Protocol::Udp], 49_151, 49_151);
        let results = scanner.run().await;

        assert_eq!(
            results,
            vec![ProbeResult {
                addr: to_integer("127.0.0.1").unwrap(),
                protocol: Protocol::Udp,
                port: 49_151,
                reachable: true,
            }]
        );
    }

    #[tokio::test]
    async fn reversed_port_range_probes_nothing() {
        // A reversed range built directly, bypassing parse_ports, must
        // yield an empty sweep rather than panic.
        let scanner = scanner_for("127.0.0.1/32", &[Protocol::Tcp, Protocol::Udp], 100, 10);
        let results = scanner.run().await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn protocol_order_follows_configuration() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let scanner = scanner_for("127.0.0.1/32", &[Protocol::Udp, Protocol::Tcp], port, port);
        let results = scanner.run().await;

        // Within one address the configured protocol order is kept.
        let protocols: Vec<Protocol> = results.iter().map(|r| r.protocol).collect();
        assert_eq!(protocols, vec![Protocol::Udp, Protocol::Tcp]);
    }
}
