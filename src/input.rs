//! Provides a means to read, parse and normalize configuration options
//! for scans.
use std::fmt;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use log::warn;
use serde_derive::Deserialize;

use crate::error::ScanError;

const LOWEST_PORT_NUMBER: u16 = 1;
const TOP_PORT_NUMBER: u16 = 65535;

/// Transport protocols a probe can be issued over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Connection-oriented TCP probing.
    Tcp,
    /// Connectionless UDP probing; see the scanner module for why its
    /// reachability verdict is approximate.
    Udp,
}

impl Protocol {
    /// Lower-case wire name, as used in `protocol://ip:port` output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inclusive port interval with `1 <= start <= end <= 65535`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    /// First port probed.
    pub start: u16,
    /// Last port probed.
    pub end: u16,
}

/// Splits a comma-separated CIDR list, trimming surrounding whitespace
/// from each element.
///
/// No validation happens here: a malformed element surfaces later as a
/// per-block parse failure and only skips that block, never the scan.
#[must_use]
pub fn parse_cidr_list(input: &str) -> Vec<String> {
    input.split(',').map(|s| s.trim().to_owned()).collect()
}

/// Normalizes a comma-separated, case-insensitive protocol list.
///
/// Entries outside `tcp`/`udp` are dropped and returned in the second
/// element so the caller can report them; duplicates collapse keeping
/// first-occurrence order. If nothing valid remains the full default
/// set `[tcp, udp]` is used, so this operation never fails.
#[must_use]
pub fn parse_protocols(input: &str) -> (Vec<Protocol>, Vec<String>) {
    let mut protocols = Vec::new();
    let mut ignored = Vec::new();

    for entry in input.split(',') {
        let entry = entry.trim().to_lowercase();
        if entry.is_empty() {
            continue;
        }
        let protocol = match entry.as_str() {
            "tcp" => Protocol::Tcp,
            "udp" => Protocol::Udp,
            _ => {
                ignored.push(entry);
                continue;
            }
        };
        if !protocols.contains(&protocol) {
            protocols.push(protocol);
        }
    }

    if protocols.is_empty() {
        protocols = vec![Protocol::Tcp, Protocol::Udp];
    }

    (protocols, ignored)
}

/// Normalizes a `start[,end]` port specification.
///
/// A missing or unparsable start defaults to 1 and a missing or
/// unparsable end to 65535; components past the second are ignored. A
/// parsable value outside 1..=65535 is reset to the same default with
/// a warning. The one unrecoverable case is an
/// effective start above the effective end, which fails with
/// [`ScanError::InvalidPortRange`].
pub fn parse_ports(input: &str) -> Result<PortRange, ScanError> {
    // Only the first two components matter; extras are ignored, so
    // "80,90,100" normalizes to 80..=90.
    let parts: Vec<&str> = input.split(',').collect();
    let start = normalize_port(parts.first().copied(), LOWEST_PORT_NUMBER);
    let end = normalize_port(parts.get(1).copied(), TOP_PORT_NUMBER);

    if start > end {
        return Err(ScanError::InvalidPortRange { start, end });
    }

    Ok(PortRange { start, end })
}

fn normalize_port(part: Option<&str>, fallback: u16) -> u16 {
    let Some(part) = part.map(str::trim).filter(|p| !p.is_empty()) else {
        return fallback;
    };
    match part.parse::<u32>() {
        Ok(port) if (u32::from(LOWEST_PORT_NUMBER)..=u32::from(TOP_PORT_NUMBER)).contains(&port) => {
            port as u16
        }
        Ok(port) => {
            warn!("port value {port} is outside 1-65535, using {fallback} instead");
            fallback
        }
        Err(_) => fallback,
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rangescan",
    version = env!("CARGO_PKG_VERSION"),
    max_term_width = 120,
    help_template = "{bin} {version}\n{about}\n\nUSAGE:\n    {usage}\n\nOPTIONS:\n{options}",
)]
/// Concurrent IPv4 CIDR and port reachability scanner.
/// Expands CIDR blocks into addresses and probes a port range over TCP
/// and/or UDP, reporting every endpoint that accepts a connection
/// within the timeout.
pub struct Opts {
    /// A comma-delimited list of CIDR blocks to be scanned.
    #[arg(long, default_value = "127.0.0.1/12")]
    pub ips: String,

    /// A comma-delimited, case-insensitive list of transport protocols
    /// (tcp, udp). Unsupported entries are dropped with a warning.
    #[arg(short = 'c', long = "protocol", alias = "pc", default_value = "tcp,udp")]
    pub protocol: String,

    /// Port range as 'start[,end]'. Missing pieces default to 1 and
    /// 65535 respectively.
    #[arg(short = 'p', long = "port", default_value = "1,65535")]
    pub port: String,

    /// The timeout in milliseconds before an endpoint is assumed to be
    /// unreachable.
    #[arg(short, long, default_value = "2000")]
    pub timeout: u32,

    /// How many addresses are probed concurrently. Caps the fan-out so
    /// wide blocks cannot exhaust file descriptors; within one address
    /// all protocol and port attempts stay sequential.
    #[arg(short, long, default_value = "4500")]
    pub batch_size: u16,

    /// Greppable mode. Only output reachable endpoints, one per line.
    #[arg(short, long)]
    pub greppable: bool,

    /// Accessible mode. Turns off features which negatively affect
    /// screen readers.
    #[arg(long)]
    pub accessible: bool,

    /// Whether to ignore the configuration file or not.
    #[arg(short, long)]
    pub no_config: bool,

    /// Custom path to config file
    #[arg(long, value_parser)]
    pub config_path: Option<PathBuf>,
}

impl Opts {
    /// Reads the command line arguments into an Opts struct.
    #[must_use]
    pub fn read() -> Self {
        Opts::parse()
    }

    /// Merges values found within the user configuration file into the
    /// command line arguments, unless the config file is ignored.
    pub fn merge(&mut self, config: &Config) {
        if self.no_config {
            return;
        }

        macro_rules! merge_field {
            ($($field: ident),+) => {
                $(
                    if let Some(e) = &config.$field {
                        self.$field = e.clone();
                    }
                )+
            }
        }

        merge_field!(ips, protocol, port, timeout, batch_size, greppable, accessible);
    }
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            ips: String::from("127.0.0.1/12"),
            protocol: String::from("tcp,udp"),
            port: String::from("1,65535"),
            timeout: 2000,
            batch_size: 4500,
            greppable: false,
            accessible: false,
            no_config: true,
            config_path: None,
        }
    }
}

/// Struct used to deserialize the options specified within our config
/// file. These are merged under the command line arguments in order to
/// produce the final Opts struct.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    ips: Option<String>,
    protocol: Option<String>,
    port: Option<String>,
    timeout: Option<u32>,
    batch_size: Option<u16>,
    greppable: Option<bool>,
    accessible: Option<bool>,
}

impl Config {
    /// Reads the configuration file with TOML format and parses it
    /// into a Config struct. A missing or malformed file degrades to
    /// the empty config with a warning; it never aborts the run.
    ///
    /// # Format
    ///
    /// ips = "10.0.0.0/29,192.168.0.0/30"
    /// protocol = "tcp"
    /// port = "1,1024"
    /// timeout = 500
    /// batch_size = 1000
    /// greppable = true
    #[must_use]
    pub fn read(custom_config_path: Option<PathBuf>) -> Self {
        let config_path = custom_config_path.unwrap_or_else(default_config_path);
        if !config_path.exists() {
            return Self::default();
        }

        let content = fs::read_to_string(config_path).unwrap_or_default();
        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!("found {e} in configuration file, ignoring it");
                Self::default()
            }
        }
    }
}

/// Constructs default path to config toml
#[must_use]
pub fn default_config_path() -> PathBuf {
    let mut config_path = dirs::home_dir().unwrap_or_default();
    config_path.push(".rangescan.toml");
    config_path
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use parameterized::parameterized;

    use super::{parse_cidr_list, parse_ports, parse_protocols, Config, Opts, PortRange, Protocol};
    use crate::error::ScanError;

    impl Config {
        fn sample() -> Self {
            Self {
                ips: Some("10.0.0.0/29".to_owned()),
                protocol: Some("tcp".to_owned()),
                port: Some("80,90".to_owned()),
                timeout: Some(250),
                batch_size: Some(1_000),
                greppable: Some(true),
                accessible: Some(true),
            }
        }
    }

    #[test]
    fn verify_cli() {
        Opts::command().debug_assert();
    }

    #[test]
    fn cidr_list_is_split_and_trimmed() {
        assert_eq!(
            parse_cidr_list(" 10.0.0.0/8 ,192.168.0.0/16"),
            vec!["10.0.0.0/8".to_owned(), "192.168.0.0/16".to_owned()]
        );
    }

    #[test]
    fn cidr_list_keeps_malformed_entries_for_later() {
        // Validation is deferred until each block is scanned.
        assert_eq!(
            parse_cidr_list("not-a-cidr,10.0.0.0/8"),
            vec!["not-a-cidr".to_owned(), "10.0.0.0/8".to_owned()]
        );
    }

    #[test]
    fn protocols_filter_and_report_unknown_entries() {
        let (protocols, ignored) = parse_protocols("tcp,foo,UDP");
        assert_eq!(protocols, vec![Protocol::Tcp, Protocol::Udp]);
        assert_eq!(ignored, vec!["foo".to_owned()]);
    }

    #[test]
    fn protocols_collapse_duplicates_keeping_order() {
        let (protocols, ignored) = parse_protocols("UDP,tcp,udp");
        assert_eq!(protocols, vec![Protocol::Udp, Protocol::Tcp]);
        assert!(ignored.is_empty());
    }

    #[test]
    fn protocols_default_when_empty_or_fully_filtered() {
        let (protocols, ignored) = parse_protocols("");
        assert_eq!(protocols, vec![Protocol::Tcp, Protocol::Udp]);
        assert!(ignored.is_empty());

        let (protocols, ignored) = parse_protocols("icmp,sctp");
        assert_eq!(protocols, vec![Protocol::Tcp, Protocol::Udp]);
        assert_eq!(ignored, vec!["icmp".to_owned(), "sctp".to_owned()]);
    }

    #[parameterized(input = {
        "",
        "2000",
        "80,443",
        ",9000",
        "0,80",
        "70000",
        "abc,def",
        "80,90,100",
        "80,abc,100",
    }, expected = {
        (1, 65535),
        (2000, 65535),
        (80, 443),
        (1, 9000),
        (1, 80),
        (1, 65535),
        (1, 65535),
        (80, 90),
        (80, 65535),
    })]
    fn ports_default_and_reset(input: &str, expected: (u16, u16)) {
        assert_eq!(
            parse_ports(input),
            Ok(PortRange {
                start: expected.0,
                end: expected.1
            })
        );
    }

    #[test]
    fn ports_ignore_components_past_the_second() {
        assert_eq!(
            parse_ports("80,90,100"),
            Ok(PortRange { start: 80, end: 90 })
        );
    }

    #[test]
    fn ports_reversed_range_is_fatal() {
        assert_eq!(
            parse_ports("5000,100"),
            Err(ScanError::InvalidPortRange {
                start: 5000,
                end: 100
            })
        );
    }

    #[test]
    fn opts_no_merge_when_config_is_ignored() {
        let mut opts = Opts::default();
        let config = Config::sample();

        opts.merge(&config);

        assert_eq!(opts.ips, "127.0.0.1/12");
        assert_eq!(opts.timeout, 2000);
        assert!(!opts.greppable);
    }

    #[test]
    fn opts_merge_config_fields() {
        let mut opts = Opts {
            no_config: false,
            ..Opts::default()
        };
        let config = Config::sample();

        opts.merge(&config);

        assert_eq!(opts.ips, "10.0.0.0/29");
        assert_eq!(opts.protocol, "tcp");
        assert_eq!(opts.port, "80,90");
        assert_eq!(opts.timeout, 250);
        assert_eq!(opts.batch_size, 1_000);
        assert!(opts.greppable);
        assert!(opts.accessible);
    }

    #[test]
    fn config_parses_toml_content() {
        let config: Config =
            toml::from_str("protocol = \"udp\"\nport = \"53,53\"\nbatch_size = 64\n").unwrap();

        assert_eq!(config.protocol.as_deref(), Some("udp"));
        assert_eq!(config.port.as_deref(), Some("53,53"));
        assert_eq!(config.batch_size, Some(64));
        assert!(config.ips.is_none());
    }
}
