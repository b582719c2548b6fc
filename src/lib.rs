//! This crate exposes the internal functionality of the rangescan
//! network scanner.
//!
//! rangescan expands IPv4 CIDR blocks into addresses and probes a port
//! range over TCP and/or UDP, reporting each `protocol://ip:port`
//! endpoint that accepts a connection within a fixed timeout.
//!
//! ## Architecture Overview
//!
//! 1. **Input normalization**: the CIDR list, protocol list and port
//!    range are parsed and normalized by [`input`]; fatal errors stop
//!    the run before any probing starts.
//! 2. **Address arithmetic**: [`codec`] converts between dotted-quad
//!    text and 32-bit integers, decomposes arbitrary address ranges
//!    into minimal CIDR block sets and back.
//! 3. **Enumeration**: [`range`] lazily walks every address of a
//!    block, network and broadcast addresses included.
//! 4. **Probing**: [`scanner::Scanner`] fans out one sequential
//!    protocol-by-port sweep per address, capped by a batch size, and
//!    resolves once every sweep has completed.
//!
//! ## Basic Usage Example
//!
//! The address arithmetic is usable on its own:
//!
//! ```rust
//! use rangescan::codec::{range_to_cidrs, to_integer};
//!
//! let start = to_integer("10.0.0.1")?;
//! let end = to_integer("10.0.0.6")?;
//!
//! let blocks = range_to_cidrs(start, end)?;
//! let rendered: Vec<String> = blocks.iter().map(ToString::to_string).collect();
//!
//! assert_eq!(rendered, ["10.0.0.1/32", "10.0.0.2/31", "10.0.0.4/31", "10.0.0.6/32"]);
//! # Ok::<(), rangescan::error::ScanError>(())
//! ```
//!
//! And a scan against localhost:
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use rangescan::input::{Protocol, PortRange};
//! use rangescan::scanner::Scanner;
//!
//! # #[tokio::main] async fn main() {
//! let scanner = Scanner::new(
//!     "127.0.0.1/32".parse().unwrap(),   // Target CIDR block
//!     &[Protocol::Tcp],                  // Transport protocols, in order
//!     PortRange { start: 1, end: 1024 }, // Port range, probed ascending
//!     Duration::from_millis(500),        // Per-attempt timeout
//!     100,                               // Concurrent addresses (batch size)
//!     true,                              // Greppable output (quiet mode)
//!     true,                              // Accessibility mode
//! );
//!
//! let reachable = scanner.run().await;
//! for result in &reachable {
//!     println!("{}://{}:{}", result.protocol, rangescan::codec::to_text(result.addr), result.port);
//! }
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Parameter errors are explicit [`error::ScanError`] values; the
//! library never terminates the process. A connection failure or
//! timeout during probing is not an error at all, it is the expected
//! "unreachable" outcome.
#![warn(missing_docs)]

pub mod codec;

pub mod error;

pub mod input;

pub mod range;

pub mod scanner;
