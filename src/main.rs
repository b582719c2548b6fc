//! Binary entry point: argument handling, parameter normalization and
//! the per-CIDR scan loop.
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::Context;
use colored::Colorize;
use log::warn;

use rangescan::codec::{to_text, CidrBlock};
use rangescan::input::{parse_cidr_list, parse_ports, parse_protocols, Config, Opts};
use rangescan::scanner::Scanner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut opts = Opts::read();
    let config = Config::read(opts.config_path.clone());
    opts.merge(&config);

    let cidrs = parse_cidr_list(&opts.ips);

    let (protocols, ignored) = parse_protocols(&opts.protocol);
    if !ignored.is_empty() {
        warn!(
            "following protocols are not supported and will be ignored: {}",
            ignored.join(",")
        );
    }

    // The one unrecoverable normalization failure: aborts before any
    // probing starts.
    let ports = parse_ports(&opts.port)
        .with_context(|| format!("not able to parse 'port' parameter value {:?}", opts.port))?;

    let timeout = Duration::from_millis(u64::from(opts.timeout));
    let started = Instant::now();
    let mut reachable = 0usize;
    let mut skipped = 0usize;

    for cidr in &cidrs {
        let block = match CidrBlock::from_str(cidr) {
            Ok(block) => block,
            Err(e) => {
                // A single bad entry must not block the rest of the list.
                warn!("skipping {cidr:?}: {e}");
                skipped += 1;
                continue;
            }
        };

        let scanner = Scanner::new(
            block,
            &protocols,
            ports,
            timeout,
            opts.batch_size,
            opts.greppable,
            opts.accessible,
        );
        let results = scanner.run().await;

        reachable += results.len();
        if opts.greppable {
            for result in &results {
                println!(
                    "{}://{}:{}",
                    result.protocol,
                    to_text(result.addr),
                    result.port
                );
            }
        }
    }

    if !opts.greppable {
        let summary = format!(
            "Scanned {} block(s) ({skipped} skipped) in {:.2?}: {reachable} reachable endpoint(s)",
            cidrs.len() - skipped,
            started.elapsed()
        );
        if opts.accessible {
            println!("{summary}");
        } else {
            println!("{}", summary.green());
        }
    }

    Ok(())
}
