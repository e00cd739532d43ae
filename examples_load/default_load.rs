use std::io;
use std::time::Instant;
use tracing::info;

use json_log_formatter::init::{init_tracing_with_writer, LayerConfig};

fn main() {
    // Lines go to io::sink so only formatting cost is measured.
    init_tracing_with_writer(LayerConfig::default(), io::sink).expect("set global subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        info!(iteration = i, "default load test event");
    }

    let elapsed = start.elapsed();
    println!("default config: formatted {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}
