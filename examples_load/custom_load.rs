use std::io;
use std::time::Instant;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

use json_log_formatter::env::cargo_home;
use json_log_formatter::init::{init_tracing_with_writer, LayerConfig};
use json_log_formatter::{FieldValue, FormatterConfig, TraceLayout};

#[derive(Debug, thiserror::Error)]
#[error("upstream timed out")]
struct UpstreamTimeout {
    #[source]
    source: io::Error,
}

fn main() {
    let formatter = FormatterConfig::default()
        .with_base_path(env!("CARGO_MANIFEST_DIR"))
        .with_call_site_window(0, None)
        .with_layout(TraceLayout::rust_toolchain(&cargo_home()));

    let mut layer_config = LayerConfig {
        formatter,
        max_level: LevelFilter::ERROR,
        channel: Some("load-test".to_string()),
        ..LayerConfig::default()
    };
    layer_config
        .extra
        .insert("service".to_string(), FieldValue::from("custom_load"));

    init_tracing_with_writer(layer_config, io::sink).expect("set global subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        let err = UpstreamTimeout {
            source: io::Error::new(io::ErrorKind::TimedOut, "read timed out"),
        };
        error!(iteration = i, error = &err as &(dyn std::error::Error + 'static), "custom load test error");
    }

    let elapsed = start.elapsed();
    println!("custom config: formatted {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}
