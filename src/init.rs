use crate::config::FormatterConfig;
use crate::env::cargo_home;
use crate::formatter::JsonLineFormatter;
use crate::layer::JsonLogLayer;
use crate::record::Fields;
use crate::trace::TraceLayout;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the JSON logging layer.
///
/// **Fields**
/// - `formatter`: base path, fixed clock and trace settings used for
///   every record. The default groups frames of registry crates and the
///   standard library ([`TraceLayout::rust_toolchain`] under
///   [`cargo_home`]) rather than the `/vendor` layout of
///   [`FormatterConfig::default`].
/// - `max_level`: most verbose level that is still written.
/// - `channel`: channel name for every record; the event target is used
///   when `None`.
/// - `extra`: fields attached to every record, e.g. service name.
/// - `mirror_to_stderr`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   added on top and events are also printed for humans on stderr.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub formatter: FormatterConfig,
    pub max_level: LevelFilter,
    pub channel: Option<String>,
    pub extra: Fields,
    pub mirror_to_stderr: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            formatter: FormatterConfig::default().with_layout(TraceLayout::rust_toolchain(&cargo_home())),
            max_level: LevelFilter::INFO,
            channel: None,
            extra: Fields::new(),
            mirror_to_stderr: false,
        }
    }
}

/// Build a [`JsonLogLayer`] from `config` writing through `make_writer`.
pub fn build_layer<W>(config: LayerConfig, make_writer: W) -> JsonLogLayer<W>
where
    W: for<'a> MakeWriter<'a> + 'static,
{
    let mut layer = JsonLogLayer::new(JsonLineFormatter::new(config.formatter))
        .with_writer(make_writer)
        .with_max_level(config.max_level)
        .with_extra_fields(config.extra);
    if let Some(channel) = config.channel {
        layer = layer.with_channel(channel);
    }
    layer
}

/// Install a global `tracing` subscriber that writes JSON lines through
/// `make_writer`.
///
/// **Returns**
/// - `Err(SetGlobalDefaultError)` if a global subscriber was already set.
pub fn init_tracing_with_writer<W>(config: LayerConfig, make_writer: W) -> Result<(), SetGlobalDefaultError>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let mirror = config.mirror_to_stderr;
    let layer = build_layer(config, make_writer);

    // The two subscriber shapes have different types, so each branch
    // installs its own.
    if mirror {
        let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)
    }
}

/// Install a global subscriber writing JSON lines to stdout using
/// `config`.
pub fn init_tracing_with_config(config: LayerConfig) -> Result<(), SetGlobalDefaultError> {
    init_tracing_with_writer(config, std::io::stdout)
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`LayerConfig::default`].
pub fn init_tracing() -> Result<(), SetGlobalDefaultError> {
    init_tracing_with_config(LayerConfig::default())
}
