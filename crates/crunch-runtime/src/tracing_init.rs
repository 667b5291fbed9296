use std::fmt::{self as stdfmt, Write as _};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use crunch_config::{LogFormat, LoggingConfig};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::format::{DefaultFields, Writer};
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{self, FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

// ---------------------------------------------------------------------------
// FileFields — keeps the file layer's span field cache apart from stderr's
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FileFields(DefaultFields);

impl<'writer> FormatFields<'writer> for FileFields {
    fn format_fields<R: tracing_subscriber::field::RecordFields>(
        &self,
        writer: Writer<'writer>,
        fields: R,
    ) -> stdfmt::Result {
        self.0.format_fields(writer, fields)
    }
}

// ---------------------------------------------------------------------------
// DomainFormat — `[domain]` prefix for plain output
// ---------------------------------------------------------------------------

/// Plain-text event format that lifts the `domain` field into a prefix:
///
/// ```text
/// 2026-03-02T09:12:44Z  INFO [sys] executor finished records=120 events=4
/// ```
///
/// Events without a domain (dependencies, `log` records from the core
/// crate) are printed without the prefix.
pub struct DomainFormat {
    timer: SystemTime,
}

impl DomainFormat {
    pub fn new() -> Self {
        Self { timer: SystemTime }
    }
}

impl Default for DomainFormat {
    fn default() -> Self {
        Self::new()
    }
}

/// Write `text` wrapped in an SGR sequence when the writer supports ANSI.
fn paint(writer: &mut Writer<'_>, ansi: bool, sgr: &str, text: impl stdfmt::Display) -> stdfmt::Result {
    if ansi {
        write!(writer, "\x1b[{sgr}m{text}\x1b[0m")
    } else {
        write!(writer, "{text}")
    }
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::ERROR => "31",
        Level::WARN => "33",
        Level::INFO => "32",
        Level::DEBUG => "34",
        Level::TRACE => "35",
    }
}

impl<S, N> FormatEvent<S, N> for DomainFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        let ansi = writer.has_ansi_escapes();

        let mut stamp = String::new();
        if self.timer.format_time(&mut Writer::new(&mut stamp)).is_err() {
            stamp.push_str("<unknown time>");
        }
        paint(&mut writer, ansi, "2", stamp)?;

        let level = *event.metadata().level();
        write!(writer, " ")?;
        paint(&mut writer, ansi, level_color(level), format_args!("{level:>5}"))?;
        write!(writer, " ")?;

        let mut fields = FieldSplitter::default();
        event.record(&mut fields);

        if let Some(domain) = &fields.domain {
            paint(&mut writer, ansi, "1;36", format_args!("[{domain}]"))?;
            write!(writer, " ")?;
        }

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                paint(&mut writer, ansi, "1", span.name())?;
                write!(writer, "{{")?;
                let ext = span.extensions();
                if let Some(span_fields) = ext.get::<FormattedFields<N>>()
                    && !span_fields.is_empty()
                {
                    write!(writer, "{span_fields}")?;
                }
                write!(writer, "}}: ")?;
            }
        }

        write!(writer, "{}", fields.message)?;
        if !fields.rest.is_empty() {
            write!(writer, " ")?;
            paint(&mut writer, ansi, "3", &fields.rest)?;
        }
        writeln!(writer)
    }
}

// ---------------------------------------------------------------------------
// FieldSplitter — separates domain and message from the other fields
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FieldSplitter {
    domain: Option<String>,
    message: String,
    rest: String,
}

impl FieldSplitter {
    fn push_field(&mut self, name: &str, value: impl stdfmt::Display) {
        if !self.rest.is_empty() {
            self.rest.push(' ');
        }
        write!(self.rest, "{name}={value}").ok();
    }
}

impl Visit for FieldSplitter {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "domain" => self.domain = Some(value.to_string()),
            "message" => self.message = value.to_string(),
            name => self.push_field(name, format_args!("{value:?}")),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn stdfmt::Debug) {
        match field.name() {
            "domain" => {
                self.domain = Some(format!("{value:?}").trim_matches('"').to_string());
            }
            "message" => {
                write!(self.message, "{value:?}").ok();
            }
            name => self.push_field(name, format_args!("{value:?}")),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push_field(field.name(), value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push_field(field.name(), value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push_field(field.name(), value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push_field(field.name(), value);
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Install the global `tracing` subscriber described by `config`.
///
/// `RUST_LOG`, when set, replaces the configured directives. A relative
/// `config.file` resolves against `base_dir`. The returned guard flushes the
/// file writer on drop and must be held for the life of the process.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig, base_dir: &Path) -> Result<Option<WorkerGuard>> {
    let mut layers: Vec<BoxedLayer> = vec![stderr_layer(config.format, build_filter(config)?)];

    let guard = match &config.file {
        Some(file) => {
            let (writer, guard) = open_log_file(&resolve_log_path(file, base_dir))?;
            layers.push(file_layer(config.format, writer, build_filter(config)?));
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow!("tracing already initialised: {e}"))?;
    Ok(guard)
}

/// Filter directives: `RUST_LOG` if set, else `level` plus per-module
/// overrides.
pub fn filter_directives(config: &LoggingConfig) -> String {
    if let Ok(env) = std::env::var("RUST_LOG") {
        return env;
    }
    let mut modules: Vec<_> = config.modules.iter().collect();
    modules.sort();
    modules
        .into_iter()
        .fold(config.level.clone(), |mut acc, (module, level)| {
            write!(acc, ",{module}={level}").ok();
            acc
        })
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = filter_directives(config);
    EnvFilter::try_new(&directives).with_context(|| format!("invalid log filter '{directives}'"))
}

fn resolve_log_path(file: &Path, base_dir: &Path) -> PathBuf {
    if file.is_relative() {
        base_dir.join(file)
    } else {
        file.to_path_buf()
    }
}

fn open_log_file(path: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    let dir = path
        .parent()
        .ok_or_else(|| anyhow!("log file path has no parent directory"))?;
    let name = path
        .file_name()
        .ok_or_else(|| anyhow!("log file path has no file name"))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create log directory {}", dir.display()))?;
    let appender = tracing_appender::rolling::never(dir, name);
    Ok(tracing_appender::non_blocking(appender))
}

fn stderr_layer(format: LogFormat, filter: EnvFilter) -> BoxedLayer {
    match format {
        // JSON keeps `domain` as a plain field so consumers can query it
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Plain => fmt::layer()
            .event_format(DomainFormat::new())
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_layer(format: LogFormat, writer: NonBlocking, filter: EnvFilter) -> BoxedLayer {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .fmt_fields(FileFields::default())
            .with_target(false)
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        LogFormat::Plain => fmt::layer()
            .event_format(DomainFormat::new())
            .fmt_fields(FileFields::default())
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    }
}
