use crate::config::{LoggingConfig, Section};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::Level;
use tracing_subscriber::{filter::FilterFn, fmt};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

const DEFAULT_MAX_SIZE_MB: u64 = 100;

// -------- level helpers --------
fn parse_tracing_level(s: &str) -> Option<tracing::Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

// -------- filtering functions --------

type CrateFilter = FilterFn<Box<dyn Fn(&tracing::Metadata<'_>) -> bool + Send + Sync + 'static>>;

/// Everything at or below `max_level` that no explicit section claims.
fn create_default_filter_for_crates(
    crate_names: &[String],
    max_level: tracing::Level,
) -> CrateFilter {
    let crates = crate_names.to_vec();
    FilterFn::new(Box::new(move |meta: &tracing::Metadata<'_>| {
        let t = meta.target();
        if crates.iter().any(|c| matches_crate_prefix(t, c)) {
            return false;
        }
        meta.level() <= &max_level
    }))
}

/// Returns true if target == crate_name or target starts with "crate_name::"
fn matches_crate_prefix(target: &str, crate_name: &str) -> bool {
    target == crate_name
        || (target.starts_with(crate_name) && target[crate_name.len()..].starts_with("::"))
}

// -------- rotating writer for files --------
#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl RotWriter {
    fn handle(&self) -> RotWriterHandle {
        RotWriterHandle(Arc::clone(&self.0))
    }
}

impl<'a> fmt::MakeWriter<'a> for RotWriter {
    type Writer = RotWriterHandle;
    fn make_writer(&'a self) -> Self::Writer {
        self.handle()
    }
}

#[derive(Clone)]
struct RotWriterHandle(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().flush()
    }
}

// A writer handle that may be None (drops writes)
#[derive(Clone)]
struct RoutedWriterHandle(Option<RotWriterHandle>);

impl Write for RoutedWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.0 {
            Some(w) => w.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.0 {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Route log records to different files by target prefix
/// (e.g. "apiary", "api_ingress").
#[derive(Clone)]
struct MultiFileRouter {
    default: Option<RotWriter>,
    by_prefix: HashMap<String, RotWriter>,
}

impl MultiFileRouter {
    fn resolve_for(&self, target: &str) -> Option<RotWriterHandle> {
        self.by_prefix
            .iter()
            .find(|(crate_name, _)| matches_crate_prefix(target, crate_name))
            .map(|(_, wr)| wr.handle())
            .or_else(|| self.default.as_ref().map(RotWriter::handle))
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for MultiFileRouter {
    type Writer = RoutedWriterHandle;

    fn make_writer(&'a self) -> Self::Writer {
        RoutedWriterHandle(self.default.as_ref().map(RotWriter::handle))
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        RoutedWriterHandle(self.resolve_for(meta.target()))
    }
}

// -------- config extraction --------

struct ConfigData<'a> {
    default_section: Option<&'a Section>,
    crate_sections: Vec<(String, &'a Section)>,
    crate_names: Vec<String>,
}

fn extract_config_data(cfg: &LoggingConfig) -> ConfigData<'_> {
    let crate_sections = cfg
        .iter()
        .filter(|(k, _)| k.as_str() != "default")
        .map(|(k, v)| (k.clone(), v))
        .collect::<Vec<_>>();

    let crate_names = crate_sections.iter().map(|(n, _)| n.clone()).collect();

    ConfigData {
        default_section: cfg.get("default"),
        crate_sections,
        crate_names,
    }
}

// -------- path resolution helpers --------

/// Absolute paths are kept as-is; relative paths are joined with `base_dir`.
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// `max_backups` wins over `max_age_days`; with neither, files roll daily.
fn file_limit_for(section: &Section) -> FileLimit {
    match (section.max_backups, section.max_age_days) {
        (Some(files), _) => FileLimit::MaxFiles(files),
        (None, Some(days)) => FileLimit::Age(chrono::Duration::days(i64::from(days))),
        (None, None) => FileLimit::Age(chrono::Duration::days(1)),
    }
}

/// Create a rotating writer for log files, ensuring the parent directory exists.
fn create_rotating_writer_at_path(
    log_path: &Path,
    max_bytes: usize,
    limit: FileLimit,
) -> std::io::Result<RotWriter> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(limit),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

fn create_file_writer(name: &str, section: &Section, base_dir: &Path) -> Option<RotWriter> {
    if section.file.trim().is_empty() {
        return None;
    }

    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let log_path = resolve_log_path(&section.file, base_dir);

    match create_rotating_writer_at_path(&log_path, max_bytes as usize, file_limit_for(section)) {
        Ok(writer) => Some(writer),
        Err(e) => {
            // The subscriber is not installed yet.
            eprintln!(
                "Failed to init log file for '{}': {} ({})",
                name,
                log_path.to_string_lossy(),
                e
            );
            None
        }
    }
}

// -------- public init --------

/// Initialize logging from a configuration.
/// - `cfg`: LoggingConfig containing the logging sections
/// - `base_dir`: base directory used to resolve relative log file paths (usually server.home_dir)
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` → `tracing` before installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    let config_data = extract_config_data(cfg);
    let console_targets = build_console_targets(&config_data);
    let file_router = build_file_router(&config_data, base_dir);
    let file_targets = build_file_targets(&config_data);

    build_logging_layers(config_data, console_targets, file_targets, file_router);
}

fn init_default_logging() {
    let subscriber = tracing_subscriber::fmt()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn build_console_targets(config: &ConfigData) -> tracing_subscriber::filter::Targets {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::filter::Targets;

    let mut targets = Targets::new().with_default(LevelFilter::OFF);

    for (crate_name, section) in &config.crate_sections {
        if let Some(level) =
            parse_tracing_level(&section.console_level).map(LevelFilter::from_level)
        {
            targets = targets.with_target(crate_name.clone(), level);
        }
    }

    targets
}

fn build_file_router(config: &ConfigData, base_dir: &Path) -> MultiFileRouter {
    let default = config
        .default_section
        .and_then(|section| create_file_writer("default", section, base_dir));

    let by_prefix = config
        .crate_sections
        .iter()
        .filter_map(|(crate_name, section)| {
            create_file_writer(crate_name, section, base_dir).map(|w| (crate_name.clone(), w))
        })
        .collect();

    MultiFileRouter { default, by_prefix }
}

fn build_file_targets(config: &ConfigData) -> tracing_subscriber::filter::Targets {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::filter::Targets;

    let mut targets = Targets::new().with_default(LevelFilter::OFF);

    for (crate_name, section) in &config.crate_sections {
        if section.file.trim().is_empty() {
            continue;
        }

        if let Some(level) = parse_tracing_level(&section.file_level).map(LevelFilter::from_level) {
            targets = targets.with_target(crate_name.clone(), level);
        }
    }

    targets
}

type BoxedLayer = Box<dyn tracing_subscriber::Layer<tracing_subscriber::Registry> + Send + Sync>;

/// Console layers always; JSON file layers only when some sink has a file.
fn collect_layers(
    config: &ConfigData,
    console_targets: tracing_subscriber::filter::Targets,
    file_targets: tracing_subscriber::filter::Targets,
    file_router: MultiFileRouter,
    ansi: bool,
) -> Vec<BoxedLayer> {
    use tracing_subscriber::Layer;

    let mut layers: Vec<BoxedLayer> = vec![fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(console_targets)
        .boxed()];

    if let Some(level) = config
        .default_section
        .and_then(|section| parse_tracing_level(&section.console_level))
    {
        layers.push(
            fmt::layer()
                .with_ansi(ansi)
                .with_target(true)
                .with_level(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_filter(create_default_filter_for_crates(&config.crate_names, level))
                .boxed(),
        );
    }

    if file_router.is_empty() {
        return layers;
    }

    layers.push(
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(file_router.clone())
            .with_filter(file_targets)
            .boxed(),
    );

    if let Some(level) = config
        .default_section
        .filter(|_| file_router.default.is_some())
        .and_then(|section| parse_tracing_level(&section.file_level))
    {
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(file_router)
                .with_filter(create_default_filter_for_crates(&config.crate_names, level))
                .boxed(),
        );
    }

    layers
}

fn build_logging_layers(
    config: ConfigData,
    console_targets: tracing_subscriber::filter::Targets,
    file_targets: tracing_subscriber::filter::Targets,
    file_router: MultiFileRouter,
) {
    use tracing_subscriber::{layer::SubscriberExt, Registry};

    let ansi = std::io::stdout().is_terminal();
    let layers = collect_layers(&config, console_targets, file_targets, file_router, ansi);
    // `LogTracer` is already installed, so `try_init` would bail before setting the subscriber.
    let _ = tracing::subscriber::set_global_default(Registry::default().with(layers));
}

// =================== tests ===================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_logging_config, AppConfig};
    use std::fs;
    use tempfile::tempdir;

    fn section(file: &str) -> Section {
        Section {
            console_level: "info".into(),
            file: file.into(),
            file_level: "debug".into(),
            max_age_days: None,
            max_backups: Some(2),
            max_size_mb: Some(1),
        }
    }

    #[test]
    fn test_logging_level_parsing() {
        assert_eq!(parse_tracing_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_tracing_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_tracing_level("Info"), Some(Level::INFO));
        assert_eq!(parse_tracing_level("warn"), Some(Level::WARN));
        assert_eq!(parse_tracing_level("ERROR"), Some(Level::ERROR));
        assert_eq!(parse_tracing_level("off"), None);
        assert_eq!(parse_tracing_level("none"), None);
        assert_eq!(parse_tracing_level("invalid"), Some(Level::INFO));
    }

    #[test]
    fn test_crate_prefix_matching() {
        assert!(matches_crate_prefix("apiary", "apiary"));
        assert!(matches_crate_prefix("apiary::validation", "apiary"));
        assert!(!matches_crate_prefix("apiary_extra", "apiary"));
        assert!(!matches_crate_prefix("api_ingress", "apiary"));
    }

    #[test]
    fn test_extract_config_data_splits_default() {
        let mut cfg = default_logging_config();
        cfg.insert("apiary".into(), section("logs/apiary-core.log"));

        let data = extract_config_data(&cfg);
        assert!(data.default_section.is_some());
        assert_eq!(data.crate_sections.len(), 1);
        assert_eq!(data.crate_names, vec!["apiary".to_string()]);
    }

    #[test]
    fn test_file_limit_prefers_backups() {
        let mut s = section("x.log");
        assert!(matches!(file_limit_for(&s), FileLimit::MaxFiles(2)));
        s.max_backups = None;
        s.max_age_days = Some(7);
        assert!(matches!(file_limit_for(&s), FileLimit::Age(_)));
    }

    #[test]
    fn test_file_paths_resolved_against_home_dir() {
        let tmp = tempdir().unwrap();
        let base_dir = tmp.path();

        let resolved = resolve_log_path("logs/test.log", base_dir);
        assert!(resolved.starts_with(base_dir));
        assert!(resolved.ends_with("logs/test.log"));

        let absolute = base_dir.join("abs.log");
        assert_eq!(
            resolve_log_path(&absolute.to_string_lossy(), Path::new("/elsewhere")),
            absolute
        );
    }

    #[test]
    fn test_create_rotating_writer_at_path_creates_parent() {
        let tmp = tempdir().unwrap();
        let p = tmp.path().join("nested/dir/app.log");

        let res = create_rotating_writer_at_path(&p, 128 * 1024, FileLimit::MaxFiles(1));
        assert!(res.is_ok(), "writer should be created");
        assert!(p.parent().unwrap().exists(), "parent dir must be created");
    }

    #[test]
    fn test_router_sends_records_to_matching_file() {
        let tmp = tempdir().unwrap();
        let mut cfg = LoggingConfig::new();
        cfg.insert("default".into(), section("logs/default.log"));
        cfg.insert("apiary".into(), section("logs/apiary.log"));

        let data = extract_config_data(&cfg);
        let router = build_file_router(&data, tmp.path());
        assert!(!router.is_empty());

        let mut core = router.resolve_for("apiary::dispatcher").unwrap();
        core.write_all(b"dispatched\n").unwrap();
        core.flush().unwrap();
        let mut server = router.resolve_for("pancake_server").unwrap();
        server.write_all(b"started\n").unwrap();
        server.flush().unwrap();

        let apiary = fs::read_to_string(tmp.path().join("logs/apiary.log")).unwrap();
        let default = fs::read_to_string(tmp.path().join("logs/default.log")).unwrap();
        assert_eq!(apiary, "dispatched\n");
        assert_eq!(default, "started\n");
    }

    #[test]
    fn test_layers_without_file_sinks_are_console_only() {
        let tmp = tempdir().unwrap();
        let mut cfg = LoggingConfig::new();
        cfg.insert("default".into(), section(""));

        let data = extract_config_data(&cfg);
        let router = build_file_router(&data, tmp.path());
        let layers = collect_layers(
            &data,
            build_console_targets(&data),
            build_file_targets(&data),
            router,
            false,
        );
        assert_eq!(layers.len(), 2);
    }

    #[test]
    fn test_layers_with_file_sinks_include_json_writers() {
        let tmp = tempdir().unwrap();
        let mut cfg = LoggingConfig::new();
        cfg.insert("default".into(), section("logs/default.log"));
        cfg.insert("apiary".into(), section("logs/apiary.log"));

        let data = extract_config_data(&cfg);
        let router = build_file_router(&data, tmp.path());
        let sink = router.clone();
        let layers = collect_layers(
            &data,
            build_console_targets(&data),
            build_file_targets(&data),
            router,
            false,
        );
        assert_eq!(layers.len(), 4);

        let subscriber = {
            use tracing_subscriber::layer::SubscriberExt;
            tracing_subscriber::Registry::default().with(layers)
        };
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "apiary::dispatcher", "dispatched");
        });
        sink.resolve_for("apiary").unwrap().flush().unwrap();

        let written = fs::read_to_string(tmp.path().join("logs/apiary.log")).unwrap();
        assert!(written.contains("dispatched"));
    }

    #[test]
    fn test_empty_file_disables_sink() {
        let tmp = tempdir().unwrap();
        let mut cfg = LoggingConfig::new();
        cfg.insert("default".into(), section(""));

        let data = extract_config_data(&cfg);
        let router = build_file_router(&data, tmp.path());
        assert!(router.is_empty());
        assert!(router.resolve_for("anything").is_none());

        let mut dropped = RoutedWriterHandle(None);
        assert_eq!(dropped.write(b"lost").unwrap(), 4);
    }

    #[test]
    fn test_config_logging_integration_with_base_dir() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("test_config.yaml");
        let home = temp_dir.path().join("home");

        let yaml_content = format!(
            r#"
server:
  home_dir: "{}"
  host: "127.0.0.1"
  port: 8088

logging:
  default:
    console_level: info
    file: ""
    file_level: debug
  api_ingress:
    console_level: debug
    file: "logs/api_test.log"
    file_level: warn
    max_size_mb: 5
    max_backups: 2
"#,
            home.to_string_lossy().replace('\\', "/")
        );

        fs::write(&config_path, yaml_content).unwrap();

        let config = AppConfig::load_layered(&config_path).unwrap();
        let logging = config.logging.as_ref().unwrap();
        assert_eq!(logging["api_ingress"].max_backups, Some(2));

        let abs = resolve_log_path(
            &logging["api_ingress"].file,
            Path::new(&config.server.home_dir),
        );
        assert!(abs.starts_with(&config.server.home_dir));
        assert!(abs.ends_with("logs/api_test.log"));
    }
}
