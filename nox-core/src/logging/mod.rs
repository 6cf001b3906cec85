//! Nox logging setup
//!
//! The crate logs through the standard `log` facade (`debug!` for routing
//! decisions, `info!` for loading and schema sync, `warn!` for destructive
//! DDL, `error!` for recursion aborts). [`init_logging`] installs an
//! `env_logger` backend rendering either human-readable or JSON lines.
//!
//! # Example
//!
//! ```rust,no_run
//! use nox_core::config::NoxConfig;
//!
//! let config = NoxConfig::load()?;
//! nox_core::logging::init_logging(&config.logging)?;
//!
//! log::info!("Router ready");
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::io::Write;
use std::sync::Once;

use crate::config::{LogFormat, LoggingConfig};

static INIT: Once = Once::new();

/// Initialize the Nox logging system
///
/// Safe to call multiple times; only the first call installs the logger.
/// A logger installed by someone else is left in place.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    config.validate()?;
    INIT.call_once(|| {
        if let Err(e) = init_logging_internal(config) {
            eprintln!("nox: logger not installed: {}", e);
        }
    });
    Ok(())
}

fn init_logging_internal(config: &LoggingConfig) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&config.level);

    match config.format {
        LogFormat::Human => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{} {:5} [{}] {}",
                    buf.timestamp_millis(),
                    record.level(),
                    record.target(),
                    record.args()
                )
            });
        }
        LogFormat::Json => {
            builder.format(|buf, record| writeln!(buf, "{}", json_line(record)));
        }
    }

    builder.try_init()?;
    Ok(())
}

/// Render a record as one JSON object
fn json_line(record: &log::Record<'_>) -> String {
    let mut json = serde_json::Map::new();
    json.insert("timestamp".to_string(), chrono::Utc::now().to_rfc3339().into());
    json.insert("level".to_string(), record.level().as_str().into());
    json.insert("target".to_string(), record.target().into());
    json.insert("message".to_string(), record.args().to_string().into());
    if let (Some(file), Some(line)) = (record.file(), record.line()) {
        json.insert("file".to_string(), file.into());
        json.insert("line".to_string(), line.into());
    }
    serde_json::Value::Object(json).to_string()
}
