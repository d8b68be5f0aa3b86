use console::style;
use env_logger::{Builder, Env, Target};
use log::Level;
use std::fs::OpenOptions;
use std::io::Write;
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;
use tilerun_core::{Result, TileError, identity};

/// Initialize the logger.
///
/// Lines go to `path` when set, stderr otherwise, and carry the identity of
/// the process that wrote them (`main`, `pidns`, or `tile:ordinal`).
/// Returns the log file descriptor so sandboxes can keep it open.
pub fn init_logger(verbose: bool, level: &str, path: Option<&Path>) -> Result<Option<RawFd>> {
    let default_level = if verbose { "debug" } else { level };
    let env = Env::default().filter_or("RUST_LOG", default_level);

    let mut builder = Builder::from_env(env);
    builder.format(|buf, record| {
        let level = match record.level() {
            Level::Error => format!("{}", style("ERROR").red().bold()),
            Level::Warn => format!("{}", style("WARN ").yellow().bold()),
            Level::Info => format!("{}", style("INFO ").green()),
            Level::Debug => format!("{}", style("DEBUG").cyan()),
            Level::Trace => format!("{}", style("TRACE").dim()),
        };
        writeln!(buf, "{} [{}] {}", level, identity::label(), record.args())
    });

    let mut log_fd = None;
    if let Some(path) = path {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                TileError::Configuration(format!("failed to open log {}: {}", path.display(), e))
            })?;
        log_fd = Some(file.as_raw_fd());
        console::set_colors_enabled(false);
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder
        .try_init()
        .map_err(|e| TileError::Configuration(format!("logger already set: {}", e)))?;
    Ok(log_fd)
}
