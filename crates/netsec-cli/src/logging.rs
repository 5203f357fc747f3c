use anyhow::{Context, Result};
use chrono::Local;
use log::LevelFilter;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name stamp for a log file, e.g. `15_10_2026_09_30_00.log`.
pub const LOG_FILE_FORMAT: &str = "%d_%m_%Y_%H_%M_%S";

pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("{}.log", Local::now().format(LOG_FILE_FORMAT)))
}

/// Install the global logger. Records go to a fresh file under `log_dir` when
/// given, to stderr otherwise. The filter defaults to `info` and is read from
/// `NETSEC_LOG`.
pub fn init_logging(log_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    let mut builder = env_logger::Builder::default();
    builder
        .filter_level(LevelFilter::Info)
        .parse_env(env_logger::Env::default().filter_or("NETSEC_LOG", "info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} {} - {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.line().unwrap_or(0),
                record.target(),
                record.level(),
                record.args()
            )
        });

    let log_file = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {:?}", dir))?;
            let path = log_file_path(dir);
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file: {:?}", path))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
            Some(path)
        }
        None => None,
    };

    builder.try_init().context("Logger already initialised")?;
    Ok(log_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_named_by_timestamp() {
        let path = log_file_path(Path::new("logs"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with(".log"));
        // dd_mm_YYYY_HH_MM_SS
        assert_eq!(name.trim_end_matches(".log").split('_').count(), 6);
        assert!(path.starts_with("logs"));
    }
}
