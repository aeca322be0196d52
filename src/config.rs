//! Command line and environment configuration.
//!
//! Every path can be given as an option, or through the environment variables
//! PlatformIO sets for extra scripts, or is derived from the project directory.

use pico_args::Arguments;
use std::path::PathBuf;

/// The directories of the firmware project being built.
#[derive(Debug)]
pub struct ProjectDirs {
    /// The project root, holding `platformio.ini`.
    pub root: PathBuf,
    /// The data directory, embedded into the firmware.
    pub data: PathBuf,
    /// The source directory, where generated code goes.
    pub src: PathBuf,
}

impl ProjectDirs {
    /// Reads the project directories from `--project-dir`, `--data-dir`, and
    /// `--src-dir`.
    pub fn from_args(args: &mut Arguments) -> anyhow::Result<Self> {
        let root = opt_arg(args, "--project-dir", "PROJECT_DIR")?;
        let data = opt_arg(args, "--data-dir", "PROJECT_DATA_DIR")?;
        let src = opt_arg(args, "--src-dir", "PROJECT_SRC_DIR")?;
        Ok(Self::new(root, data, src))
    }

    /// Fills in any directory not given from the project root, which itself
    /// defaults to the working directory.
    pub fn new(root: Option<PathBuf>, data: Option<PathBuf>, src: Option<PathBuf>) -> Self {
        let root = root.unwrap_or_else(|| PathBuf::from("."));
        let data = data.unwrap_or_else(|| root.join("data"));
        let src = src.unwrap_or_else(|| root.join("src"));
        Self { root, data, src }
    }
}

/// Reads an option from the command line, falling back to the environment
/// variable `key`.
pub fn opt_arg<T>(
    args: &mut Arguments,
    name: &'static str,
    key: &str,
) -> anyhow::Result<Option<T>>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    if let Some(value) = args.opt_value_from_str(name)? {
        Ok(Some(value))
    } else if let Ok(value) = std::env::var(key) {
        value
            .parse()
            .map(Some)
            .map_err(|err| anyhow::anyhow!("invalid value for {key}: {err}"))
    } else {
        Ok(None)
    }
}
