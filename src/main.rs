//! Build-time helpers for the ESP8266 clock firmware.

use crate::{
    config::{ProjectDirs, opt_arg},
    tzdb::{
        DEFAULT_FALLBACK, DEFAULT_PREFIX, DEFAULT_SOURCE, Dataset, Duplicates, LookupTable, Source,
    },
};
use anyhow::Context as _;
use pico_args::Arguments;
use std::{
    path::{Path, PathBuf},
    time::Instant,
};

mod common;
mod config;
mod resource;
mod sign;
mod tzdb;

fn print_usage() {
    let exe = std::env::args().next().unwrap_or_default();
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    println!("Usage: {exe} <command> [options]\n");
    println!("Commands:");
    println!("    tz-update:       Generate the timezone lookup table and selection list");
    println!("    tz-lookup:       Show the symbol an area and city resolve to");
    println!("    embed-resources: Embed the data directory into the firmware");
    println!("    sign:            Sign a firmware image\n");
    println!("Common options:");
    println!("    --project-dir: Project root (default: $PROJECT_DIR or .)");
    println!("    --data-dir:    Data directory (default: $PROJECT_DATA_DIR or <project>/data)");
    println!("    --src-dir:     Source directory (default: $PROJECT_SRC_DIR or <project>/src)\n");
    println!("tz-update options:");
    println!("    --source:   Zone database URL (default: $TZ_SOURCE_URL or {DEFAULT_SOURCE})");
    println!("    --input:    Read the zone database from a file instead");
    println!("    --rust:     Also write a Rust lookup module to this path");
    println!("    --prefix:   Symbol prefix (default: {DEFAULT_PREFIX})");
    println!("    --fallback: Symbol for unknown zones (default: {DEFAULT_FALLBACK})");
    println!("    --strict:   Reject duplicate cities\n");
    println!("tz-lookup arguments:");
    println!("    [--source|--input] <area> <city>\n");
    println!("sign options:");
    println!("    --image:       Firmware image to sign (default: $FIRMWARE_IMAGE)");
    println!("    --out:         Signed output (default: <image>.signed.bin)");
    println!("    --private-key: Signing key (default: $PRIVATE_KEY or <project>/private.key)");
    println!("    --openssl:     openssl executable (default: $OPENSSL_PATH or openssl)");
}

fn usage<T>(err: &'static str) -> anyhow::Result<T> {
    print_usage();
    Err(anyhow::Error::msg(err))
}

/// Fails with usage information if any arguments were not consumed.
fn finish(args: Arguments) -> anyhow::Result<()> {
    if args.finish().is_empty() {
        Ok(())
    } else {
        usage("Unknown extra arguments passed")
    }
}

/// Writes a set of generated files so that either every one of them is
/// replaced or none is. Each file is staged next to its destination and only
/// renamed into place once all of them have been written.
fn write_outputs(outputs: &[(PathBuf, &str)]) -> anyhow::Result<()> {
    use std::io::Write as _;

    for (path, _) in outputs {
        let dir = parent_dir(path);
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut staged = Vec::with_capacity(outputs.len());
    for (path, contents) in outputs {
        let mut file = tempfile::Builder::new()
            .prefix(".clock-tools")
            .tempfile_in(parent_dir(path))
            .with_context(|| format!("staging {}", path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("writing {}", path.display()))?;
        staged.push((file, path));
    }

    for (file, path) in staged {
        file.persist(path)
            .with_context(|| format!("replacing {}", path.display()))?;
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}

/// The directory a file is written into.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Reads `--source` or `--input`.
fn zone_source(args: &mut Arguments) -> anyhow::Result<Source> {
    let url = opt_arg::<String>(args, "--source", "TZ_SOURCE_URL")?
        .unwrap_or_else(|| DEFAULT_SOURCE.to_string());
    let input = args.opt_value_from_str::<_, PathBuf>("--input")?;
    Ok(input.map_or(Source::Url(url), Source::File))
}

/// One run of the timezone table generator.
#[derive(Debug)]
struct TzUpdate {
    source: Source,
    rust_path: Option<PathBuf>,
    prefix: String,
    fallback: String,
    duplicates: Duplicates,
}

impl TzUpdate {
    fn from_args(args: &mut Arguments) -> anyhow::Result<Self> {
        let source = zone_source(args)?;
        let rust_path = args.opt_value_from_str("--rust")?;
        let prefix = args
            .opt_value_from_str("--prefix")?
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        let fallback = args
            .opt_value_from_str("--fallback")?
            .unwrap_or_else(|| DEFAULT_FALLBACK.to_string());
        let duplicates = if args.contains("--strict") {
            Duplicates::Reject
        } else {
            Duplicates::Warn
        };
        Ok(Self {
            source,
            rust_path,
            prefix,
            fallback,
            duplicates,
        })
    }

    /// Regenerates the selection list and lookup table of a project. Nothing
    /// is written unless every artifact was generated.
    fn run(&self, dirs: &ProjectDirs) -> anyhow::Result<()> {
        let text = self.source.load()?;

        let time = Instant::now();
        let dataset = Dataset::from_csv(text.as_bytes(), self.duplicates)?;
        log::info!(
            "Loaded {} zones in {} areas in {:.2?}",
            dataset.zone_count(),
            dataset.area_count(),
            time.elapsed()
        );

        let source_name = self.source.to_string();
        let options = tzdb::Options {
            prefix: &self.prefix,
            fallback: &self.fallback,
            source: &source_name,
            rust: self.rust_path.is_some(),
        };
        let artifacts = tzdb::generate(&dataset, &options)?;
        let limits = dataset.limits();
        log::info!(
            "Area buffer length {}, city buffer length {}",
            limits.area,
            limits.city
        );

        let mut outputs = vec![
            (dirs.data.join("TZ.js"), artifacts.selection_list.as_str()),
            (dirs.src.join("TZDB.h"), artifacts.cpp_header.as_str()),
            (dirs.src.join("TZDB.cpp"), artifacts.cpp_source.as_str()),
        ];
        if let (Some(path), Some(rust)) = (&self.rust_path, &artifacts.rust) {
            outputs.push((path.clone(), rust.as_str()));
        }
        write_outputs(&outputs)
    }
}

fn tz_update(mut args: Arguments) -> anyhow::Result<()> {
    let dirs = ProjectDirs::from_args(&mut args)?;
    let update = TzUpdate::from_args(&mut args)?;
    finish(args)?;
    update.run(&dirs)
}

fn tz_lookup(mut args: Arguments) -> anyhow::Result<()> {
    let source = zone_source(&mut args)?;
    let prefix = args
        .opt_value_from_str("--prefix")?
        .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
    let fallback = args
        .opt_value_from_str("--fallback")?
        .unwrap_or_else(|| DEFAULT_FALLBACK.to_string());
    let (Some(area), Some(city)) = (
        args.opt_free_from_str::<String>()?,
        args.opt_free_from_str::<String>()?,
    ) else {
        return usage("Missing area and city arguments");
    };
    finish(args)?;

    let text = source.load()?;
    let dataset = Dataset::from_csv(text.as_bytes(), Duplicates::Warn)?;
    let table = LookupTable::new(&dataset, &prefix, &fallback);
    if table.find(&area, &city).is_none() {
        log::warn!("{area}/{city} is not in the zone database");
    }
    println!("{}", table.lookup(&area, &city));
    Ok(())
}

fn embed_resources(mut args: Arguments) -> anyhow::Result<()> {
    let dirs = ProjectDirs::from_args(&mut args)?;
    finish(args)?;
    embed_project(&dirs)
}

/// Embeds the data directory of a project into its source directory.
fn embed_project(dirs: &ProjectDirs) -> anyhow::Result<()> {
    let embedded = resource::embed_dir(&dirs.data)?;
    log::info!(
        "Embedded {} files from {}",
        embedded.paths.len(),
        dirs.data.display()
    );
    write_outputs(&[
        (dirs.src.join("resource-data.h"), embedded.header.as_str()),
        (dirs.src.join("resource.cpp"), embedded.source.as_str()),
    ])
}

fn sign(mut args: Arguments) -> anyhow::Result<()> {
    let dirs = ProjectDirs::from_args(&mut args)?;
    let Some(image) = opt_arg::<PathBuf>(&mut args, "--image", "FIRMWARE_IMAGE")? else {
        return usage("Missing firmware image argument");
    };
    let out = args
        .opt_value_from_str::<_, PathBuf>("--out")?
        .unwrap_or_else(|| sign::signed_path(&image));
    let private_key = opt_arg::<PathBuf>(&mut args, "--private-key", "PRIVATE_KEY")?
        .unwrap_or_else(|| dirs.root.join("private.key"));
    let openssl = opt_arg::<String>(&mut args, "--openssl", "OPENSSL_PATH")?
        .unwrap_or_else(|| "openssl".to_string());
    finish(args)?;

    let signer = sign::Signer {
        openssl,
        private_key,
        public_key: dirs.data.join("public.key"),
    };
    log::info!("Signing {}", out.display());
    let len = signer.sign_file(&image, &out)?;
    log::info!("Appended {len} byte signature");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let mut args = Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        print_usage();
        return Ok(());
    }

    match args.subcommand()?.as_deref() {
        Some("tz-update") => tz_update(args),
        Some("tz-lookup") => tz_lookup(args),
        Some("embed-resources") => embed_resources(args),
        Some("sign") => sign(args),
        Some(_) => usage("Unknown command"),
        None => usage("Missing command"),
    }
}
