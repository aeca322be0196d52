//! Timezone lookup table generation.
//!
//! The firmware cannot keep a mutable associative container in flash, so the
//! mapping from an area/city pair to a POSIX timezone definition is generated
//! as code instead: an if/else chain over areas, and inside each area a
//! binary search decision tree over the sorted city names.

use indexmap::IndexMap;
use std::io::Read;

pub(crate) use emit::Artifacts;
use emit::{emit_cpp_header, emit_cpp_source, emit_selection_list};
use rust::emit_rust;
pub(crate) use table::LookupTable;

mod emit;
mod rust;
mod table;
#[cfg(test)]
mod tests;

/// The upstream zone database used when no other source is given.
pub const DEFAULT_SOURCE: &str =
    "https://raw.githubusercontent.com/nayarsystems/posix_tz_db/master/zones.csv";

/// The namespace tag prepended to every generated symbol.
pub const DEFAULT_PREFIX: &str = "TZ";

/// The symbol returned when an area/city pair is unknown.
pub const DEFAULT_FALLBACK: &str = "TZ_Etc_UTC";

/// The result type for timezone table operations.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors that may occur while building a timezone table.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The zone database CSV could not be parsed.
    #[error("malformed zone database: {0}")]
    Csv(#[from] csv::Error),

    /// A city appeared twice in the same area and duplicates were rejected.
    #[error("duplicate city '{city}' in area '{area}'")]
    DuplicateCity { area: String, city: String },

    /// The zone database could not be downloaded.
    #[error("could not fetch zone database: {0}")]
    Fetch(#[from] ureq::Error),

    /// A derived name cannot be used as an identifier in generated Rust.
    #[error("'{0}' is not a valid Rust identifier")]
    InvalidIdentifier(String),

    /// Writing generated code failed.
    #[error("code generation failed")]
    Format(#[from] core::fmt::Error),

    /// The zone database file could not be read.
    #[error("{1}: I/O error: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    /// A zone path had no area part. `line` is the 1-based input line.
    #[error("line {line}: zone '{zone}' has no area separator")]
    MissingSeparator { line: u64, zone: String },
}

/// Options for one run of the generator.
#[derive(Debug)]
pub struct Options<'a> {
    /// The namespace tag for symbols.
    pub prefix: &'a str,
    /// The symbol returned for unknown area/city pairs.
    pub fallback: &'a str,
    /// Where the dataset came from, recorded in the generated source.
    pub source: &'a str,
    /// Whether to also generate the Rust module.
    pub rust: bool,
}

impl Default for Options<'_> {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX,
            fallback: DEFAULT_FALLBACK,
            source: DEFAULT_SOURCE,
            rust: false,
        }
    }
}

/// Generates every artifact for a dataset. Nothing is written to disk, so a
/// failure part way through cannot leave a half-updated set of files.
pub fn generate(dataset: &Dataset, options: &Options<'_>) -> Result<Artifacts> {
    let table = LookupTable::new(dataset, options.prefix, options.fallback);
    for area in &table.areas {
        log::debug!(
            "{}: {} cities, first {:?}, last {:?}",
            area.area,
            area.sorted.len(),
            area.sorted.first(),
            area.sorted.last()
        );
    }

    let mut artifacts = Artifacts::default();
    emit_selection_list(&mut artifacts.selection_list, dataset)?;
    emit_cpp_header(&mut artifacts.cpp_header)?;
    emit_cpp_source(&mut artifacts.cpp_source, &table, options.source)?;
    if options.rust {
        artifacts.rust = Some(emit_rust(&table)?);
    }
    Ok(artifacts)
}

/// Fixed-length buffer sizes needed by the firmware to hold any area or city
/// name from the dataset, including the terminating NUL.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BufferLimits {
    /// Buffer length for an area name.
    pub area: usize,
    /// Buffer length for a city name.
    pub city: usize,
}

/// How to treat a city that appears more than once in the same area.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Duplicates {
    /// Keep every entry and log a warning. Only one branch of the generated
    /// search can ever match the duplicated name.
    #[default]
    Warn,
    /// Abort ingestion.
    Reject,
}

/// The zone database, grouped by area.
#[derive(Debug, Default)]
pub struct Dataset {
    /// Area name to city names, both in first-seen order.
    areas: IndexMap<String, Vec<String>>,
    /// The longest area name, in characters.
    area_max: usize,
    /// The longest city name, in characters.
    city_max: usize,
}

impl Dataset {
    /// Reads a headerless zone database CSV. Only the first column, the full
    /// zone path, is used.
    pub fn from_csv<R: Read>(reader: R, duplicates: Duplicates) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut dataset = Self::default();
        for record in reader.records() {
            let record = record?;
            let Some(zone) = record.get(0) else {
                continue;
            };
            // Blank lines produce no record, so the record index is not the
            // line number.
            let line = record.position().map_or(0, csv::Position::line);
            dataset.insert(line, zone, duplicates)?;
        }
        Ok(dataset)
    }

    /// Builds a dataset from zone paths like `Africa/Abidjan`.
    #[cfg(test)]
    pub fn from_zones<I, S>(zones: I, duplicates: Duplicates) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dataset = Self::default();
        for (line, zone) in (1..).zip(zones) {
            dataset.insert(line, zone.as_ref(), duplicates)?;
        }
        Ok(dataset)
    }

    /// Adds one zone path to the dataset. The path is split on the first `/`
    /// only; the remainder is the city, which may contain more separators.
    fn insert(&mut self, line: u64, zone: &str, duplicates: Duplicates) -> Result<()> {
        let (area, city) = zone.split_once('/').ok_or_else(|| Error::MissingSeparator {
            line,
            zone: zone.to_string(),
        })?;

        self.area_max = self.area_max.max(area.chars().count());
        self.city_max = self.city_max.max(city.chars().count());

        let cities = self.areas.entry(area.to_string()).or_default();
        if cities.iter().any(|existing| existing == city) {
            match duplicates {
                Duplicates::Warn => {
                    log::warn!("line {line}: duplicate city '{city}' in area '{area}'");
                }
                Duplicates::Reject => {
                    return Err(Error::DuplicateCity {
                        area: area.to_string(),
                        city: city.to_string(),
                    });
                }
            }
        }
        cities.push(city.to_string());
        Ok(())
    }

    /// Iterates over each area and its cities in first-seen order.
    pub fn areas(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.areas
            .iter()
            .map(|(area, cities)| (area.as_str(), cities.as_slice()))
    }

    /// The buffer sizes needed to hold any name in the dataset.
    pub fn limits(&self) -> BufferLimits {
        BufferLimits {
            area: self.area_max + 1,
            city: self.city_max + 1,
        }
    }

    /// The number of areas.
    pub fn area_count(&self) -> usize {
        self.areas.len()
    }

    /// The total number of zones across all areas.
    pub fn zone_count(&self) -> usize {
        self.areas.values().map(Vec::len).sum()
    }
}

/// Where the zone database is read from.
#[derive(Debug)]
pub enum Source {
    /// Downloaded over HTTP(S).
    Url(String),
    /// Read from a local file.
    File(std::path::PathBuf),
}

impl Source {
    /// Loads the raw CSV text.
    pub fn load(&self) -> Result<String> {
        match self {
            Source::Url(url) => {
                log::info!("Fetching zone database from {url}");
                let text = ureq::get(url)
                    .header(
                        "User-Agent",
                        format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
                    )
                    .call()?
                    .into_body()
                    .read_to_string()?;
                Ok(text)
            }
            Source::File(path) => {
                log::info!("Reading zone database from {}", path.display());
                std::fs::read_to_string(path).map_err(|err| Error::Io(err, path.clone()))
            }
        }
    }
}

impl core::fmt::Display for Source {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Source::Url(url) => f.write_str(url),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Derives the name of the timezone definition for an area/city pair, as
/// defined in the firmware’s master timezone table.
///
/// Path separators in the city become `_`, `-` becomes `m`, and `+` becomes
/// `p`, so `Etc/GMT-5` is `TZ_Etc_GMTm5`.
pub fn symbol(prefix: &str, area: &str, city: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + area.len() + city.len() + 2);
    out.push_str(prefix);
    out.push('_');
    out.push_str(area);
    out.push('_');
    out.extend(city.chars().map(|c| match c {
        '/' => '_',
        '-' => 'm',
        '+' => 'p',
        c => c,
    }));
    out
}
