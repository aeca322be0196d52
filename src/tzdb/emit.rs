//! C++ and JavaScript renderings of the lookup table.

use super::{
    Dataset,
    table::{AreaTable, LookupTable, Node},
};
use crate::common::{CString, GENERATED_BANNER, sanitize_identifier};
use core::fmt;
use indexmap::IndexMap;

/// Every file produced by one run of the timezone generator.
#[derive(Debug, Default)]
pub struct Artifacts {
    /// `TZ.js`, the area/city choices for the settings page.
    pub selection_list: String,
    /// `TZDB.h`.
    pub cpp_header: String,
    /// `TZDB.cpp`.
    pub cpp_source: String,
    /// The optional Rust module.
    pub rust: Option<String>,
}

/// The selection list as serialised for the settings page.
#[derive(serde::Serialize)]
#[serde(transparent)]
struct SelectionList<'a>(IndexMap<&'a str, &'a [String]>);

/// Writes the area/city selection list consumed by the settings page. Cities
/// are listed in their original order.
pub fn emit_selection_list<W: fmt::Write + ?Sized>(
    out: &mut W,
    dataset: &Dataset,
) -> fmt::Result {
    let list = SelectionList(dataset.areas().collect());
    let json = serde_json::to_string(&list).map_err(|_| fmt::Error)?;
    writeln!(out, "{GENERATED_BANNER}var tz_cities = {json};")
}

/// Writes `TZDB.h`.
pub fn emit_cpp_header<W: fmt::Write + ?Sized>(out: &mut W) -> fmt::Result {
    write!(
        out,
        r#"{GENERATED_BANNER}
#ifndef ESP8266Clock_TZDB_H
#define ESP8266Clock_TZDB_H

#include <Arduino.h>
#include <TZ.h>

namespace TZDB {{
/**
 * @brief Finds the timezone definition for an area/city pair.
 *
 * @return PGM_P the timezone string to pass to configTime()
 * @return nullptr if the area/city pair is unknown
 */
PGM_P findTZ(const String &area, const String &city);

/**
 * @brief Gets the timezone definition for an area/city pair, or the fallback
 * timezone if the pair is unknown.
 */
PGM_P getTZ(const String &area, const String &city);

/// Buffer size for the longest area name, including the terminator.
extern const size_t area_maxlength;

/// Buffer size for the longest city name, including the terminator.
extern const size_t city_maxlength;
}} // namespace TZDB

#endif // ESP8266Clock_TZDB_H
"#
    )
}

/// Writes `TZDB.cpp`. `source` names where the zone data came from.
pub fn emit_cpp_source<W: fmt::Write + ?Sized>(
    out: &mut W,
    table: &LookupTable<'_>,
    source: &str,
) -> fmt::Result {
    write!(
        out,
        r#"{GENERATED_BANNER}//
// This database is autogenerated from IANA timezone database
//      https://www.iana.org/time-zones
// via: {source}

#include "TZDB.h"

namespace {{
"#
    )?;

    for (index, area) in table.areas.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "PGM_P {}(const char *c) {{", area_function(index, area))?;
        if area.root.has_split() {
            writeln!(out, "  int r;")?;
        }
        emit_node(out, table, area.area, &area.root, 1)?;
        writeln!(out, "}}")?;
    }

    write!(
        out,
        r#"
}} // namespace

PGM_P TZDB::findTZ(const String &area, const String &city) {{
  const char *a = area.c_str();
  const char *c = city.c_str();
"#
    )?;

    for (index, area) in table.areas.iter().enumerate() {
        writeln!(
            out,
            "  {}if (strcmp_P(a, PSTR({})) == 0) return {}(c);",
            if index == 0 { "" } else { "else " },
            CString(area.area),
            area_function(index, area)
        )?;
    }

    let fallback = table.fallback;
    let limits = table.limits;
    write!(
        out,
        r#"  return nullptr;
}}

PGM_P TZDB::getTZ(const String &area, const String &city) {{
  PGM_P tz = findTZ(area, city);
  return tz != nullptr ? tz : {fallback};
}}

const size_t TZDB::area_maxlength = {};
const size_t TZDB::city_maxlength = {};
"#,
        limits.area, limits.city
    )
}

/// The name of the generated search function for an area. The index keeps
/// names unique even if two areas sanitise to the same identifier.
fn area_function(index: usize, area: &AreaTable<'_>) -> String {
    format!("area{index}_{}", sanitize_identifier(area.area))
}

/// Writes the statements for one decision node, indented two spaces per
/// level of `depth`.
fn emit_node<W: fmt::Write + ?Sized>(
    out: &mut W,
    table: &LookupTable<'_>,
    area: &str,
    node: &Node<'_>,
    depth: usize,
) -> fmt::Result {
    let ws = "  ".repeat(depth);
    match node {
        Node::Leaf(city) => {
            writeln!(
                out,
                "{ws}if (strcmp_P(c, PSTR({})) == 0) return {};",
                CString(city),
                table.symbol(area, city)
            )?;
            writeln!(out, "{ws}else return nullptr;")
        }
        Node::Pair(first, second) => {
            writeln!(
                out,
                "{ws}if (strcmp_P(c, PSTR({})) == 0) return {};",
                CString(first),
                table.symbol(area, first)
            )?;
            writeln!(
                out,
                "{ws}else if (strcmp_P(c, PSTR({})) == 0) return {};",
                CString(second),
                table.symbol(area, second)
            )?;
            writeln!(out, "{ws}else return nullptr;")
        }
        Node::Split {
            pivot,
            less,
            greater,
        } => {
            writeln!(out, "{ws}r = strcmp_P(c, PSTR({}));", CString(pivot))?;
            writeln!(out, "{ws}if (r < 0) {{")?;
            emit_node(out, table, area, less, depth + 1)?;
            writeln!(out, "{ws}}} else if (r > 0) {{")?;
            emit_node(out, table, area, greater, depth + 1)?;
            writeln!(out, "{ws}}} else {{")?;
            writeln!(out, "{ws}  return {};", table.symbol(area, pivot))?;
            writeln!(out, "{ws}}}")
        }
    }
}
