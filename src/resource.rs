//! Embeds the firmware’s data directory into generated C++.
//!
//! Every file becomes a `PROGMEM` byte array with its length and a weak ETag,
//! and `Resource::searchByPath` maps the request path back to those.

use crate::common::{CString, GENERATED_BANNER, sanitize_identifier};
use core::fmt;
use sha2::{Digest as _, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Errors that may occur while embedding resources.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Writing generated code failed.
    #[error("code generation failed")]
    Format(#[from] fmt::Error),

    /// A resource file could not be read.
    #[error("{1}: I/O error: {0}")]
    Io(std::io::Error, PathBuf),

    /// The data directory could not be traversed.
    #[error("could not read data directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// The number of array elements written per line.
const BYTES_PER_LINE: usize = 32;

/// A file from the data directory.
struct ResourceFile {
    /// The request path, relative to the data directory, like `/index.html`.
    path: String,
    /// The C++ variable holding the contents.
    var_name: String,
    /// The file contents.
    data: Vec<u8>,
}

impl ResourceFile {
    fn new(path: String, data: Vec<u8>) -> Self {
        let var_name = sanitize_identifier(&path).into_owned();
        Self {
            path,
            var_name,
            data,
        }
    }

    /// A weak ETag built from the start of the SHA-256 of the contents.
    fn etag(&self) -> String {
        let hex = format!("{:x}", Sha256::digest(&self.data));
        format!("W/\"{}\"", &hex[..12])
    }
}

/// The generated resource table.
#[derive(Debug, Default)]
pub struct EmbeddedResources {
    /// `resource-data.h`.
    pub header: String,
    /// `resource.cpp`.
    pub source: String,
    /// The request paths that were embedded, in emission order.
    pub paths: Vec<String>,
}

/// Reads every file under `data_dir` and generates the resource table. Files
/// are visited in file name order so the output is reproducible.
pub fn embed_dir(data_dir: &Path) -> Result<EmbeddedResources, Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(data_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(data_dir).unwrap_or(entry.path());
        let mut path = String::new();
        for component in relative.components() {
            path.push('/');
            path.push_str(&component.as_os_str().to_string_lossy());
        }

        let data = std::fs::read(entry.path())
            .map_err(|err| Error::Io(err, entry.path().to_path_buf()))?;
        log::info!("Embedding {path} ({} bytes)", data.len());
        files.push(ResourceFile::new(path, data));
    }

    let mut embedded = EmbeddedResources::default();
    emit_header(&mut embedded.header, &files)?;
    emit_source(&mut embedded.source, &files)?;
    embedded.paths = files.into_iter().map(|file| file.path).collect();
    Ok(embedded)
}

fn emit_header<W: fmt::Write + ?Sized>(out: &mut W, files: &[ResourceFile]) -> fmt::Result {
    write!(
        out,
        r#"{GENERATED_BANNER}
#ifndef ESP8266Clock_resource_data_H_
#define ESP8266Clock_resource_data_H_

#include <Arduino.h>

namespace Resource {{
"#
    )?;
    for file in files {
        let var_name = &file.var_name;
        writeln!(out, "extern const char   {var_name}[] PROGMEM;")?;
        writeln!(out, "extern const size_t len{var_name};")?;
        writeln!(out, "extern const char   etag{var_name}[] PROGMEM;")?;
    }
    write!(
        out,
        r#"
}} // namespace Resource

#endif // ESP8266Clock_resource_data_H_
"#
    )
}

fn emit_source<W: fmt::Write + ?Sized>(out: &mut W, files: &[ResourceFile]) -> fmt::Result {
    write!(
        out,
        r#"{GENERATED_BANNER}
#include <resource.h>
#include <resource-data.h>

namespace Resource {{
"#
    )?;

    for file in files {
        let var_name = &file.var_name;
        writeln!(out, "const char {var_name}[] PROGMEM = {{")?;
        for line in file.data.chunks(BYTES_PER_LINE) {
            for b in line {
                write!(out, "{b:#x},")?;
            }
            writeln!(out)?;
        }
        writeln!(out, "}};")?;
        writeln!(out, "const size_t len{var_name} = {};", file.data.len())?;
        writeln!(
            out,
            "const char etag{var_name}[] PROGMEM = {};",
            CString(&file.etag())
        )?;
    }

    writeln!(out, "resource_t searchByPath(const String &path) {{")?;
    for file in files {
        let var_name = &file.var_name;
        writeln!(out, "  if (path == F({}))", CString(&file.path))?;
        writeln!(out, "    return {{{var_name}, len{var_name}, etag{var_name}}};")?;
    }
    write!(
        out,
        r#"  return {{0, 0, 0}};
}}

}} // namespace Resource
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn etag(data: &[u8]) -> String {
        let hex = Sha256::digest(data)
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<String>();
        format!("W/\\\"{}\\\"", &hex[..12])
    }

    #[test]
    fn embeds_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>").unwrap();
        std::fs::write(dir.path().join("TZ.js"), "var tz_cities = {};").unwrap();
        std::fs::create_dir(dir.path().join("img")).unwrap();
        std::fs::write(dir.path().join("img/2x-logo.png"), [0u8, 1, 255]).unwrap();

        let embedded = embed_dir(dir.path()).unwrap();
        assert_eq!(embedded.paths, ["/TZ.js", "/img/2x-logo.png", "/index.html"]);

        let header = &embedded.header;
        assert!(header.starts_with(GENERATED_BANNER));
        assert!(header.contains("extern const char   _index_html[] PROGMEM;\n"));
        assert!(header.contains("extern const size_t len_index_html;\n"));
        assert!(header.contains("extern const char   etag_img_2x_logo_png[] PROGMEM;\n"));
        assert!(header.ends_with("#endif // ESP8266Clock_resource_data_H_\n"));

        let source = &embedded.source;
        assert!(source.contains("const char _img_2x_logo_png[] PROGMEM = {\n0x0,0x1,0xff,\n};\n"));
        assert!(source.contains("const size_t len_img_2x_logo_png = 3;\n"));
        assert!(source.contains(&format!(
            "const char etag_index_html[] PROGMEM = \"{}\";\n",
            etag(b"<html>")
        )));
        assert!(source.contains(
            "  if (path == F(\"/index.html\"))\n    return {_index_html, len_index_html, etag_index_html};\n"
        ));
        assert!(source.contains("  return {0, 0, 0};\n}\n"));

        let first = source.find("_TZ_js[]").unwrap();
        let second = source.find("_img_2x_logo_png[]").unwrap();
        let third = source.find("_index_html[]").unwrap();
        assert!(first < second && second < third, "files should be in name order");
    }

    #[test]
    fn etags() {
        let file = ResourceFile::new("/empty".into(), Vec::new());
        assert_eq!(file.etag(), "W/\"e3b0c44298fc\"");
        let file = ResourceFile::new("/abc".into(), b"abc".to_vec());
        assert_eq!(file.etag(), "W/\"ba7816bf8f01\"");
    }

    #[test]
    fn wraps_lines() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blob.bin"), [0xabu8; 33]).unwrap();

        let embedded = embed_dir(dir.path()).unwrap();
        let full_line = "0xab,".repeat(32);
        assert!(
            embedded
                .source
                .contains(&format!("= {{\n{full_line}\n0xab,\n}};\n"))
        );
        assert!(embedded.source.contains("const size_t len_blob_bin = 33;\n"));
    }

    #[test]
    fn missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            embed_dir(&dir.path().join("nope")),
            Err(Error::Walk(_))
        ));
    }
}
