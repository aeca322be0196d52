//! Helpers shared by the C++ code generators.

use regex::Regex;
use std::{
    borrow::Cow,
    fmt::{self, Write as _},
    sync::LazyLock,
};

/// The header written at the top of every generated file.
pub const GENERATED_BANNER: &str = concat!(
    "// auto-generated by ",
    env!("CARGO_PKG_NAME"),
    "\n// DO NOT EDIT BY HAND\n"
);

/// Replaces every character that cannot appear in a C identifier with `_`.
pub fn sanitize_identifier(name: &str) -> Cow<'_, str> {
    static INVALID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9A-Za-z_]").unwrap());
    INVALID.replace_all(name, "_")
}

/// Formats a string as a C/C++ string literal.
pub struct CString<'a>(pub &'a str);

impl fmt::Display for CString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        for c in self.0.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\t' => f.write_str("\\t")?,
                // Octal escapes have a fixed maximum width, unlike `\x`,
                // which would swallow any hex digit that follows.
                c if c.is_ascii_control() => write!(f, "\\{:03o}", u32::from(c))?,
                c => f.write_char(c)?,
            }
        }
        f.write_char('"')
    }
}
