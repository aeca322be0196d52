//! Rust rendering of the lookup table, for firmware written in Rust.
//!
//! Symbols are emitted as bare identifiers. The generated module is meant to
//! be `include!`d somewhere the master timezone table is in scope.

use super::{
    Error, Result,
    table::{LookupTable, Node},
};
use crate::common::{GENERATED_BANNER, sanitize_identifier};
use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};

/// Generates the Rust lookup module for a table.
pub fn emit_rust(table: &LookupTable<'_>) -> Result<String> {
    let mut functions = Vec::with_capacity(table.areas.len());
    let mut arms = Vec::with_capacity(table.areas.len());
    for (index, area) in table.areas.iter().enumerate() {
        let name = format_ident!(
            "area{}_{}",
            index,
            sanitize_identifier(area.area).to_ascii_lowercase()
        );
        let body = emit_node(table, area.area, &area.root)?;
        let doc = format!(" Searches the cities of `{}`.", area.area);
        functions.push(quote! {
            #[doc = #doc]
            fn #name(city: &str) -> Option<&'static str> {
                #body
            }
        });
        let area = area.area;
        arms.push(quote! {
            if area == #area {
                return #name(city);
            }
        });
    }

    let fallback = ident(table.fallback)?;
    let get_doc = format!(
        " Gets the timezone for an area/city pair, or `{}` if unknown.",
        table.fallback
    );
    let area_max = Literal::usize_unsuffixed(table.limits.area);
    let city_max = Literal::usize_unsuffixed(table.limits.city);

    let file: syn::File = syn::parse_quote! {
        /// Buffer length for the longest area name, including a terminator.
        pub const AREA_MAX_LENGTH: usize = #area_max;

        /// Buffer length for the longest city name, including a terminator.
        pub const CITY_MAX_LENGTH: usize = #city_max;

        /// Finds the timezone definition for an area/city pair, or `None` if
        /// the pair is unknown.
        pub fn find_tz(area: &str, city: &str) -> Option<&'static str> {
            #(#arms)*
            None
        }

        #[doc = #get_doc]
        pub fn get_tz(area: &str, city: &str) -> &'static str {
            find_tz(area, city).unwrap_or(#fallback)
        }

        #(#functions)*
    };

    Ok(format!("{GENERATED_BANNER}\n{}", prettyplease::unparse(&file)))
}

/// Generates the expression for one decision node.
fn emit_node(table: &LookupTable<'_>, area: &str, node: &Node<'_>) -> Result<TokenStream> {
    let symbol = |city| ident(&table.symbol(area, city));
    Ok(match node {
        Node::Leaf(city) => {
            let found = symbol(*city)?;
            quote! {
                if city == #city { Some(#found) } else { None }
            }
        }
        Node::Pair(first, second) => {
            let first_found = symbol(*first)?;
            let second_found = symbol(*second)?;
            quote! {
                if city == #first {
                    Some(#first_found)
                } else if city == #second {
                    Some(#second_found)
                } else {
                    None
                }
            }
        }
        Node::Split {
            pivot,
            less,
            greater,
        } => {
            let found = symbol(*pivot)?;
            let less = emit_node(table, area, less)?;
            let greater = emit_node(table, area, greater)?;
            quote! {
                match city.cmp(#pivot) {
                    core::cmp::Ordering::Less => { #less }
                    core::cmp::Ordering::Greater => { #greater }
                    core::cmp::Ordering::Equal => Some(#found),
                }
            }
        }
    })
}

/// Parses a symbol as an identifier. `format_ident!` would panic instead.
fn ident(name: &str) -> Result<syn::Ident> {
    syn::parse_str::<syn::Ident>(name).map_err(|_| Error::InvalidIdentifier(name.to_string()))
}
