use std::collections::HashSet;

use crate::error::ParseResult;
use crate::framework;
use crate::resource_table::{ResourceEntry, ResourceTable};
use crate::value::TYPE_STRING;

/// Policy object that turns resource ids into displayable strings.
///
/// The defaults resolve nothing, so a unit struct is a valid no-op
/// resolver. Implementations must be cheap to call; the decoder consults
/// the resolver once per reference-typed attribute.
pub trait ResourceResolver {
    /// A rendering for a reference to `res_id`, or `None` to fall back to
    /// the raw `@0x<hex>` form.
    fn resolve_reference(&self, res_id: u32) -> Option<String> {
        let _ = res_id;
        None
    }

    /// The attribute name registered under `res_id`, or `None` to fall
    /// back to `AttrId:0x<hex>`.
    fn resolve_attribute_name(&self, res_id: u32) -> Option<String> {
        let _ = res_id;
        None
    }
}

/// A language/country pair used to pick between per-locale entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Locale {
    pub language: String,
    pub country: String,
}

impl Locale {
    pub fn new(language: impl Into<String>, country: impl Into<String>) -> Self {
        Locale {
            language: language.into(),
            country: country.into(),
        }
    }

    /// The host's locale, read from the usual POSIX environment variables.
    /// Falls back to the neutral locale when none is set.
    pub fn host_default() -> Locale {
        for key in ["LC_ALL", "LC_MESSAGES", "LANG"] {
            if let Ok(value) = std::env::var(key) {
                if !value.is_empty() {
                    return Locale::from_posix(&value);
                }
            }
        }
        Locale::default()
    }

    /// Parses `en_US.UTF-8`-style POSIX locale strings.
    fn from_posix(value: &str) -> Locale {
        let base = value
            .split('.')
            .next()
            .unwrap_or("")
            .split('@')
            .next()
            .unwrap_or("");
        if base.is_empty() || base == "C" || base == "POSIX" {
            return Locale::default();
        }
        match base.split_once('_') {
            Some((language, country)) => Locale::new(language, country),
            None => Locale::new(base, ""),
        }
    }

    /// The `""` / `lang` / `lang-COUNTRY` form stored in config blocks.
    pub fn to_locale_string(&self) -> String {
        if self.language.is_empty() {
            return String::new();
        }
        if self.country.is_empty() {
            return self.language.clone();
        }
        format!("{}-{}", self.language, self.country)
    }
}

/// Resolver backed by a parsed resource table.
///
/// With `resolve_to_value` set, reference chains are followed through the
/// table until a string drops out; otherwise (and whenever the chain goes
/// nowhere) references render symbolically as `@<type>/<key>`.
pub struct TableResolver {
    table: ResourceTable,
    locale: Locale,
    resolve_to_value: bool,
}

impl TableResolver {
    pub fn new(table: ResourceTable, resolve_to_value: bool, locale: Locale) -> Self {
        TableResolver {
            table,
            locale,
            resolve_to_value,
        }
    }

    /// Parses raw `resources.arsc` bytes and wraps the result.
    pub fn from_resources(
        data: &[u8],
        resolve_to_value: bool,
        locale: Locale,
    ) -> ParseResult<TableResolver> {
        Ok(TableResolver::new(
            ResourceTable::parse(data)?,
            resolve_to_value,
            locale,
        ))
    }

    pub fn table(&self) -> &ResourceTable {
        &self.table
    }

    /// Walks a reference chain until it produces a pool string. The visited
    /// set caps the walk at one step per distinct id, so cyclic tables
    /// terminate instead of looping.
    fn resolve_string(&self, entry: &ResourceEntry, seen: &mut HashSet<u32>) -> Option<String> {
        let value = entry.value?;
        if value.data_type == TYPE_STRING {
            return self.table.get_string(value.data).map(str::to_string);
        }
        if value.is_reference() {
            if !seen.insert(value.data) {
                return None;
            }
            let referenced = self.table.select_entry(value.data, &self.locale)?;
            return self.resolve_string(referenced, seen);
        }
        None
    }
}

impl ResourceResolver for TableResolver {
    fn resolve_reference(&self, res_id: u32) -> Option<String> {
        if let Some(style) = framework::resolve_android_style(res_id) {
            return Some(style);
        }
        let entry = self.table.select_entry(res_id, &self.locale)?;
        if self.resolve_to_value {
            if let Some(value) = self.resolve_string(entry, &mut HashSet::new()) {
                return Some(value);
            }
        }
        Some(format!("@{}/{}", entry.type_name, entry.key))
    }

    fn resolve_attribute_name(&self, res_id: u32) -> Option<String> {
        self.table.attribute_name(res_id).map(str::to_string)
    }
}
