use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::apk::ApkError;

/// The Android resource namespace, bound to the `android` prefix in every
/// real-world manifest.
pub const ANDROID_NS: &str = "http://schemas.android.com/apk/res/android";

/// Basic application metadata lifted from a decoded manifest.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApkMeta {
    pub package_name: Option<String>,
    pub label: Option<String>,
    pub application_name: Option<String>,
    pub icon: Option<String>,
    pub version_name: Option<String>,
    pub version_code: Option<i64>,
    pub min_sdk_version: Option<String>,
    pub target_sdk_version: Option<String>,
    pub uses_permissions: Vec<String>,
}

struct PendingAttribute {
    prefix: Option<String>,
    local_name: String,
    value: String,
}

impl ApkMeta {
    /// Reads the well-known attributes back out of the textual manifest.
    ///
    /// Namespaces are tracked through a scope stack so `android:` attributes
    /// match whether they arrive under the canonical URI binding or the
    /// literal prefix.
    pub fn from_manifest_xml(xml: &str) -> Result<ApkMeta, ApkError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);
        let mut buffer = Vec::new();
        let mut meta = ApkMeta::default();
        let mut path: Vec<String> = Vec::new();
        let mut ns_stack: Vec<BTreeMap<String, String>> = vec![BTreeMap::new()];

        loop {
            match reader
                .read_event_into(&mut buffer)
                .map_err(|err| ApkError::Xml(err.to_string()))?
            {
                Event::Start(start) => {
                    let start = start.into_owned();
                    let (decls, attrs) = extract_attributes(&start)?;
                    ns_stack.push(decls);
                    let local = local_name(&start)?;
                    meta.collect(&path, &local, &attrs, &ns_stack);
                    path.push(local);
                }
                Event::Empty(start) => {
                    let start = start.into_owned();
                    let (decls, attrs) = extract_attributes(&start)?;
                    ns_stack.push(decls);
                    let local = local_name(&start)?;
                    meta.collect(&path, &local, &attrs, &ns_stack);
                    ns_stack.pop();
                }
                Event::End(_) => {
                    path.pop();
                    if ns_stack.len() > 1 {
                        ns_stack.pop();
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buffer.clear();
        }

        Ok(meta)
    }

    fn collect(
        &mut self,
        path: &[String],
        local: &str,
        attrs: &[PendingAttribute],
        ns_stack: &[BTreeMap<String, String>],
    ) {
        let under_manifest = path.len() == 1 && path[0] == "manifest";
        match local {
            "manifest" if path.is_empty() => {
                self.package_name = plain_attr(attrs, "package");
                self.version_name = android_attr(attrs, ns_stack, "versionName");
                self.version_code = android_attr(attrs, ns_stack, "versionCode")
                    .and_then(|code| code.parse().ok());
            }
            "uses-sdk" if under_manifest => {
                self.min_sdk_version = android_attr(attrs, ns_stack, "minSdkVersion");
                self.target_sdk_version = android_attr(attrs, ns_stack, "targetSdkVersion");
            }
            "application" if under_manifest => {
                self.label = android_attr(attrs, ns_stack, "label");
                self.application_name = android_attr(attrs, ns_stack, "name");
                self.icon = android_attr(attrs, ns_stack, "icon");
            }
            "uses-permission" => {
                if let Some(permission) = android_attr(attrs, ns_stack, "name") {
                    self.uses_permissions.push(permission);
                }
            }
            _ => {}
        }
    }
}

fn local_name(start: &BytesStart<'_>) -> Result<String, ApkError> {
    let name = start.name();
    let raw = std::str::from_utf8(name.as_ref()).map_err(|err| ApkError::Xml(err.to_string()))?;
    Ok(match raw.split_once(':') {
        Some((_, local)) => local.to_string(),
        None => raw.to_string(),
    })
}

fn extract_attributes(
    start: &BytesStart<'_>,
) -> Result<(BTreeMap<String, String>, Vec<PendingAttribute>), ApkError> {
    let mut namespaces = BTreeMap::new();
    let mut attrs = Vec::new();
    for attr in start.attributes().with_checks(false) {
        let attr = attr.map_err(|err| ApkError::Xml(err.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| ApkError::Xml(err.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|err| ApkError::Xml(err.to_string()))?
            .into_owned();
        if key == "xmlns" {
            namespaces.insert(String::new(), value);
            continue;
        }
        if let Some(rest) = key.strip_prefix("xmlns:") {
            namespaces.insert(rest.to_string(), value);
            continue;
        }
        let (prefix, local_name) = match key.split_once(':') {
            Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
            None => (None, key.to_string()),
        };
        attrs.push(PendingAttribute {
            prefix,
            local_name,
            value,
        });
    }
    Ok((namespaces, attrs))
}

fn lookup_namespace_uri(stack: &[BTreeMap<String, String>], prefix: Option<&str>) -> Option<String> {
    let key = prefix.unwrap_or("");
    for frame in stack.iter().rev() {
        if let Some(uri) = frame.get(key) {
            return Some(uri.clone());
        }
    }
    None
}

fn plain_attr(attrs: &[PendingAttribute], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|attr| attr.prefix.is_none() && attr.local_name == name)
        .map(|attr| attr.value.clone())
        .filter(|value| !value.is_empty())
}

fn android_attr(
    attrs: &[PendingAttribute],
    ns_stack: &[BTreeMap<String, String>],
    name: &str,
) -> Option<String> {
    attrs
        .iter()
        .find(|attr| {
            if attr.local_name != name {
                return false;
            }
            match attr.prefix.as_deref() {
                Some(prefix) => {
                    prefix == "android"
                        || lookup_namespace_uri(ns_stack, Some(prefix)).as_deref()
                            == Some(ANDROID_NS)
                }
                None => false,
            }
        })
        .map(|attr| attr.value.clone())
        .filter(|value| !value.is_empty())
}
