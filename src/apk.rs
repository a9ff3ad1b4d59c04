use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

use log::debug;
use zip::read::ZipArchive;

use crate::attribute_values::AttributeValueMapper;
use crate::binary_xml::decode_manifest;
use crate::error::ParseError;
use crate::meta::ApkMeta;
use crate::resolver::{Locale, ResourceResolver, TableResolver};

/// Archive entry holding the compiled manifest.
pub const MANIFEST_PATH: &str = "AndroidManifest.xml";
/// Archive entry holding the compiled resource table.
pub const RESOURCE_FILE: &str = "resources.arsc";

/// Result alias for APK-level operations.
pub type ApkResult<T> = Result<T, ApkError>;

/// Errors surfaced by the APK-level decode entry points.
#[derive(Debug)]
pub enum ApkError {
    Io(io::Error),
    Zip(zip::result::ZipError),
    Parse(ParseError),
    /// The archive carries no entry under the given name.
    ManifestNotFound(String),
    /// Degenerate input, such as an empty manifest blob.
    InvalidInput(String),
    /// Reading the emitted text back for metadata extraction failed.
    Xml(String),
}

impl std::fmt::Display for ApkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApkError::Io(err) => write!(f, "I/O error: {err}"),
            ApkError::Zip(err) => write!(f, "ZIP error: {err}"),
            ApkError::Parse(err) => write!(f, "Malformed manifest: {err}"),
            ApkError::ManifestNotFound(name) => write!(f, "Manifest file not found: {name}"),
            ApkError::InvalidInput(msg) => write!(f, "{msg}"),
            ApkError::Xml(msg) => write!(f, "XML error: {msg}"),
        }
    }
}

impl std::error::Error for ApkError {}

impl From<io::Error> for ApkError {
    fn from(value: io::Error) -> Self {
        ApkError::Io(value)
    }
}

impl From<zip::result::ZipError> for ApkError {
    fn from(value: zip::result::ZipError) -> Self {
        ApkError::Zip(value)
    }
}

impl From<ParseError> for ApkError {
    fn from(value: ParseError) -> Self {
        ApkError::Parse(value)
    }
}

/// The decode configuration knobs.
#[derive(Clone, Debug)]
pub struct DecodeOptions {
    /// Follow reference chains down to concrete strings instead of
    /// stopping at `@type/name`.
    pub resolve_to_value: bool,
    /// Humanise well-known integer attributes through the built-in mapper.
    pub attribute_value_mapping: bool,
    /// Locale used to pick between per-configuration resource entries.
    pub locale: Locale,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            resolve_to_value: true,
            attribute_value_mapping: true,
            locale: Locale::host_default(),
        }
    }
}

impl DecodeOptions {
    pub fn resolve_to_value(mut self, resolve_to_value: bool) -> Self {
        self.resolve_to_value = resolve_to_value;
        self
    }

    pub fn attribute_value_mapping(mut self, enabled: bool) -> Self {
        self.attribute_value_mapping = enabled;
        self
    }

    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }
}

/// An APK opened for manifest decoding.
///
/// The two interesting entries are pulled into memory up front; the
/// decoded text and the metadata derived from it are cached on first use.
pub struct ApkFile {
    manifest: Vec<u8>,
    resources: Option<Vec<u8>>,
    options: DecodeOptions,
    manifest_xml: Option<String>,
    meta: Option<ApkMeta>,
}

impl ApkFile {
    /// Opens an APK from disk with default options.
    pub fn open(path: impl AsRef<Path>) -> ApkResult<Self> {
        Self::open_with_options(path, DecodeOptions::default())
    }

    pub fn open_with_options(path: impl AsRef<Path>, options: DecodeOptions) -> ApkResult<Self> {
        Self::from_reader(File::open(path.as_ref())?, options)
    }

    /// Reads an APK out of any seekable source, such as an in-memory blob.
    pub fn from_reader<R: Read + Seek>(reader: R, options: DecodeOptions) -> ApkResult<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let manifest = read_entry(&mut archive, MANIFEST_PATH)?
            .ok_or_else(|| ApkError::ManifestNotFound(MANIFEST_PATH.to_string()))?;
        let resources = read_entry(&mut archive, RESOURCE_FILE)?;
        debug!(
            "loaded manifest ({} bytes), resources {}",
            manifest.len(),
            match &resources {
                Some(data) => format!("({} bytes)", data.len()),
                None => "absent".to_string(),
            }
        );
        Self::from_parts(manifest, resources, options)
    }

    /// Builds an [`ApkFile`] from entry blobs extracted elsewhere.
    pub fn from_parts(
        manifest: Vec<u8>,
        resources: Option<Vec<u8>>,
        options: DecodeOptions,
    ) -> ApkResult<Self> {
        if manifest.is_empty() {
            return Err(ApkError::InvalidInput("manifest data is empty".to_string()));
        }
        Ok(ApkFile {
            manifest,
            resources,
            options,
            manifest_xml: None,
            meta: None,
        })
    }

    /// The decoded textual manifest. Decoded once, then served from cache.
    pub fn manifest_xml(&mut self) -> ApkResult<&str> {
        if self.manifest_xml.is_none() {
            let resolver = match &self.resources {
                Some(data) => Some(TableResolver::from_resources(
                    data,
                    self.options.resolve_to_value,
                    self.options.locale.clone(),
                )?),
                None => None,
            };
            let mapper = if self.options.attribute_value_mapping {
                Some(AttributeValueMapper::builtin())
            } else {
                None
            };
            let xml = decode_manifest(
                &self.manifest,
                resolver.as_ref().map(|r| r as &dyn ResourceResolver),
                mapper.as_ref(),
            )?;
            self.manifest_xml = Some(xml);
        }
        Ok(self.manifest_xml.as_deref().unwrap_or_default())
    }

    /// Metadata lifted from the decoded manifest, cached after the first
    /// call.
    pub fn apk_meta(&mut self) -> ApkResult<&ApkMeta> {
        if self.meta.is_none() {
            self.manifest_xml()?;
            let xml = self.manifest_xml.as_deref().unwrap_or_default();
            self.meta = Some(ApkMeta::from_manifest_xml(xml)?);
        }
        Ok(self.meta.as_ref().expect("meta cached above"))
    }
}

/// Decodes the manifest of the APK at `path` with default options.
pub fn decode_file(path: impl AsRef<Path>) -> ApkResult<String> {
    decode_file_with_options(path, DecodeOptions::default())
}

/// Decodes the manifest of the APK at `path`.
pub fn decode_file_with_options(
    path: impl AsRef<Path>,
    options: DecodeOptions,
) -> ApkResult<String> {
    let mut apk = ApkFile::open_with_options(path, options)?;
    Ok(apk.manifest_xml()?.to_string())
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> ApkResult<Option<Vec<u8>>> {
    match archive.by_name(name) {
        Ok(mut entry) => {
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            Ok(Some(data))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(err) => Err(ApkError::Zip(err)),
    }
}
