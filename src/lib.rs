//! # axml
//!
//! A library for decoding the compiled binary form of `AndroidManifest.xml`
//! back into text, with optional resolution of resource references against
//! the APK's `resources.arsc`.
//!
//! The fastest route is [`ApkFile`]:
//!
//! ```no_run
//! use axml::ApkFile;
//!
//! let mut apk = ApkFile::open("app-release.apk").unwrap();
//! println!("{}", apk.manifest_xml().unwrap());
//! let meta = apk.apk_meta().unwrap();
//! println!("{:?} v{:?}", meta.package_name, meta.version_name);
//! ```
//!
//! Raw blobs extracted elsewhere go through [`decode_manifest`] directly,
//! paired with a [`TableResolver`] when a resource table is at hand.

mod apk;
mod attribute_values;
mod binary_xml;
mod chunk;
mod error;
mod framework;
mod meta;
mod reader;
mod resolver;
mod resource_table;
mod string_pool;
mod translator;
mod value;

pub use crate::apk::{
    decode_file, decode_file_with_options, ApkError, ApkFile, ApkResult, DecodeOptions,
    MANIFEST_PATH, RESOURCE_FILE,
};
pub use crate::attribute_values::AttributeValueMapper;
pub use crate::binary_xml::decode_manifest;
pub use crate::error::{ParseError, ParseResult};
pub use crate::meta::{ApkMeta, ANDROID_NS};
pub use crate::resolver::{Locale, ResourceResolver, TableResolver};
pub use crate::resource_table::{ResourceEntry, ResourceTable};
pub use crate::string_pool::StringPool;
pub use crate::value::ResourceValue;
