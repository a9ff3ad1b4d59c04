//! Builders that assemble synthetic binary manifests and resource tables
//! for the end-to-end tests. Layouts follow what aapt emits: UTF-16 string
//! pools, 16-byte node headers carrying line/comment slots, and packages
//! whose nested pools sit at offsets relative to the package chunk start.

// Each integration test crate compiles this module separately and uses a
// different slice of it.
#![allow(dead_code)]

use std::collections::BTreeMap;

pub const ANDROID_NS: &str = "http://schemas.android.com/apk/res/android";

const CHUNK_STRING_POOL: u16 = 0x0001;
const CHUNK_TABLE: u16 = 0x0002;
const CHUNK_XML: u16 = 0x0003;
const XML_START_NAMESPACE: u16 = 0x0100;
const XML_END_NAMESPACE: u16 = 0x0101;
const XML_START_ELEMENT: u16 = 0x0102;
const XML_END_ELEMENT: u16 = 0x0103;
const XML_CDATA: u16 = 0x0104;
const XML_RESOURCE_MAP: u16 = 0x0180;
const TABLE_PACKAGE: u16 = 0x0200;
const TABLE_TYPE: u16 = 0x0201;
const TABLE_TYPE_SPEC: u16 = 0x0202;

pub const TYPE_REFERENCE: u8 = 0x01;
pub const TYPE_STRING: u8 = 0x03;
pub const TYPE_INT_DEC: u8 = 0x10;
pub const TYPE_INT_HEX: u8 = 0x11;
pub const TYPE_INT_BOOLEAN: u8 = 0x12;

const NO_ENTRY: u32 = 0xffff_ffff;

fn write_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn write_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn align_to_four(buf: &mut Vec<u8>) {
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

fn begin_chunk(buf: &mut Vec<u8>, chunk_type: u16, header_size: u16) -> usize {
    let start = buf.len();
    write_u16(buf, chunk_type);
    write_u16(buf, header_size);
    write_u32(buf, 0); // chunk size placeholder
    start
}

fn finalize_chunk(buf: &mut Vec<u8>, chunk_start: usize) {
    align_to_four(buf);
    let size = (buf.len() - chunk_start) as u32;
    buf[chunk_start + 4..chunk_start + 8].copy_from_slice(&size.to_le_bytes());
}

/// Interns strings and renders them as a UTF-16 pool chunk.
#[derive(Default)]
pub struct StringPoolBuilder {
    strings: Vec<String>,
    indices: BTreeMap<String, u32>,
}

impl StringPoolBuilder {
    pub fn new() -> Self {
        StringPoolBuilder::default()
    }

    pub fn intern(&mut self, value: impl AsRef<str>) -> u32 {
        let value = value.as_ref();
        if let Some(&idx) = self.indices.get(value) {
            return idx;
        }
        let idx = self.strings.len() as u32;
        self.strings.push(value.to_string());
        self.indices.insert(value.to_string(), idx);
        idx
    }

    pub fn index_of(&self, value: &str) -> Option<u32> {
        self.indices.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn to_chunk(&self) -> Vec<u8> {
        let header_size = 28u16;
        let string_count = self.strings.len() as u32;
        let strings_start = header_size as u32 + string_count * 4;

        let mut string_data = Vec::new();
        let mut offsets = Vec::with_capacity(self.strings.len());
        for s in &self.strings {
            offsets.push(string_data.len() as u32);
            let units: Vec<u16> = s.encode_utf16().collect();
            write_u16(&mut string_data, units.len() as u16);
            for unit in units {
                write_u16(&mut string_data, unit);
            }
            write_u16(&mut string_data, 0);
        }

        let mut chunk = Vec::new();
        let chunk_start = begin_chunk(&mut chunk, CHUNK_STRING_POOL, header_size);
        write_u32(&mut chunk, string_count);
        write_u32(&mut chunk, 0); // style count
        write_u32(&mut chunk, 0); // flags: UTF-16
        write_u32(&mut chunk, strings_start);
        write_u32(&mut chunk, 0); // styles start
        for offset in offsets {
            write_u32(&mut chunk, offset);
        }
        chunk.extend_from_slice(&string_data);
        finalize_chunk(&mut chunk, chunk_start);
        chunk
    }
}

/// A typed attribute payload for [`AttrSpec`].
#[derive(Clone)]
pub enum TypedValue {
    Reference(u32),
    PoolString(String),
    IntDec(i32),
    IntHex(u32),
    Boolean(bool),
    Raw(u8, u32),
}

/// One attribute record of a start-element chunk.
#[derive(Clone)]
pub struct AttrSpec {
    pub ns: Option<String>,
    pub name: String,
    pub res_id: Option<u32>,
    pub raw: Option<String>,
    pub value: TypedValue,
}

impl AttrSpec {
    /// The usual case: an `android:`-namespaced attribute with a raw string
    /// value mirrored into the typed slot.
    pub fn android_string(name: &str, value: &str) -> Self {
        AttrSpec {
            ns: Some(ANDROID_NS.to_string()),
            name: name.to_string(),
            res_id: None,
            raw: Some(value.to_string()),
            value: TypedValue::PoolString(value.to_string()),
        }
    }

    pub fn plain_string(name: &str, value: &str) -> Self {
        AttrSpec {
            ns: None,
            name: name.to_string(),
            res_id: None,
            raw: Some(value.to_string()),
            value: TypedValue::PoolString(value.to_string()),
        }
    }

    pub fn android_typed(name: &str, value: TypedValue) -> Self {
        AttrSpec {
            ns: Some(ANDROID_NS.to_string()),
            name: name.to_string(),
            res_id: None,
            raw: None,
            value,
        }
    }

    /// An obfuscated attribute: empty name string, recoverable only through
    /// the resource map.
    pub fn obfuscated(res_id: u32, value: TypedValue) -> Self {
        AttrSpec {
            ns: Some(ANDROID_NS.to_string()),
            name: String::new(),
            res_id: Some(res_id),
            raw: None,
            value,
        }
    }
}

enum Op {
    StartNamespace(String, String),
    EndNamespace(String, String),
    StartElement(Option<String>, String, Vec<AttrSpec>),
    EndElement(Option<String>, String),
    Cdata(String),
    RawChunk(u16, usize),
}

/// Assembles a complete binary XML document from recorded events.
#[derive(Default)]
pub struct AxmlBuilder {
    ops: Vec<Op>,
}

impl AxmlBuilder {
    pub fn new() -> Self {
        AxmlBuilder::default()
    }

    pub fn start_namespace(&mut self, prefix: &str, uri: &str) -> &mut Self {
        self.ops
            .push(Op::StartNamespace(prefix.to_string(), uri.to_string()));
        self
    }

    pub fn end_namespace(&mut self, prefix: &str, uri: &str) -> &mut Self {
        self.ops
            .push(Op::EndNamespace(prefix.to_string(), uri.to_string()));
        self
    }

    pub fn start_element(
        &mut self,
        ns: Option<&str>,
        name: &str,
        attrs: Vec<AttrSpec>,
    ) -> &mut Self {
        self.ops
            .push(Op::StartElement(ns.map(str::to_string), name.to_string(), attrs));
        self
    }

    pub fn end_element(&mut self, ns: Option<&str>, name: &str) -> &mut Self {
        self.ops
            .push(Op::EndElement(ns.map(str::to_string), name.to_string()));
        self
    }

    pub fn cdata(&mut self, text: &str) -> &mut Self {
        self.ops.push(Op::Cdata(text.to_string()));
        self
    }

    /// Splices in a zero-filled chunk of the given type, to exercise the
    /// parser's skipping behavior.
    pub fn raw_chunk(&mut self, chunk_type: u16, body_len: usize) -> &mut Self {
        self.ops.push(Op::RawChunk(chunk_type, body_len));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = StringPoolBuilder::new();
        let mut resource_map: Vec<u32> = Vec::new();

        // Attribute names carrying resource ids must occupy the low pool
        // indices so the resource map lines up index-for-index.
        for op in &self.ops {
            if let Op::StartElement(_, _, attrs) = op {
                for attr in attrs {
                    if let Some(res_id) = attr.res_id {
                        let idx = pool.intern(&attr.name);
                        if idx as usize == resource_map.len() {
                            resource_map.push(res_id);
                        }
                    }
                }
            }
        }
        for op in &self.ops {
            match op {
                Op::StartNamespace(prefix, uri) | Op::EndNamespace(prefix, uri) => {
                    pool.intern(prefix);
                    pool.intern(uri);
                }
                Op::StartElement(ns, name, attrs) => {
                    if let Some(ns) = ns {
                        pool.intern(ns);
                    }
                    pool.intern(name);
                    for attr in attrs {
                        if let Some(ns) = &attr.ns {
                            pool.intern(ns);
                        }
                        pool.intern(&attr.name);
                        if let Some(raw) = &attr.raw {
                            pool.intern(raw);
                        }
                        if let TypedValue::PoolString(s) = &attr.value {
                            pool.intern(s);
                        }
                    }
                }
                Op::EndElement(ns, name) => {
                    if let Some(ns) = ns {
                        pool.intern(ns);
                    }
                    pool.intern(name);
                }
                Op::Cdata(text) => {
                    pool.intern(text);
                }
                Op::RawChunk(..) => {}
            }
        }

        let mut document = Vec::new();
        let document_start = begin_chunk(&mut document, CHUNK_XML, 8);
        document.extend_from_slice(&pool.to_chunk());

        if !resource_map.is_empty() {
            let map_start = begin_chunk(&mut document, XML_RESOURCE_MAP, 8);
            for id in &resource_map {
                write_u32(&mut document, *id);
            }
            finalize_chunk(&mut document, map_start);
        }

        for op in &self.ops {
            match op {
                Op::StartNamespace(prefix, uri) => {
                    write_namespace(&mut document, &pool, XML_START_NAMESPACE, prefix, uri);
                }
                Op::EndNamespace(prefix, uri) => {
                    write_namespace(&mut document, &pool, XML_END_NAMESPACE, prefix, uri);
                }
                Op::StartElement(ns, name, attrs) => {
                    write_start_element(&mut document, &pool, ns.as_deref(), name, attrs);
                }
                Op::EndElement(ns, name) => {
                    let start = begin_chunk(&mut document, XML_END_ELEMENT, 16);
                    write_u32(&mut document, 0); // line
                    write_u32(&mut document, NO_ENTRY); // comment
                    write_u32(&mut document, string_ref(&pool, ns.as_deref()));
                    write_u32(&mut document, pool.index_of(name).unwrap());
                    finalize_chunk(&mut document, start);
                }
                Op::Cdata(text) => {
                    let idx = pool.index_of(text).unwrap();
                    let start = begin_chunk(&mut document, XML_CDATA, 16);
                    write_u32(&mut document, 0);
                    write_u32(&mut document, NO_ENTRY);
                    write_u32(&mut document, idx);
                    write_value(&mut document, TYPE_STRING, idx);
                    finalize_chunk(&mut document, start);
                }
                Op::RawChunk(chunk_type, body_len) => {
                    let start = begin_chunk(&mut document, *chunk_type, 8);
                    document.extend_from_slice(&vec![0; *body_len]);
                    finalize_chunk(&mut document, start);
                }
            }
        }

        finalize_chunk(&mut document, document_start);
        document
    }
}

fn string_ref(pool: &StringPoolBuilder, value: Option<&str>) -> u32 {
    match value {
        Some(value) => pool.index_of(value).unwrap(),
        None => NO_ENTRY,
    }
}

fn write_value(buf: &mut Vec<u8>, data_type: u8, data: u32) {
    write_u16(buf, 8); // value size
    buf.push(0); // res0
    buf.push(data_type);
    write_u32(buf, data);
}

fn typed_value_bytes(pool: &StringPoolBuilder, value: &TypedValue) -> (u8, u32) {
    match value {
        TypedValue::Reference(id) => (TYPE_REFERENCE, *id),
        TypedValue::PoolString(s) => (TYPE_STRING, pool.index_of(s).unwrap()),
        TypedValue::IntDec(n) => (TYPE_INT_DEC, *n as u32),
        TypedValue::IntHex(n) => (TYPE_INT_HEX, *n),
        TypedValue::Boolean(b) => (TYPE_INT_BOOLEAN, *b as u32),
        TypedValue::Raw(data_type, data) => (*data_type, *data),
    }
}

fn write_namespace(buf: &mut Vec<u8>, pool: &StringPoolBuilder, chunk_type: u16, prefix: &str, uri: &str) {
    let start = begin_chunk(buf, chunk_type, 16);
    write_u32(buf, 0); // line
    write_u32(buf, NO_ENTRY); // comment
    write_u32(buf, pool.index_of(prefix).unwrap());
    write_u32(buf, pool.index_of(uri).unwrap());
    finalize_chunk(buf, start);
}

fn write_start_element(
    buf: &mut Vec<u8>,
    pool: &StringPoolBuilder,
    ns: Option<&str>,
    name: &str,
    attrs: &[AttrSpec],
) {
    let start = begin_chunk(buf, XML_START_ELEMENT, 16);
    write_u32(buf, 0); // line
    write_u32(buf, NO_ENTRY); // comment
    write_u32(buf, string_ref(pool, ns));
    write_u32(buf, pool.index_of(name).unwrap());
    write_u16(buf, 0x0014); // attribute start
    write_u16(buf, 0x0014); // attribute size
    write_u16(buf, attrs.len() as u16);
    write_u16(buf, 0); // id index
    write_u16(buf, 0); // class index
    write_u16(buf, 0); // style index
    for attr in attrs {
        write_u32(buf, string_ref(pool, attr.ns.as_deref()));
        write_u32(buf, pool.index_of(&attr.name).unwrap());
        write_u32(buf, string_ref(pool, attr.raw.as_deref()));
        let (data_type, data) = typed_value_bytes(pool, &attr.value);
        write_value(buf, data_type, data);
    }
    finalize_chunk(buf, start);
}

/// One entry inside a type chunk of a synthetic resource table.
#[derive(Clone)]
pub enum EntrySpec {
    Simple {
        key: String,
        data_type: u8,
        data: u32,
    },
    Complex {
        key: String,
        parent: u32,
        children: Vec<(u32, u8, u32)>,
    },
}

impl EntrySpec {
    pub fn simple(key: &str, data_type: u8, data: u32) -> Option<EntrySpec> {
        Some(EntrySpec::Simple {
            key: key.to_string(),
            data_type,
            data,
        })
    }

    pub fn complex(key: &str, parent: u32, children: Vec<(u32, u8, u32)>) -> Option<EntrySpec> {
        Some(EntrySpec::Complex {
            key: key.to_string(),
            parent,
            children,
        })
    }
}

struct TypeChunkSpec {
    type_id: u8,
    language: String,
    country: String,
    entries: Vec<Option<EntrySpec>>,
}

/// One package of a synthetic `resources.arsc`.
pub struct PackageBuilder {
    id: u8,
    name: String,
    type_names: Vec<String>,
    chunks: Vec<TypeChunkSpec>,
}

impl PackageBuilder {
    /// `type_names[i]` names type id `i + 1`.
    pub fn new(id: u8, name: &str, type_names: &[&str]) -> Self {
        PackageBuilder {
            id,
            name: name.to_string(),
            type_names: type_names.iter().map(|s| s.to_string()).collect(),
            chunks: Vec::new(),
        }
    }

    pub fn type_chunk(
        &mut self,
        type_id: u8,
        language: &str,
        country: &str,
        entries: Vec<Option<EntrySpec>>,
    ) -> &mut Self {
        self.chunks.push(TypeChunkSpec {
            type_id,
            language: language.to_string(),
            country: country.to_string(),
            entries,
        });
        self
    }
}

/// Assembles a complete resource table with one global pool and any number
/// of packages.
#[derive(Default)]
pub struct ArscBuilder {
    global: StringPoolBuilder,
    packages: Vec<PackageBuilder>,
    trailing_unknown_chunk: bool,
}

impl ArscBuilder {
    pub fn new() -> Self {
        ArscBuilder::default()
    }

    /// Interns a string into the global pool, returning its index for use
    /// as STRING-typed entry data.
    pub fn global_string(&mut self, value: &str) -> u32 {
        self.global.intern(value)
    }

    pub fn package(&mut self, package: PackageBuilder) -> &mut Self {
        self.packages.push(package);
        self
    }

    /// Appends an unrecognized chunk after the last package's types, to
    /// exercise forward-compatible skipping.
    pub fn trailing_unknown_chunk(&mut self) -> &mut Self {
        self.trailing_unknown_chunk = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut table = Vec::new();
        let table_start = begin_chunk(&mut table, CHUNK_TABLE, 12);
        write_u32(&mut table, self.packages.len() as u32);
        table.extend_from_slice(&self.global.to_chunk());
        for package in &self.packages {
            table.extend_from_slice(&build_package(package));
        }
        if self.trailing_unknown_chunk {
            let start = begin_chunk(&mut table, 0x0204, 8);
            write_u32(&mut table, 0xdeadbeef);
            finalize_chunk(&mut table, start);
        }
        finalize_chunk(&mut table, table_start);
        table
    }
}

fn build_package(package: &PackageBuilder) -> Vec<u8> {
    const PACKAGE_HEADER_SIZE: u16 = 288;

    let mut type_pool = StringPoolBuilder::new();
    for name in &package.type_names {
        type_pool.intern(name);
    }
    let mut key_pool = StringPoolBuilder::new();
    for chunk in &package.chunks {
        for entry in package_entries(chunk) {
            match entry {
                EntrySpec::Simple { key, .. } | EntrySpec::Complex { key, .. } => {
                    key_pool.intern(key);
                }
            }
        }
    }
    let type_chunk_bytes = type_pool.to_chunk();
    let key_chunk_bytes = key_pool.to_chunk();

    let mut body = Vec::new();
    let package_start = begin_chunk(&mut body, TABLE_PACKAGE, PACKAGE_HEADER_SIZE);
    write_u32(&mut body, package.id as u32);
    let mut name_units: Vec<u16> = package.name.encode_utf16().collect();
    name_units.resize(128, 0);
    for unit in name_units {
        write_u16(&mut body, unit);
    }
    write_u32(&mut body, PACKAGE_HEADER_SIZE as u32); // type strings offset
    write_u32(&mut body, type_pool.len() as u32); // last public type
    write_u32(
        &mut body,
        PACKAGE_HEADER_SIZE as u32 + type_chunk_bytes.len() as u32,
    ); // key strings offset
    write_u32(&mut body, key_pool.len() as u32); // last public key
    write_u32(&mut body, 0); // typeIdOffset padding up to the header size
    assert_eq!(body.len(), PACKAGE_HEADER_SIZE as usize);

    body.extend_from_slice(&type_chunk_bytes);
    body.extend_from_slice(&key_chunk_bytes);

    for chunk in &package.chunks {
        // A spec chunk before each type chunk, as aapt lays them out.
        let spec_start = begin_chunk(&mut body, TABLE_TYPE_SPEC, 16);
        body.push(chunk.type_id);
        body.push(0);
        write_u16(&mut body, 0);
        write_u32(&mut body, chunk.entries.len() as u32);
        for _ in 0..chunk.entries.len() {
            write_u32(&mut body, 0);
        }
        finalize_chunk(&mut body, spec_start);

        body.extend_from_slice(&build_type_chunk(chunk, &key_pool));
    }

    finalize_chunk(&mut body, package_start);
    body
}

fn package_entries(chunk: &TypeChunkSpec) -> impl Iterator<Item = &EntrySpec> {
    chunk.entries.iter().flatten()
}

fn build_type_chunk(chunk: &TypeChunkSpec, key_pool: &StringPoolBuilder) -> Vec<u8> {
    const CONFIG_SIZE: u32 = 28;
    const TYPE_HEADER_SIZE: u16 = 20 + CONFIG_SIZE as u16;

    let entry_count = chunk.entries.len() as u32;
    let entries_start = TYPE_HEADER_SIZE as u32 + entry_count * 4;

    let mut buf = Vec::new();
    let start = begin_chunk(&mut buf, TABLE_TYPE, TYPE_HEADER_SIZE);
    buf.push(chunk.type_id);
    buf.push(0); // res0
    write_u16(&mut buf, 0); // res1
    write_u32(&mut buf, entry_count);
    write_u32(&mut buf, entries_start);

    // Config block: declared size first, locale fields, zero qualifiers.
    write_u32(&mut buf, CONFIG_SIZE);
    write_u16(&mut buf, 0); // mcc
    write_u16(&mut buf, 0); // mnc
    push_fixed_ascii(&mut buf, &chunk.language);
    push_fixed_ascii(&mut buf, &chunk.country);
    buf.push(0); // orientation
    buf.push(0); // touchscreen
    write_u16(&mut buf, 0); // density
    buf.extend_from_slice(&[0; 12]);
    assert_eq!(buf.len(), TYPE_HEADER_SIZE as usize);

    let mut entry_data = Vec::new();
    let mut offsets = Vec::with_capacity(chunk.entries.len());
    for entry in &chunk.entries {
        match entry {
            None => offsets.push(NO_ENTRY),
            Some(spec) => {
                offsets.push(entry_data.len() as u32);
                write_entry(&mut entry_data, spec, key_pool);
            }
        }
    }
    for offset in offsets {
        write_u32(&mut buf, offset);
    }
    buf.extend_from_slice(&entry_data);
    finalize_chunk(&mut buf, start);
    buf
}

fn push_fixed_ascii(buf: &mut Vec<u8>, value: &str) {
    let mut bytes = value.as_bytes().to_vec();
    bytes.resize(2, 0);
    buf.extend_from_slice(&bytes);
}

fn write_entry(buf: &mut Vec<u8>, spec: &EntrySpec, key_pool: &StringPoolBuilder) {
    match spec {
        EntrySpec::Simple {
            key,
            data_type,
            data,
        } => {
            write_u16(buf, 8); // entry header size
            write_u16(buf, 0); // flags
            write_u32(buf, key_pool.index_of(key).unwrap());
            write_value(buf, *data_type, *data);
        }
        EntrySpec::Complex {
            key,
            parent,
            children,
        } => {
            write_u16(buf, 16);
            write_u16(buf, 0x0001); // FLAG_COMPLEX
            write_u32(buf, key_pool.index_of(key).unwrap());
            write_u32(buf, *parent);
            write_u32(buf, children.len() as u32);
            for (name, data_type, data) in children {
                write_u32(buf, *name);
                write_value(buf, *data_type, *data);
            }
        }
    }
}
