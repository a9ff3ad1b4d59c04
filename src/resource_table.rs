use std::collections::HashMap;

use log::{debug, warn};

use crate::chunk::{self, ChunkHeader, PackageHeader, TypeHeader};
use crate::error::{ParseError, ParseResult};
use crate::reader::ByteReader;
use crate::resolver::Locale;
use crate::string_pool::StringPool;
use crate::value::ResourceValue;

const FLAG_COMPLEX: u16 = 0x0001;
const NO_ENTRY: u32 = 0xffff_ffff;

/// One configuration-specific value of a resource.
///
/// `res_id` packs `(package_id << 24) | (type_id << 16) | entry_index`.
/// Complex (map) entries carry no value; the manifest decoder only ever
/// chases simple values and references.
#[derive(Clone, Debug)]
pub struct ResourceEntry {
    pub res_id: u32,
    pub type_name: String,
    pub key: String,
    pub value: Option<ResourceValue>,
    pub locale: String,
}

/// A parsed `resources.arsc`, indexed by resource id. Entries for the same
/// id under different configurations pile up in insertion order and are
/// picked apart by locale at resolution time.
#[derive(Debug, Default)]
pub struct ResourceTable {
    global_pool: StringPool,
    entries: HashMap<u32, Vec<ResourceEntry>>,
    attr_names: HashMap<u32, String>,
}

impl ResourceTable {
    /// Parses a compiled resource table out of raw `resources.arsc` bytes.
    pub fn parse(data: &[u8]) -> ParseResult<ResourceTable> {
        Parser {
            reader: ByteReader::new(data),
        }
        .parse()
    }

    pub(crate) fn get_string(&self, index: u32) -> Option<&str> {
        self.global_pool.get(index as i32)
    }

    /// The key of the most recently parsed `attr` entry with this id.
    pub fn attribute_name(&self, res_id: u32) -> Option<&str> {
        self.attr_names.get(&res_id).map(String::as_str)
    }

    /// Picks the best candidate for a resource id: exact `lang-COUNTRY`
    /// first, then bare `lang`, then the locale-neutral entry, then
    /// whatever came first.
    pub fn select_entry(&self, res_id: u32, locale: &Locale) -> Option<&ResourceEntry> {
        let candidates = self.entries.get(&res_id)?;
        let lang = &locale.language;
        let lang_country = locale.to_locale_string();

        if let Some(entry) = candidates.iter().find(|e| e.locale == lang_country) {
            return Some(entry);
        }
        if !lang.is_empty() {
            if let Some(entry) = candidates.iter().find(|e| &e.locale == lang) {
                return Some(entry);
            }
        }
        candidates
            .iter()
            .find(|e| e.locale.is_empty())
            .or_else(|| candidates.first())
    }

    fn add_entry(&mut self, entry: ResourceEntry) {
        if entry.type_name == "attr" {
            self.attr_names.insert(entry.res_id, entry.key.clone());
        }
        self.entries.entry(entry.res_id).or_default().push(entry);
    }
}

struct Parser<'a> {
    reader: ByteReader<'a>,
}

impl<'a> Parser<'a> {
    fn parse(mut self) -> ParseResult<ResourceTable> {
        let table_header = match chunk::read_table_chunk(&mut self.reader)? {
            Some(ChunkHeader::Table(header)) => header,
            Some(other) => return Err(ParseError::UnexpectedChunkType(other.info().chunk_type)),
            None => return Ok(ResourceTable::default()),
        };

        let mut table = ResourceTable {
            global_pool: self.read_pool()?,
            ..ResourceTable::default()
        };

        if table_header.package_count > 0 {
            let mut next_package = match chunk::read_table_chunk(&mut self.reader)? {
                Some(ChunkHeader::Package(header)) => Some(header),
                _ => None,
            };
            for _ in 0..table_header.package_count {
                let header = match next_package.take() {
                    Some(header) => header,
                    None => break,
                };
                next_package = self.parse_package(&header, &mut table)?;
            }
        }
        Ok(table)
    }

    fn read_pool(&mut self) -> ParseResult<StringPool> {
        match chunk::read_table_chunk(&mut self.reader)? {
            Some(ChunkHeader::StringPool(header)) => {
                StringPool::parse(&mut self.reader, &header)
            }
            _ => Err(ParseError::MissingStringPool),
        }
    }

    /// Parses one package: its two nested pools, then the chunk run up to
    /// the next package header (which is returned) or the end of buffer.
    fn parse_package(
        &mut self,
        header: &PackageHeader,
        table: &mut ResourceTable,
    ) -> ParseResult<Option<PackageHeader>> {
        let begin = self.reader.position();
        debug!("parsing resource package 0x{:02x} ({})", header.id, header.name);

        let mut type_pool = None;
        if header.type_strings > 0 {
            self.seek_package_offset(begin, header, header.type_strings)?;
            type_pool = Some(self.read_pool()?);
        }
        let mut key_pool = None;
        if header.key_strings > 0 {
            self.seek_package_offset(begin, header, header.key_strings)?;
            key_pool = Some(self.read_pool()?);
        }

        loop {
            let chunk_header = match chunk::read_table_chunk(&mut self.reader)? {
                Some(chunk_header) => chunk_header,
                None => return Ok(None),
            };
            let body_start = self.reader.position();
            match chunk_header {
                ChunkHeader::TypeSpec(spec) => {
                    debug!(
                        "type spec 0x{:02x} declares {} entries",
                        spec.id, spec.entry_count
                    );
                    self.reader.seek(body_start + spec.info.body_size())?;
                }
                ChunkHeader::Type(type_header) => {
                    self.read_type(
                        &type_header,
                        header.id,
                        type_pool.as_ref(),
                        key_pool.as_ref(),
                        table,
                    )?;
                    self.reader.seek(body_start + type_header.info.body_size())?;
                }
                ChunkHeader::Package(next) => return Ok(Some(next)),
                other => {
                    if let ChunkHeader::Unknown(info) = &other {
                        warn!(
                            "skipping unknown chunk type 0x{:04x} in resource table",
                            info.chunk_type
                        );
                    }
                    self.reader.seek(body_start + other.info().body_size())?;
                }
            }
        }
    }

    fn seek_package_offset(
        &mut self,
        body_start: usize,
        header: &PackageHeader,
        offset: u32,
    ) -> ParseResult<()> {
        // The stored offsets are relative to the package chunk start.
        let target = (body_start + offset as usize)
            .checked_sub(header.info.header_size as usize)
            .ok_or(ParseError::Overflow)?;
        self.reader.seek(target)
    }

    fn read_type(
        &mut self,
        header: &TypeHeader,
        package_id: u32,
        type_pool: Option<&StringPool>,
        key_pool: Option<&StringPool>,
        table: &mut ResourceTable,
    ) -> ParseResult<()> {
        let body_start = self.reader.position();
        let mut offsets = Vec::with_capacity(header.entry_count as usize);
        for _ in 0..header.entry_count {
            offsets.push(self.reader.read_u32()?);
        }

        let type_name = type_pool
            .filter(|_| header.id > 0)
            .and_then(|pool| pool.get(header.id as i32 - 1))
            .map(str::to_string)
            .unwrap_or_else(|| format!("type{}", header.id));
        let entries_start = (body_start + header.entries_start as usize)
            .checked_sub(header.info.header_size as usize)
            .ok_or(ParseError::Overflow)?;
        let locale = header.config.locale();

        for (entry_index, offset) in offsets.into_iter().enumerate() {
            if offset == NO_ENTRY {
                continue;
            }
            self.reader.seek(entries_start + offset as usize)?;
            let entry = self.read_entry(
                package_id,
                header.id,
                entry_index as u32,
                &type_name,
                key_pool,
                &locale,
            )?;
            table.add_entry(entry);
        }
        Ok(())
    }

    fn read_entry(
        &mut self,
        package_id: u32,
        type_id: u8,
        entry_index: u32,
        type_name: &str,
        key_pool: Option<&StringPool>,
        locale: &str,
    ) -> ParseResult<ResourceEntry> {
        let begin = self.reader.position();
        let size = self.reader.read_u16()?;
        let flags = self.reader.read_u16()?;
        let key_ref = self.reader.read_u32()?;
        let key = key_pool
            .and_then(|pool| pool.get(key_ref as i32))
            .map(str::to_string)
            .unwrap_or_else(|| format!("key{key_ref}"));
        let res_id = (package_id << 24) | ((type_id as u32) << 16) | entry_index;

        let value = if flags & FLAG_COMPLEX != 0 {
            self.reader.read_u32()?; // parent
            let count = self.reader.read_u32()?;
            self.reader.seek(begin + size as usize)?;
            // The map body is consumed but not modelled; complex entries
            // never feed manifest attribute values.
            for _ in 0..count {
                self.reader.read_u32()?;
                ResourceValue::read(&mut self.reader)?;
            }
            None
        } else {
            self.reader.seek(begin + size as usize)?;
            Some(ResourceValue::read(&mut self.reader)?)
        };

        Ok(ResourceEntry {
            res_id,
            type_name: type_name.to_string(),
            key,
            value,
            locale: locale.to_string(),
        })
    }
}
