use crate::error::{ParseError, ParseResult};
use crate::reader::ByteReader;

pub(crate) const CHUNK_NULL: u16 = 0x0000;
pub(crate) const CHUNK_STRING_POOL: u16 = 0x0001;
pub(crate) const CHUNK_TABLE: u16 = 0x0002;
pub(crate) const CHUNK_XML: u16 = 0x0003;

pub(crate) const XML_FIRST_CHUNK: u16 = 0x0100;
pub(crate) const XML_START_NAMESPACE: u16 = 0x0100;
pub(crate) const XML_END_NAMESPACE: u16 = 0x0101;
pub(crate) const XML_START_ELEMENT: u16 = 0x0102;
pub(crate) const XML_END_ELEMENT: u16 = 0x0103;
pub(crate) const XML_CDATA: u16 = 0x0104;
pub(crate) const XML_LAST_CHUNK: u16 = 0x017f;
pub(crate) const XML_RESOURCE_MAP: u16 = 0x0180;

pub(crate) const TABLE_PACKAGE: u16 = 0x0200;
pub(crate) const TABLE_TYPE: u16 = 0x0201;
pub(crate) const TABLE_TYPE_SPEC: u16 = 0x0202;
pub(crate) const TABLE_LIBRARY: u16 = 0x0203;

/// The fields every chunk shares. `chunk_size` covers the header itself,
/// so `body_size = chunk_size - header_size`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ChunkInfo {
    pub chunk_type: u16,
    pub header_size: u16,
    pub chunk_size: u32,
    pub start: usize,
}

impl ChunkInfo {
    pub(crate) fn body_start(&self) -> usize {
        self.start + self.header_size as usize
    }

    pub(crate) fn body_size(&self) -> usize {
        (self.chunk_size - self.header_size as u32) as usize
    }
}

#[derive(Clone, Debug)]
pub(crate) struct StringPoolHeader {
    pub info: ChunkInfo,
    pub string_count: u32,
    pub style_count: u32,
    pub flags: u32,
    pub strings_start: u32,
    pub styles_start: u32,
}

impl StringPoolHeader {
    pub(crate) const UTF8_FLAG: u32 = 1 << 8;

    pub(crate) fn is_utf8(&self) -> bool {
        self.flags & Self::UTF8_FLAG != 0
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct TableHeader {
    pub info: ChunkInfo,
    pub package_count: u32,
}

#[derive(Clone, Debug)]
pub(crate) struct PackageHeader {
    pub info: ChunkInfo,
    pub id: u32,
    pub name: String,
    pub type_strings: u32,
    pub key_strings: u32,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct TypeSpecHeader {
    pub info: ChunkInfo,
    pub id: u8,
    pub entry_count: u32,
}

#[derive(Clone, Debug)]
pub(crate) struct TypeHeader {
    pub info: ChunkInfo,
    pub id: u8,
    pub entry_count: u32,
    pub entries_start: u32,
    pub config: ResTableConfig,
}

/// The slice of the type configuration block the manifest decoder cares
/// about: only the locale matters downstream. Everything else, including
/// qualifier dimensions added by newer toolchains, is skipped by the
/// block's declared size.
#[derive(Clone, Debug, Default)]
pub(crate) struct ResTableConfig {
    pub language: String,
    pub country: String,
}

impl ResTableConfig {
    pub(crate) fn read(reader: &mut ByteReader<'_>) -> ParseResult<ResTableConfig> {
        let begin = reader.position();
        let size = reader.read_u32()?;
        reader.read_u16()?; // mcc
        reader.read_u16()?; // mnc
        let config = ResTableConfig {
            language: reader.read_fixed_ascii(2)?,
            country: reader.read_fixed_ascii(2)?,
        };
        reader.read_u8()?; // orientation
        reader.read_u8()?; // touchscreen
        reader.read_u16()?; // density
        let consumed = (reader.position() - begin) as u32;
        if size < consumed {
            return Err(ParseError::Overflow);
        }
        reader.skip((size - consumed) as usize)?;
        Ok(config)
    }

    /// `""`, `lang`, or `lang-COUNTRY`, depending on which fields are set.
    pub(crate) fn locale(&self) -> String {
        if self.language.is_empty() {
            return String::new();
        }
        if self.country.is_empty() {
            return self.language.clone();
        }
        format!("{}-{}", self.language, self.country)
    }
}

#[derive(Clone, Debug)]
pub(crate) enum ChunkHeader {
    Null(ChunkInfo),
    StringPool(StringPoolHeader),
    Xml(ChunkInfo),
    XmlNode(ChunkInfo),
    ResourceMap(ChunkInfo),
    Table(TableHeader),
    Package(PackageHeader),
    TypeSpec(TypeSpecHeader),
    Type(TypeHeader),
    Library(ChunkInfo),
    Unknown(ChunkInfo),
}

impl ChunkHeader {
    pub(crate) fn info(&self) -> &ChunkInfo {
        match self {
            ChunkHeader::Null(info)
            | ChunkHeader::Xml(info)
            | ChunkHeader::XmlNode(info)
            | ChunkHeader::ResourceMap(info)
            | ChunkHeader::Library(info)
            | ChunkHeader::Unknown(info) => info,
            ChunkHeader::StringPool(header) => &header.info,
            ChunkHeader::Table(header) => &header.info,
            ChunkHeader::Package(header) => &header.info,
            ChunkHeader::TypeSpec(header) => &header.info,
            ChunkHeader::Type(header) => &header.info,
        }
    }
}

fn read_info(reader: &mut ByteReader<'_>) -> ParseResult<Option<ChunkInfo>> {
    if !reader.has_remaining() {
        return Ok(None);
    }
    let start = reader.position();
    let chunk_type = reader.read_u16()?;
    let header_size = reader.read_u16()?;
    let chunk_size = reader.read_u32()?;
    if chunk_size < header_size as u32 {
        return Err(ParseError::Truncated);
    }
    Ok(Some(ChunkInfo {
        chunk_type,
        header_size,
        chunk_size,
        start,
    }))
}

fn read_string_pool_header(
    reader: &mut ByteReader<'_>,
    info: ChunkInfo,
) -> ParseResult<StringPoolHeader> {
    Ok(StringPoolHeader {
        info,
        string_count: reader.read_u32()?,
        style_count: reader.read_u32()?,
        flags: reader.read_u32()?,
        strings_start: reader.read_u32()?,
        styles_start: reader.read_u32()?,
    })
}

/// Reads the next chunk header of an XML document, leaving the cursor at
/// `start + header_size` whatever the variant actually parsed. Unknown
/// types inside the reserved node range come back as skippable
/// [`ChunkHeader::Unknown`]; anything else unrecognized is fatal.
pub(crate) fn read_xml_chunk(reader: &mut ByteReader<'_>) -> ParseResult<Option<ChunkHeader>> {
    let info = match read_info(reader)? {
        Some(info) => info,
        None => return Ok(None),
    };
    let header = match info.chunk_type {
        CHUNK_NULL => ChunkHeader::Null(info),
        CHUNK_XML => ChunkHeader::Xml(info),
        CHUNK_STRING_POOL => ChunkHeader::StringPool(read_string_pool_header(reader, info)?),
        XML_RESOURCE_MAP => ChunkHeader::ResourceMap(info),
        XML_START_NAMESPACE..=XML_CDATA => {
            reader.read_u32()?; // line
            reader.read_u32()?; // comment
            ChunkHeader::XmlNode(info)
        }
        chunk_type if (XML_FIRST_CHUNK..=XML_LAST_CHUNK).contains(&chunk_type) => {
            ChunkHeader::Unknown(info)
        }
        chunk_type => return Err(ParseError::UnexpectedChunkType(chunk_type)),
    };
    reader.seek(header.info().body_start())?;
    Ok(Some(header))
}

/// Reads the next chunk header of a resource table. Unrecognized types are
/// never fatal here; newer tables carry chunks this parser skips wholesale.
pub(crate) fn read_table_chunk(reader: &mut ByteReader<'_>) -> ParseResult<Option<ChunkHeader>> {
    let info = match read_info(reader)? {
        Some(info) => info,
        None => return Ok(None),
    };
    let header = match info.chunk_type {
        CHUNK_NULL => ChunkHeader::Null(info),
        CHUNK_TABLE => ChunkHeader::Table(TableHeader {
            info,
            package_count: reader.read_u32()?,
        }),
        CHUNK_STRING_POOL => ChunkHeader::StringPool(read_string_pool_header(reader, info)?),
        TABLE_PACKAGE => {
            let id = reader.read_u32()?;
            // The package name is a fixed 256-byte UTF-16 field.
            let name = reader.read_utf16(128)?;
            let type_strings = reader.read_u32()?;
            reader.read_u32()?; // last public type
            let key_strings = reader.read_u32()?;
            reader.read_u32()?; // last public key
            ChunkHeader::Package(PackageHeader {
                info,
                id,
                name,
                type_strings,
                key_strings,
            })
        }
        TABLE_TYPE_SPEC => {
            let id = reader.read_u8()?;
            reader.read_u8()?; // res0
            reader.read_u16()?; // res1
            ChunkHeader::TypeSpec(TypeSpecHeader {
                info,
                id,
                entry_count: reader.read_u32()?,
            })
        }
        TABLE_TYPE => {
            let id = reader.read_u8()?;
            reader.read_u8()?; // res0
            reader.read_u16()?; // res1
            ChunkHeader::Type(TypeHeader {
                info,
                id,
                entry_count: reader.read_u32()?,
                entries_start: reader.read_u32()?,
                config: ResTableConfig::read(reader)?,
            })
        }
        TABLE_LIBRARY => ChunkHeader::Library(info),
        _ => ChunkHeader::Unknown(info),
    };
    reader.seek(header.info().body_start())?;
    Ok(Some(header))
}
