use log::debug;

use crate::attribute_values::AttributeValueMapper;
use crate::chunk::{self, ChunkHeader, ChunkInfo};
use crate::error::{ParseError, ParseResult};
use crate::reader::ByteReader;
use crate::resolver::ResourceResolver;
use crate::string_pool::StringPool;
use crate::translator::{XmlAttribute, XmlTranslator};
use crate::value::ResourceValue;

/// Decodes a compiled `AndroidManifest.xml` payload into text.
///
/// `resolver` dereferences resource ids found in attribute values and
/// recovers attribute names for obfuscated manifests; `mapper` humanises
/// well-known integer attributes. Either may be absent.
pub fn decode_manifest(
    data: &[u8],
    resolver: Option<&dyn ResourceResolver>,
    mapper: Option<&AttributeValueMapper>,
) -> ParseResult<String> {
    BinaryXmlParser::new(data, resolver, mapper).parse()
}

struct BinaryXmlParser<'a> {
    reader: ByteReader<'a>,
    resolver: Option<&'a dyn ResourceResolver>,
    mapper: Option<&'a AttributeValueMapper>,
    string_pool: StringPool,
    resource_map: Vec<u32>,
    translator: XmlTranslator,
}

impl<'a> BinaryXmlParser<'a> {
    fn new(
        data: &'a [u8],
        resolver: Option<&'a dyn ResourceResolver>,
        mapper: Option<&'a AttributeValueMapper>,
    ) -> Self {
        BinaryXmlParser {
            reader: ByteReader::new(data),
            resolver,
            mapper,
            string_pool: StringPool::default(),
            resource_map: Vec::new(),
            translator: XmlTranslator::new(),
        }
    }

    fn parse(mut self) -> ParseResult<String> {
        let first = match chunk::read_xml_chunk(&mut self.reader)? {
            Some(header) => header,
            None => return Ok(self.translator.into_xml()),
        };
        match first {
            ChunkHeader::Xml(_) | ChunkHeader::Null(_) => {}
            other => return Err(ParseError::UnexpectedChunkType(other.info().chunk_type)),
        }

        match chunk::read_xml_chunk(&mut self.reader)? {
            Some(ChunkHeader::StringPool(header)) => {
                self.string_pool = StringPool::parse(&mut self.reader, &header)?;
            }
            _ => return Err(ParseError::MissingStringPool),
        }

        let mut next = chunk::read_xml_chunk(&mut self.reader)?;
        if let Some(ChunkHeader::ResourceMap(info)) = &next {
            let info = *info;
            self.read_resource_map(&info)?;
            next = chunk::read_xml_chunk(&mut self.reader)?;
        }

        while let Some(header) = next {
            let body_start = self.reader.position();
            match &header {
                ChunkHeader::XmlNode(info) => match info.chunk_type {
                    chunk::XML_START_NAMESPACE => self.read_namespace_start()?,
                    chunk::XML_END_NAMESPACE => self.read_namespace_end()?,
                    chunk::XML_START_ELEMENT => self.read_start_tag()?,
                    chunk::XML_END_ELEMENT => self.read_end_tag()?,
                    chunk::XML_CDATA => self.read_cdata()?,
                    _ => {}
                },
                // Reserved-range chunks this parser does not know, and
                // stray resource maps, are advanced over by body size.
                ChunkHeader::Unknown(_) | ChunkHeader::ResourceMap(_) => {}
                other => return Err(ParseError::UnexpectedChunkType(other.info().chunk_type)),
            }
            self.reader.seek(body_start + header.info().body_size())?;
            next = chunk::read_xml_chunk(&mut self.reader)?;
        }

        Ok(self.translator.into_xml())
    }

    fn read_resource_map(&mut self, info: &ChunkInfo) -> ParseResult<()> {
        let count = info.body_size() / 4;
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            ids.push(self.reader.read_u32()?);
        }
        debug!("resource map carries {} attribute ids", ids.len());
        self.resource_map = ids;
        Ok(())
    }

    fn read_namespace_start(&mut self) -> ParseResult<()> {
        let prefix_ref = self.reader.read_i32()?;
        let uri_ref = self.reader.read_i32()?;
        let prefix = self.get_string(prefix_ref);
        let uri = self.get_string(uri_ref);
        self.translator.on_namespace_start(prefix, uri);
        Ok(())
    }

    fn read_namespace_end(&mut self) -> ParseResult<()> {
        let prefix_ref = self.reader.read_i32()?;
        let uri_ref = self.reader.read_i32()?;
        let prefix = self.get_string(prefix_ref);
        let uri = self.get_string(uri_ref);
        self.translator
            .on_namespace_end(prefix.as_deref(), uri.as_deref());
        Ok(())
    }

    fn read_start_tag(&mut self) -> ParseResult<()> {
        let ns_ref = self.reader.read_i32()?;
        let name_ref = self.reader.read_i32()?;
        let namespace = self.get_string(ns_ref);
        let name = self.get_string(name_ref).unwrap_or_default();

        self.reader.read_u16()?; // attribute start
        self.reader.read_u16()?; // attribute size
        let attribute_count = self.reader.read_u16()? as usize;
        self.reader.read_u16()?; // id index
        self.reader.read_u16()?; // class index
        self.reader.read_u16()?; // style index

        let mut attributes = Vec::with_capacity(attribute_count);
        for _ in 0..attribute_count {
            attributes.push(self.read_attribute()?);
        }
        self.translator
            .on_start_tag(namespace.as_deref(), &name, &attributes);
        Ok(())
    }

    fn read_end_tag(&mut self) -> ParseResult<()> {
        let ns_ref = self.reader.read_i32()?;
        let name_ref = self.reader.read_i32()?;
        let namespace = self.get_string(ns_ref);
        let name = self.get_string(name_ref).unwrap_or_default();
        self.translator.on_end_tag(namespace.as_deref(), &name);
        Ok(())
    }

    fn read_cdata(&mut self) -> ParseResult<()> {
        let data_ref = self.reader.read_i32()?;
        let data = self.get_string(data_ref);
        ResourceValue::read(&mut self.reader)?;
        if let Some(data) = data {
            self.translator.on_cdata(&data);
        }
        Ok(())
    }

    fn read_attribute(&mut self) -> ParseResult<XmlAttribute> {
        let ns_ref = self.reader.read_i32()?;
        let name_ref = self.reader.read_i32()?;
        let raw_value_ref = self.reader.read_i32()?;

        let namespace = self.get_string(ns_ref);
        let name = self.attribute_name(name_ref);
        let raw_value = if raw_value_ref >= 0 {
            self.get_string(raw_value_ref)
        } else {
            None
        };
        let res_value = ResourceValue::read(&mut self.reader)?;

        let mut value = raw_value
            .unwrap_or_else(|| res_value.render(Some(&self.string_pool), self.resolver));
        if let Some(mapper) = self.mapper {
            if let Some(mapped) = mapper.map(&name, &value) {
                value = mapped;
            }
        }
        Ok(XmlAttribute {
            namespace,
            name,
            value,
        })
    }

    /// Obfuscated manifests blank out attribute name strings; the resource
    /// map then keys the name by attribute resource id.
    fn attribute_name(&self, name_ref: i32) -> String {
        if let Some(name) = self.get_string(name_ref) {
            if !name.is_empty() {
                return name;
            }
        }
        if name_ref >= 0 && (name_ref as usize) < self.resource_map.len() {
            let res_id = self.resource_map[name_ref as usize];
            if let Some(resolver) = self.resolver {
                if let Some(resolved) = resolver.resolve_attribute_name(res_id) {
                    return resolved;
                }
            }
            return format!("AttrId:0x{res_id:x}");
        }
        self.get_string(name_ref).unwrap_or_default()
    }

    fn get_string(&self, string_ref: i32) -> Option<String> {
        self.string_pool.get(string_ref).map(str::to_string)
    }
}
