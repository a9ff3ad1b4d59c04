use crate::error::ParseResult;
use crate::reader::ByteReader;
use crate::resolver::ResourceResolver;
use crate::string_pool::StringPool;

pub(crate) const TYPE_NULL: u8 = 0x00;
pub(crate) const TYPE_REFERENCE: u8 = 0x01;
pub(crate) const TYPE_ATTRIBUTE: u8 = 0x02;
pub(crate) const TYPE_STRING: u8 = 0x03;
pub(crate) const TYPE_FLOAT: u8 = 0x04;
pub(crate) const TYPE_DIMENSION: u8 = 0x05;
pub(crate) const TYPE_FRACTION: u8 = 0x06;
pub(crate) const TYPE_INT_DEC: u8 = 0x10;
pub(crate) const TYPE_INT_HEX: u8 = 0x11;
pub(crate) const TYPE_INT_BOOLEAN: u8 = 0x12;
pub(crate) const TYPE_INT_COLOR_ARGB8: u8 = 0x1c;
pub(crate) const TYPE_INT_COLOR_RGB8: u8 = 0x1d;
pub(crate) const TYPE_INT_COLOR_ARGB4: u8 = 0x1e;
pub(crate) const TYPE_INT_COLOR_RGB4: u8 = 0x1f;

const UNIT_PX: u32 = 0;
const UNIT_DIP: u32 = 1;
const UNIT_SP: u32 = 2;
const UNIT_PT: u32 = 3;
const UNIT_IN: u32 = 4;
const UNIT_MM: u32 = 5;
const UNIT_FRACTION: u32 = 0;
const UNIT_FRACTION_PARENT: u32 = 1;

/// A typed value slot, shared by XML attributes and resource table entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceValue {
    pub data_type: u8,
    pub data: u32,
}

impl ResourceValue {
    pub fn new(data_type: u8, data: u32) -> Self {
        ResourceValue { data_type, data }
    }

    /// Reads the 8-byte `Res_value` layout: size, a reserved byte, the type
    /// code, and the payload word.
    pub(crate) fn read(reader: &mut ByteReader<'_>) -> ParseResult<ResourceValue> {
        reader.read_u16()?; // size
        reader.read_u8()?; // res0
        let data_type = reader.read_u8()?;
        let data = reader.read_u32()?;
        Ok(ResourceValue { data_type, data })
    }

    pub(crate) fn is_reference(&self) -> bool {
        matches!(self.data_type, TYPE_REFERENCE | TYPE_ATTRIBUTE)
    }

    /// Renders the value as manifest text. References go through the
    /// resolver when one is supplied and fall back to the raw id otherwise;
    /// unrecognized type codes degrade to `{<type>:<data>}` instead of
    /// failing the decode.
    pub fn render(
        &self,
        pool: Option<&StringPool>,
        resolver: Option<&dyn ResourceResolver>,
    ) -> String {
        match self.data_type {
            TYPE_NULL => String::new(),
            TYPE_REFERENCE | TYPE_ATTRIBUTE => {
                if let Some(resolver) = resolver {
                    if let Some(resolved) = resolver.resolve_reference(self.data) {
                        return resolved;
                    }
                }
                format!("@0x{:x}", self.data)
            }
            TYPE_STRING => pool
                .and_then(|pool| pool.get(self.data as i32))
                .unwrap_or("")
                .to_string(),
            TYPE_FLOAT => f32::from_bits(self.data).to_string(),
            TYPE_DIMENSION => format!(
                "{}{}",
                complex_to_float(self.data),
                dimension_unit(self.data)
            ),
            TYPE_FRACTION => {
                format!("{}{}", complex_to_float(self.data), fraction_unit(self.data))
            }
            TYPE_INT_DEC => (self.data as i32).to_string(),
            TYPE_INT_HEX => format!("0x{:x}", self.data),
            TYPE_INT_BOOLEAN => (if self.data != 0 { "true" } else { "false" }).to_string(),
            TYPE_INT_COLOR_ARGB8 => format!("#{:08x}", self.data),
            TYPE_INT_COLOR_RGB8 => format!("#{:06x}", self.data & 0x00ff_ffff),
            TYPE_INT_COLOR_ARGB4 => format!("#{:04x}", self.data & 0xffff),
            TYPE_INT_COLOR_RGB4 => format!("#{:03x}", self.data & 0x0fff),
            other => format!("{{{}:{}}}", other, self.data),
        }
    }
}

/// The radix portion of a complex dimension/fraction word. The sign bit
/// survives the mask, so negative dimensions render negative.
fn complex_to_float(complex: u32) -> f32 {
    ((complex & 0xffff_ff00) as i32) as f32 / 256.0
}

fn dimension_unit(complex: u32) -> &'static str {
    match complex & 0xf {
        UNIT_PX => "px",
        UNIT_DIP => "dp",
        UNIT_SP => "sp",
        UNIT_PT => "pt",
        UNIT_IN => "in",
        UNIT_MM => "mm",
        _ => "unknown",
    }
}

fn fraction_unit(complex: u32) -> &'static str {
    match complex & 0xf {
        UNIT_FRACTION => "%",
        UNIT_FRACTION_PARENT => "%p",
        _ => "unknown",
    }
}
