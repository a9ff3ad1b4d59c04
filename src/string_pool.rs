use log::debug;

use crate::chunk::StringPoolHeader;
use crate::error::{ParseError, ParseResult};
use crate::reader::ByteReader;

/// An indexed collection of strings materialised from a pool chunk.
///
/// Every document (and the resource table, three times over) carries one of
/// these; chunk payloads refer to its entries by index.
#[derive(Clone, Debug, Default)]
pub struct StringPool {
    strings: Vec<String>,
}

impl StringPool {
    /// Looks up a string by the signed reference stored in the binary.
    /// Negative references mean "no string".
    pub fn get(&self, string_ref: i32) -> Option<&str> {
        if string_ref < 0 {
            return None;
        }
        self.strings.get(string_ref as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Decodes a pool whose header was just read; the cursor must sit at the
    /// pool's body start, and ends up at the pool's chunk end.
    ///
    /// Offsets repeat when aapt deduplicates identical strings, so a repeat
    /// of the previous offset shares the previously decoded value instead of
    /// seeking again.
    pub(crate) fn parse(
        reader: &mut ByteReader<'_>,
        header: &StringPoolHeader,
    ) -> ParseResult<StringPool> {
        let begin = reader.position();
        let count = header.string_count as usize;
        if header.style_count > 0 {
            debug!(
                "pool carries {} style entries at offset {}, skipped",
                header.style_count, header.styles_start
            );
        }
        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            offsets.push(reader.read_u32()?);
        }

        let strings_start = (begin + header.strings_start as usize)
            .checked_sub(header.info.header_size as usize)
            .ok_or(ParseError::Overflow)?;

        let mut strings = Vec::with_capacity(count);
        let mut last_offset = None;
        let mut last_value = String::new();
        for offset in offsets {
            let absolute = strings_start + offset as usize;
            if last_offset == Some(absolute) {
                strings.push(last_value.clone());
                continue;
            }
            reader.seek(absolute)?;
            let value = reader.read_string(header.is_utf8())?;
            last_offset = Some(absolute);
            last_value = value.clone();
            strings.push(value);
        }

        reader.seek(begin + header.info.body_size())?;
        Ok(StringPool { strings })
    }
}
