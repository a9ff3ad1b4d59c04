use std::fmt;

/// Result alias for binary chunk parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors surfaced while decoding binary XML or a compiled resource table.
///
/// All of these are fatal for the current decode; the parsers never return
/// partial output.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer bytes remained than a read requested.
    Truncated,
    /// A seek target or size field pointed outside the document.
    Overflow,
    /// A chunk type the XML parser does not recognize.
    UnexpectedChunkType(u16),
    /// The document did not carry a string pool after the XML sentinel.
    MissingStringPool,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Truncated => write!(f, "unexpected end of data"),
            ParseError::Overflow => write!(f, "offset outside of document bounds"),
            ParseError::UnexpectedChunkType(chunk_type) => {
                write!(f, "unexpected chunk type: 0x{chunk_type:04x}")
            }
            ParseError::MissingStringPool => write!(f, "string pool chunk not found"),
        }
    }
}

impl std::error::Error for ParseError {}
