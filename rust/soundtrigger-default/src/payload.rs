//! Reference model payload format.
//!
//! Real vendor payloads are proprietary. The reference server accepts only
//! this framing:
//!
//! ```text
//! +--------+----------------+-----------------+
//! | "STRM" | body_len (LE)  | body            |
//! | 4 B    | u32, 4 B       | body_len bytes  |
//! +--------+----------------+-----------------+
//! ```
//!
//! Anything else (empty data, random bytes, truncated bodies) is rejected.

/// Leading bytes of every accepted payload.
pub const MODEL_MAGIC: [u8; 4] = *b"STRM";

/// Magic plus body length.
pub const HEADER_LEN: usize = 8;

/// Why a payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// No data at all.
    Empty,
    /// Shorter than the header.
    Truncated { len: usize },
    /// Does not start with [`MODEL_MAGIC`].
    BadMagic([u8; 4]),
    /// Declared body length disagrees with the bytes present.
    LengthMismatch { declared: usize, actual: usize },
    /// Body too long for the length field.
    TooLarge { len: usize },
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadError::Empty => write!(f, "payload is empty"),
            PayloadError::Truncated { len } => {
                write!(f, "payload of {} bytes is shorter than its header", len)
            }
            PayloadError::BadMagic(magic) => write!(f, "bad payload magic {:02x?}", magic),
            PayloadError::LengthMismatch { declared, actual } => write!(
                f,
                "payload declares {} body bytes but carries {}",
                declared, actual
            ),
            PayloadError::TooLarge { len } => {
                write!(f, "body of {} bytes does not fit a u32 length", len)
            }
        }
    }
}

impl std::error::Error for PayloadError {}

/// Frame `body` as an accepted payload.
pub fn encode(body: &[u8]) -> Result<Vec<u8>, PayloadError> {
    let len = body_len(body.len())?;
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&MODEL_MAGIC);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(body);
    Ok(out)
}

fn body_len(len: usize) -> Result<u32, PayloadError> {
    u32::try_from(len).map_err(|_| PayloadError::TooLarge { len })
}

/// Validate `data` and return its body.
pub fn decode(data: &[u8]) -> Result<&[u8], PayloadError> {
    if data.is_empty() {
        return Err(PayloadError::Empty);
    }
    if data.len() < HEADER_LEN {
        return Err(PayloadError::Truncated { len: data.len() });
    }

    let magic = [data[0], data[1], data[2], data[3]];
    if magic != MODEL_MAGIC {
        return Err(PayloadError::BadMagic(magic));
    }

    let declared = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
    let body = &data[HEADER_LEN..];
    if declared != body.len() {
        return Err(PayloadError::LengthMismatch {
            declared,
            actual: body.len(),
        });
    }
    Ok(body)
}
