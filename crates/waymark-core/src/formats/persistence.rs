//! # Persistence Format
//!
//! Binary serialization for abbreviation rule sets.
//!
//! Layout, all integers little-endian:
//! - 4 bytes: format version (`u32`)
//! - 4 bytes: rule count (`i32`)
//! - per rule: pattern then replacement, each a `u32` byte length followed by UTF-8
//!
//! A blob written by an older or equal version is read; a newer version is
//! rejected with [`WaymarkError::IncompatibleVersion`].
//!
//! ## Limits
//!
//! Size and count limits are validated before any string is allocated:
//! - total size at most [`MAX_RULESET_PAYLOAD_SIZE`]
//! - at most [`MAX_PERSISTED_RULES`] rules
//! - every declared length must fit in the remaining bytes

use crate::primitives::{MAX_PERSISTED_RULES, MAX_RULESET_PAYLOAD_SIZE, RULESET_FORMAT_VERSION};
use crate::WaymarkError;

/// Size of the fixed header.
pub const RULESET_HEADER_SIZE: usize = 8;

// =============================================================================
// HEADER
// =============================================================================

/// The fixed header preceding all rule data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSetHeader {
    pub version: u32,
    pub count: i32,
}

impl RuleSetHeader {
    /// Create a header of the current version for `count` rules.
    #[must_use]
    pub fn new(count: i32) -> Self {
        Self {
            version: RULESET_FORMAT_VERSION,
            count,
        }
    }

    /// Check version and count before reading any rule.
    pub fn validate(&self) -> Result<usize, WaymarkError> {
        if self.version > RULESET_FORMAT_VERSION {
            return Err(WaymarkError::IncompatibleVersion {
                found: self.version,
                supported: RULESET_FORMAT_VERSION,
            });
        }
        let count = usize::try_from(self.count).map_err(|_| {
            WaymarkError::SerializationError(format!("Negative rule count: {}", self.count))
        })?;
        if count > MAX_PERSISTED_RULES {
            return Err(WaymarkError::SerializationError(format!(
                "Rule count {} exceeds maximum allowed {}",
                count, MAX_PERSISTED_RULES
            )));
        }
        Ok(count)
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; RULESET_HEADER_SIZE] {
        let mut bytes = [0u8; RULESET_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.version.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.count.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WaymarkError> {
        let mut reader = Reader::new(bytes);
        Ok(Self {
            version: reader.u32()?,
            count: reader.i32()?,
        })
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Encode `(pattern, replacement)` pairs.
pub fn rules_to_bytes(rules: &[(String, String)]) -> Result<Vec<u8>, WaymarkError> {
    let count = i32::try_from(rules.len())
        .map_err(|_| WaymarkError::SerializationError("Too many rules to encode".to_string()))?;

    let body: usize = rules.iter().map(|(p, r)| 8 + p.len() + r.len()).sum();
    let mut out = Vec::with_capacity(RULESET_HEADER_SIZE + body);
    out.extend_from_slice(&RuleSetHeader::new(count).to_bytes());

    for (pattern, replacement) in rules {
        write_string(&mut out, pattern)?;
        write_string(&mut out, replacement)?;
    }
    Ok(out)
}

/// Decode `(pattern, replacement)` pairs.
pub fn rules_from_bytes(bytes: &[u8]) -> Result<Vec<(String, String)>, WaymarkError> {
    if bytes.len() > MAX_RULESET_PAYLOAD_SIZE {
        return Err(WaymarkError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_RULESET_PAYLOAD_SIZE
        )));
    }

    let header = RuleSetHeader::from_bytes(bytes)?;
    let count = header.validate()?;

    let mut reader = Reader::new(&bytes[RULESET_HEADER_SIZE..]);
    // Each rule needs at least its two length prefixes.
    if count.saturating_mul(8) > reader.remaining() {
        return Err(WaymarkError::SerializationError(format!(
            "Truncated rule set: {} rules declared, {} bytes left",
            count,
            reader.remaining()
        )));
    }

    let mut rules = Vec::with_capacity(count);
    for _ in 0..count {
        let pattern = reader.string()?;
        let replacement = reader.string()?;
        rules.push((pattern, replacement));
    }
    Ok(rules)
}

fn write_string(out: &mut Vec<u8>, value: &str) -> Result<(), WaymarkError> {
    let len = u32::try_from(value.len())
        .map_err(|_| WaymarkError::SerializationError("String too long to encode".to_string()))?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

/// Cursor over the input with bounds-checked reads.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], WaymarkError> {
        if len > self.remaining() {
            return Err(WaymarkError::SerializationError(format!(
                "Unexpected end of data: needed {} bytes at offset {}, {} left",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array4(&mut self) -> Result<[u8; 4], WaymarkError> {
        let mut out = [0u8; 4];
        out.copy_from_slice(self.take(4)?);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, WaymarkError> {
        Ok(u32::from_le_bytes(self.array4()?))
    }

    fn i32(&mut self) -> Result<i32, WaymarkError> {
        Ok(i32::from_le_bytes(self.array4()?))
    }

    fn string(&mut self) -> Result<String, WaymarkError> {
        let len = self.u32()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| WaymarkError::SerializationError(format!("Invalid UTF-8 in rule: {}", e)))
    }
}

// =============================================================================
// TESTS
// =============================================================================
