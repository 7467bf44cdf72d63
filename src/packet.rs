//! Fixed-width hex codec for the game packet record
//!
//! Domain packets travel inside a frame's `data` field as a single hex
//! string: a 34-character header of five zero-padded uppercase fields,
//! then the raw body with no delimiter.
//!
//! ```text
//! offset   0        8   10       18       26       34
//!          LLLLLLLL VV  CCCCCCCC AAAAAAAA KKKKKKKK body...
//!          length   ver cmd      account  checksum
//! ```
//!
//! Only the two endpoints of an exchange encode or decode this; the hub
//! and the frame layer treat it as an opaque string.

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Width of the fixed numeric header, in hex digits.
pub const HEADER_LEN: usize = 34;

/// One domain packet as carried in a frame's `data` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub length: u32,
    pub version: u8,
    pub cmd: u32,
    pub account: u32,
    pub checksum: u32,
    /// Raw body appended after the header, carried untouched.
    pub data: String,
}

impl Packet {
    /// Encode to wire form: zero-padded uppercase header, then the body
    /// verbatim. Output length is always `34 + self.data.len()`.
    pub fn pack(&self) -> String {
        format!(
            "{:08X}{:02X}{:08X}{:08X}{:08X}{}",
            self.length, self.version, self.cmd, self.account, self.checksum, self.data
        )
    }

    /// Decode from wire form. Header hex is accepted in either case; the
    /// body after offset 34 is taken verbatim, including any stray
    /// length mismatch against the `length` field (the codec does not
    /// police it).
    pub fn unpack(text: &str) -> Result<Self> {
        Ok(Self {
            length: field(text, 0..8, "length")?,
            version: field(text, 8..10, "version")? as u8,
            cmd: field(text, 10..18, "cmd")?,
            account: field(text, 18..26, "account")?,
            checksum: field(text, 26..34, "checksum")?,
            // Safe: the header parsed as hex, so byte 34 is a char boundary.
            data: text[HEADER_LEN..].to_string(),
        })
    }
}

fn field(text: &str, range: std::ops::Range<usize>, name: &'static str) -> Result<u32> {
    let digits = text
        .get(range)
        .ok_or(RelayError::PacketTruncated { len: text.len() })?;
    // from_str_radix tolerates a leading sign; the header grammar is hex
    // digits only.
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(RelayError::PacketField { field: name });
    }
    u32::from_str_radix(digits, 16).map_err(|_| RelayError::PacketField { field: name })
}
