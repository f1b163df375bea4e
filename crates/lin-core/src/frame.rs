//! LIN frame model.
//!
//! A [`Frame`] is built fresh for each exchange. Its payload decides the
//! direction of the exchange: non-empty `data` transmits, a declared `length`
//! receives, neither means the frame is not for this node.

use std::fmt;

use crate::checksum::ChecksumVariant;
use crate::error::{LinError, Result};
use crate::protocol::constants::*;

/// Protected identifier: six identifier bits plus two parity bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(u8);

impl Pid {
    /// Build the PID for an identifier in `0..=63`.
    pub fn from_identifier(identifier: u8) -> Result<Self> {
        if identifier > MAX_IDENTIFIER {
            return Err(LinError::InvalidIdentifier(identifier as u32));
        }
        Ok(Self(identifier | (parity(identifier) << 6)))
    }

    /// Parse a PID byte seen on the wire.
    pub fn decode(byte: u8) -> Result<Self> {
        let identifier = byte & IDENTIFIER_MASK;
        if byte >> 6 != parity(identifier) {
            return Err(LinError::ParityError { pid: byte });
        }
        Ok(Self(byte))
    }

    pub fn identifier(&self) -> u8 {
        self.0 & IDENTIFIER_MASK
    }

    pub fn parity(&self) -> u8 {
        self.0 >> 6
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Two parity bits for a six bit identifier.
///
/// P0 = ID0 ^ ID1 ^ ID2 ^ ID4, P1 = !(ID1 ^ ID3 ^ ID4 ^ ID5).
pub fn parity(identifier: u8) -> u8 {
    let bit = |n: u8| (identifier >> n) & 1;
    let p0 = bit(0) ^ bit(1) ^ bit(2) ^ bit(4);
    let p1 = (bit(1) ^ bit(3) ^ bit(4) ^ bit(5)) ^ 1;
    p0 | (p1 << 1)
}

/// Identifier classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// 0..=59, signal-carrying frames.
    Signal,
    /// 60 and 61, diagnostic frames.
    Diagnostic,
    /// 62, user-defined extensions.
    UserDefined,
    /// 63, reserved.
    Reserved,
}

impl FrameKind {
    pub fn of(identifier: u8) -> Self {
        match identifier {
            0..=LAST_SIGNAL_IDENTIFIER => FrameKind::Signal,
            MASTER_REQUEST_ID | SLAVE_RESPONSE_ID => FrameKind::Diagnostic,
            USER_DEFINED_ID => FrameKind::UserDefined,
            _ => FrameKind::Reserved,
        }
    }
}

/// Direction of an exchange as seen by this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Publish `data` followed by its checksum.
    Transmit,
    /// Subscribe to `n` bytes plus checksum.
    Receive(usize),
    /// Stay silent.
    Ignore,
}

/// A LIN frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    identifier: u8,
    length: Option<usize>,
    data: Vec<u8>,
    checksum: Option<u8>,
    checksum_variant: Option<ChecksumVariant>,
}

impl Frame {
    /// Header-only frame.
    pub fn new(identifier: u8) -> Result<Self> {
        Self::with_payload(identifier, None, Vec::new())
    }

    /// Frame publishing `data`.
    pub fn transmit(identifier: u8, data: impl Into<Vec<u8>>) -> Result<Self> {
        Self::with_payload(identifier, None, data.into())
    }

    /// Frame subscribing to `length` response bytes.
    pub fn receive(identifier: u8, length: usize) -> Result<Self> {
        Self::with_payload(identifier, Some(length), Vec::new())
    }

    /// Validating constructor covering all field combinations.
    pub fn with_payload(identifier: u8, length: Option<usize>, data: Vec<u8>) -> Result<Self> {
        if identifier > MAX_IDENTIFIER {
            return Err(LinError::InvalidIdentifier(identifier as u32));
        }
        check_len(data.len())?;
        if let Some(declared) = length {
            check_len(declared)?;
            if !data.is_empty() && declared != data.len() {
                return Err(LinError::LengthMismatch {
                    declared,
                    actual: data.len(),
                });
            }
        }
        Ok(Self {
            identifier,
            length,
            data,
            checksum: None,
            checksum_variant: None,
        })
    }

    /// Override the engine's configured checksum variant for this frame.
    pub fn with_checksum_variant(mut self, variant: ChecksumVariant) -> Self {
        self.checksum_variant = Some(variant);
        self
    }

    pub fn identifier(&self) -> u8 {
        self.identifier
    }

    pub fn pid(&self) -> Pid {
        Pid(self.identifier | (parity(self.identifier) << 6))
    }

    pub fn parity(&self) -> u8 {
        parity(self.identifier)
    }

    pub fn kind(&self) -> FrameKind {
        FrameKind::of(self.identifier)
    }

    pub fn length(&self) -> Option<usize> {
        self.length
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Checksum of the last exchange this frame took part in.
    pub fn checksum(&self) -> Option<u8> {
        self.checksum
    }

    pub fn checksum_variant(&self) -> Option<ChecksumVariant> {
        self.checksum_variant
    }

    pub fn direction(&self) -> Direction {
        if !self.data.is_empty() {
            Direction::Transmit
        } else if let Some(n) = self.length {
            Direction::Receive(n)
        } else {
            Direction::Ignore
        }
    }

    /// Declare a transmit response.
    pub fn set_data(&mut self, data: impl Into<Vec<u8>>) -> Result<()> {
        let data = data.into();
        check_len(data.len())?;
        self.data = data;
        self.length = None;
        Ok(())
    }

    /// Declare a receive response of `length` bytes.
    pub fn set_length(&mut self, length: usize) -> Result<()> {
        check_len(length)?;
        self.length = Some(length);
        self.data.clear();
        Ok(())
    }

    /// Declare that this node does not take part in the response.
    pub fn ignore(&mut self) {
        self.length = None;
        self.data.clear();
    }

    /// Store the outcome of a completed receive.
    pub(crate) fn fill(&mut self, data: Vec<u8>, checksum: u8) {
        self.length = Some(data.len());
        self.data = data;
        self.checksum = Some(checksum);
    }

    pub(crate) fn set_checksum(&mut self, checksum: u8) {
        self.checksum = Some(checksum);
    }

    pub(crate) fn from_pid(pid: Pid) -> Self {
        Self {
            identifier: pid.identifier(),
            length: None,
            data: Vec::new(),
            checksum: None,
            checksum_variant: None,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id={} pid={}", self.identifier, self.pid())?;
        if !self.data.is_empty() {
            write!(f, " data=[")?;
            for (i, b) in self.data.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{:02X}", b)?;
            }
            write!(f, "]")?;
        } else if let Some(n) = self.length {
            write!(f, " len={}", n)?;
        }
        if let Some(c) = self.checksum {
            write!(f, " crc=0x{:02X}", c)?;
        }
        Ok(())
    }
}

fn check_len(len: usize) -> Result<()> {
    if len > MAX_DATA_LEN {
        return Err(LinError::PayloadTooLarge { len });
    }
    Ok(())
}
