//! Classic (LIN 1.3) and enhanced (LIN 2.0) response checksums.
//!
//! Both use an inverted eight bit sum with end-around carry. The enhanced
//! variant also covers the protected identifier. Diagnostic and reserved
//! identifiers (60..=63) always use the classic checksum.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::constants::{IDENTIFIER_MASK, MASTER_REQUEST_ID};

/// Checksum algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumVariant {
    /// LIN 1.3, data bytes only.
    Classic,
    /// LIN 2.0, protected identifier plus data bytes.
    #[default]
    Enhanced,
}

impl ChecksumVariant {
    /// Resolve the variant actually used for `identifier`.
    pub fn resolve(self, identifier: u8) -> Self {
        if identifier >= MASTER_REQUEST_ID {
            ChecksumVariant::Classic
        } else {
            self
        }
    }

    /// Compute the checksum for a response.
    ///
    /// `pid` is the protected identifier byte of the header; its low six bits
    /// select the variant through [`ChecksumVariant::resolve`].
    pub fn compute(self, pid: u8, data: &[u8]) -> u8 {
        match self.resolve(pid & IDENTIFIER_MASK) {
            ChecksumVariant::Classic => classic_checksum(data),
            ChecksumVariant::Enhanced => enhanced_checksum(pid, data),
        }
    }

    /// Check a received checksum byte.
    pub fn verify(self, pid: u8, data: &[u8], received: u8) -> Result<(), u8> {
        let expected = self.compute(pid, data);
        if expected == received {
            Ok(())
        } else {
            Err(expected)
        }
    }
}

impl fmt::Display for ChecksumVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumVariant::Classic => write!(f, "classic"),
            ChecksumVariant::Enhanced => write!(f, "enhanced"),
        }
    }
}

fn carry_sum<'a>(bytes: impl IntoIterator<Item = &'a u8>) -> u8 {
    let mut acc: u16 = 0;
    for &b in bytes {
        acc += b as u16;
        if acc > 0xFF {
            acc -= 0xFF;
        }
    }
    acc as u8
}

/// LIN 1.3 classic checksum over the data bytes.
pub fn classic_checksum(data: &[u8]) -> u8 {
    0xFF - carry_sum(data)
}

/// LIN 2.0 enhanced checksum over the protected identifier and data bytes.
pub fn enhanced_checksum(pid: u8, data: &[u8]) -> u8 {
    0xFF - carry_sum(std::iter::once(&pid).chain(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Pid;

    #[test]
    fn test_classic_simple_sum() {
        assert_eq!(classic_checksum(&[1, 2, 3, 4]), 0xF5);
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(classic_checksum(&[]), 0xFF);
        assert_eq!(enhanced_checksum(0x00, &[]), 0xFF);
    }

    #[test]
    fn test_end_around_carry() {
        // 0xFF + 0x01 = 0x100 -> 0x01
        assert_eq!(classic_checksum(&[0xFF, 0x01]), 0xFE);
        // 0xF0 + 0x20 = 0x110 -> 0x11
        assert_eq!(classic_checksum(&[0xF0, 0x20]), 0xEE);
        assert_eq!(classic_checksum(&[0xFF; 8]), 0x00);
    }

    #[test]
    fn test_lin2_reference_frame() {
        // PID 0x4A frame from the LIN 2.x checksum example.
        let data = [0x55, 0x93, 0xE5];
        assert_eq!(enhanced_checksum(0x4A, &data), 0xE6);
    }

    #[test]
    fn test_enhanced_covers_pid() {
        let pid = Pid::from_identifier(42).unwrap().value();
        assert_ne!(
            enhanced_checksum(pid, &[1, 2, 3, 4]),
            classic_checksum(&[1, 2, 3, 4])
        );
    }

    #[test]
    fn test_diagnostic_ids_force_classic() {
        let data = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        for id in 60..=63u8 {
            let pid = Pid::from_identifier(id).unwrap().value();
            assert_eq!(ChecksumVariant::Enhanced.resolve(id), ChecksumVariant::Classic);
            assert_eq!(
                ChecksumVariant::Enhanced.compute(pid, &data),
                classic_checksum(&data)
            );
        }
        assert_eq!(ChecksumVariant::Enhanced.resolve(59), ChecksumVariant::Enhanced);
    }

    #[test]
    fn test_deterministic() {
        for len in 1..=8usize {
            let data: Vec<u8> = (0..len as u8).map(|b| b.wrapping_mul(37)).collect();
            assert_eq!(classic_checksum(&data), classic_checksum(&data));
            assert_eq!(enhanced_checksum(0x80, &data), enhanced_checksum(0x80, &data));
        }
    }

    #[test]
    fn test_verify() {
        assert!(ChecksumVariant::Classic.verify(0x2A, &[1, 2, 3, 4], 0xF5).is_ok());
        assert_eq!(ChecksumVariant::Classic.verify(0x2A, &[1, 2, 3, 4], 0x00), Err(0xF5));
    }
}
