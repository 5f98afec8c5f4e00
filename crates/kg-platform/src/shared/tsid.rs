//! TSID Generator
//!
//! Time-sorted ids as 13-character Crockford Base32 strings, used as the
//! primary key for namespaces, services, and login records.

use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Crockford Base32 alphabet (excludes I, L, O, U)
const ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

static COUNTER: AtomicU16 = AtomicU16::new(0);

pub struct TsidGenerator;

impl TsidGenerator {
    /// Generate a new TSID, e.g. "0HZXEQ5Y8JY5Z".
    ///
    /// 64-bit layout: 42-bit millisecond timestamp, 10-bit random
    /// component, 12-bit per-process counter.
    pub fn generate() -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let counter = COUNTER.fetch_add(1, Ordering::SeqCst) as u64;
        let random: u64 = rand_u16() as u64 & 0x3FF;

        let tsid = ((now & 0x3FFFFFFFFFF) << 22) | (random << 12) | (counter & 0xFFF);

        encode_crockford(tsid)
    }
}

/// Encode a 64-bit value to Crockford Base32 (13 characters)
fn encode_crockford(mut value: u64) -> String {
    let mut result = [b'0'; 13];

    for i in (0..13).rev() {
        result[i] = ALPHABET[(value & 0x1F) as usize];
        value >>= 5;
    }

    String::from_utf8_lossy(&result).into_owned()
}

/// Cheap random u16 seeded from the clock and counter
fn rand_u16() -> u16 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let counter = COUNTER.load(Ordering::Relaxed) as u64;
    ((now ^ (counter.wrapping_mul(0x5851F42D4C957F2D))) & 0xFFFF) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_tsid() {
        let id = TsidGenerator::generate();
        assert_eq!(id.len(), 13);
    }

    #[test]
    fn test_uniqueness() {
        let mut ids = std::collections::HashSet::new();
        for _ in 0..1000 {
            let id = TsidGenerator::generate();
            assert!(ids.insert(id), "Duplicate TSID generated");
        }
    }

    #[test]
    fn test_sortability() {
        let id1 = TsidGenerator::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = TsidGenerator::generate();
        assert!(id1 < id2, "TSIDs should be lexicographically sortable");
    }
}
