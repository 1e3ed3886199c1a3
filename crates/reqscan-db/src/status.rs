// crates/reqscan-db/src/status.rs

/// Lifecycle state of a `ScanRecord`, stored as a small integer column but
/// modeled here as an explicit enum so an out-of-range value read back from
/// the column is a decode error rather than a silent bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum ScanStatus {
    Unscanned = 0,
    Scanned = 1,
    InProgress = 2,
    Failed = 3,
}

impl ScanStatus {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(v: i32) -> Result<Self, DecodeStatusError> {
        match v {
            0 => Ok(Self::Unscanned),
            1 => Ok(Self::Scanned),
            2 => Ok(Self::InProgress),
            3 => Ok(Self::Failed),
            other => Err(DecodeStatusError(other)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("scan_status {0} is out of range (expected 0..=3)")]
pub struct DecodeStatusError(pub i32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_all_variants() {
        for s in [
            ScanStatus::Unscanned,
            ScanStatus::Scanned,
            ScanStatus::InProgress,
            ScanStatus::Failed,
        ] {
            assert_eq!(ScanStatus::from_i32(s.as_i32()).unwrap(), s);
        }
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert!(ScanStatus::from_i32(4).is_err());
        assert!(ScanStatus::from_i32(-1).is_err());
    }
}
