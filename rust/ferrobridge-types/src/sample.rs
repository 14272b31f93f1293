use crate::fixed_string::FixedString;

/// Address space for a scooped value, e.g. an OPC-UA node id or a Modbus
/// register path. Inline, no heap.
pub type Address = FixedString<64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Quality {
    Good,
    Bad,
    Uncertain,
}

/// Short byte blob, inline up to 32 bytes (covers the common small-payload
/// cases: floats packed as raw bytes, short binary tags). Longer payloads
/// are out of scope for `Sample` and should travel as a `Batch` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InlineBlob {
    bytes: [u8; 32],
    len: u8,
}

impl InlineBlob {
    pub fn from_slice(data: &[u8]) -> Self {
        let mut bytes = [0u8; 32];
        let take = data.len().min(32);
        bytes[..take].copy_from_slice(&data[..take]);
        Self { bytes, len: take as u8 }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleValue {
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Blob(InlineBlob),
}

/// A single scooped reading: a value-typed, `Copy`, no-heap unit that
/// flows from a scoop through the bus and rule engine to a sink.
///
/// `Sample` itself is stateless; per-source monotonic timestamp tracking
/// is the scoop registry's responsibility, not a constructor invariant
/// here, since many `Sample`s may be constructed from the same source
/// concurrently without shared state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    pub address: Address,
    pub protocol: u16,
    pub value: SampleValue,
    pub quality: Quality,
    pub timestamp_ns: u64,
}

impl Sample {
    pub fn new(address: &str, protocol: u16, value: SampleValue, quality: Quality, timestamp_ns: u64) -> Self {
        Self {
            address: Address::from_str_truncating(address),
            protocol,
            value,
            quality,
            timestamp_ns,
        }
    }

    pub fn is_good(&self) -> bool {
        matches!(self.quality, Quality::Good)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_from_str_address() {
        let s = Sample::new("line1/temp", 1, SampleValue::F64(21.5), Quality::Good, 1000);
        assert_eq!(s.address.as_str(), "line1/temp");
        assert!(s.is_good());
    }

    #[test]
    fn blob_truncates_silently() {
        let data = [7u8; 64];
        let blob = InlineBlob::from_slice(&data);
        assert_eq!(blob.as_slice().len(), 32);
    }
}
