//! Payload codecs for cache snapshots.

use crate::error::{Result, WatchError};
use std::io::Read;

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CodecId {
    Store = 0,
    Zstd = 1,
}

impl CodecId {
    pub fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(CodecId::Store),
            1 => Ok(CodecId::Zstd),
            other => Err(WatchError::Format(format!("unknown codec id {other}"))),
        }
    }

    fn codec(self) -> &'static dyn Codec {
        match self {
            CodecId::Store => &Store,
            CodecId::Zstd => &Zstd,
        }
    }
}

pub trait Codec: Send + Sync {
    fn id(&self) -> CodecId;
    fn pack(&self, raw: &[u8]) -> Result<Vec<u8>>;
    fn unpack(&self, packed: &[u8]) -> Result<Vec<u8>>;
}

pub struct Store;

impl Codec for Store {
    fn id(&self) -> CodecId {
        CodecId::Store
    }

    fn pack(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Ok(raw.to_vec())
    }

    fn unpack(&self, packed: &[u8]) -> Result<Vec<u8>> {
        Ok(packed.to_vec())
    }
}

pub struct Zstd;

const ZSTD_LEVEL: i32 = 3;

impl Codec for Zstd {
    fn id(&self) -> CodecId {
        CodecId::Zstd
    }

    fn pack(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Ok(zstd::stream::encode_all(raw, ZSTD_LEVEL)?)
    }

    fn unpack(&self, packed: &[u8]) -> Result<Vec<u8>> {
        let mut dec = zstd::stream::Decoder::new(packed)?;
        let mut out = Vec::with_capacity(packed.len() * 2);
        dec.read_to_end(&mut out)?;
        Ok(out)
    }
}

/// Encode a snapshot payload. Zstd output is kept only when it saves at
/// least `min_gain` of the input size.
pub fn encode(data: &str, min_gain: f32) -> Result<(CodecId, Vec<u8>)> {
    let raw = data.as_bytes();
    let packed = Zstd.pack(raw)?;
    if should_compress(raw.len(), packed.len(), min_gain) {
        Ok((Zstd.id(), packed))
    } else {
        Ok((Store.id(), Store.pack(raw)?))
    }
}

pub fn decode(codec: CodecId, bytes: &[u8]) -> Result<String> {
    let raw = codec.codec().unpack(bytes)?;
    String::from_utf8(raw).map_err(|e| WatchError::Format(format!("snapshot is not UTF-8: {e}")))
}

fn should_compress(u: usize, c: usize, min_gain: f32) -> bool {
    // true if (u - c) >= u * min_gain  ⇔  c <= u * (1 - min_gain)
    u > 0 && (u as f64 - c as f64) >= (u as f64 * min_gain as f64)
}
