//! Undo record for one spent output

use crate::core::compressor::{compressed_len, read_compressed, write_compressed};
use crate::core::transaction::TxOutput;
use crate::encoding::{Decodable, Encodable, FormatError, VarInt};
use bytes::{Buf, BufMut};
use serde::Serialize;

/// What it takes to bring back one spent output.
///
/// `height` and `version` describe the parent transaction and are only
/// kept when the spend removed the parent's last unspent output. Otherwise
/// both stay zero and are left out of the encoding.
///
/// ```text
///   VarInt(height * 2 + coinbase)
///   VarInt(version)              only when height > 0
///   compressed output
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct OutputUndo {
    pub output: TxOutput,
    pub coinbase: bool,
    pub height: u32,
    pub version: i32,
}

impl OutputUndo {
    /// Record for a spend that left other outputs of the parent unspent
    pub fn new(output: TxOutput) -> Self {
        Self {
            output,
            ..Default::default()
        }
    }

    /// Record for a spend that emptied the parent transaction
    pub fn with_metadata(output: TxOutput, coinbase: bool, height: u32, version: i32) -> Self {
        Self {
            output,
            coinbase,
            height,
            version,
        }
    }

    pub fn has_metadata(&self) -> bool {
        self.height > 0
    }

    fn code(&self) -> u64 {
        self.height as u64 * 2 + self.coinbase as u64
    }
}

impl Encodable for OutputUndo {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        VarInt::write(buf, self.code());
        if self.has_metadata() {
            // Negative versions go out as their u32 two's complement (five
            // bytes for SC_TX_VERSION) so they decode back exactly. Writers
            // that emit only the low seven bits lose the sign.
            VarInt::write(buf, self.version as u32 as u64);
        }
        write_compressed(buf, &self.output);
    }

    fn encoded_len(&self) -> usize {
        let version_len = if self.has_metadata() {
            VarInt::size(self.version as u32 as u64)
        } else {
            0
        };
        VarInt::size(self.code()) + version_len + compressed_len(&self.output)
    }
}

impl Decodable for OutputUndo {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, FormatError> {
        let code = VarInt::read(buf)?;
        let height =
            u32::try_from(code / 2).map_err(|_| FormatError::OutOfRange("undo height"))?;
        let coinbase = code & 1 == 1;
        let version = if height > 0 {
            VarInt::read_u32(buf)? as i32
        } else {
            i32::default()
        };
        let output = read_compressed(buf)?;
        Ok(Self {
            output,
            coinbase,
            height,
            version,
        })
    }
}
