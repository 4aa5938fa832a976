//! Binary batch format for edit scripts.
//!
//! An edit script crosses the WASM/JS boundary as one base64 string. Each
//! operation is length-prefixed because element ids vary in length:
//!
//! ```text
//! +-----+-----------+-----+-----------+-------------------+
//! | u8  | op name   | u8  | id bytes  | u32 index (BE)    |
//! | len | "Insert"  | len | "btn-3"   |                   |
//! +-----+-----------+-----+-----------+-------------------+
//! ```
//!
//! Records are concatenated and the whole buffer is base64 encoded
//! (standard alphabet, padded).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{ZuiError, ZuiResult};
use crate::id::ElementId;

use super::myers::{EditOp, OpKind};

/// Encode an edit script into a base64 batch.
///
/// Fails if an element id is longer than 255 bytes or an index does not
/// fit in a `u32`.
pub fn encode_batch(ops: &[EditOp]) -> ZuiResult<String> {
    Ok(STANDARD.encode(encode_raw(ops)?))
}

/// Encode without the base64 envelope.
pub fn encode_raw(ops: &[EditOp]) -> ZuiResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(ops.len() * 16);

    for op in ops {
        let name = op.op.as_str().as_bytes();
        let id = op.id.as_str().as_bytes();
        let id_len = u8::try_from(id.len())
            .map_err(|_| ZuiError::BatchEncode(format!("element id {} exceeds 255 bytes", op.id)))?;
        let index = u32::try_from(op.index)
            .map_err(|_| ZuiError::BatchEncode(format!("index {} exceeds u32", op.index)))?;

        buf.push(name.len() as u8);
        buf.extend_from_slice(name);
        buf.push(id_len);
        buf.extend_from_slice(id);
        buf.extend_from_slice(&index.to_be_bytes());
    }

    Ok(buf)
}

/// Decode a base64 batch back into operations.
pub fn decode_batch(batch: &str) -> ZuiResult<Vec<EditOp>> {
    let raw = STANDARD.decode(batch)?;
    decode_raw(&raw)
}

/// Decode a raw (already unwrapped) batch buffer.
pub fn decode_raw(buf: &[u8]) -> ZuiResult<Vec<EditOp>> {
    let mut reader = Reader { buf, pos: 0 };
    let mut ops = Vec::new();

    while !reader.is_done() {
        let start = reader.pos;
        let name = reader.prefixed()?;
        let op = OpKind::from_name(name).ok_or_else(|| {
            ZuiError::malformed(start, format!("unknown operation {:?}", String::from_utf8_lossy(name)))
        })?;

        let id_start = reader.pos;
        let id = std::str::from_utf8(reader.prefixed()?)
            .map_err(|_| ZuiError::malformed(id_start, "element id is not utf-8"))?;

        let index = u32::from_be_bytes(reader.array::<4>()?);

        ops.push(EditOp {
            op,
            id: ElementId::from(id),
            index: index as usize,
        });
    }

    Ok(ops)
}

/// Bounds-checked cursor over the batch buffer.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn is_done(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, len: usize) -> ZuiResult<&'a [u8]> {
        let end = self.pos + len;
        if end > self.buf.len() {
            return Err(ZuiError::malformed(
                self.pos,
                format!("need {} bytes, {} left", len, self.buf.len() - self.pos),
            ));
        }
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn prefixed(&mut self) -> ZuiResult<&'a [u8]> {
        let len = self.take(1)?[0] as usize;
        self.take(len)
    }

    fn array<const N: usize>(&mut self) -> ZuiResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::edit_script;
    use proptest::prelude::*;

    #[test]
    fn test_wire_layout() {
        let raw = encode_raw(&[EditOp::insert("ab", 258)]).unwrap();
        let mut expected = vec![6u8];
        expected.extend_from_slice(b"Insert");
        expected.push(2);
        expected.extend_from_slice(b"ab");
        expected.extend_from_slice(&[0, 0, 1, 2]);
        assert_eq!(raw, expected);
    }

    #[test]
    fn test_empty_batch() {
        assert_eq!(encode_batch(&[]).unwrap(), "");
        assert!(decode_batch("").unwrap().is_empty());
    }

    #[test]
    fn test_script_survives_batch() {
        let a: Vec<ElementId> = ["a", "b", "c", "e", "f", "h"].map(ElementId::from).to_vec();
        let b: Vec<ElementId> = ["b", "c", "d", "e", "f", "g"].map(ElementId::from).to_vec();
        let script = edit_script(&a, &b);

        let batch = encode_batch(&script).unwrap();
        assert_eq!(decode_batch(&batch).unwrap(), script);
    }

    #[test]
    fn test_truncated_batch() {
        let mut raw = encode_raw(&[EditOp::remove("node", 1)]).unwrap();
        raw.pop();
        let err = decode_raw(&raw).unwrap_err();
        assert!(matches!(err, ZuiError::MalformedBatch { offset: 12, .. }), "{err}");
    }

    #[test]
    fn test_unknown_operation() {
        let mut raw = vec![4u8];
        raw.extend_from_slice(b"Move");
        raw.extend_from_slice(&[1, b'x', 0, 0, 0, 0]);
        assert!(matches!(
            decode_raw(&raw),
            Err(ZuiError::MalformedBatch { offset: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(decode_batch("%%%"), Err(ZuiError::Base64(_))));
    }

    #[test]
    fn test_oversized_id_rejected() {
        let long = "x".repeat(256);
        assert!(matches!(
            encode_batch(&[EditOp::insert(long.as_str(), 0)]),
            Err(ZuiError::BatchEncode(_))
        ));
    }

    fn arb_op() -> impl Strategy<Value = EditOp> {
        (any::<bool>(), "[a-z0-9-]{1,40}", 0u32..100_000).prop_map(|(insert, id, index)| {
            if insert {
                EditOp::insert(id.as_str(), index as usize)
            } else {
                EditOp::remove(id.as_str(), index as usize)
            }
        })
    }

    proptest! {
        #[test]
        fn prop_batch_decodes_to_same_ops(ops in prop::collection::vec(arb_op(), 0..20)) {
            let batch = encode_batch(&ops).unwrap();
            prop_assert_eq!(decode_batch(&batch).unwrap(), ops);
        }
    }
}
