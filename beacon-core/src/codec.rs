//! Compact Binary Codec
//!
//! ## Overview
//!
//! Every message the beacon exchanges with a client (live readings, log
//! records, control commands, configuration) uses the protobuf wire format.
//! Deployed clients already speak it, and its varint framing keeps records
//! small enough that several fit into one 256 byte notification.
//!
//! Only the subset the beacon needs is implemented:
//!
//! | Wire type | Id | Used for                           |
//! |-----------|----|------------------------------------|
//! | Varint    | 0  | `uint32`, `uint64`, enums          |
//! | Fixed64   | 1  | skipped when found in unknown fields |
//! | Len       | 2  | skipped when found in unknown fields |
//! | Fixed32   | 5  | `float`                            |
//!
//! Groups (wire types 3 and 4) are rejected.
//!
//! ## Determinism
//!
//! Fields are always written in field-number order and default values are
//! omitted (proto3 rules), so identical messages encode to identical bytes.
//! Floats are compared bitwise when deciding whether they are "default", so
//! `-0.0` survives a round trip.
//!
//! ## Delimited Framing
//!
//! ```text
//! ┌────────┬──────────────┬────────┬──────────────┬─────┐
//! │ len(v) │ message body │ len(v) │ message body │ ... │
//! └────────┴──────────────┴────────┴──────────────┴─────┘
//! ```
//!
//! A reader re-splits a payload with [`DelimitedRecords`] without knowing
//! where the sender's frame boundaries were.
//!
//! ## No Partial Writes
//!
//! Encoders compute the exact size first and fail with
//! [`BeaconError::Capacity`] before touching the buffer. Decoders build into a
//! fresh default value and only hand it out once every field parsed, so a
//! corrupt payload never yields a half-populated message.

use core::marker::PhantomData;

use heapless::Vec as HVec;

use crate::constants::transport::MAX_MESSAGE_SIZE;
use crate::errors::{BeaconError, BeaconResult};

/// Longest varint encoding of a `u64`
pub const MAX_VARINT_LEN: usize = 10;

/// Protobuf wire types understood by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    /// Base-128 varint
    Varint,
    /// Eight little-endian bytes
    Fixed64,
    /// Length-prefixed bytes
    LengthDelimited,
    /// Four little-endian bytes
    Fixed32,
}

impl WireType {
    fn from_tag_bits(bits: u8) -> BeaconResult<Self> {
        match bits {
            0 => Ok(Self::Varint),
            1 => Ok(Self::Fixed64),
            2 => Ok(Self::LengthDelimited),
            5 => Ok(Self::Fixed32),
            3 | 4 => Err(BeaconError::format("groups are not supported")),
            _ => Err(BeaconError::format("invalid wire type")),
        }
    }

    const fn tag_bits(self) -> u8 {
        match self {
            Self::Varint => 0,
            Self::Fixed64 => 1,
            Self::LengthDelimited => 2,
            Self::Fixed32 => 5,
        }
    }
}

/// A decoded field value, borrowed from the input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WireValue<'a> {
    /// Varint payload
    Varint(u64),
    /// Fixed 64-bit payload
    Fixed64(u64),
    /// Length-delimited payload
    Bytes(&'a [u8]),
    /// Fixed 32-bit payload
    Fixed32(u32),
}

impl<'a> WireValue<'a> {
    /// Interpret as `uint64`
    pub fn as_u64(self) -> BeaconResult<u64> {
        match self {
            Self::Varint(v) => Ok(v),
            _ => Err(BeaconError::format("expected varint")),
        }
    }

    /// Interpret as `uint32`, rejecting values that overflow
    pub fn as_u32(self) -> BeaconResult<u32> {
        let value = self.as_u64()?;
        u32::try_from(value).map_err(|_| BeaconError::format("uint32 overflow"))
    }

    /// Interpret as `float`
    pub fn as_f32(self) -> BeaconResult<f32> {
        match self {
            Self::Fixed32(bits) => Ok(f32::from_bits(bits)),
            _ => Err(BeaconError::format("expected fixed32")),
        }
    }
}

/// Number of bytes `value` occupies as a varint
pub const fn varint_len(value: u64) -> usize {
    let mut len = 1;
    let mut v = value >> 7;
    while v != 0 {
        len += 1;
        v >>= 7;
    }
    len
}

/// Encoded size of a `float` field, zero when omitted
pub fn f32_field_len(value: f32) -> usize {
    if value.to_bits() == 0 { 0 } else { 1 + 4 }
}

/// Encoded size of a varint field, zero when omitted
pub const fn varint_field_len(value: u64) -> usize {
    if value == 0 { 0 } else { 1 + varint_len(value) }
}

/// Bounded writer over a caller-supplied buffer
pub struct WireWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> WireWriter<'a> {
    /// Wrap `buf`; writing starts at offset 0
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes still available
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn put(&mut self, bytes: &[u8]) -> BeaconResult<()> {
        if bytes.len() > self.remaining() {
            return Err(BeaconError::Capacity {
                required: bytes.len(),
                available: self.remaining(),
            });
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    /// Write a raw varint
    pub fn put_varint(&mut self, mut value: u64) -> BeaconResult<()> {
        let mut scratch = [0u8; MAX_VARINT_LEN];
        let mut len = 0;
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                scratch[len] = byte;
                len += 1;
                break;
            }
            scratch[len] = byte | 0x80;
            len += 1;
        }
        self.put(&scratch[..len])
    }

    fn put_tag(&mut self, field: u32, wire_type: WireType) -> BeaconResult<()> {
        self.put_varint(((field as u64) << 3) | wire_type.tag_bits() as u64)
    }

    /// Write a `float` field unless it is `+0.0`
    pub fn f32_field(&mut self, field: u32, value: f32) -> BeaconResult<()> {
        if value.to_bits() == 0 {
            return Ok(());
        }
        self.put_tag(field, WireType::Fixed32)?;
        self.put(&value.to_le_bytes())
    }

    /// Write a varint field unless it is zero
    pub fn varint_field(&mut self, field: u32, value: u64) -> BeaconResult<()> {
        if value == 0 {
            return Ok(());
        }
        self.put_tag(field, WireType::Varint)?;
        self.put_varint(value)
    }
}

/// Cursor over an encoded message
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Read from the start of `buf`
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// True once every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, len: usize) -> BeaconResult<&'a [u8]> {
        if len > self.buf.len() - self.pos {
            return Err(BeaconError::format("truncated field"));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Read a raw varint
    pub fn varint(&mut self) -> BeaconResult<u64> {
        let mut value: u64 = 0;
        for i in 0..MAX_VARINT_LEN {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or(BeaconError::format("truncated varint"))?;
            self.pos += 1;

            // The tenth byte may only carry the top bit of a u64
            if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
                return Err(BeaconError::format("varint overflow"));
            }

            value |= ((byte & 0x7F) as u64) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(BeaconError::format("varint overflow"))
    }

    /// Read the next `(field, value)` pair, or `None` at end of input
    pub fn next_field(&mut self) -> BeaconResult<Option<(u32, WireValue<'a>)>> {
        if self.is_empty() {
            return Ok(None);
        }

        let tag = self.varint()?;
        let field = u32::try_from(tag >> 3).map_err(|_| BeaconError::format("field number overflow"))?;
        if field == 0 {
            return Err(BeaconError::format("field number zero"));
        }

        let value = match WireType::from_tag_bits((tag & 0x07) as u8)? {
            WireType::Varint => WireValue::Varint(self.varint()?),
            WireType::Fixed32 => {
                let b = self.take(4)?;
                WireValue::Fixed32(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            }
            WireType::Fixed64 => {
                let b = self.take(8)?;
                WireValue::Fixed64(u64::from_le_bytes([
                    b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
                ]))
            }
            WireType::LengthDelimited => {
                let len = self.varint()?;
                let len = usize::try_from(len).map_err(|_| BeaconError::format("length overflow"))?;
                WireValue::Bytes(self.take(len)?)
            }
        };

        Ok(Some((field, value)))
    }
}

/// A message with a protobuf wire representation
///
/// Implementors describe their fields; the free functions in this module do
/// the framing.
pub trait WireMessage: Default + Sized {
    /// Upper bound of [`encoded_len`](Self::encoded_len) over all values
    const MAX_ENCODED_LEN: usize;

    /// Exact size of the encoded body
    fn encoded_len(&self) -> usize;

    /// Write every non-default field in field-number order
    fn encode_fields(&self, out: &mut WireWriter<'_>) -> BeaconResult<()>;

    /// Apply one decoded field; unknown field numbers must be ignored
    fn merge_field(&mut self, field: u32, value: WireValue<'_>) -> BeaconResult<()>;

    /// Size of the body plus its varint length prefix
    fn encoded_len_delimited(&self) -> usize {
        let len = self.encoded_len();
        varint_len(len as u64) + len
    }
}

/// Encode `msg` into the front of `buf`, returning the bytes written
pub fn encode_into<M: WireMessage>(msg: &M, buf: &mut [u8]) -> BeaconResult<usize> {
    let required = msg.encoded_len();
    if required > buf.len() {
        return Err(BeaconError::Capacity { required, available: buf.len() });
    }
    let mut writer = WireWriter::new(buf);
    msg.encode_fields(&mut writer)?;
    debug_assert_eq!(writer.position(), required);
    Ok(writer.position())
}

/// Encode `msg` into an owned, stack-allocated buffer
pub fn encode<M: WireMessage>(msg: &M) -> BeaconResult<HVec<u8, MAX_MESSAGE_SIZE>> {
    let mut out = HVec::new();
    out.resize_default(msg.encoded_len())
        .map_err(|_| BeaconError::Capacity {
            required: msg.encoded_len(),
            available: MAX_MESSAGE_SIZE,
        })?;
    encode_into(msg, &mut out)?;
    Ok(out)
}

/// Encode `msg` with a varint length prefix into the front of `buf`
///
/// Nothing is written when the framed message does not fit.
pub fn encode_delimited_into<M: WireMessage>(msg: &M, buf: &mut [u8]) -> BeaconResult<usize> {
    let body = msg.encoded_len();
    let required = varint_len(body as u64) + body;
    if required > buf.len() {
        return Err(BeaconError::Capacity { required, available: buf.len() });
    }
    let mut writer = WireWriter::new(buf);
    writer.put_varint(body as u64)?;
    msg.encode_fields(&mut writer)?;
    Ok(writer.position())
}

/// Decode a complete message body
pub fn decode<M: WireMessage>(buf: &[u8]) -> BeaconResult<M> {
    let mut reader = WireReader::new(buf);
    let mut msg = M::default();
    while let Some((field, value)) = reader.next_field()? {
        msg.merge_field(field, value)?;
    }
    Ok(msg)
}

/// Decode one length-prefixed message from the front of `buf`
///
/// Returns the message and the number of bytes consumed (prefix included).
pub fn decode_delimited<M: WireMessage>(buf: &[u8]) -> BeaconResult<(M, usize)> {
    let mut reader = WireReader::new(buf);
    let len = reader.varint()?;
    let len = usize::try_from(len).map_err(|_| BeaconError::format("length overflow"))?;
    let start = reader.position();
    if len > buf.len() - start {
        return Err(BeaconError::format("truncated message"));
    }
    let msg = decode(&buf[start..start + len])?;
    Ok((msg, start + len))
}

/// Iterator re-splitting a payload of delimited messages
///
/// Stops after the first error so a corrupt element cannot cascade into
/// garbage records.
pub struct DelimitedRecords<'a, M> {
    buf: &'a [u8],
    failed: bool,
    _marker: PhantomData<M>,
}

impl<'a, M: WireMessage> DelimitedRecords<'a, M> {
    /// Iterate over the messages in `buf`
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, failed: false, _marker: PhantomData }
    }
}

impl<'a, M: WireMessage> Iterator for DelimitedRecords<'a, M> {
    type Item = BeaconResult<M>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.buf.is_empty() {
            return None;
        }
        match decode_delimited::<M>(self.buf) {
            Ok((msg, used)) => {
                self.buf = &self.buf[used..];
                Some(Ok(msg))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Pair {
        a: u64,
        b: f32,
    }

    impl WireMessage for Pair {
        const MAX_ENCODED_LEN: usize = 1 + MAX_VARINT_LEN + 1 + 4;

        fn encoded_len(&self) -> usize {
            varint_field_len(self.a) + f32_field_len(self.b)
        }

        fn encode_fields(&self, out: &mut WireWriter<'_>) -> BeaconResult<()> {
            out.varint_field(1, self.a)?;
            out.f32_field(2, self.b)
        }

        fn merge_field(&mut self, field: u32, value: WireValue<'_>) -> BeaconResult<()> {
            match field {
                1 => self.a = value.as_u64()?,
                2 => self.b = value.as_f32()?,
                _ => {}
            }
            Ok(())
        }
    }

    #[test]
    fn varint_lengths() {
        assert_eq!(varint_len(0), 1);
        assert_eq!(varint_len(127), 1);
        assert_eq!(varint_len(128), 2);
        assert_eq!(varint_len(u64::MAX), MAX_VARINT_LEN);
    }

    #[test]
    fn known_encoding() {
        // protobuf reference: field 1 = 150 -> 08 96 01
        let msg = Pair { a: 150, b: 0.0 };
        let bytes = encode(&msg).unwrap();
        assert_eq!(bytes.as_slice(), &[0x08, 0x96, 0x01]);
    }

    #[test]
    fn defaults_encode_empty() {
        let bytes = encode(&Pair::default()).unwrap();
        assert!(bytes.is_empty());
        assert_eq!(decode::<Pair>(&[]).unwrap(), Pair::default());
    }

    #[test]
    fn negative_zero_is_written() {
        let msg = Pair { a: 0, b: -0.0 };
        let bytes = encode(&msg).unwrap();
        assert_eq!(bytes.len(), 5);
        let back: Pair = decode(&bytes).unwrap();
        assert_eq!(back.b.to_bits(), (-0.0f32).to_bits());
    }

    #[test]
    fn unknown_fields_are_skipped() {
        // field 7 varint, field 8 bytes, field 9 fixed64, then field 1 = 3
        let bytes = [
            0x38, 0x05,
            0x42, 0x02, 0xAA, 0xBB,
            0x49, 1, 2, 3, 4, 5, 6, 7, 8,
            0x08, 0x03,
        ];
        let msg: Pair = decode(&bytes).unwrap();
        assert_eq!(msg.a, 3);
    }

    #[test]
    fn wrong_wire_type_is_rejected() {
        // field 1 sent as fixed32
        let bytes = [0x0D, 0, 0, 0, 0];
        assert!(matches!(decode::<Pair>(&bytes), Err(BeaconError::Format { .. })));
    }

    #[test]
    fn truncation_is_rejected() {
        assert!(decode::<Pair>(&[0x08]).is_err());
        assert!(decode::<Pair>(&[0x08, 0x96]).is_err());
        assert!(decode::<Pair>(&[0x15, 0x00, 0x00]).is_err());
    }

    #[test]
    fn groups_and_bad_wire_types_are_rejected() {
        assert!(decode::<Pair>(&[0x0B]).is_err());
        assert!(decode::<Pair>(&[0x0E]).is_err());
        assert!(decode::<Pair>(&[0x00]).is_err());
    }

    #[test]
    fn overlong_varint_is_rejected() {
        let bytes = [0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        assert!(decode::<Pair>(&bytes).is_err());
        let max = [0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert_eq!(decode::<Pair>(&max).unwrap().a, u64::MAX);
    }

    #[test]
    fn delimited_does_not_write_partially() {
        let msg = Pair { a: 150, b: 1.5 };
        let mut buf = [0xEEu8; 4];
        let err = encode_delimited_into(&msg, &mut buf).unwrap_err();
        assert_eq!(err, BeaconError::Capacity { required: 9, available: 4 });
        assert_eq!(buf, [0xEE; 4]);
    }

    #[test]
    fn delimited_iteration_stops_on_corruption() {
        let mut buf = [0u8; 32];
        let first = encode_delimited_into(&Pair { a: 1, b: 0.0 }, &mut buf).unwrap();
        // length prefix promising more bytes than remain
        buf[first] = 20;
        buf[first + 1] = 0x08;
        let items: Vec<_> = DelimitedRecords::<Pair>::new(&buf[..first + 2]).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().a, 1);
        assert!(items[1].is_err());
    }
}
