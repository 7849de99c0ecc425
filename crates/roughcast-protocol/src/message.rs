use crate::cursor::ReadCursor;
use crate::error::Error;
use crate::error::TlvViolation::{
    DuplicateTag, OutOfBoundsOffset, TooManyTags, TrailingBytes, UnalignedOffset, UnalignedValues,
    UnorderedOffset, UnorderedTag, ZeroOffset,
};
use crate::tag::Tag;
use crate::wire;

/// Upper bound on tags per message; a request fitting in a UDP datagram can
/// not meaningfully carry more.
pub const MAX_NUM_TAGS: u32 = 1024;

/// A Roughtime message: an ordered map from tag to byte-string.
///
/// Entries are kept sorted by the tags' little-endian numeric value, the
/// order the wire format requires. Values are stored exactly as provided;
/// encoding right-pads each one with NULs to a multiple of four bytes.
///
/// Values of nested messages (SREP, CERT, DELE) are kept as raw bytes and
/// only interpreted on demand: signatures verify over the bytes that were
/// received, never over a re-encoding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    tags: Vec<Tag>,
    values: Vec<Vec<u8>>,
}

/// A decoded view of one value. Which variant applies is determined by the
/// tag: counted quantities decode to integers, SREP/CERT/DELE to nested
/// messages, everything else stays bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bytes(Vec<u8>),
    U32(u32),
    U64(u64),
    U32List(Vec<u32>),
    Nested(Message),
}

#[inline]
const fn padded_len(len: usize) -> usize {
    len.div_ceil(4) * 4
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(num_fields: usize) -> Self {
        Message {
            tags: Vec::with_capacity(num_fields),
            values: Vec::with_capacity(num_fields),
        }
    }

    /// Add a field, keeping entries in wire order. Duplicate tags are
    /// rejected.
    pub fn insert(&mut self, tag: Tag, value: &[u8]) -> Result<(), Error> {
        match self.tags.binary_search(&tag) {
            Ok(_) => Err(Error::BadTlv(DuplicateTag(tag))),
            Err(idx) => {
                self.tags.insert(idx, tag);
                self.values.insert(idx, value.to_vec());
                Ok(())
            }
        }
    }

    /// Replace the value of an existing field, or add it if absent.
    pub fn set(&mut self, tag: Tag, value: &[u8]) {
        match self.tags.binary_search(&tag) {
            Ok(idx) => self.values[idx] = value.to_vec(),
            Err(idx) => {
                self.tags.insert(idx, tag);
                self.values.insert(idx, value.to_vec());
            }
        }
    }

    pub fn get(&self, tag: Tag) -> Option<&[u8]> {
        self.tags
            .binary_search(&tag)
            .ok()
            .map(|idx| self.values[idx].as_slice())
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.tags.binary_search(&tag).is_ok()
    }

    pub fn num_fields(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Length in bytes of the on-the-wire representation.
    pub fn encoded_size(&self) -> usize {
        let num_tags = self.tags.len();
        let offsets_size = if num_tags < 2 { 0 } else { 4 * (num_tags - 1) };
        let values_size: usize = self.values.iter().map(|v| padded_len(v.len())).sum();

        4 + offsets_size + 4 * num_tags + values_size
    }

    /// Encode to the wire representation. An empty message is the four
    /// bytes `00 00 00 00`.
    pub fn encode(&self) -> Vec<u8> {
        let num_tags = self.tags.len();
        let mut out = Vec::with_capacity(self.encoded_size());

        out.extend_from_slice(&(num_tags as u32).to_le_bytes());

        // offsets to values 2..N, cumulative over the padded lengths
        if num_tags > 1 {
            let mut offset = padded_len(self.values[0].len());
            for value in &self.values[1..] {
                out.extend_from_slice(&(offset as u32).to_le_bytes());
                offset += padded_len(value.len());
            }
        }

        for tag in &self.tags {
            out.extend_from_slice(&tag.wire_value());
        }

        for value in &self.values {
            out.extend_from_slice(value);
            out.resize(out.len() + padded_len(value.len()) - value.len(), 0);
        }

        debug_assert_eq!(out.len(), self.encoded_size(), "unexpected length");
        out
    }

    /// Decode and validate a message. Rejects the malformed cases outright:
    /// short buffers, an absurd tag count, misaligned or non-monotonic
    /// offsets, zero offsets, out-of-order or duplicate tags, and a value
    /// region that isn't a multiple of four bytes.
    pub fn decode(buf: &[u8]) -> Result<Message, Error> {
        let mut cursor = ReadCursor::new(buf);

        let num_tags = cursor.try_get_u32_le()?;
        if num_tags > MAX_NUM_TAGS {
            return Err(Error::BadTlv(TooManyTags(num_tags)));
        }
        let n = num_tags as usize;

        if n == 0 {
            if cursor.has_remaining() {
                return Err(Error::BadTlv(TrailingBytes(cursor.remaining())));
            }
            return Ok(Message::default());
        }

        // The implicit value boundaries are [0, offsets.., payload_len].
        let mut boundaries: Vec<u32> = Vec::with_capacity(n + 1);
        boundaries.push(0);

        for idx in 0..(n - 1) {
            let value = cursor.try_get_u32_le()?;
            if value % 4 != 0 {
                return Err(Error::BadTlv(UnalignedOffset {
                    index: idx as u32,
                    value,
                }));
            }
            if value == 0 {
                return Err(Error::BadTlv(ZeroOffset { index: idx as u32 }));
            }
            if value < *boundaries.last().expect("nonempty") {
                return Err(Error::BadTlv(UnorderedOffset {
                    index: idx as u32,
                    value,
                }));
            }
            boundaries.push(value);
        }

        let mut tags: Vec<Tag> = Vec::with_capacity(n);
        for idx in 0..n {
            let tag = Tag::from_wire(cursor.try_get_fixed::<4>()?);
            if let Some(&prior) = tags.last()
                && tag <= prior
            {
                return Err(Error::BadTlv(UnorderedTag {
                    index: idx as u32,
                    tag,
                }));
            }
            tags.push(tag);
        }

        let payload = cursor.peek();
        if payload.len() % 4 != 0 {
            return Err(Error::BadTlv(UnalignedValues(payload.len())));
        }

        for (idx, &boundary) in boundaries.iter().enumerate().skip(1) {
            if boundary as usize > payload.len() {
                return Err(Error::BadTlv(OutOfBoundsOffset {
                    index: (idx - 1) as u32,
                    value: boundary,
                }));
            }
        }
        boundaries.push(payload.len() as u32);

        let values = (0..n)
            .map(|i| payload[boundaries[i] as usize..boundaries[i + 1] as usize].to_vec())
            .collect();

        Ok(Message { tags, values })
    }

    /// The value of `tag` as a little-endian u32. Absent tags are an
    /// `InvalidResponse`; a present value of the wrong width is rejected.
    pub fn u32_value(&self, tag: Tag) -> Result<u32, Error> {
        wire::decode_u32(self.get(tag).ok_or(Error::InvalidResponse(tag))?)
    }

    /// The value of `tag` as a little-endian u64.
    pub fn u64_value(&self, tag: Tag) -> Result<u64, Error> {
        wire::decode_u64(self.get(tag).ok_or(Error::InvalidResponse(tag))?)
    }

    /// The value of `tag` as a list of little-endian u32s.
    pub fn u32_list_value(&self, tag: Tag) -> Result<Vec<u32>, Error> {
        wire::decode_u32_list(self.get(tag).ok_or(Error::InvalidResponse(tag))?)
    }

    /// Decode the value of `tag` as a nested message.
    pub fn nested(&self, tag: Tag) -> Result<Message, Error> {
        Message::decode(self.get(tag).ok_or(Error::InvalidResponse(tag))?)
    }

    /// The typed view of a value. Integer-valued and nested tags decode to
    /// their natural variant; unknown and opaque tags stay `Bytes`.
    pub fn value_of(&self, tag: Tag) -> Result<Value, Error> {
        match tag {
            Tag::VER | Tag::RADI | Tag::TYPE | Tag::INDX => self.u32_value(tag).map(Value::U32),
            Tag::MIDP | Tag::MINT | Tag::MAXT => self.u64_value(tag).map(Value::U64),
            Tag::VERS => self.u32_list_value(tag).map(Value::U32List),
            Tag::SREP | Tag::CERT | Tag::DELE => self.nested(tag).map(Value::Nested),
            _ => self
                .get(tag)
                .map(|v| Value::Bytes(v.to_vec()))
                .ok_or(Error::InvalidResponse(tag)),
        }
    }
}
