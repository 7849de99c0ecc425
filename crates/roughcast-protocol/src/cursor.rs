use crate::error::Error;
use crate::error::Error::Truncated;

/// A bounds-checked reader over a borrowed byte buffer. Slices handed out
/// borrow from the underlying buffer; nothing is copied until a caller asks
/// for ownership.
pub struct ReadCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ReadCursor<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.position < self.data.len()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Read a little-endian u32, advancing the cursor.
    #[inline]
    pub fn try_get_u32_le(&mut self) -> Result<u32, Error> {
        let bytes = self.try_get_fixed::<4>()?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Read a little-endian u64, advancing the cursor.
    #[inline]
    pub fn try_get_u64_le(&mut self) -> Result<u64, Error> {
        let bytes = self.try_get_fixed::<8>()?;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Read a fixed-size array, advancing the cursor.
    #[inline]
    pub fn try_get_fixed<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        if self.remaining() < N {
            return Err(Truncated {
                needed: N,
                available: self.remaining(),
            });
        }

        let mut result = [0u8; N];
        result.copy_from_slice(&self.data[self.position..self.position + N]);
        self.position += N;
        Ok(result)
    }

    /// Borrow the next `n` bytes, advancing the cursor.
    #[inline]
    pub fn try_take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < n {
            return Err(Truncated {
                needed: n,
                available: self.remaining(),
            });
        }

        let slice = &self.data[self.position..self.position + n];
        self.position += n;
        Ok(slice)
    }

    /// Borrow everything not yet consumed, without advancing.
    #[inline]
    pub fn peek(&self) -> &'a [u8] {
        &self.data[self.position..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_advance() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut cursor = ReadCursor::new(&data);

        assert_eq!(cursor.remaining(), 8);
        assert_eq!(cursor.try_get_u32_le().unwrap(), 0x0403_0201);
        assert_eq!(cursor.remaining(), 4);
        assert_eq!(cursor.try_take(4).unwrap(), &[0x05, 0x06, 0x07, 0x08]);
        assert!(!cursor.has_remaining());
    }

    #[test]
    fn u64_le() {
        let data = [0xf0, 0xde, 0xbc, 0x9a, 0x78, 0x56, 0x34, 0x12];
        let mut cursor = ReadCursor::new(&data);
        assert_eq!(cursor.try_get_u64_le().unwrap(), 0x1234_5678_9abc_def0);
    }

    #[test]
    fn short_reads_fail() {
        let data = [0x01, 0x02];
        let mut cursor = ReadCursor::new(&data);

        match cursor.try_get_u32_le() {
            Err(Truncated {
                needed: 4,
                available: 2,
            }) => (),
            other => panic!("unexpected result: {other:?}"),
        }

        // a failed read does not advance
        assert_eq!(cursor.position(), 0);
        assert!(cursor.try_take(3).is_err());
        assert_eq!(cursor.try_take(2).unwrap(), &[0x01, 0x02]);
    }

    #[test]
    fn peek_does_not_advance() {
        let data = [0xaa, 0xbb, 0xcc, 0xdd];
        let mut cursor = ReadCursor::new(&data);
        cursor.try_take(2).unwrap();

        assert_eq!(cursor.peek(), &[0xcc, 0xdd]);
        assert_eq!(cursor.position(), 2);
    }
}
