//! Little-endian cursors over borrowed byte slices.
//!
//! Payload serialization never owns memory: [`Bytes`] walks a received
//! payload, [`BytesMut`] fills a scratch buffer. Multi-byte reads and writes
//! are little-endian, matching both the MAVLink framing and payload rules.

use std::io;

/// Read cursor over a byte slice.
pub struct Bytes<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Bytes<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    fn check_remaining(&self, count: usize) -> io::Result<()> {
        if self.remaining() >= count {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "buffer underflow: tried to read {count} bytes with {} remaining",
                    self.remaining()
                ),
            ))
        }
    }

    #[inline]
    pub fn get_bytes(&mut self, count: usize) -> io::Result<&'a [u8]> {
        self.check_remaining(count)?;
        let bytes = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    #[inline]
    fn get_array<const SIZE: usize>(&mut self) -> io::Result<[u8; SIZE]> {
        let mut arr = [0u8; SIZE];
        arr.copy_from_slice(self.get_bytes(SIZE)?);
        Ok(arr)
    }

    #[inline]
    pub fn get_u8(&mut self) -> io::Result<u8> {
        self.check_remaining(1)?;
        let val = self.data[self.pos];
        self.pos += 1;
        Ok(val)
    }

    #[inline]
    pub fn get_i8(&mut self) -> io::Result<i8> {
        Ok(self.get_u8()? as i8)
    }

    #[inline]
    pub fn get_u16_le(&mut self) -> io::Result<u16> {
        Ok(u16::from_le_bytes(self.get_array()?))
    }

    #[inline]
    pub fn get_i16_le(&mut self) -> io::Result<i16> {
        Ok(i16::from_le_bytes(self.get_array()?))
    }

    #[inline]
    pub fn get_u32_le(&mut self) -> io::Result<u32> {
        Ok(u32::from_le_bytes(self.get_array()?))
    }

    #[inline]
    pub fn get_i32_le(&mut self) -> io::Result<i32> {
        Ok(i32::from_le_bytes(self.get_array()?))
    }

    #[inline]
    pub fn get_u64_le(&mut self) -> io::Result<u64> {
        Ok(u64::from_le_bytes(self.get_array()?))
    }

    #[inline]
    pub fn get_i64_le(&mut self) -> io::Result<i64> {
        Ok(i64::from_le_bytes(self.get_array()?))
    }

    #[inline]
    pub fn get_f32_le(&mut self) -> io::Result<f32> {
        Ok(f32::from_le_bytes(self.get_array()?))
    }

    #[inline]
    pub fn get_f64_le(&mut self) -> io::Result<f64> {
        Ok(f64::from_le_bytes(self.get_array()?))
    }
}

/// Write cursor over a mutable byte slice.
pub struct BytesMut<'a> {
    data: &'a mut [u8],
    len: usize,
}

impl<'a> BytesMut<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, len: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.len
    }

    #[inline]
    fn check_remaining(&self, count: usize) {
        assert!(
            self.remaining() >= count,
            "write buffer overflow: remaining {} bytes, tried to add {count}",
            self.remaining(),
        );
    }

    #[inline]
    pub fn put_slice(&mut self, src: &[u8]) {
        self.check_remaining(src.len());
        self.data[self.len..self.len + src.len()].copy_from_slice(src);
        self.len += src.len();
    }

    #[inline]
    pub fn put_u8(&mut self, val: u8) {
        self.check_remaining(1);
        self.data[self.len] = val;
        self.len += 1;
    }

    #[inline]
    pub fn put_i8(&mut self, val: i8) {
        self.put_u8(val as u8);
    }

    #[inline]
    pub fn put_u16_le(&mut self, val: u16) {
        self.put_slice(&val.to_le_bytes());
    }

    #[inline]
    pub fn put_i16_le(&mut self, val: i16) {
        self.put_slice(&val.to_le_bytes());
    }

    #[inline]
    pub fn put_u32_le(&mut self, val: u32) {
        self.put_slice(&val.to_le_bytes());
    }

    #[inline]
    pub fn put_i32_le(&mut self, val: i32) {
        self.put_slice(&val.to_le_bytes());
    }

    #[inline]
    pub fn put_u64_le(&mut self, val: u64) {
        self.put_slice(&val.to_le_bytes());
    }

    #[inline]
    pub fn put_i64_le(&mut self, val: i64) {
        self.put_slice(&val.to_le_bytes());
    }

    #[inline]
    pub fn put_f32_le(&mut self, val: f32) {
        self.put_slice(&val.to_le_bytes());
    }

    #[inline]
    pub fn put_f64_le(&mut self, val: f64) {
        self.put_slice(&val.to_le_bytes());
    }
}
