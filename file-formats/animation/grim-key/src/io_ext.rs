use std::io::{Read, Result, Write};

/// Extension trait for reading little-endian values from a reader
pub trait ReadExt: Read {
    fn read_u32_le(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_i32_le(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    fn read_f32_le(&mut self) -> Result<f32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }
}

/// Extension trait for writing little-endian values to a writer
pub trait WriteExt: Write {
    fn write_u32_le(&mut self, n: u32) -> Result<()> {
        self.write_all(&n.to_le_bytes())
    }

    fn write_i32_le(&mut self, n: i32) -> Result<()> {
        self.write_all(&n.to_le_bytes())
    }

    fn write_f32_le(&mut self, n: f32) -> Result<()> {
        self.write_all(&n.to_le_bytes())
    }
}

// Implement the traits for all types that implement Read/Write
impl<R: Read + ?Sized> ReadExt for R {}
impl<W: Write + ?Sized> WriteExt for W {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_u32_le() {
        let mut cursor = Cursor::new([0x20, 0x30, 0x00, 0x00]);
        assert_eq!(cursor.read_u32_le().unwrap(), 0x3020);
    }

    #[test]
    fn test_read_f32_le() {
        let mut cursor = Cursor::new(15.0_f32.to_le_bytes());
        assert_eq!(cursor.read_f32_le().unwrap(), 15.0);
    }

    #[test]
    fn test_write_roundtrip() {
        let mut buf = Vec::new();
        buf.write_u32_le(42).unwrap();
        buf.write_i32_le(-7).unwrap();
        buf.write_f32_le(1.5).unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(cursor.read_u32_le().unwrap(), 42);
        assert_eq!(cursor.read_i32_le().unwrap(), -7);
        assert_eq!(cursor.read_f32_le().unwrap(), 1.5);
    }
}
