use bytes::Buf;

use crate::utils::{Error, Result};

pub fn get_u8(src: &mut impl Buf) -> Result<u8> {
    if src.remaining() < 1 {
        return Err(Error::InvalidBytes);
    }
    Ok(src.get_u8())
}

pub fn get_u16(src: &mut impl Buf) -> Result<u16> {
    if src.remaining() < 2 {
        return Err(Error::InvalidBytes);
    }
    Ok(src.get_u16_le())
}

pub fn get_u64(src: &mut impl Buf) -> Result<u64> {
    if src.remaining() < 8 {
        return Err(Error::InvalidBytes);
    }
    Ok(src.get_u64_le())
}

pub fn get_i64(src: &mut impl Buf) -> Result<i64> {
    if src.remaining() < 8 {
        return Err(Error::InvalidBytes);
    }
    Ok(src.get_i64_le())
}

pub fn get_bytes(src: &mut impl Buf, len: usize) -> Result<Vec<u8>> {
    if src.remaining() < len {
        return Err(Error::InvalidBytes);
    }
    Ok(src.copy_to_bytes(len).to_vec())
}

// Fixed-offset accessors used by the on-disk page codecs. Offsets are
// computed from page layouts that are validated on init, so slice indexing
// is bounds-checked by construction.

pub fn read_u16_at(data: &[u8], offset: usize) -> u16 {
    let mut raw = [0u8; 2];
    raw.copy_from_slice(&data[offset..offset + 2]);
    u16::from_le_bytes(raw)
}

pub fn write_u16_at(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn read_u32_at(data: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

pub fn write_u32_at(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn read_i32_at(data: &[u8], offset: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&data[offset..offset + 4]);
    i32::from_le_bytes(raw)
}

pub fn write_i32_at(data: &mut [u8], offset: usize, value: i32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn read_u64_at(data: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(raw)
}

pub fn write_u64_at(data: &mut [u8], offset: usize, value: u64) {
    data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_getters() -> anyhow::Result<()> {
        let mut src = &[1u8, 2, 0][..];

        assert_eq!(get_u8(&mut src)?, 1);
        assert_eq!(get_u16(&mut src)?, 2);
        assert!(get_u64(&mut src).is_err());

        Ok(())
    }

    #[test]
    fn test_offset_accessors() {
        let mut buf = vec![0u8; 32];

        write_u32_at(&mut buf, 4, 0xDEAD_BEEF);
        write_i32_at(&mut buf, 8, -1);
        write_u64_at(&mut buf, 16, u64::MAX - 1);

        assert_eq!(read_u32_at(&buf, 4), 0xDEAD_BEEF);
        assert_eq!(read_i32_at(&buf, 8), -1);
        assert_eq!(read_u64_at(&buf, 16), u64::MAX - 1);
    }
}
