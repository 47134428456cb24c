use bytemuck::{Pod, Zeroable};

/// Rotation code resolution in degrees (codes count hundredths of a degree).
pub const ROTATION_RESOLUTION: f32 = 0.01;
/// Number of distinct rotation codes per revolution.
pub const ROTATION_MAX_UNITS: usize = 36000;
/// Distance code resolution in meters.
pub const DISTANCE_RESOLUTION: f32 = 0.002;

/// Total packet size on the wire.
pub const PACKET_SIZE: usize = 1206;
pub const BLOCKS_PER_PACKET: usize = 12;
pub const SCANS_PER_BLOCK: usize = 32;
pub const RAW_SCAN_SIZE: usize = 3;
pub const BLOCK_DATA_SIZE: usize = SCANS_PER_BLOCK * RAW_SCAN_SIZE;
pub const SCANS_PER_PACKET: usize = SCANS_PER_BLOCK * BLOCKS_PER_PACKET;

/// Block header marker for lasers 0..31.
pub const UPPER_BANK: u16 = 0xeeff;
/// Block header marker for lasers 32..63 on 64-laser units.
pub const LOWER_BANK: u16 = 0xddff;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RawPacket {
    pub blocks: [RawBlock; BLOCKS_PER_PACKET],
    timestamp: [u8; 4],
    factory: [u8; 2],
}

impl RawPacket {
    pub fn from_bytes(data: &[u8; PACKET_SIZE]) -> Self {
        bytemuck::pod_read_unaligned(data.as_slice())
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, SizeMismatchError> {
        bytemuck::try_pod_read_unaligned(data).map_err(|_| SizeMismatchError {
            expected: PACKET_SIZE,
            actual: data.len(),
        })
    }

    /// Microseconds past the hour, stamped by the sensor.
    pub fn timestamp_us(&self) -> u32 {
        u32::from_le_bytes(self.timestamp)
    }

    pub fn return_mode(&self) -> ReturnMode {
        ReturnMode::from(self.factory[0])
    }

    pub fn is_dual_return(&self) -> bool {
        self.return_mode() == ReturnMode::Dual
    }

    /// Product id byte from the factory field.
    pub fn product_id(&self) -> u8 {
        self.factory[1]
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RawBlock {
    header: u16,
    rotation: u16,
    pub data: [u8; BLOCK_DATA_SIZE],
}

impl RawBlock {
    pub fn header(&self) -> u16 {
        u16::from_le(self.header)
    }

    /// Shared rotation code of the block, hundredths of a degree.
    pub fn rotation(&self) -> u16 {
        u16::from_le(self.rotation)
    }

    pub fn reading(&self, idx: usize) -> RawReading {
        let k = idx * RAW_SCAN_SIZE;
        RawReading {
            distance_code: u16::from_le_bytes([self.data[k], self.data[k + 1]]),
            reflectivity: self.data[k + 2],
        }
    }
}

/// One laser return as transmitted: distance code plus reflectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReading {
    pub distance_code: u16,
    pub reflectivity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnMode {
    Strongest,
    Last,
    Dual,
}

impl From<u8> for ReturnMode {
    fn from(value: u8) -> Self {
        match value {
            0x38 => ReturnMode::Last,
            0x39 => ReturnMode::Dual,
            _ => ReturnMode::Strongest,
        }
    }
}

#[derive(thiserror::Error, Debug)]
#[error("Expected {expected} bytes, got {actual}")]
pub struct SizeMismatchError {
    expected: usize,
    actual: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_correct_structsize() {
        assert_eq!(100, std::mem::size_of::<RawBlock>());
        assert_eq!(PACKET_SIZE, std::mem::size_of::<RawPacket>());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(RawPacket::from_slice(&[0u8; PACKET_SIZE - 1]).is_err());
        assert!(RawPacket::from_slice(&[0u8; PACKET_SIZE]).is_ok());
    }

    #[test]
    fn fields_are_little_endian() {
        let mut data = [0u8; PACKET_SIZE];
        // block 1: header 0xddff, rotation 0x1234, first reading 0x0507 / 0x42
        let base = 100;
        data[base..base + 2].copy_from_slice(&0xddffu16.to_le_bytes());
        data[base + 2..base + 4].copy_from_slice(&0x1234u16.to_le_bytes());
        data[base + 4..base + 6].copy_from_slice(&0x0507u16.to_le_bytes());
        data[base + 6] = 0x42;

        let packet = RawPacket::from_bytes(&data);
        let block = &packet.blocks[1];
        assert_eq!(LOWER_BANK, block.header());
        assert_eq!(0x1234, block.rotation());
        assert_eq!(
            RawReading {
                distance_code: 0x0507,
                reflectivity: 0x42
            },
            block.reading(0)
        );
    }

    #[test]
    fn status_region() {
        let mut data = [0u8; PACKET_SIZE];
        data[1200..1204].copy_from_slice(&123_456u32.to_le_bytes());
        data[1204] = 0x39;
        data[1205] = 0x22;

        let packet = RawPacket::from_bytes(&data);
        assert_eq!(123_456, packet.timestamp_us());
        assert_eq!(ReturnMode::Dual, packet.return_mode());
        assert!(packet.is_dual_return());
        assert_eq!(0x22, packet.product_id());

        data[1204] = 0x37;
        let packet = RawPacket::from_bytes(&data);
        assert_eq!(ReturnMode::Strongest, packet.return_mode());
        assert!(!packet.is_dual_return());
        data[1204] = 0x38;
        assert_eq!(ReturnMode::Last, RawPacket::from_bytes(&data).return_mode());
    }
}
