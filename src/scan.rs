use crate::PACKET_SIZE;

/// One full sensor revolution as delivered by the driver: an ordered run
/// of packets sharing a capture frame.
#[derive(Debug, Clone)]
pub struct Scan {
    /// Capture time of the scan in seconds.
    pub stamp: f64,
    /// Frame the sensor reports in.
    pub frame_id: String,
    pub packets: Vec<ScanPacket>,
}

#[derive(Debug, Clone)]
pub struct ScanPacket {
    /// Capture time of this packet in seconds.
    pub stamp: f64,
    pub data: [u8; PACKET_SIZE],
}

impl ScanPacket {
    pub fn new(stamp: f64, data: [u8; PACKET_SIZE]) -> Self {
        Self { stamp, data }
    }
}
