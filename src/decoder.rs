use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::DecoderConfig;
use crate::throttle::Throttle;
use crate::{
    correct_measurement, in_angle_window, in_range, Calibration, DecoderOptions, FrameTransformer,
    PointCloud, RawPacket, RotationTable, Scan, BLOCKS_PER_PACKET, LOWER_BANK, SCANS_PER_BLOCK,
    SCANS_PER_PACKET, UPPER_BANK,
};

pub const VLP16_FIRINGS_PER_BLOCK: usize = 2;
pub const VLP16_SCANS_PER_FIRING: usize = 16;
/// Duration of one block in microseconds.
pub const VLP16_BLOCK_TDURATION: f32 = 110.592;
/// Time between two laser firings within one firing sequence, µs.
pub const VLP16_DSR_TOFFSET: f32 = 2.304;
/// Time between the two firing sequences of a block, µs.
pub const VLP16_FIRING_TOFFSET: f32 = 55.296;

const WARN_PERIOD: Duration = Duration::from_secs(1);

/// Turns raw scans into organized point clouds.
///
/// Calibration and the rotation table are built once and never mutated
/// afterwards, so one decoder can serve concurrent `unpack` calls; each
/// call allocates its own output grid. Parameters are replaced wholesale
/// between scans via [`Decoder::set_parameters`].
pub struct Decoder {
    calibration: Calibration,
    rotation_table: RotationTable,
    config: RwLock<DecoderConfig>,
    transformer: Option<Box<dyn FrameTransformer + Send + Sync>>,
    block_warn: Throttle,
    transform_warn: Throttle,
}

impl Decoder {
    pub fn new(calibration: Calibration) -> Self {
        Self::with_options(calibration, &DecoderOptions::default())
    }

    pub fn with_options(calibration: Calibration, options: &DecoderOptions) -> Self {
        info!("decoding for {} lasers", calibration.num_lasers());
        Self {
            rotation_table: RotationTable::new(),
            config: RwLock::new(DecoderConfig::from(options)),
            calibration,
            transformer: None,
            block_warn: Throttle::new(WARN_PERIOD),
            transform_warn: Throttle::new(WARN_PERIOD),
        }
    }

    pub fn with_transformer(
        mut self,
        transformer: Box<dyn FrameTransformer + Send + Sync>,
    ) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Replaces the decode parameters. Scans already being decoded keep
    /// the snapshot they started with.
    pub fn set_parameters(&self, options: &DecoderOptions) {
        let next = DecoderConfig::from(options);
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        if next.target_frame != config.target_frame {
            if let Some(frame) = &next.target_frame {
                info!("target frame: {frame}");
            }
        }
        if next.fixed_frame != config.fixed_frame {
            if let Some(frame) = &next.fixed_frame {
                info!("fixed frame: {frame}");
            }
        }
        *config = next;
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Decodes one full scan into an organized grid.
    ///
    /// Row = mirrored ring index, column = azimuth slot. Cells whose
    /// measurement was gated away or could not be transformed keep a NaN
    /// position; their ring still records that a shot was seen there.
    pub fn unpack(&self, scan: &Scan) -> PointCloud {
        debug!(
            "decoding scan of {} packets, stamp {}",
            scan.packets.len(),
            scan.stamp
        );
        let config = self
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let num_lasers = self.calibration.num_lasers();
        let frame_id = match (&self.transformer, &config.target_frame) {
            (Some(_), Some(target)) => target.clone(),
            _ => scan.frame_id.clone(),
        };

        if num_lasers == VLP16_SCANS_PER_FIRING {
            let width = scan.packets.len() * BLOCKS_PER_PACKET * VLP16_FIRINGS_PER_BLOCK;
            let mut cloud = PointCloud::filled(scan.stamp, frame_id, width, num_lasers);
            self.unpack_vlp16(scan, &config, &mut cloud);
            cloud
        } else {
            let width = scan.packets.len() * SCANS_PER_PACKET / num_lasers;
            let mut cloud = PointCloud::filled(scan.stamp, frame_id, width, num_lasers);
            self.unpack_banked(scan, &config, &mut cloud);
            cloud
        }
    }

    /// Dual-bank layout of the 32- and 64-laser units: every block
    /// carries one shared azimuth and a full bank of readings.
    fn unpack_banked(&self, scan: &Scan, config: &DecoderConfig, cloud: &mut PointCloud) {
        let num_lasers = self.calibration.num_lasers();
        // Readings processed so far; column placement depends on it, so
        // the packet -> block -> laser order is load-bearing.
        let mut n_points = 0usize;

        for packet in &scan.packets {
            let raw = RawPacket::from_bytes(&packet.data);
            for block in &raw.blocks {
                // The header marker picks the bank the block belongs to.
                let bank_origin = if block.header() == LOWER_BANK { 32 } else { 0 };

                if !in_angle_window(block.rotation(), config.min_angle, config.max_angle) {
                    continue;
                }

                for slot in 0..SCANS_PER_BLOCK {
                    let laser_id = slot + bank_origin;
                    let Some(correction) = self.calibration.correction(laser_id) else {
                        // lower-bank block fed to a unit without those lasers
                        continue;
                    };

                    let point = correct_measurement(
                        correction,
                        &self.rotation_table,
                        block.rotation(),
                        block.reading(slot),
                    );

                    let col = n_points / num_lasers;
                    let row = num_lasers - 1 - correction.laser_ring as usize;
                    n_points += 1;

                    // The ring is recorded even when the range gate
                    // suppresses the position below.
                    cloud.at_mut(col, row).ring = Some(correction.laser_ring);

                    if !in_range(point.distance, config.min_range, config.max_range) {
                        continue;
                    }

                    let position = [point.x, point.y, point.z];
                    let Some([x, y, z]) =
                        self.resolve_position(config, &scan.frame_id, None, packet.stamp, position)
                    else {
                        continue;
                    };
                    let cell = cloud.at_mut(col, row);
                    cell.x = x;
                    cell.y = y;
                    cell.z = z;
                    cell.intensity = point.intensity;
                }
            }
        }
    }

    /// Interleaved-firing layout of the 16-laser unit, single or dual
    /// return.
    fn unpack_vlp16(&self, scan: &Scan, config: &DecoderConfig, cloud: &mut PointCloud) {
        let num_lasers = self.calibration.num_lasers();
        // Carried across packets for trailing blocks without a lookahead.
        let mut last_azimuth_diff = 0f32;

        for (packet_idx, packet) in scan.packets.iter().enumerate() {
            let raw = RawPacket::from_bytes(&packet.data);
            let dual_return = raw.is_dual_return();
            // Index step to the next block with a new azimuth; dual
            // return repeats each azimuth on two consecutive blocks.
            let return_step = 1 + dual_return as usize;

            for block_idx in 0..BLOCKS_PER_PACKET {
                let block = &raw.blocks[block_idx];
                if block.header() != UPPER_BANK {
                    if self.block_warn.admit() {
                        warn!(
                            "dropping rest of scan: block {block_idx} header {:#06x} is not the upper-bank marker",
                            block.header()
                        );
                    }
                    return; // mangled packet; the grid stays partially filled
                }

                let azimuth = block.rotation() as f32;
                let azimuth_diff = if block_idx < BLOCKS_PER_PACKET - return_step {
                    let next = raw.blocks[block_idx + return_step].rotation();
                    let diff = ((36000 + next as i32 - block.rotation() as i32) % 36000) as f32;
                    last_azimuth_diff = diff;
                    diff
                } else {
                    last_azimuth_diff
                };

                for firing in 0..VLP16_FIRINGS_PER_BLOCK {
                    for dsr in 0..VLP16_SCANS_PER_FIRING {
                        // Firing time relative to the block start in µs.
                        let t_beam =
                            dsr as f32 * VLP16_DSR_TOFFSET + firing as f32 * VLP16_FIRING_TOFFSET;

                        // All lasers of a block share one reported azimuth;
                        // spread them over the block's angular travel.
                        let azimuth_corrected_f =
                            azimuth + azimuth_diff * t_beam / VLP16_BLOCK_TDURATION;
                        let azimuth_corrected = (azimuth_corrected_f.round() as i32 % 36000) as u16;

                        if !in_angle_window(azimuth_corrected, config.min_angle, config.max_angle) {
                            continue;
                        }

                        let correction = &self.calibration.corrections()[dsr];
                        let reading = block.reading(firing * VLP16_SCANS_PER_FIRING + dsr);
                        let point = correct_measurement(
                            correction,
                            &self.rotation_table,
                            azimuth_corrected,
                            reading,
                        );

                        let row = num_lasers - 1 - correction.laser_ring as usize;
                        // The two return channels interleave into adjacent
                        // columns instead of separate grid halves.
                        let col = if dual_return {
                            packet_idx * BLOCKS_PER_PACKET * VLP16_FIRINGS_PER_BLOCK
                                + (block_idx / 2) * 2 * VLP16_FIRINGS_PER_BLOCK
                                + firing * 2
                                + block_idx % 2
                        } else {
                            packet_idx * BLOCKS_PER_PACKET * VLP16_FIRINGS_PER_BLOCK
                                + block_idx * VLP16_FIRINGS_PER_BLOCK
                                + firing
                        };

                        cloud.at_mut(col, row).ring = Some(correction.laser_ring);

                        if !in_range(point.distance, config.min_range, config.max_range) {
                            continue;
                        }

                        // Each laser gets its own firing-time stamp for the
                        // transform lookup.
                        let stamp = packet.stamp
                            + ((block_idx as f32 * VLP16_BLOCK_TDURATION + t_beam) * 1e-6) as f64;
                        let position = [point.x, point.y, point.z];
                        let Some([x, y, z]) = self.resolve_position(
                            config,
                            &scan.frame_id,
                            config.fixed_frame.as_deref(),
                            stamp,
                            position,
                        ) else {
                            continue;
                        };
                        let cell = cloud.at_mut(col, row);
                        cell.x = x;
                        cell.y = y;
                        cell.z = z;
                        cell.intensity = point.intensity;
                    }
                }
            }
        }
    }

    /// Runs the point through the transform collaborator when one is
    /// configured. `None` means the point is to be suppressed.
    fn resolve_position(
        &self,
        config: &DecoderConfig,
        source_frame: &str,
        fixed_frame: Option<&str>,
        stamp: f64,
        point: [f32; 3],
    ) -> Option<[f32; 3]> {
        let (Some(transformer), Some(target)) = (&self.transformer, &config.target_frame) else {
            return Some(point);
        };
        if target == source_frame {
            return Some(point);
        }
        match transformer.transform(point, source_frame, target, fixed_frame, stamp) {
            Ok(transformed) => Some(transformed),
            Err(err) => {
                if self.transform_warn.admit() {
                    warn!("transform from {source_frame} to {target} failed: {err}");
                }
                None
            }
        }
    }
}
