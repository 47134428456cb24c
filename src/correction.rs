use crate::{LaserCorrection, RawReading, RotationTable, DISTANCE_RESOLUTION};

/// A fully corrected measurement, already swapped into the right-handed
/// output frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corrected {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
    /// Base corrected distance in meters, before the per-axis two-point
    /// terms. Range gating works on this value.
    pub distance: f32,
}

/// Turns one raw reading into a calibrated point. Both decode paths go
/// through here.
///
/// The computation follows the manufacturer's procedure step by step;
/// the two-point interpolation and the intensity clamp are
/// order-sensitive, so the sequence must not be algebraically
/// rearranged.
pub fn correct_measurement(
    correction: &LaserCorrection,
    table: &RotationTable,
    rotation: u16,
    reading: RawReading,
) -> Corrected {
    let distance = reading.distance_code as f32 * DISTANCE_RESOLUTION + correction.dist_correction;

    let cos_vert_angle = correction.cos_vert_correction;
    let sin_vert_angle = correction.sin_vert_correction;
    let cos_rot_correction = correction.cos_rot_correction;
    let sin_rot_correction = correction.sin_rot_correction;

    // cos(a-b) = cos(a)*cos(b) + sin(a)*sin(b)
    // sin(a-b) = sin(a)*cos(b) - cos(a)*sin(b)
    // folds the per-laser rotational offset into the shared table lookup
    let cos_rot_angle = table.cos(rotation) * cos_rot_correction
        + table.sin(rotation) * sin_rot_correction;
    let sin_rot_angle = table.sin(rotation) * cos_rot_correction
        - table.cos(rotation) * sin_rot_correction;

    let horiz_offset = correction.horiz_offset_correction;
    let vert_offset = correction.vert_offset_correction;

    // Distance in the xy plane, before accounting for rotation.
    let xy_distance = distance * cos_vert_angle - vert_offset * sin_vert_angle;

    // Provisional x/y magnitudes select where on the two-point
    // interpolation each axis sits.
    let xx = (xy_distance * sin_rot_angle - horiz_offset * cos_rot_angle).abs();
    let yy = (xy_distance * cos_rot_angle + horiz_offset * sin_rot_angle).abs();

    // Two-point calibration: the distance correction differs per axis
    // and varies linearly between the factory reference ranges,
    // anchored so it vanishes at the base dist_correction.
    let mut distance_corr_x = 0.;
    let mut distance_corr_y = 0.;
    if correction.two_pt_correction_available {
        distance_corr_x = (correction.dist_correction - correction.dist_correction_x)
            * (xx - 2.4)
            / (25.04 - 2.4)
            + correction.dist_correction_x;
        distance_corr_x -= correction.dist_correction;
        distance_corr_y = (correction.dist_correction - correction.dist_correction_y)
            * (yy - 1.93)
            / (25.04 - 1.93)
            + correction.dist_correction_y;
        distance_corr_y -= correction.dist_correction;
    }

    let distance_x = distance + distance_corr_x;
    let xy_distance = distance_x * cos_vert_angle - vert_offset * sin_vert_angle;
    let x = xy_distance * sin_rot_angle - horiz_offset * cos_rot_angle;

    let distance_y = distance + distance_corr_y;
    let xy_distance = distance_y * cos_vert_angle - vert_offset * sin_vert_angle;
    let y = xy_distance * cos_rot_angle + horiz_offset * sin_rot_angle;

    // z uses the y-corrected distance; the manufacturer's procedure is
    // not symmetric in x/y.
    let z = distance_y * sin_vert_angle + vert_offset * cos_vert_angle;

    let focal_offset = 256. * (1. - correction.focal_distance / 13100.)
        * (1. - correction.focal_distance / 13100.);
    let ratio = 1. - reading.distance_code as f32 / 65535.;
    let intensity = reading.reflectivity as f32
        + correction.focal_slope * (focal_offset - 256. * ratio * ratio).abs();
    let intensity = intensity
        .max(correction.min_intensity)
        .min(correction.max_intensity);

    // Right-handed output frame: x forward becomes y, y left becomes -x.
    Corrected {
        x: y,
        y: -x,
        z,
        intensity,
        distance,
    }
}
