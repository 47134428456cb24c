use serde::{Deserialize, Serialize};

/// Laser counts with a decode path.
pub const SUPPORTED_LASER_COUNTS: [usize; 3] = [16, 32, 64];

/// Factory calibration artifact as an external loader hands it over.
/// How it is read from storage is the loader's business; this crate only
/// fixes the shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationData {
    pub lasers: Vec<LaserParams>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserParams {
    pub laser_id: u8,
    /// Rotational mounting offset in radians.
    pub rot_correction: f32,
    /// Vertical beam angle in radians.
    pub vert_correction: f32,
    #[serde(default)]
    pub dist_correction: f32,
    #[serde(default)]
    pub two_pt_correction_available: bool,
    #[serde(default)]
    pub dist_correction_x: f32,
    #[serde(default)]
    pub dist_correction_y: f32,
    #[serde(default)]
    pub vert_offset_correction: f32,
    #[serde(default)]
    pub horiz_offset_correction: f32,
    #[serde(default)]
    pub min_intensity: f32,
    #[serde(default = "default_max_intensity")]
    pub max_intensity: f32,
    #[serde(default)]
    pub focal_distance: f32,
    #[serde(default)]
    pub focal_slope: f32,
    pub laser_ring: u16,
}

fn default_max_intensity() -> f32 {
    255.
}

impl Default for LaserParams {
    fn default() -> Self {
        Self {
            laser_id: 0,
            rot_correction: 0.,
            vert_correction: 0.,
            dist_correction: 0.,
            two_pt_correction_available: false,
            dist_correction_x: 0.,
            dist_correction_y: 0.,
            vert_offset_correction: 0.,
            horiz_offset_correction: 0.,
            min_intensity: 0.,
            max_intensity: default_max_intensity(),
            focal_distance: 0.,
            focal_slope: 0.,
            laser_ring: 0,
        }
    }
}

/// Per-laser corrections with the trigonometric terms cached, ready for
/// the hot path.
#[derive(Debug, Clone)]
pub struct LaserCorrection {
    pub dist_correction: f32,
    pub two_pt_correction_available: bool,
    pub dist_correction_x: f32,
    pub dist_correction_y: f32,
    pub vert_offset_correction: f32,
    pub horiz_offset_correction: f32,
    pub min_intensity: f32,
    pub max_intensity: f32,
    pub focal_distance: f32,
    pub focal_slope: f32,
    pub laser_ring: u16,
    pub cos_rot_correction: f32,
    pub sin_rot_correction: f32,
    pub cos_vert_correction: f32,
    pub sin_vert_correction: f32,
}

impl From<&LaserParams> for LaserCorrection {
    fn from(params: &LaserParams) -> Self {
        Self {
            dist_correction: params.dist_correction,
            two_pt_correction_available: params.two_pt_correction_available,
            dist_correction_x: params.dist_correction_x,
            dist_correction_y: params.dist_correction_y,
            vert_offset_correction: params.vert_offset_correction,
            horiz_offset_correction: params.horiz_offset_correction,
            min_intensity: params.min_intensity,
            max_intensity: params.max_intensity,
            focal_distance: params.focal_distance,
            focal_slope: params.focal_slope,
            laser_ring: params.laser_ring,
            cos_rot_correction: params.rot_correction.cos(),
            sin_rot_correction: params.rot_correction.sin(),
            cos_vert_correction: params.vert_correction.cos(),
            sin_vert_correction: params.vert_correction.sin(),
        }
    }
}

/// Validated calibration table: one entry per hardware laser id in
/// `[0, num_lasers)`, ring indices a permutation of the same range.
pub struct Calibration {
    corrections: Box<[LaserCorrection]>,
}

impl Calibration {
    pub fn from_params(lasers: &[LaserParams]) -> Result<Self, CalibrationError> {
        if lasers.is_empty() {
            return Err(CalibrationError::Empty);
        }
        let num_lasers = lasers.len();
        if !SUPPORTED_LASER_COUNTS.contains(&num_lasers) {
            return Err(CalibrationError::UnsupportedLaserCount(num_lasers));
        }

        let mut slots: Vec<Option<LaserCorrection>> = vec![None; num_lasers];
        for params in lasers {
            let id = params.laser_id;
            let slot = slots
                .get_mut(id as usize)
                .ok_or(CalibrationError::LaserIdOutOfRange { id, num_lasers })?;
            if slot.is_some() {
                return Err(CalibrationError::DuplicateLaserId(id));
            }
            *slot = Some(LaserCorrection::from(params));
        }
        // All ids were distinct and in range, so every slot is filled.
        let corrections: Box<[LaserCorrection]> = slots.into_iter().flatten().collect();

        let mut ring_seen = vec![false; num_lasers];
        for correction in corrections.iter() {
            match ring_seen.get_mut(correction.laser_ring as usize) {
                Some(seen) if !*seen => *seen = true,
                _ => return Err(CalibrationError::InvalidRingAssignment(num_lasers)),
            }
        }

        Ok(Self { corrections })
    }

    pub fn num_lasers(&self) -> usize {
        self.corrections.len()
    }

    pub fn correction(&self, laser_id: usize) -> Option<&LaserCorrection> {
        self.corrections.get(laser_id)
    }

    /// Corrections ordered by hardware laser id.
    pub fn corrections(&self) -> &[LaserCorrection] {
        &self.corrections
    }
}

impl TryFrom<CalibrationData> for Calibration {
    type Error = CalibrationError;

    fn try_from(data: CalibrationData) -> Result<Self, Self::Error> {
        Self::from_params(&data.lasers)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("calibration contains no lasers")]
    Empty,
    #[error("unsupported laser count {0}, expected one of 16, 32, 64")]
    UnsupportedLaserCount(usize),
    #[error("laser id {id} out of range for a {num_lasers}-laser unit")]
    LaserIdOutOfRange { id: u8, num_lasers: usize },
    #[error("duplicate entry for laser id {0}")]
    DuplicateLaserId(u8),
    #[error("ring indices are not a permutation of 0..{0}")]
    InvalidRingAssignment(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(n: usize) -> Vec<LaserParams> {
        (0..n)
            .map(|i| LaserParams {
                laser_id: i as u8,
                laser_ring: i as u16,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn accepts_supported_counts() {
        for n in SUPPORTED_LASER_COUNTS {
            let calibration = Calibration::from_params(&params(n)).unwrap();
            assert_eq!(n, calibration.num_lasers());
        }
    }

    #[test]
    fn caches_trigonometry() {
        let mut lasers = params(16);
        lasers[3].vert_correction = std::f32::consts::FRAC_PI_2;
        let calibration = Calibration::from_params(&lasers).unwrap();
        let correction = calibration.correction(3).unwrap();
        assert!((correction.sin_vert_correction - 1.).abs() < 1e-6);
        assert!(correction.cos_vert_correction.abs() < 1e-6);
    }

    #[test]
    fn rejects_empty_and_odd_counts() {
        assert!(matches!(
            Calibration::from_params(&[]),
            Err(CalibrationError::Empty)
        ));
        assert!(matches!(
            Calibration::from_params(&params(15)),
            Err(CalibrationError::UnsupportedLaserCount(15))
        ));
    }

    #[test]
    fn rejects_duplicate_and_out_of_range_ids() {
        let mut lasers = params(16);
        lasers[5].laser_id = 4;
        assert!(matches!(
            Calibration::from_params(&lasers),
            Err(CalibrationError::DuplicateLaserId(4))
        ));

        let mut lasers = params(16);
        lasers[5].laser_id = 16;
        assert!(matches!(
            Calibration::from_params(&lasers),
            Err(CalibrationError::LaserIdOutOfRange { id: 16, .. })
        ));
    }

    #[test]
    fn rejects_non_permutation_rings() {
        let mut lasers = params(16);
        lasers[5].laser_ring = 6;
        assert!(matches!(
            Calibration::from_params(&lasers),
            Err(CalibrationError::InvalidRingAssignment(16))
        ));
    }

    #[test]
    fn deserializes_sparse_artifact() {
        let json = r#"{"lasers": [
            {"laser_id": 0, "rot_correction": 0.0, "vert_correction": -0.2667, "laser_ring": 0},
            {"laser_id": 1, "rot_correction": 0.01, "vert_correction": 0.0175,
             "dist_correction": 1.2, "two_pt_correction_available": true,
             "dist_correction_x": 1.1, "dist_correction_y": 1.3, "laser_ring": 1}
        ]}"#;
        let data: CalibrationData = serde_json::from_str(json).unwrap();
        assert_eq!(2, data.lasers.len());
        assert_eq!(255., data.lasers[0].max_intensity);
        assert!(data.lasers[1].two_pt_correction_available);
        // two lasers is not a decodable unit
        assert!(matches!(
            Calibration::try_from(data),
            Err(CalibrationError::UnsupportedLaserCount(2))
        ));
    }
}
