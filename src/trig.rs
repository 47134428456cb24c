use crate::{ROTATION_MAX_UNITS, ROTATION_RESOLUTION};

/// Cosine/sine of every rotation code, computed once so the per-point hot
/// path never evaluates a transcendental.
pub struct RotationTable {
    cos: Box<[f32]>,
    sin: Box<[f32]>,
}

impl RotationTable {
    pub fn new() -> Self {
        let (cos, sin) = (0..ROTATION_MAX_UNITS)
            .map(|code| {
                let rotation = (ROTATION_RESOLUTION * code as f32).to_radians();
                (rotation.cos(), rotation.sin())
            })
            .unzip::<_, _, Vec<_>, Vec<_>>();
        Self {
            cos: cos.into(),
            sin: sin.into(),
        }
    }

    #[inline(always)]
    pub fn cos(&self, code: u16) -> f32 {
        self.cos[code as usize]
    }

    #[inline(always)]
    pub fn sin(&self, code: u16) -> f32 {
        self.sin[code as usize]
    }
}

impl Default for RotationTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_magnitude_for_every_code() {
        let table = RotationTable::new();
        for code in 0..ROTATION_MAX_UNITS as u16 {
            let magnitude = table.cos(code) * table.cos(code) + table.sin(code) * table.sin(code);
            assert!((magnitude - 1.).abs() < 1e-6, "code {code}: {magnitude}");
        }
    }

    #[test]
    fn quarter_turns() {
        let table = RotationTable::new();
        assert_eq!(1., table.cos(0));
        assert_eq!(0., table.sin(0));
        assert!(table.cos(9000).abs() < 1e-6);
        assert!((table.sin(9000) - 1.).abs() < 1e-6);
        assert!((table.cos(18000) + 1.).abs() < 1e-6);
    }
}
