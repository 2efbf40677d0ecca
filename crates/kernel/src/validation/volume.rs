use crate::mesh::FacetedSolid;

/// Verify that Boolean operations preserve the volume identity:
/// vol(A ∪ B) = vol(A) + vol(B) - vol(A ∩ B)
///
/// When a difference is supplied it is checked against
/// vol(A - B) = vol(A) - vol(A ∩ B) as well. Returns the worst relative error.
pub fn verify_boolean_volume_identity(
    a: &FacetedSolid,
    b: &FacetedSolid,
    union: &FacetedSolid,
    intersection: &FacetedSolid,
    difference: Option<&FacetedSolid>,
) -> VolumeVerification {
    let vol_a = a.volume();
    let vol_b = b.volume();
    let vol_union = union.volume();
    let vol_intersection = intersection.volume();
    let vol_difference = difference.map(FacetedSolid::volume);

    let expected_union = vol_a + vol_b - vol_intersection;
    let mut error = relative_error(vol_union, expected_union);
    if let Some(vol_diff) = vol_difference {
        error = error.max(relative_error(vol_diff, vol_a - vol_intersection));
    }

    VolumeVerification {
        vol_a,
        vol_b,
        vol_union,
        vol_intersection,
        vol_difference,
        expected_union,
        relative_error: error,
    }
}

fn relative_error(actual: f64, expected: f64) -> f64 {
    if expected.abs() > f64::EPSILON {
        (actual - expected).abs() / expected.abs()
    } else {
        actual.abs()
    }
}

#[derive(Debug)]
pub struct VolumeVerification {
    pub vol_a: f64,
    pub vol_b: f64,
    pub vol_union: f64,
    pub vol_intersection: f64,
    pub vol_difference: Option<f64>,
    pub expected_union: f64,
    pub relative_error: f64,
}

impl VolumeVerification {
    pub fn is_valid(&self, max_relative_error: f64) -> bool {
        self.relative_error < max_relative_error
    }
}
