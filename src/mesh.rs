use core::f64::consts::PI;
use crate::array::{self, Array3};

// The wedge is axisymmetric: cell volumes and face areas integrate the
// azimuthal angle over the full [0, 2pi].
const PHI_RANGE: f64 = 2.0 * PI;




/**
 * Generate the vertex grid for a spherical wedge covering the radial
 * interval `[r0, r1]` and the polar interval `[q0, q1]`. Vertices are
 * logarithmically spaced in radius and uniformly spaced in polar angle. The
 * result has shape `(ni + 1, nj + 1, 2)` with components `(r, theta)`.
 */
pub fn vertices(ni: usize, nj: usize, extent: [f64; 4]) -> Array3 {
    let [r0, r1, q0, q1] = extent;

    Array3::from_slice_function((ni + 1, nj + 1, 2), |(i, j), x| {
        x[0] = r0 * (r1 / r0).powf(i as f64 / ni as f64);
        x[1] = q0 + (q1 - q0) * j as f64 / nj as f64;
    })
}


/**
 * Cell centroids: the geometric mean radius and the midpoint polar angle.
 */
pub fn cell_centroids(verts: &Array3) -> Array3 {
    let (mi, mj, _) = verts.dim();
    let v0 = verts.select(0..mi - 1, 0..mj - 1);
    let v1 = verts.select(1..mi, 1..mj);

    array::zip(v0, v1, 2, |a, b, x| {
        x[0] = (a[0] * b[0]).sqrt();
        x[1] = 0.5 * (a[1] + b[1]);
    })
}


/**
 * Exact cell volumes for the spherical wedge.
 */
pub fn cell_volumes(verts: &Array3) -> Array3 {
    let (mi, mj, _) = verts.dim();
    let v0 = verts.select(0..mi - 1, 0..mj - 1);
    let v1 = verts.select(1..mi, 1..mj);

    array::zip(v0, v1, 1, |a, b, x| {
        let (r0, q0) = (a[0], a[1]);
        let (r1, q1) = (b[0], b[1]);
        x[0] = -1.0 / 3.0 * (r1.powi(3) - r0.powi(3)) * (q1.cos() - q0.cos()) * PHI_RANGE;
    })
}


/**
 * Areas of the radial (`i`-directed) faces; shape `(ni + 1, nj, 1)`.
 */
pub fn face_areas_i(verts: &Array3) -> Array3 {
    let (mi, mj, _) = verts.dim();
    let v0 = verts.select(0..mi, 0..mj - 1);
    let v1 = verts.select(0..mi, 1..mj);

    array::zip(v0, v1, 1, |a, b, x| {
        let (r0, q0) = (a[0], a[1]);
        let q1 = b[1];
        x[0] = -r0 * r0 * PHI_RANGE * (q1.cos() - q0.cos());
    })
}


/**
 * Areas of the polar (`j`-directed) faces; shape `(ni, nj + 1, 1)`. The
 * faces at the poles have zero area through `sin(theta)`.
 */
pub fn face_areas_j(verts: &Array3) -> Array3 {
    let (mi, mj, _) = verts.dim();
    let v0 = verts.select(0..mi - 1, 0..mj);
    let v1 = verts.select(1..mi, 0..mj);

    array::zip(v0, v1, 1, |a, b, x| {
        let (r0, q0) = (a[0], a[1]);
        let r1 = b[0];
        x[0] = 0.5 * (r1 + r0) * (r1 - r0) * PHI_RANGE * q0.sin();
    })
}
