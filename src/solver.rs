use std::sync::Arc;
use crate::array::{self, Array3, ArrayView3};
use crate::database::{BlockIndex, Database, Field};
use crate::error::Error;
use crate::hydro::{riemann_hlle, Conserved, Direction, Primitive, SourceTerms, GAMMA_LAW_INDEX};

// Most aggressive (least diffusive) setting of the generalized minmod
// limiter.
const PLM_THETA: f64 = 2.0;

// Guard zones on each radial edge of a fetched patch: the three-point PLM
// stencil plus one more cell to feed the Riemann solve at the interior's
// edge faces.
pub const NUM_GUARD: usize = 2;




/**
 * The immutable geometry arrays a solver task needs alongside the conserved
 * data: cell centroids, cell volumes, and the two families of face areas.
 * These are shared with the database, not copied.
 */
#[derive(Clone)]
pub struct MeshGeometry {
    pub centroids: Arc<Array3>,
    pub volumes: Arc<Array3>,
    pub face_areas_i: Arc<Array3>,
    pub face_areas_j: Arc<Array3>,
}




// ============================================================================
impl MeshGeometry {
    pub fn for_block(database: &Database, block: BlockIndex) -> Self {
        Self {
            centroids: database.at(block, Field::CellCoords).clone(),
            volumes: database.at(block, Field::CellVolume).clone(),
            face_areas_i: database.at(block, Field::FaceAreaI).clone(),
            face_areas_j: database.at(block, Field::FaceAreaJ).clone(),
        }
    }
}




// ============================================================================
fn sgn(x: f64) -> f64 {
    f64::copysign(1.0, x)
}

fn min3abs(a: f64, b: f64, c: f64) -> f64 {
    f64::min(f64::min(a.abs(), b.abs()), c.abs())
}

/**
 * Generalized minmod slope over the three-point stencil `(ul, u0, ur)`. The
 * result is zero at extrema and limited to `theta` times the one-sided
 * differences elsewhere.
 */
fn plm_gradient(theta: f64, ul: f64, u0: f64, ur: f64) -> f64 {
    let a = theta * (u0 - ul);
    let b = 0.5 * (ur - ul);
    let c = theta * (ur - u0);
    0.25 * f64::abs(sgn(a) + sgn(b)) * (sgn(a) + sgn(c)) * min3abs(a, b, c)
}




// ============================================================================
fn plm_gradient_array(pa: ArrayView3, pb: ArrayView3, pc: ArrayView3) -> Array3 {
    array::zip3(pa, pb, pc, 5, |a, b, c, g| {
        for q in 0..5 {
            g[q] = plm_gradient(PLM_THETA, a[q], b[q], c[q])
        }
    })
}

fn extrap_l(p: ArrayView3, grad: ArrayView3) -> Array3 {
    array::zip(p, grad, 5, |p, g, f| {
        for q in 0..5 {
            f[q] = p[q] - 0.5 * g[q]
        }
    })
}

fn extrap_r(p: ArrayView3, grad: ArrayView3) -> Array3 {
    array::zip(p, grad, 5, |p, g, f| {
        for q in 0..5 {
            f[q] = p[q] + 0.5 * g[q]
        }
    })
}

fn godunov_flux(
    pl: ArrayView3,
    pr: ArrayView3,
    direction: Direction,
) -> Result<Array3, Error> {
    array::try_zip(pl, pr, 5, |l, r, f| {
        let flux = riemann_hlle(
            Primitive::from_slice(l),
            Primitive::from_slice(r),
            direction,
            GAMMA_LAW_INDEX)?;
        flux.write_to_slice(f);
        Ok(())
    })
}

fn flux_times_area(flux: ArrayView3, area: ArrayView3) -> Array3 {
    array::zip(flux, area, 5, |f, da, fa| {
        for q in 0..5 {
            fa[q] = f[q] * da[0]
        }
    })
}

/**
 * Insert one row of zeros at each end of axis 1. Encodes the zero-flux
 * policy at the polar axis.
 */
fn pad_with_zeros_j(a: &Array3) -> Array3 {
    let (ni, nj, nk) = a.dim();
    let mut result = Array3::zeros((ni, nj + 2, nk));
    for i in 0..ni {
        for j in 0..nj {
            result.slice_mut(i, j + 1).copy_from_slice(a.slice(i, j))
        }
    }
    result
}




// ============================================================================
/**
 * Advance a single patch by one time step: piecewise-linear reconstruction
 * and HLLE fluxes on both axes, the local source terms, and a conservative
 * update. The input conserved array carries `NUM_GUARD` radial guard zones
 * per edge and no polar guards; the returned array has the interior shape.
 */
pub fn advance(
    source_terms: SourceTerms,
    u0: &Array3,
    geometry: &MeshGeometry,
    dt: f64,
) -> Result<Array3, Error> {
    let (mi, mj, _) = u0.dim();

    let p0 = array::try_map(u0.view(), 5, |u, p| {
        Conserved::from_slice(u)
            .to_primitive(GAMMA_LAW_INDEX)?
            .write_to_slice(p);
        Ok::<(), Error>(())
    })?;


    // Radial fluxes, area-weighted, at every face bordering an interior cell
    // ------------------------------------------------------------------------
    let fhi = {
        let pa = p0.select(0..mi - 2, 0..mj);
        let pb = p0.select(1..mi - 1, 0..mj);
        let pc = p0.select(2..mi, 0..mj);
        let gb = plm_gradient_array(pa, pb, pc);
        let pl = extrap_l(pb, gb.view());
        let pr = extrap_r(pb, gb.view());
        let fh = godunov_flux(
            pr.select(0..mi - 3, 0..mj),
            pl.select(1..mi - 2, 0..mj),
            Direction::Radial)?;
        flux_times_area(fh.view(), geometry.face_areas_i.view())
    };


    // Polar fluxes over the interior radial range, zero at the poles
    // ------------------------------------------------------------------------
    let fhj = {
        let pa = p0.select(NUM_GUARD..mi - NUM_GUARD, 0..mj - 2);
        let pb = p0.select(NUM_GUARD..mi - NUM_GUARD, 1..mj - 1);
        let pc = p0.select(NUM_GUARD..mi - NUM_GUARD, 2..mj);
        let gb = pad_with_zeros_j(&plm_gradient_array(pa, pb, pc));
        let pi = p0.select(NUM_GUARD..mi - NUM_GUARD, 0..mj);
        let pl = extrap_l(pi, gb.view());
        let pr = extrap_r(pi, gb.view());
        let fh = godunov_flux(
            pr.select(0..mi - 2 * NUM_GUARD, 0..mj - 1),
            pl.select(0..mi - 2 * NUM_GUARD, 1..mj),
            Direction::Polar)?;
        flux_times_area(
            pad_with_zeros_j(&fh).view(),
            geometry.face_areas_j.view())
    };


    // Flux divergence, sources, and the conservative update
    // ------------------------------------------------------------------------
    let ni = mi - 2 * NUM_GUARD;
    let dfi = array::zip(
        fhi.select(1..ni + 1, 0..mj),
        fhi.select(0..ni, 0..mj),
        5,
        |fp, fm, df| {
            for q in 0..5 {
                df[q] = fp[q] - fm[q]
            }
        });
    let df = array::zip(
        dfi.view(),
        array::zip(
            fhj.select(0..ni, 1..mj + 1),
            fhj.select(0..ni, 0..mj),
            5,
            |fp, fm, df| {
                for q in 0..5 {
                    df[q] = fp[q] - fm[q]
                }
            })
        .view(),
        5,
        |a, b, df| {
            for q in 0..5 {
                df[q] = a[q] + b[q]
            }
        });

    let s0 = array::try_zip(
        p0.select(NUM_GUARD..mi - NUM_GUARD, 0..mj),
        geometry.centroids.view(),
        5,
        |p, x, s| {
            source_terms
                .evaluate(Primitive::from_slice(p), (x[0], x[1]))?
                .write_to_slice(s);
            Ok::<(), Error>(())
        })?;

    let du = array::zip3(
        s0.view(),
        df.view(),
        geometry.volumes.view(),
        5,
        |s, df, dv, du| {
            for q in 0..5 {
                du[q] = dt * (s[q] - df[q] / dv[0])
            }
        });

    Ok(array::zip(
        u0.select(NUM_GUARD..mi - NUM_GUARD, 0..mj),
        du.view(),
        5,
        |u, du, u1| {
            for q in 0..5 {
                u1[q] = u[q] + du[q]
            }
        }))
}




// ============================================================================
#[cfg(test)]
mod test {

    use core::f64::consts::{FRAC_PI_2, PI};
    use super::*;
    use crate::database::{Database, Edge, Field};
    use crate::mesh;


    #[test]
    fn plm_gradient_is_limited_and_vanishes_at_extrema() {
        // Smooth monotone data: the slope tracks the centered difference.
        assert_eq!(plm_gradient(2.0, 1.0, 2.0, 3.0), 1.0);

        // Steep one-sided jump: limited to theta times the short side.
        assert_eq!(plm_gradient(2.0, 1.0, 1.1, 3.0), 0.2);

        // Extrema give zero slope.
        assert_eq!(plm_gradient(2.0, 1.0, 2.0, 1.0), 0.0);
        assert_eq!(plm_gradient(2.0, 2.0, 1.0, 2.0), 0.0);
    }


    #[test]
    fn plm_advection_does_not_increase_total_variation() {
        // Scalar advection at unit speed with upwind PLM face values. The
        // limiter must keep the total variation from growing.
        let total_variation = |u: &Vec<f64>| -> f64 {
            u.windows(2).map(|w| (w[1] - w[0]).abs()).sum()
        };

        let n = 100;
        let mut u: Vec<f64> = (0..n)
            .map(|i| if i > 30 && i < 50 { 1.0 } else if i > 60 && i < 70 { 0.3 } else { 0.0 })
            .collect();
        let dt_over_dx = 0.5;

        for _ in 0..40 {
            let tv0 = total_variation(&u);
            let mut flux = vec![0.0; n + 1];

            for k in 1..n {
                let ul = u[if k >= 2 { k - 2 } else { 0 }];
                let u0 = u[k - 1];
                let ur = u[k];
                flux[k] = u0 + 0.5 * plm_gradient(2.0, ul, u0, ur);
            }
            for k in 0..n {
                u[k] -= dt_over_dx * (flux[k + 1] - flux[k]);
            }
            assert!(total_variation(&u) <= tv0 + 1e-12);
        }
    }


    fn uniform_geometry(ni: usize, nj: usize) -> MeshGeometry {
        let verts = mesh::vertices(ni, nj, [1.0, 4.0, 0.0, PI]);
        MeshGeometry {
            centroids: Arc::new(mesh::cell_centroids(&verts)),
            volumes: Arc::new(mesh::cell_volumes(&verts)),
            face_areas_i: Arc::new(mesh::face_areas_i(&verts)),
            face_areas_j: Arc::new(mesh::face_areas_j(&verts)),
        }
    }


    #[test]
    fn advance_preserves_polar_symmetry_of_radial_fields() {
        let (ni, nj) = (8, 16);
        let geometry = uniform_geometry(ni, nj);
        let centroids = geometry.centroids.clone();

        // A polar-symmetric state with purely radial structure.
        let u0 = Array3::from_slice_function((ni + 4, nj, 5), |(i, _), u| {
            let i = i as i64 - 2;
            let r: f64 = if (0..ni as i64).contains(&i) {
                centroids[(i as usize, 0, 0)]
            } else {
                1.0 + 0.4 * i as f64
            };
            Primitive(r.powf(-1.5), 0.0, 0.0, 0.0, r.powf(-2.5))
                .to_conserved(GAMMA_LAW_INDEX)
                .write_to_slice(u)
        });

        let source = SourceTerms { heating_rate: 0.0, cooling_rate: 0.0 };
        let u1 = advance(source, &u0, &geometry, 1e-3).unwrap();
        assert_eq!(u1.dim(), (ni, nj, 5));

        // Density, radial momentum, and energy stay independent of the
        // polar index; no mass or energy moved through the polar faces.
        for i in 0..ni {
            for j in 1..nj {
                for q in [0, 1, 4] {
                    let a = u1[(i, 0, q)];
                    let b = u1[(i, j, q)];
                    assert!(
                        (a - b).abs() <= 1e-13 * a.abs().max(1.0),
                        "field {} at ({}, {}) broke symmetry: {} vs {}",
                        q, i, j, a, b);
                }
            }
        }
    }


    #[test]
    fn total_mass_is_conserved_in_a_wrapped_configuration() {
        // With unit volumes and face areas the update reduces to a plain
        // flux difference. Wrapping the radial guards makes the two edge
        // fluxes identical, interior fluxes telescope, and mass has no
        // source term, so the total mass must not drift.
        let (ni, nj) = (16, 4);

        let u0 = Array3::from_slice_function((ni, nj, 5), |(i, _), u| {
            let dg = 1.0 + 0.2 * f64::sin(2.0 * PI * i as f64 / ni as f64);
            Primitive(dg, 0.0, 0.0, 0.0, 1.0)
                .to_conserved(GAMMA_LAW_INDEX)
                .write_to_slice(u)
        });

        let mut database = Database::new(ni, nj);
        database.insert((0, 0, 0), Field::Conserved, u0.clone());
        database.set_boundary_value(Box::new(|_, edge, depth, patch: &Array3| {
            let (ni, nj, _) = patch.dim();
            match edge {
                Edge::Il => patch.select(ni - depth..ni, 0..nj).to_owned(),
                Edge::Ir => patch.select(0..depth, 0..nj).to_owned(),
                Edge::Jl | Edge::Jr => Array3::empty(),
            }
        }));

        let ones = |dim| Array3::from_slice_function(dim, |_, x| x[0] = 1.0);
        let geometry = MeshGeometry {
            centroids: Arc::new(Array3::from_slice_function((ni, nj, 2), |(i, _), x| {
                x[0] = 1.0 + i as f64;
                x[1] = FRAC_PI_2;
            })),
            volumes: Arc::new(ones((ni, nj, 1))),
            face_areas_i: Arc::new(ones((ni + 1, nj, 1))),
            face_areas_j: Arc::new(ones((ni, nj + 1, 1))),
        };

        let fetched = database.fetch((0, 0, 0), NUM_GUARD, NUM_GUARD, 0, 0);
        let source = SourceTerms { heating_rate: 0.0, cooling_rate: 0.0 };
        let u1 = advance(source, &fetched, &geometry, 1e-3).unwrap();

        let mass = |u: &Array3| -> f64 {
            (0..ni).flat_map(|i| (0..nj).map(move |j| (i, j)))
                .map(|(i, j)| u[(i, j, 0)])
                .sum()
        };
        assert!((mass(&u1) - mass(&u0)).abs() <= 1e-12 * mass(&u0));
    }


    #[test]
    fn shock_tube_densities_stay_within_the_initial_bounds() {
        // A Sod-like problem run with the same reconstruction and Riemann
        // solver as the production axes, on a 1D uniform grid with no
        // geometry. PLM plus HLLE must not overshoot the initial densities.
        let n = 100;
        let dx = 1.0 / n as f64;
        let dt = 0.2 * dx;

        let mut primitive: Vec<Primitive> = (0..n)
            .map(|i| {
                if (i as f64 + 0.5) * dx < 0.5 {
                    Primitive(1.0, 0.0, 0.0, 0.0, 1.0)
                } else {
                    Primitive(0.125, 0.0, 0.0, 0.0, 0.1)
                }
            })
            .collect();

        for _ in 0..100 {
            let pe: Vec<Primitive> = [primitive[0], primitive[0]]
                .iter()
                .chain(primitive.iter())
                .chain([primitive[n - 1], primitive[n - 1]].iter())
                .cloned()
                .collect();

            let mut gradient = vec![[0.0; 5]; n + 2];
            for k in 1..n + 3 {
                let (a, b, c) = (pe[k - 1], pe[k], pe[k + 1]);
                let a: [f64; 5] = [a.0, a.1, a.2, a.3, a.4];
                let b: [f64; 5] = [b.0, b.1, b.2, b.3, b.4];
                let c: [f64; 5] = [c.0, c.1, c.2, c.3, c.4];
                for q in 0..5 {
                    gradient[k - 1][q] = plm_gradient(2.0, a[q], b[q], c[q])
                }
            }

            let face_state = |k: usize, side: f64| -> Primitive {
                let p = pe[k + 1];
                let g = gradient[k];
                Primitive(
                    p.0 + side * 0.5 * g[0],
                    p.1 + side * 0.5 * g[1],
                    p.2 + side * 0.5 * g[2],
                    p.3 + side * 0.5 * g[3],
                    p.4 + side * 0.5 * g[4])
            };

            let mut u: Vec<Conserved> = primitive
                .iter()
                .map(|p| p.to_conserved(GAMMA_LAW_INDEX))
                .collect();

            for k in 0..n + 1 {
                let fl = face_state(k, 1.0);
                let fr = face_state(k + 1, -1.0);
                let f = riemann_hlle(fl, fr, Direction::Radial, GAMMA_LAW_INDEX).unwrap();
                if k > 0 {
                    u[k - 1] = u[k - 1] - f * (dt / dx)
                }
                if k < n {
                    u[k] = u[k] + f * (dt / dx)
                }
            }
            primitive = u
                .iter()
                .map(|u| u.to_primitive(GAMMA_LAW_INDEX).unwrap())
                .collect();
        }

        for p in &primitive {
            assert!(p.0 <= 1.0 * 1.01);
            assert!(p.0 >= 0.125 * 0.99);
        }
    }
}
