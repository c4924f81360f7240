use core::f64::consts::FRAC_PI_2;
use core::ops::{Add, Div, Mul, Sub};
use crate::error::Error;

pub const GAMMA_LAW_INDEX: f64 = 5.0 / 3.0;




/**
 * Enum for a unit vector along one of the coordinate axes: radial (r), polar
 * (theta), or azimuthal (phi).
 */
#[derive(Clone, Copy)]
pub enum Direction {
    Radial,
    Polar,
    Azimuthal,
}




// ============================================================================
impl Direction {
    pub fn along(self, other: Direction) -> f64 {
        match (self, other) {
            (Direction::Radial, Direction::Radial) => 1.0,
            (Direction::Polar, Direction::Polar) => 1.0,
            (Direction::Azimuthal, Direction::Azimuthal) => 1.0,
            _ => 0.0,
        }
    }
}




// ============================================================================
/**
 * Conserved state: mass density, three momentum densities, total energy
 * density.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Conserved(pub f64, pub f64, pub f64, pub f64, pub f64);

/**
 * Primitive state: mass density, three velocity components, gas pressure.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Primitive(pub f64, pub f64, pub f64, pub f64, pub f64);




// ============================================================================
impl Conserved {

    pub fn zeros() -> Self {
        Self(0.0, 0.0, 0.0, 0.0, 0.0)
    }

    pub fn from_slice(u: &[f64]) -> Self {
        Self(u[0], u[1], u[2], u[3], u[4])
    }

    pub fn write_to_slice(&self, u: &mut [f64]) {
        u[0] = self.0;
        u[1] = self.1;
        u[2] = self.2;
        u[3] = self.3;
        u[4] = self.4;
    }

    pub fn mass_density(&self) -> f64 {
        self.0
    }

    pub fn momentum(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Radial => self.1,
            Direction::Polar => self.2,
            Direction::Azimuthal => self.3,
        }
    }

    pub fn momentum_squared(&self) -> f64 {
        self.1 * self.1 + self.2 * self.2 + self.3 * self.3
    }

    pub fn energy_density(&self) -> f64 {
        self.4
    }

    fn validate(self, caller: &'static str) -> Result<Self, Error> {
        if self.0 < 0.0 {
            Err(Error::NegativeDensity(caller, self.0))
        } else if self.4 < 0.0 {
            Err(Error::NegativeEnergy(caller, self.4))
        } else {
            Ok(self)
        }
    }

    /**
     * Recover the primitive state under the gamma-law equation of state.
     * Fails if the conserved density or energy is negative, or if the
     * recovered pressure is.
     */
    pub fn to_primitive(self, gamma_law_index: f64) -> Result<Primitive, Error> {
        self.validate("cons_to_prim")?;

        let gm1 = gamma_law_index - 1.0;
        let dg = self.mass_density();
        let pg = (self.energy_density() - 0.5 * self.momentum_squared() / dg) * gm1;

        Primitive(dg, self.1 / dg, self.2 / dg, self.3 / dg, pg).validate("cons_to_prim")
    }
}




// ============================================================================
impl Primitive {

    pub fn from_slice(p: &[f64]) -> Self {
        Self(p[0], p[1], p[2], p[3], p[4])
    }

    pub fn write_to_slice(&self, p: &mut [f64]) {
        p[0] = self.0;
        p[1] = self.1;
        p[2] = self.2;
        p[3] = self.3;
        p[4] = self.4;
    }

    pub fn mass_density(&self) -> f64 {
        self.0
    }

    pub fn velocity(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Radial => self.1,
            Direction::Polar => self.2,
            Direction::Azimuthal => self.3,
        }
    }

    pub fn velocity_squared(&self) -> f64 {
        self.1 * self.1 + self.2 * self.2 + self.3 * self.3
    }

    pub fn gas_pressure(&self) -> f64 {
        self.4
    }

    pub fn temperature(&self, gamma_law_index: f64) -> f64 {
        self.gas_pressure() / self.mass_density() / (gamma_law_index - 1.0)
    }

    fn validate(self, caller: &'static str) -> Result<Self, Error> {
        if self.0 < 0.0 {
            Err(Error::NegativeDensity(caller, self.0))
        } else if self.4 < 0.0 {
            Err(Error::NegativePressure(caller, self.4))
        } else {
            Ok(self)
        }
    }

    pub fn to_conserved(self, gamma_law_index: f64) -> Conserved {
        let d = self.mass_density();
        let p = self.gas_pressure();
        let vv = self.velocity_squared();

        Conserved(
            d,
            d * self.1,
            d * self.2,
            d * self.3,
            d * vv * 0.5 + p / (gamma_law_index - 1.0))
    }

    /**
     * The flux of conserved quantities through a face with the given unit
     * normal.
     */
    pub fn flux_vector(self, direction: Direction, gamma_law_index: f64) -> Conserved {
        let pg = self.gas_pressure();
        let vn = self.velocity(direction);
        let u = self.to_conserved(gamma_law_index);

        Conserved(
            u.0 * vn,
            u.1 * vn + pg * direction.along(Direction::Radial),
            u.2 * vn + pg * direction.along(Direction::Polar),
            u.3 * vn + pg * direction.along(Direction::Azimuthal),
            u.4 * vn + pg * vn)
    }

    /**
     * Characteristic wavespeeds along the given axis. The pressure is
     * clamped at zero here (and only here) so the sound speed never goes
     * NaN.
     */
    pub fn eigenvalues(self, direction: Direction, gamma_law_index: f64) -> [f64; 5] {
        let dg = self.mass_density();
        let pg = self.gas_pressure().max(0.0);
        let cs = (gamma_law_index * pg / dg).sqrt();
        let vn = self.velocity(direction);
        [vn - cs, vn, vn, vn, vn + cs]
    }

    pub fn outer_wavespeeds(self, direction: Direction, gamma_law_index: f64) -> (f64, f64) {
        let a = self.eigenvalues(direction, gamma_law_index);
        (a[0], a[4])
    }
}




// ============================================================================
impl Add<Conserved> for Conserved {
    type Output = Self;
    fn add(self, u: Self) -> Self {
        Self(self.0 + u.0, self.1 + u.1, self.2 + u.2, self.3 + u.3, self.4 + u.4)
    }
}

impl Sub<Conserved> for Conserved {
    type Output = Self;
    fn sub(self, u: Self) -> Self {
        Self(self.0 - u.0, self.1 - u.1, self.2 - u.2, self.3 - u.3, self.4 - u.4)
    }
}

impl Mul<f64> for Conserved {
    type Output = Self;
    fn mul(self, a: f64) -> Self {
        Self(self.0 * a, self.1 * a, self.2 * a, self.3 * a, self.4 * a)
    }
}

impl Div<f64> for Conserved {
    type Output = Self;
    fn div(self, a: f64) -> Self {
        Self(self.0 / a, self.1 / a, self.2 / a, self.3 / a, self.4 / a)
    }
}




// ============================================================================
/**
 * HLLE Godunov flux between two primitive states at a face with the given
 * unit normal. When both states are exactly quiescent with zero sound speed
 * the two-wave fan is empty and the flux is zero.
 */
pub fn riemann_hlle(
    pl: Primitive,
    pr: Primitive,
    direction: Direction,
    gamma_law_index: f64,
) -> Result<Conserved, Error> {
    let pl = pl.validate("riemann_hlle")?;
    let pr = pr.validate("riemann_hlle")?;

    let ul = pl.to_conserved(gamma_law_index);
    let ur = pr.to_conserved(gamma_law_index);
    let fl = pl.flux_vector(direction, gamma_law_index);
    let fr = pr.flux_vector(direction, gamma_law_index);

    let (alm, alp) = pl.outer_wavespeeds(direction, gamma_law_index);
    let (arm, arp) = pr.outer_wavespeeds(direction, gamma_law_index);
    let ap = alp.max(arp).max(0.0);
    let am = alm.min(arm).min(0.0);

    if ap == 0.0 && am == 0.0 {
        return Ok(Conserved::zeros());
    }
    Ok((fl * ap - fr * am - (ul - ur) * ap * am) / (ap - am))
}




/**
 * Local source terms for the axisymmetric Euler equations in spherical
 * coordinates, around a unit point mass (GM = 1) at the origin, with
 * volumetric heating concentrated near the origin and optically thin
 * Bremsstrahlung cooling. The rate coefficients are carried in the record.
 */
#[derive(Clone, Copy)]
pub struct SourceTerms {
    pub heating_rate: f64,
    pub cooling_rate: f64,
}




// ============================================================================
impl SourceTerms {

    /**
     * Evaluate the source terms for the given primitive state at spherical
     * position `(r, theta)`.
     */
    pub fn evaluate(&self, p: Primitive, position: (f64, f64)) -> Result<Conserved, Error> {
        let p = p.validate("source_terms")?;

        let (r, q) = position;
        let dg = p.0;
        let vr = p.1;
        let vq = p.2;
        let vp = p.3;
        let pg = p.4;
        let tg = p.temperature(GAMMA_LAW_INDEX);

        // Spherical geometry
        let s1 = (2.0 * pg + dg * (vq * vq + vp * vp)) / r;
        let s2 = (pg * cot(q) + dg * (vp * vp * cot(q) - vr * vq)) / r;
        let s3 = -dg * vp * (vr + vq * cot(q)) / r;

        // Point mass gravity
        let g = 1.0 / r / r;
        let s1 = s1 - dg * g;
        let s4 = -dg * g * vr;

        // Thermal heating and Bremsstrahlung cooling
        let s4 = s4 + self.heating_rate * f64::exp(-r * r);
        let s4 = s4 - self.cooling_rate * tg.sqrt() * dg * dg;

        Ok(Conserved(0.0, s1, s2, s3, s4))
    }
}


fn cot(x: f64) -> f64 {
    f64::tan(FRAC_PI_2 - x)
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;


    fn sample_primitive() -> Primitive {
        Primitive(1.5, 0.2, -0.3, 0.1, 2.0)
    }


    #[test]
    fn prim_cons_round_trip_is_exact_to_machine_precision() {
        let p0 = sample_primitive();
        let p1 = p0.to_conserved(GAMMA_LAW_INDEX).to_primitive(GAMMA_LAW_INDEX).unwrap();

        assert!((p1.0 - p0.0).abs() < 1e-12);
        assert!((p1.1 - p0.1).abs() < 1e-12);
        assert!((p1.2 - p0.2).abs() < 1e-12);
        assert!((p1.3 - p0.3).abs() < 1e-12);
        assert!((p1.4 - p0.4).abs() < 1e-12);
    }


    #[test]
    fn negative_states_are_rejected_with_the_kernel_name() {
        let u = Conserved(-1.0, 0.0, 0.0, 0.0, 1.0);
        match u.to_primitive(GAMMA_LAW_INDEX) {
            Err(Error::NegativeDensity(caller, _)) => assert_eq!(caller, "cons_to_prim"),
            _ => panic!("expected a negative density error"),
        }

        // Kinetic energy exceeding the total energy means negative pressure.
        let u = Conserved(1.0, 10.0, 0.0, 0.0, 1.0);
        assert!(matches!(
            u.to_primitive(GAMMA_LAW_INDEX),
            Err(Error::NegativePressure(_, _))));
    }


    #[test]
    fn hlle_flux_of_equal_states_is_the_physical_flux() {
        let p = sample_primitive();
        let f = p.flux_vector(Direction::Radial, GAMMA_LAW_INDEX);
        let g = riemann_hlle(p, p, Direction::Radial, GAMMA_LAW_INDEX).unwrap();

        assert!((f.0 - g.0).abs() < 1e-12);
        assert!((f.1 - g.1).abs() < 1e-12);
        assert!((f.2 - g.2).abs() < 1e-12);
        assert!((f.3 - g.3).abs() < 1e-12);
        assert!((f.4 - g.4).abs() < 1e-12);
    }


    #[test]
    fn hlle_flux_is_upwind_when_all_wavespeeds_share_a_sign() {
        // Supersonic rightward flow: the flux must be the left state's flux.
        let pl = Primitive(1.0, 5.0, 0.0, 0.0, 1.0);
        let pr = Primitive(0.5, 5.0, 0.0, 0.0, 0.5);
        assert!(pl.eigenvalues(Direction::Radial, GAMMA_LAW_INDEX)[0] > 0.0);
        assert!(pr.eigenvalues(Direction::Radial, GAMMA_LAW_INDEX)[0] > 0.0);

        let f = riemann_hlle(pl, pr, Direction::Radial, GAMMA_LAW_INDEX).unwrap();
        let g = pl.flux_vector(Direction::Radial, GAMMA_LAW_INDEX);
        assert!((f.0 - g.0).abs() < 1e-12);
        assert!((f.4 - g.4).abs() < 1e-12);
    }


    #[test]
    fn hlle_flux_of_quiescent_cold_states_is_zero() {
        let p = Primitive(1.0, 0.0, 0.0, 0.0, 0.0);
        let f = riemann_hlle(p, p, Direction::Polar, GAMMA_LAW_INDEX).unwrap();
        assert_eq!(f, Conserved::zeros());
    }


    #[test]
    fn wavespeeds_clamp_negative_pressure() {
        let p = Primitive(1.0, 0.3, 0.0, 0.0, -1e-12);
        let a = p.eigenvalues(Direction::Radial, GAMMA_LAW_INDEX);
        assert_eq!(a[0], 0.3);
        assert_eq!(a[4], 0.3);
    }


    #[test]
    fn gravity_pulls_inward_on_static_gas() {
        let source = SourceTerms { heating_rate: 0.0, cooling_rate: 0.0 };
        let p = Primitive(1.0, 0.0, 0.0, 0.0, 0.0);
        let s = source.evaluate(p, (2.0, FRAC_PI_2)).unwrap();

        // At the equator with zero pressure and velocity, the only radial
        // source is gravity, and it does no work.
        assert_eq!(s.1, -1.0 / 4.0);
        assert_eq!(s.4, 0.0);
    }


    #[test]
    fn heating_deposits_energy_near_the_origin() {
        let source = SourceTerms { heating_rate: 3.0, cooling_rate: 0.0 };
        let p = Primitive(1.0, 0.0, 0.0, 0.0, 1.0);
        let near = source.evaluate(p, (1.0, FRAC_PI_2)).unwrap();
        let far = source.evaluate(p, (5.0, FRAC_PI_2)).unwrap();
        assert!(near.4 > far.4);
        assert!((near.4 - 3.0 * f64::exp(-1.0)).abs() < 1e-12);
    }


    #[test]
    fn cooling_scales_with_density_squared_and_root_temperature() {
        let source = SourceTerms { heating_rate: 0.0, cooling_rate: 2.0 };
        let p = Primitive(3.0, 0.0, 0.0, 0.0, 1.0);
        let s = source.evaluate(p, (1.0, FRAC_PI_2)).unwrap();
        let tg = 1.0 / 3.0 / (GAMMA_LAW_INDEX - 1.0);
        assert!((s.4 - (-2.0 * tg.sqrt() * 9.0)).abs() < 1e-12);
    }
}
