//! Discrete field operators on the 1D Yee layout.
//!
//! Only `x` derivatives survive in 1D, so
//!
//! ```text
//! curl F = (0, -dFz/dx, dFy/dx)
//! ```
//!
//! `B` has `Bx` on nodes and `By`, `Bz` at cell centers; `E` and `J` the
//! opposite. With the shared local indexing of the layout, primal node
//! `i` sits between dual cells `i - 1` and `i`, so every derivative below
//! is a two-point difference of neighbouring local indices.
//!
//! Operators write the physical nodes of their output only. Ghost nodes
//! are the messenger's business.

use hamr_amr::FieldData;
use hamr_core::Centering;
use hamr_model::Electrons;

/// Three components of a vector field, x first.
pub type VecRef<'a> = [&'a FieldData; 3];

/// Value of `field` at local index `i` of a quantity with `centering`,
/// averaging the two neighbours when the centerings differ.
pub fn value_at(field: &FieldData, centering: Centering, i: usize) -> f64 {
    match (field.centering(), centering) {
        (Centering::Primal, Centering::Dual) => 0.5 * (field[i] + field[i + 1]),
        (Centering::Dual, Centering::Primal) => 0.5 * (field[i - 1] + field[i]),
        _ => field[i],
    }
}

fn vector_at(field: VecRef<'_>, centering: Centering, i: usize) -> [f64; 3] {
    field.map(|f| value_at(f, centering, i))
}

/// `a × b`.
pub fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// `B <- B - dt curl E`, in place on the physical cells of `By`, `Bz`.
/// `Bx` does not evolve in 1D.
pub fn faraday(e: VecRef<'_>, b: &mut [FieldData; 3], dt: f64) {
    let [_, ey, ez] = e;
    let [_, by, bz] = b;
    let factor = dt * by.layout().inverse_mesh_size();
    for i in by.physical_range() {
        by[i] += factor * (ez[i + 1] - ez[i]);
    }
    for i in bz.physical_range() {
        bz[i] -= factor * (ey[i + 1] - ey[i]);
    }
}

/// `J <- curl B` on the physical nodes of `J`.
pub fn ampere(b: VecRef<'_>, j: &mut [FieldData; 3]) {
    let [_, by, bz] = b;
    let [jx, jy, jz] = j;
    let inv_dx = jy.layout().inverse_mesh_size();
    jx.fill(0.0);
    for i in jy.physical_range() {
        jy[i] = -(bz[i] - bz[i - 1]) * inv_dx;
    }
    for i in jz.physical_range() {
        jz[i] = (by[i] - by[i - 1]) * inv_dx;
    }
}

/// Inputs of the generalized Ohm's law.
#[derive(Clone, Copy, Debug)]
pub struct OhmInputs<'a> {
    /// Total ion density.
    pub density: &'a FieldData,
    /// Ion bulk velocity.
    pub bulk_velocity: VecRef<'a>,
    /// Magnetic field.
    pub magnetic: VecRef<'a>,
    /// Current density.
    pub current: VecRef<'a>,
    /// Electron closure.
    pub electrons: &'a Electrons,
    /// Resistivity.
    pub resistivity: f64,
}

impl OhmInputs<'_> {
    /// `E` at local index `i` of a quantity with `centering`:
    ///
    /// ```text
    /// E = -Ve × B - grad(Pe) / n + eta J,   Ve = Vi - J / n
    /// ```
    ///
    /// Where no ion is present only the resistive term is kept.
    fn electric(&self, centering: Centering, i: usize) -> [f64; 3] {
        let n = value_at(self.density, centering, i);
        let j = vector_at(self.current, centering, i);
        let resistive = j.map(|c| self.resistivity * c);
        if n <= 0.0 {
            return resistive;
        }
        let vi = vector_at(self.bulk_velocity, centering, i);
        let b = vector_at(self.magnetic, centering, i);
        let ve = [0, 1, 2].map(|c| vi[c] - j[c] / n);
        let motional = cross(ve, b);
        let grad_pe = match centering {
            // Pe on nodes i and i+1 brackets cell i
            Centering::Dual => {
                let pe = |k: usize| self.electrons.pressure(self.density[k]);
                (pe(i + 1) - pe(i)) * self.density.layout().inverse_mesh_size()
            }
            Centering::Primal => 0.0,
        };
        [
            -motional[0] - grad_pe / n + resistive[0],
            -motional[1] + resistive[1],
            -motional[2] + resistive[2],
        ]
    }
}

/// Generalized Ohm's law on the physical nodes of `e`.
pub fn ohm(inputs: &OhmInputs<'_>, e: &mut [FieldData; 3]) {
    for (c, component) in e.iter_mut().enumerate() {
        let centering = component.centering();
        for i in component.physical_range() {
            component[i] = inputs.electric(centering, i)[c];
        }
    }
}

/// Ideal MHD electric field `E = -V × B` on the physical nodes of `e`.
pub fn ideal_electric(velocity: VecRef<'_>, b: VecRef<'_>, e: &mut [FieldData; 3]) {
    for (c, component) in e.iter_mut().enumerate() {
        let centering = component.centering();
        for i in component.physical_range() {
            let v = vector_at(velocity, centering, i);
            let bi = vector_at(b, centering, i);
            component[i] = -cross(v, bi)[c];
        }
    }
}

/// `out <- (a + b) / 2` on every node, ghosts included.
pub fn average(a: VecRef<'_>, b: VecRef<'_>, out: &mut [FieldData; 3]) {
    for ((out, a), b) in out.iter_mut().zip(a).zip(b) {
        for ((o, x), y) in out.values_mut().iter_mut().zip(a.values()).zip(b.values()) {
            *o = 0.5 * (x + y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamr_core::{AmrBox, GridLayout, Quantity};
    use proptest::prelude::*;

    const DX: f64 = 0.1;

    fn layout() -> GridLayout {
        GridLayout::new(AmrBox::new(0, 9), DX, 0.0)
    }

    fn field(quantity: Quantity, f: impl Fn(f64) -> f64) -> FieldData {
        let mut data = FieldData::new(quantity, layout(), 0.0);
        data.fill_with(f);
        data
    }

    fn b_field(f: impl Fn(f64) -> f64 + Copy) -> [FieldData; 3] {
        [
            field(Quantity::Bx, f),
            field(Quantity::By, f),
            field(Quantity::Bz, f),
        ]
    }

    fn e_field(f: impl Fn(f64) -> f64 + Copy) -> [FieldData; 3] {
        [
            field(Quantity::Ex, f),
            field(Quantity::Ey, f),
            field(Quantity::Ez, f),
        ]
    }

    fn refs(v: &[FieldData; 3]) -> VecRef<'_> {
        [&v[0], &v[1], &v[2]]
    }

    #[test]
    fn centering_conversion_averages_neighbours() {
        let ey = field(Quantity::Ey, |x| x);
        // dual cell 3 (local) sits halfway between nodes 3 and 4
        let expected = layout().coordinate(Centering::Dual, 3);
        assert!((value_at(&ey, Centering::Dual, 3) - expected).abs() < 1e-14);
        let by = field(Quantity::By, |x| x);
        let expected = layout().coordinate(Centering::Primal, 3);
        assert!((value_at(&by, Centering::Primal, 3) - expected).abs() < 1e-14);
    }

    #[test]
    fn ampere_of_linear_field_is_its_slope() {
        let b = b_field(|x| 2.0 * x + 1.0);
        let mut j = e_field(|_| 7.0);
        ampere(refs(&b), &mut j);
        for i in j[1].physical_range() {
            assert!((j[1][i] + 2.0).abs() < 1e-10);
            assert!((j[2][i] - 2.0).abs() < 1e-10);
        }
        assert!(j[0].values().iter().all(|&v| v == 0.0));
        // ghosts untouched
        assert_eq!(j[1][0], 7.0);
    }

    #[test]
    fn faraday_with_uniform_e_leaves_b_unchanged() {
        let e = e_field(|_| 3.0);
        let mut b = b_field(|x| x * x);
        let before = b.clone();
        faraday(refs(&e), &mut b, 0.01);
        assert_eq!(b, before);
    }

    #[test]
    fn faraday_rotates_by_and_bz_with_opposite_signs() {
        let e = e_field(|x| x);
        let mut b = b_field(|_| 0.0);
        faraday(refs(&e), &mut b, 0.5);
        let i = *b[1].physical_range().start();
        assert!((b[1][i] - 0.5).abs() < 1e-12);
        assert!((b[2][i] + 0.5).abs() < 1e-12);
        assert_eq!(b[0][i], 0.0);
    }

    #[test]
    fn ohm_of_plasma_at_rest_is_pressure_gradient() {
        let n = field(Quantity::Rho, |x| 1.0 + x);
        let zero = e_field(|_| 0.0);
        let v = [
            field(Quantity::Vx, |_| 0.0),
            field(Quantity::Vy, |_| 0.0),
            field(Quantity::Vz, |_| 0.0),
        ];
        let b = b_field(|_| 1.0);
        let electrons = Electrons::isothermal(0.5);
        let inputs = OhmInputs {
            density: &n,
            bulk_velocity: refs(&v),
            magnetic: refs(&b),
            current: refs(&zero),
            electrons: &electrons,
            resistivity: 0.0,
        };
        let mut e = e_field(|_| 0.0);
        ohm(&inputs, &mut e);
        for i in e[0].physical_range() {
            let nx = value_at(&n, Centering::Dual, i);
            assert!((e[0][i] + 0.5 / nx).abs() < 1e-10);
        }
        for i in e[1].physical_range() {
            assert_eq!(e[1][i], 0.0);
            assert_eq!(e[2][i], 0.0);
        }
    }

    #[test]
    fn ohm_without_ions_keeps_the_resistive_term() {
        let n = field(Quantity::Rho, |_| 0.0);
        let j = e_field(|_| 2.0);
        let v = [
            field(Quantity::Vx, |_| 1.0),
            field(Quantity::Vy, |_| 1.0),
            field(Quantity::Vz, |_| 1.0),
        ];
        let b = b_field(|_| 1.0);
        let electrons = Electrons::isothermal(1.0);
        let inputs = OhmInputs {
            density: &n,
            bulk_velocity: refs(&v),
            magnetic: refs(&b),
            current: refs(&j),
            electrons: &electrons,
            resistivity: 0.25,
        };
        let mut e = e_field(|_| 0.0);
        ohm(&inputs, &mut e);
        let i = *e[1].physical_range().start();
        assert_eq!(e[1][i], 0.5);
    }

    #[test]
    fn ideal_field_is_minus_v_cross_b() {
        let v = [
            field(Quantity::Vx, |_| 0.0),
            field(Quantity::Vy, |_| 2.0),
            field(Quantity::Vz, |_| 0.0),
        ];
        let b = [
            field(Quantity::Bx, |_| 1.0),
            field(Quantity::By, |_| 0.0),
            field(Quantity::Bz, |_| 0.0),
        ];
        let mut e = e_field(|_| 9.0);
        ideal_electric(refs(&v), refs(&b), &mut e);
        let i = *e[2].physical_range().start();
        // -(Vy Bx) on z
        assert_eq!(e[2][i], 2.0);
        assert_eq!(e[1][i], 0.0);
    }

    proptest! {
        #[test]
        fn average_lies_between_its_inputs(a in -10.0f64..10.0, b in -10.0f64..10.0) {
            let fa = e_field(move |_| a);
            let fb = e_field(move |_| b);
            let mut out = e_field(|_| 0.0);
            average(refs(&fa), refs(&fb), &mut out);
            let lo = a.min(b) - 1e-12;
            let hi = a.max(b) + 1e-12;
            for c in &out {
                prop_assert!(c.values().iter().all(|v| (lo..=hi).contains(v)));
            }
        }

        #[test]
        fn curl_of_a_gradient_free_b_is_zero(c in -5.0f64..5.0) {
            let b = b_field(move |_| c);
            let mut j = e_field(|_| 1.0);
            ampere(refs(&b), &mut j);
            for i in j[1].physical_range() {
                prop_assert!(j[1][i].abs() < 1e-12 && j[2][i].abs() < 1e-12);
            }
        }
    }
}
