//! Linear (order 1) particle-mesh interpolation.
//!
//! Positions are in cell units of the particle's level: primal node `a`
//! sits at `a`, dual node `a` at `a + 0.5`. Each particle touches the two
//! nodes bracketing it.

use hamr_amr::FieldData;
use hamr_core::{Centering, Particle};

/// Lower node index and weight of the upper node.
pub fn weights(particle: &Particle, centering: Centering) -> (i32, f64) {
    match centering {
        Centering::Primal => (particle.i_cell, particle.delta),
        Centering::Dual => {
            if particle.delta >= 0.5 {
                (particle.i_cell, particle.delta - 0.5)
            } else {
                (particle.i_cell - 1, particle.delta + 0.5)
            }
        }
    }
}

/// Value of `field` at the particle position. Nodes outside the field's
/// allocation contribute nothing.
pub fn gather(field: &FieldData, particle: &Particle) -> f64 {
    let (lower, w) = weights(particle, field.centering());
    let lo = field.at_amr(lower).unwrap_or(0.0);
    let hi = field.at_amr(lower + 1).unwrap_or(0.0);
    (1.0 - w) * lo + w * hi
}

/// `[x, y, z]` components of a vector field at the particle position.
pub fn gather_vector(components: [&FieldData; 3], particle: &Particle) -> [f64; 3] {
    components.map(|c| gather(c, particle))
}

/// Add `value` shaped at the particle position to `field`.
pub fn scatter(field: &mut FieldData, particle: &Particle, value: f64) {
    let (lower, w) = weights(particle, field.centering());
    if let Some(i) = field.local(lower) {
        field[i] += (1.0 - w) * value;
    }
    if let Some(i) = field.local(lower + 1) {
        field[i] += w * value;
    }
}

/// Accumulate the density and flux of `particles`, each contribution
/// scaled by `factor`.
pub fn deposit<'a>(
    particles: impl IntoIterator<Item = &'a Particle>,
    density: &mut FieldData,
    flux: &mut [FieldData; 3],
    factor: f64,
) {
    for p in particles {
        let w = p.weight * factor;
        scatter(density, p, w);
        for (f, v) in flux.iter_mut().zip(p.v) {
            scatter(f, p, w * v);
        }
    }
}
