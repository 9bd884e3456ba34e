//! Physical quantities, their Yee centering and named vector fields.

use std::fmt;

use crate::Centering;

/// A scalar quantity of the hybrid and MHD models.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Quantity {
    Bx,
    By,
    Bz,
    Ex,
    Ey,
    Ez,
    Jx,
    Jy,
    Jz,
    Rho,
    Vx,
    Vy,
    Vz,
    P,
}

impl Quantity {
    /// Centering on the 1D Yee grid.
    pub fn centering(self) -> Centering {
        use Quantity::*;
        match self {
            Bx | Ey | Ez | Jy | Jz | Rho | Vx | Vy | Vz | P => Centering::Primal,
            By | Bz | Ex | Jx => Centering::Dual,
        }
    }
}

/// A vector quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VectorQuantity {
    /// Magnetic field.
    B,
    /// Electric field.
    E,
    /// Current density.
    J,
    /// Velocity or flux.
    V,
}

impl VectorQuantity {
    /// Scalar components, x first.
    pub fn components(self) -> [Quantity; 3] {
        use Quantity::*;
        match self {
            Self::B => [Bx, By, Bz],
            Self::E => [Ex, Ey, Ez],
            Self::J => [Jx, Jy, Jz],
            Self::V => [Vx, Vy, Vz],
        }
    }
}

/// A vector component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Component {
    X,
    Y,
    Z,
}

impl Component {
    /// All components in storage order.
    pub const ALL: [Component; 3] = [Component::X, Component::Y, Component::Z];

    /// Position in a `[_; 3]` array.
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        }
    }
}

/// A named vector field: `"EM_B"` with components `"EM_B_x"`,
/// `"EM_B_y"` and `"EM_B_z"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VecFieldDescriptor {
    name: String,
    quantity: VectorQuantity,
    components: [String; 3],
}

impl VecFieldDescriptor {
    /// Describe a vector field called `name`.
    pub fn new(name: impl Into<String>, quantity: VectorQuantity) -> Self {
        let name = name.into();
        let components = Component::ALL.map(|c| format!("{name}_{}", c.suffix()));
        Self {
            name,
            quantity,
            components,
        }
    }

    /// Vector field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical quantity.
    pub fn quantity(&self) -> VectorQuantity {
        self.quantity
    }

    /// Name of one component.
    pub fn component_name(&self, c: Component) -> &str {
        &self.components[c.index()]
    }

    /// `(component name, scalar quantity)` pairs, x first.
    pub fn components(&self) -> impl Iterator<Item = (&str, Quantity)> + '_ {
        self.components
            .iter()
            .map(String::as_str)
            .zip(self.quantity.components())
    }
}

impl fmt::Display for VecFieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
