// cf-core/src/units.rs
//
// Input files carry engineering units (bar, mm, kW, kJ/kg); the solver works
// in plain SI f64. These constructors are the only place the conversion
// happens.

use uom::si::f64::{
    AvailableEnergy as UomAvailableEnergy, Length as UomLength, Power as UomPower,
    Pressure as UomPressure,
};

pub type SpecificEnergy = UomAvailableEnergy;
pub type Length = UomLength;
pub type Power = UomPower;
pub type Pressure = UomPressure;

#[inline]
pub fn bar(v: f64) -> Pressure {
    use uom::si::pressure::bar;
    Pressure::new::<bar>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn mm(v: f64) -> Length {
    use uom::si::length::millimeter;
    Length::new::<millimeter>(v)
}

#[inline]
pub fn kw(v: f64) -> Power {
    use uom::si::power::kilowatt;
    Power::new::<kilowatt>(v)
}

#[inline]
pub fn kj_per_kg(v: f64) -> SpecificEnergy {
    use uom::si::available_energy::kilojoule_per_kilogram;
    SpecificEnergy::new::<kilojoule_per_kilogram>(v)
}

pub mod constants {
    /// Standard gravity [m/s²]
    pub const G0_MPS2: f64 = 9.806_65;
    pub const P_ATM_PA: f64 = 101_325.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engineering_units_land_in_si() {
        assert!((bar(60.0).value - 6.0e6).abs() < 1e-6);
        assert!((mm(50.0).value - 0.05).abs() < 1e-15);
        assert!((m(12.5).value - 12.5).abs() < 1e-15);
        assert!((kw(500.0).value - 5.0e5).abs() < 1e-9);
        assert!((kj_per_kg(1213.0).value - 1.213e6).abs() < 1e-6);
    }
}
