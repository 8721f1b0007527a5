use std::f64::consts::PI;

use crate::Vector;

/// Sun position for a latitude, day of year and local solar hour.
///
/// Angles are in radians. Azimuth is measured from north, clockwise,
/// with north along +y and east along +x.
#[derive(Debug, Clone, Copy)]
pub struct SolarPosition {
    pub declination: f64,
    pub hour_angle: f64,
    /// Angle above the horizon.
    pub elevation: f64,
    pub azimuth: f64,
}

impl SolarPosition {
    /// Spencer (1971) declination with a 15 degree per hour hour angle.
    ///
    /// - `latitude`: degrees, positive north
    /// - `day_of_year`: 1-366
    /// - `hour`: local solar time in hours, 12 is solar noon
    pub fn at(latitude: f64, day_of_year: u16, hour: f64) -> Self {
        let lat = latitude.to_radians();
        let day_angle = 2.0 * PI * (f64::from(day_of_year) - 1.0) / 365.0;
        let declination = 0.006918 - 0.399912 * day_angle.cos() + 0.070257 * day_angle.sin()
            - 0.006758 * (2.0 * day_angle).cos()
            + 0.000907 * (2.0 * day_angle).sin()
            - 0.002697 * (3.0 * day_angle).cos()
            + 0.00148 * (3.0 * day_angle).sin();
        let hour_angle = (hour - 12.0) * 15.0_f64.to_radians();

        let sin_elev =
            lat.sin() * declination.sin() + lat.cos() * declination.cos() * hour_angle.cos();
        let elevation = sin_elev.clamp(-1.0, 1.0).asin();

        // Azimuth from the east and north components of the sun vector
        let east = -declination.cos() * hour_angle.sin();
        let north =
            declination.sin() * lat.cos() - declination.cos() * lat.sin() * hour_angle.cos();
        let azimuth = east.atan2(north).rem_euclid(2.0 * PI);

        Self {
            declination,
            hour_angle,
            elevation,
            azimuth,
        }
    }

    pub fn is_above_horizon(&self) -> bool {
        self.elevation > 0.0
    }

    /// Unit vector pointing from the ground toward the sun.
    pub fn to_sun(&self) -> Vector {
        let (sin_e, cos_e) = self.elevation.sin_cos();
        Vector::new(
            cos_e * self.azimuth.sin(),
            cos_e * self.azimuth.cos(),
            sin_e,
        )
    }

    /// Direction of light travel, or None when the sun is below the horizon.
    pub fn light_direction(&self) -> Option<Vector> {
        self.is_above_horizon().then(|| -self.to_sun())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equinox_noon_on_equator_is_overhead() {
        let pos = SolarPosition::at(0.0, 80, 12.0);
        assert!(pos.elevation.to_degrees() > 80.0);
        let dir = pos.light_direction().unwrap();
        assert!(dir.dz < -0.98);
    }

    #[test]
    fn test_winter_midnight_is_dark() {
        let pos = SolarPosition::at(45.0, 355, 0.0);
        assert!(!pos.is_above_horizon());
        assert!(pos.light_direction().is_none());
    }

    #[test]
    fn test_morning_sun_is_in_the_east() {
        // Northern mid-latitude summer morning: sun in the eastern sky
        let pos = SolarPosition::at(45.0, 172, 8.0);
        assert!(pos.is_above_horizon());
        let sun = pos.to_sun();
        assert!(sun.dx > 0.0);
        // Light travels westward and downward
        let light = pos.light_direction().unwrap();
        assert!(light.dx < 0.0 && light.dz < 0.0);
        assert!((light.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_noon_sun_is_south_in_north() {
        let pos = SolarPosition::at(50.0, 172, 12.0);
        assert!((pos.azimuth.to_degrees() - 180.0).abs() < 1e-6);
        // Summer solstice: 90 - 50 + 23.4
        assert!((pos.elevation.to_degrees() - 63.4).abs() < 0.5);
    }
}
