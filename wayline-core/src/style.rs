//! Numeric point styling
//!
//! Only the parameters that drive a trail's look: color, alpha and pixel size.
//! How a host turns these into pixels is its own business.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::geo::lerp;

/// RGB color, serialized as `#RRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Per channel linear interpolation, rounded to the nearest integer
    pub fn lerp(&self, to: &Rgb, t: f64) -> Rgb {
        let channel = |a: u8, b: u8| lerp(a as f64, b as f64, t).round().clamp(0.0, 255.0) as u8;
        Rgb {
            r: channel(self.r, to.r),
            g: channel(self.g, to.g),
            b: channel(self.b, to.b),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("invalid color {:?}, expected #RRGGBB", s));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
        Ok(Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self {
        c.to_string()
    }
}

/// Style of one trail point as handed to the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointStyle {
    pub color: Rgb,
    /// Opacity in 0..=1
    pub alpha: f64,
    /// Diameter in pixels
    pub pixel_size: f64,
}

impl PointStyle {
    /// Same style with alpha scaled by `factor` (clamped to 0..=1)
    pub fn faded(&self, factor: f64) -> PointStyle {
        PointStyle {
            alpha: self.alpha * factor.clamp(0.0, 1.0),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let c: Rgb = "#1E90FF".parse().unwrap();
        assert_eq!(c, Rgb::new(0x1E, 0x90, 0xFF));
        assert_eq!(c.to_string(), "#1E90FF");
        assert_eq!("ffd700".parse::<Rgb>().unwrap(), Rgb::new(255, 215, 0));
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#GG0000".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let c = Rgb::new(255, 0, 128);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"#FF0080\"");
        let back: Rgb = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
        assert!(serde_json::from_str::<Rgb>("\"red\"").is_err());
    }

    #[test]
    fn test_color_lerp() {
        let black = Rgb::new(0, 0, 0);
        let white = Rgb::new(255, 255, 255);
        assert_eq!(black.lerp(&white, 0.0), black);
        assert_eq!(black.lerp(&white, 1.0), white);
        assert_eq!(black.lerp(&white, 0.5), Rgb::new(128, 128, 128));
    }

    #[test]
    fn test_faded() {
        let style = PointStyle {
            color: Rgb::new(1, 2, 3),
            alpha: 0.5,
            pixel_size: 4.0,
        };
        assert_eq!(style.faded(0.5).alpha, 0.25);
        assert_eq!(style.faded(2.0).alpha, 0.5);
        assert_eq!(style.faded(-1.0).alpha, 0.0);
    }
}
