use serde::{Deserialize, Serialize};
use std::fmt;

/// 3D electrode coordinates. Stored values may be off the unit sphere;
/// only the field rasterizer normalizes them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElectrodePosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ElectrodePosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit-length copy. A zero vector passes through unchanged.
    pub fn normalized(&self) -> Self {
        let len = self.magnitude();
        if len > 0.0 {
            Self {
                x: self.x / len,
                y: self.y / len,
                z: self.z / len,
            }
        } else {
            *self
        }
    }
}

/// Scalp region derived from the 10-20 channel name prefix.
///
/// Serialized with the clinical labels the dashboard shows, accents
/// included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    Frontal,
    Central,
    #[serde(rename = "Pariétal")]
    Parietal,
    Occipital,
    Temporal,
    #[serde(rename = "Autre")]
    Other,
}

impl Region {
    /// Prefix rule, evaluated in the order the dashboard applies it:
    /// F comes before C and T, so FC/FT count as frontal and TP as
    /// temporal.
    pub fn for_name(name: &str) -> Self {
        if name.starts_with('F') || name.starts_with("AF") {
            Region::Frontal
        } else if name.starts_with('C') {
            Region::Central
        } else if name.starts_with('P') {
            Region::Parietal
        } else if name.starts_with('O') {
            Region::Occipital
        } else if name.starts_with('T') {
            Region::Temporal
        } else {
            Region::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Region::Frontal => "Frontal",
            Region::Central => "Central",
            Region::Parietal => "Pariétal",
            Region::Occipital => "Occipital",
            Region::Temporal => "Temporal",
            Region::Other => "Autre",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One electrode of a merged montage, real or interpolated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Electrode {
    pub name: String,
    pub position: ElectrodePosition,
    /// Mean absolute amplitude over the analysis window, in µV.
    pub voltage: f64,
    /// True for entries of the smallest (measured) montage.
    pub is_original: bool,
    pub region: Region,
}

/// Marker color for a single electrode: blue (240°) at 0 µV ramping to
/// red (0°) at 100 µV and above.
pub fn electrode_color(voltage: f64) -> [u8; 3] {
    let normalized = (voltage / 100.0).clamp(0.0, 1.0);
    let hue = (1.0 - normalized) * 240.0;
    crate::field::hsl_to_rgb(hue, 0.9, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_prefix_rule_matches_dashboard_order() {
        assert_eq!(Region::for_name("Fp1"), Region::Frontal);
        assert_eq!(Region::for_name("AF3"), Region::Frontal);
        // FC and FT hit the F branch before C or T can claim them.
        assert_eq!(Region::for_name("FC1"), Region::Frontal);
        assert_eq!(Region::for_name("FT7"), Region::Frontal);
        assert_eq!(Region::for_name("Cz"), Region::Central);
        assert_eq!(Region::for_name("CP3"), Region::Central);
        assert_eq!(Region::for_name("Pz"), Region::Parietal);
        assert_eq!(Region::for_name("PO4"), Region::Parietal);
        assert_eq!(Region::for_name("O1"), Region::Occipital);
        assert_eq!(Region::for_name("T7"), Region::Temporal);
        assert_eq!(Region::for_name("TP8"), Region::Temporal);
        assert_eq!(Region::for_name("X1"), Region::Other);
    }

    #[test]
    fn region_labels_keep_clinical_spelling() {
        assert_eq!(Region::Parietal.to_string(), "Pariétal");
        assert_eq!(Region::Other.to_string(), "Autre");
        let json = serde_json::to_string(&Region::Parietal).unwrap();
        assert_eq!(json, "\"Pariétal\"");
    }

    #[test]
    fn normalization_leaves_zero_vector_alone() {
        let zero = ElectrodePosition::new(0.0, 0.0, 0.0);
        assert_eq!(zero.normalized(), zero);
        let p = ElectrodePosition::new(0.0, 3.0, 4.0).normalized();
        assert!((p.magnitude() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn electrode_color_spans_blue_to_red() {
        let cold = electrode_color(0.0);
        let hot = electrode_color(150.0);
        assert!(cold[2] > cold[0], "low voltage should lean blue: {cold:?}");
        assert!(hot[0] > hot[2], "high voltage should lean red: {hot:?}");
    }
}
