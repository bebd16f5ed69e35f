use crate::electrode::{Electrode, ElectrodePosition, Region};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One named electrode position as the coordinate-conversion endpoint
/// returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedPosition {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl NamedPosition {
    pub fn position(&self) -> ElectrodePosition {
        ElectrodePosition::new(self.x, self.y, self.z)
    }
}

/// Montage-size → electrode list, sizes ascending. The server's ordering
/// within one size is preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MontageSet {
    pub sizes: BTreeMap<u32, Vec<NamedPosition>>,
}

impl MontageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the string-keyed payload of the coordinate-conversion
    /// endpoint. Keys that do not parse as a montage size are dropped.
    pub fn from_keyed(raw: BTreeMap<String, Vec<NamedPosition>>) -> Self {
        let mut sizes = BTreeMap::new();
        for (key, electrodes) in raw {
            if let Ok(size) = key.trim().parse::<u32>() {
                sizes.insert(size, electrodes);
            }
        }
        Self { sizes }
    }

    pub fn insert(&mut self, size: u32, electrodes: Vec<NamedPosition>) {
        self.sizes.insert(size, electrodes);
    }

    /// The smallest montage present is treated as the measured baseline.
    pub fn smallest_size(&self) -> Option<u32> {
        self.sizes.keys().next().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

/// Merge real and interpolated montages into one electrode list.
///
/// The smallest montage is emitted first with `is_original = true`; every
/// larger size (ascending) only contributes names not seen yet. Voltages
/// come from the optional name→µV map (see `frame::average_voltages`);
/// unknown names read 0.0. An empty set merges to an empty list, never an
/// error.
pub fn merge_montages(set: &MontageSet, voltages: Option<&HashMap<String, f64>>) -> Vec<Electrode> {
    let mut merged = Vec::new();
    let Some(baseline) = set.smallest_size() else {
        return merged;
    };
    let mut seen: HashSet<&str> = HashSet::new();
    for (&size, electrodes) in &set.sizes {
        let is_original = size == baseline;
        for entry in electrodes {
            if !seen.insert(entry.name.as_str()) {
                continue;
            }
            let voltage = voltages
                .and_then(|map| map.get(&entry.name))
                .copied()
                .unwrap_or(0.0);
            merged.push(Electrode {
                name: entry.name.clone(),
                position: entry.position(),
                voltage,
                is_original,
                region: Region::for_name(&entry.name),
            });
        }
    }
    merged
}

// Fallback 10-20 coordinates used when the backend has not produced
// montage positions for a patient yet.
const BASE_10_20: [(&str, [f64; 3]); 16] = [
    ("Fp1", [-0.35, 0.8, 0.15]),
    ("Fp2", [0.35, 0.8, 0.15]),
    ("F3", [-0.45, 0.7, 0.55]),
    ("F4", [0.45, 0.7, 0.55]),
    ("Fz", [0.0, 0.85, 0.6]),
    ("T7", [-0.8, 0.6, -0.1]),
    ("C3", [-0.5, 0.7, 0.35]),
    ("Cz", [0.0, 0.8, 0.4]),
    ("C4", [0.5, 0.7, 0.35]),
    ("T8", [0.8, 0.6, -0.1]),
    ("P3", [-0.45, 0.6, -0.5]),
    ("Pz", [0.0, 0.75, -0.6]),
    ("P4", [0.45, 0.6, -0.5]),
    ("O1", [-0.35, 0.5, -0.75]),
    ("Oz", [0.0, 0.6, -0.8]),
    ("O2", [0.35, 0.5, -0.75]),
];

const EXT_32: [(&str, [f64; 3]); 8] = [
    ("AF3", [-0.3, 0.75, 0.3]),
    ("AF4", [0.3, 0.75, 0.3]),
    ("FC1", [-0.35, 0.65, 0.45]),
    ("FC2", [0.35, 0.65, 0.45]),
    ("CP1", [-0.35, 0.55, -0.45]),
    ("CP2", [0.35, 0.55, -0.45]),
    ("PO3", [-0.4, 0.45, -0.6]),
    ("PO4", [0.4, 0.45, -0.6]),
];

const EXT_64: [(&str, [f64; 3]); 20] = [
    ("F5", [-0.55, 0.65, 0.5]),
    ("F6", [0.55, 0.65, 0.5]),
    ("C5", [-0.6, 0.6, 0.2]),
    ("C6", [0.6, 0.6, 0.2]),
    ("P5", [-0.5, 0.5, -0.5]),
    ("P6", [0.5, 0.5, -0.5]),
    ("F1", [-0.25, 0.75, 0.5]),
    ("F2", [0.25, 0.75, 0.5]),
    ("FC3", [-0.45, 0.6, 0.4]),
    ("FC4", [0.45, 0.6, 0.4]),
    ("CP3", [-0.4, 0.5, -0.4]),
    ("CP4", [0.4, 0.5, -0.4]),
    ("P1", [-0.25, 0.55, -0.5]),
    ("P2", [0.25, 0.55, -0.5]),
    ("PO5", [-0.3, 0.4, -0.7]),
    ("PO6", [0.3, 0.4, -0.7]),
    ("FT7", [-0.75, 0.65, 0.1]),
    ("FT8", [0.75, 0.65, 0.1]),
    ("TP7", [-0.75, 0.5, -0.3]),
    ("TP8", [0.75, 0.5, -0.3]),
];

/// Built-in 10-20 fallback table: 16 electrodes, extended at 32 and 64
/// target counts.
pub fn builtin_positions(target_count: u32) -> Vec<NamedPosition> {
    let mut out: Vec<NamedPosition> = BASE_10_20
        .iter()
        .map(|(name, [x, y, z])| NamedPosition {
            name: (*name).to_string(),
            x: *x,
            y: *y,
            z: *z,
        })
        .collect();
    if target_count >= 32 {
        out.extend(EXT_32.iter().map(|(name, [x, y, z])| NamedPosition {
            name: (*name).to_string(),
            x: *x,
            y: *y,
            z: *z,
        }));
    }
    if target_count >= 64 {
        out.extend(EXT_64.iter().map(|(name, [x, y, z])| NamedPosition {
            name: (*name).to_string(),
            x: *x,
            y: *y,
            z: *z,
        }));
    }
    out
}
