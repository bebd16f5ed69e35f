use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Presentational amplitude floor in µV: flat-looking traces are scaled
/// up until their largest peak-to-peak amplitude reaches this.
pub const DISPLAY_AMPLITUDE_FLOOR: f64 = 50.0;

const DEFAULT_DURATION_S: f64 = 300.0;

/// Raw payload of the signal-extraction endpoint. `electrodes` and
/// `signals` are parallel arrays; the server drops unavailable channels
/// and lists them in `missing_electrodes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalExtraction {
    #[serde(default)]
    pub times: Vec<f64>,
    #[serde(default)]
    pub signals: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub electrodes: Option<Vec<String>>,
    #[serde(default)]
    pub missing_electrodes: Vec<String>,
    pub sampling_rate: f64,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Name-keyed per-channel samples over a shared time base.
///
/// Invariant: every sample vector has exactly `timestamps.len()` entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalFrame {
    pub timestamps: Vec<f64>,
    pub signals: BTreeMap<String, Vec<f64>>,
    pub sampling_rate: f64,
    pub duration: f64,
}

#[derive(Debug, Clone)]
pub struct FrameResult {
    pub frame: SignalFrame,
    /// Channels the server reported as requested-but-absent. Advisory;
    /// a partially served request is still a success.
    pub missing_electrodes: Vec<String>,
}

/// Reconstruct a name-keyed frame from the extraction payload's parallel
/// arrays.
///
/// Only channels named in `electrodes` get an entry; nothing is
/// fabricated for missing ones. Sample rows shorter than the time base
/// are zero-padded and longer rows truncated, so the frame invariant
/// holds at the boundary. Fails only when the payload carries neither
/// electrode names nor signals.
pub fn build_frame(extraction: SignalExtraction) -> Result<FrameResult> {
    let SignalExtraction {
        times,
        signals,
        electrodes,
        missing_electrodes,
        sampling_rate,
        duration,
    } = extraction;
    if electrodes.is_none() && signals.is_none() {
        bail!("extraction response carries neither electrode names nor signals");
    }
    let electrodes = electrodes.unwrap_or_default();
    let rows = signals.unwrap_or_default();
    let mut map = BTreeMap::new();
    for (name, mut samples) in electrodes.into_iter().zip(rows) {
        samples.resize(times.len(), 0.0);
        map.insert(name, samples);
    }
    let frame = SignalFrame {
        timestamps: times,
        signals: map,
        sampling_rate,
        duration: duration.unwrap_or(DEFAULT_DURATION_S),
    };
    Ok(FrameResult {
        frame,
        missing_electrodes,
    })
}

/// Presentational scale factor: if the largest peak-to-peak amplitude
/// across channels is under the floor, return the factor that stretches
/// it to the floor, else 1.0. Never applied to the stored frame.
pub fn display_scale(frame: &SignalFrame) -> f64 {
    let mut max_amplitude = 0.0f64;
    for samples in frame.signals.values() {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &value in samples {
            min = min.min(value);
            max = max.max(value);
        }
        if max > min {
            max_amplitude = max_amplitude.max(max - min);
        }
    }
    if max_amplitude > 0.0 && max_amplitude < DISPLAY_AMPLITUDE_FLOOR {
        DISPLAY_AMPLITUDE_FLOOR / max_amplitude
    } else {
        1.0
    }
}

/// Mean absolute amplitude per channel, in µV. Feeds the merger's
/// voltage map; channels with no samples read 0.0.
pub fn average_voltages(frame: &SignalFrame) -> HashMap<String, f64> {
    let mut averages = HashMap::new();
    for (name, samples) in &frame.signals {
        let mean = if samples.is_empty() {
            0.0
        } else {
            samples.iter().map(|v| v.abs()).sum::<f64>() / samples.len() as f64
        };
        averages.insert(name.clone(), mean);
    }
    averages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extraction() -> SignalExtraction {
        SignalExtraction {
            times: vec![0.0, 0.004, 0.008, 0.012],
            signals: Some(vec![vec![1.0, -2.0, 3.0, -4.0], vec![5.0, 6.0]]),
            electrodes: Some(vec!["Fp1".to_string(), "O1".to_string()]),
            missing_electrodes: vec!["T7".to_string()],
            sampling_rate: 250.0,
            duration: Some(60.0),
        }
    }

    #[test]
    fn every_channel_matches_the_time_base() {
        let result = build_frame(extraction()).unwrap();
        for samples in result.frame.signals.values() {
            assert_eq!(samples.len(), result.frame.timestamps.len());
        }
        // The short row was zero-padded, not dropped.
        assert_eq!(result.frame.signals["O1"], vec![5.0, 6.0, 0.0, 0.0]);
    }

    #[test]
    fn missing_electrodes_are_advisory_not_an_error() {
        let result = build_frame(extraction()).unwrap();
        assert_eq!(result.missing_electrodes, ["T7"]);
        assert!(!result.frame.signals.contains_key("T7"));
    }

    #[test]
    fn fails_when_names_and_signals_are_both_absent() {
        let payload = SignalExtraction {
            times: vec![],
            signals: None,
            electrodes: None,
            missing_electrodes: vec![],
            sampling_rate: 250.0,
            duration: None,
        };
        assert!(build_frame(payload).is_err());
    }

    #[test]
    fn duration_defaults_when_the_server_omits_it() {
        let mut payload = extraction();
        payload.duration = None;
        let result = build_frame(payload).unwrap();
        assert_eq!(result.frame.duration, DEFAULT_DURATION_S);
    }

    #[test]
    fn scale_floor_stretches_flat_traces() {
        let result = build_frame(extraction()).unwrap();
        // Largest peak-to-peak is Fp1: 3 - (-4) = 7 µV, under the floor.
        let scale = display_scale(&result.frame);
        assert!((scale - DISPLAY_AMPLITUDE_FLOOR / 7.0).abs() < 1e-12);
    }

    #[test]
    fn scale_is_identity_for_full_amplitude() {
        let mut payload = extraction();
        payload.signals = Some(vec![vec![-40.0, 40.0, 0.0, 0.0]]);
        payload.electrodes = Some(vec!["Cz".to_string()]);
        let result = build_frame(payload).unwrap();
        assert_eq!(display_scale(&result.frame), 1.0);
    }

    #[test]
    fn average_voltages_use_mean_absolute_amplitude() {
        let result = build_frame(extraction()).unwrap();
        let averages = average_voltages(&result.frame);
        assert!((averages["Fp1"] - 2.5).abs() < 1e-12);
        assert!((averages["O1"] - 11.0 / 4.0).abs() < 1e-12);
    }
}
