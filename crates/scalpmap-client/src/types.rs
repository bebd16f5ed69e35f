use scalpmap_lib::montage::NamedPosition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Response to an EDF upload: stored filename plus recording metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    #[serde(default)]
    pub electrodes: Vec<NamedPosition>,
    pub info: RecordingInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingInfo {
    pub duration: f64,
    pub sfreq: f64,
    pub n_channels: usize,
}

/// Raw payload of the coordinate-conversion endpoint; `results` keys are
/// montage sizes as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatesResponse {
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub results: BTreeMap<String, Vec<NamedPosition>>,
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
}

/// Summary of a server-side interpolation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpolationSummary {
    pub channels: Vec<String>,
    pub signals_shape: Vec<usize>,
    pub times_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChannelList {
    #[serde(default)]
    pub channels: Vec<String>,
}

/// Server-side interpolation method, selecting the backend endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMethod {
    Knn,
    KnnSpherical,
    Idw,
}

impl InterpolationMethod {
    pub fn endpoint(&self) -> &'static str {
        match self {
            InterpolationMethod::Knn => "interpolate_knn_static",
            InterpolationMethod::KnnSpherical => "interpolate_knn_spherically",
            InterpolationMethod::Idw => "interpolate_idw_static",
        }
    }
}

/// One analysis-history entry.
///
/// The backend has emitted both snake_case and camelCase field names over
/// time; the aliases normalize that here, once, instead of at every call
/// site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "edf_filename")]
    pub filename: Option<String>,
    #[serde(default, alias = "sourceSize")]
    pub source_size: Option<u32>,
    #[serde(default, alias = "targetSize")]
    pub target_size: Option<u32>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
}

impl AnalysisRecord {
    /// Source montage size, falling back to the recorded channel count
    /// when the record predates the size fields.
    pub fn source_size_or_channels(&self) -> Option<u32> {
        self.source_size.or_else(|| {
            if self.channels.is_empty() {
                None
            } else {
                Some(self.channels.len() as u32)
            }
        })
    }

    pub fn display_filename(&self) -> &str {
        self.filename.as_deref().unwrap_or("unknown")
    }
}
