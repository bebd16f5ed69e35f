mod error;
mod types;

pub use error::{ApiError, Result};
pub use types::*;

use log::debug;
use reqwest::blocking::{multipart, Client, Response};
use scalpmap_lib::frame::SignalExtraction;
use scalpmap_lib::montage::MontageSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Callers wait at most this long for the numeric backend. There are no
/// retries; a failure surfaces straight to the caller.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// Montage sizes requested by default when converting a head
/// circumference into electrode coordinates.
pub const DEFAULT_MONTAGE_SIZES: [u32; 4] = [16, 32, 64, 128];

/// Explicit per-session analysis state: one patient/recording pair.
///
/// Replaces the dashboard's ambient context providers; commands receive
/// this at initialization and validation runs before any network call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub edf_filename: String,
    #[serde(default)]
    pub head_circumference_mm: Option<f64>,
}

impl Session {
    pub fn validate(&self) -> Result<()> {
        require(&self.patient_id, "patient_id")?;
        require(&self.edf_filename, "edf_filename")?;
        Ok(())
    }
}

fn require(value: &str, name: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ApiError::MissingParameter(name));
    }
    Ok(())
}

/// Blocking client for the external EEG backend. All payloads are JSON
/// over HTTP; the interpolation math itself lives server-side.
pub struct EegClient {
    base_url: String,
    http: Client,
}

impl EegClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { base_url, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Map non-2xx responses to `ApiError::Server`, preferring the
    /// backend's own `msg` field when it sends one.
    fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let msg = response
            .text()
            .ok()
            .and_then(|body| extract_server_message(&body))
            .unwrap_or_else(|| "request failed".to_string());
        Err(ApiError::Server {
            status: status.as_u16(),
            msg,
        })
    }

    /// Register an EDF recording for a patient (multipart upload).
    pub fn upload_edf(&self, patient_id: &str, file: &Path) -> Result<UploadResponse> {
        require(patient_id, "patient_id")?;
        let url = self.url(&format!("eeg/upload_edf/{patient_id}"));
        debug!("POST {url} ({})", file.display());
        let form = multipart::Form::new().file("file", file)?;
        let response = Self::check(self.http.post(&url).multipart(form).send()?)?;
        Ok(response.json()?)
    }

    /// Convert a head circumference (mm) into 10-20 electrode coordinates
    /// at the requested montage sizes.
    pub fn convert_coordinates(
        &self,
        patient_id: &str,
        head_circumference_mm: f64,
        sizes: &[u32],
    ) -> Result<MontageSet> {
        require(patient_id, "patient_id")?;
        let url = self.url(&format!("eeg/convert_coordinates/{patient_id}"));
        debug!("POST {url} circumference={head_circumference_mm}mm sizes={sizes:?}");
        let body = serde_json::json!({
            "head_circumference_mm": head_circumference_mm,
            "montage_sizes": sizes,
        });
        let response = Self::check(self.http.post(&url).json(&body).send()?)?;
        let payload: CoordinatesResponse = response.json()?;
        debug!("coordinates: {}", payload.msg);
        Ok(MontageSet::from_keyed(payload.results))
    }

    /// Fetch raw samples for a time window. The server may silently drop
    /// unavailable electrodes; the extraction payload reports them.
    pub fn extract_signals(
        &self,
        session: &Session,
        electrodes: &[String],
        tmin: f64,
        tmax: f64,
    ) -> Result<SignalExtraction> {
        session.validate()?;
        let Session {
            patient_id,
            edf_filename,
            ..
        } = session;
        // POST for multi-electrode requests, GET for a single one, as the
        // backend routes them.
        let response = if electrodes.len() > 1 {
            let url = self.url(&format!("eeg/extract_signals/{patient_id}/{edf_filename}"));
            debug!("POST {url} electrodes={} [{tmin}, {tmax}]s", electrodes.len());
            let body = serde_json::json!({
                "electrodes": electrodes,
                "tmin": tmin,
                "tmax": tmax,
            });
            self.http.post(&url).json(&body).send()?
        } else {
            let url = self.url(&format!("eeg/extract_signals/{patient_id}/{edf_filename}"));
            debug!("GET {url} [{tmin}, {tmax}]s");
            self.http
                .get(&url)
                .query(&[("tmin", tmin.to_string()), ("tmax", tmax.to_string())])
                .query(&[("electrodes", electrodes.join(","))])
                .send()?
        };
        Ok(Self::check(response)?.json()?)
    }

    /// Run a server-side interpolation from a source montage size to a
    /// target size.
    pub fn interpolate(
        &self,
        session: &Session,
        source_size: u32,
        target_size: u32,
        head_circumference_mm: f64,
        method: InterpolationMethod,
    ) -> Result<InterpolationSummary> {
        session.validate()?;
        let url = self.url(&format!(
            "eeg/{}/{}/{}/{source_size}/{target_size}",
            method.endpoint(),
            session.patient_id,
            session.edf_filename,
        ));
        debug!("GET {url} circumference={head_circumference_mm}mm");
        let response = self
            .http
            .get(&url)
            .query(&[("head_circumference_mm", head_circumference_mm.to_string())])
            .send()?;
        Ok(Self::check(response)?.json()?)
    }

    /// Enumerate the channels present in a recording.
    pub fn list_channels(&self, session: &Session) -> Result<Vec<String>> {
        session.validate()?;
        let url = self.url(&format!(
            "eeg/list_channels/{}/{}",
            session.patient_id, session.edf_filename
        ));
        debug!("GET {url}");
        let payload: ChannelList = Self::check(self.http.get(&url).send()?)?.json()?;
        Ok(payload.channels)
    }

    /// Fetch the interpolation history for a patient, normalized into
    /// `AnalysisRecord`.
    pub fn patient_analyses(&self, patient_id: &str) -> Result<Vec<AnalysisRecord>> {
        require(patient_id, "patient_id")?;
        let url = self.url(&format!("eeg/patient_analyses/{patient_id}"));
        debug!("GET {url}");
        Ok(Self::check(self.http.get(&url).send()?)?.json()?)
    }
}

fn extract_server_message(body: &str) -> Option<String> {
    let msg = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("msg")
                .and_then(|msg| msg.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());
    if msg.is_empty() {
        None
    } else {
        Some(msg)
    }
}
