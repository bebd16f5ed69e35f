use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::warn;
use plotters::prelude::*;
use scalpmap_client::{
    EegClient, InterpolationMethod, Session, DEFAULT_BASE_URL, DEFAULT_MONTAGE_SIZES,
};
use scalpmap_lib::{
    electrode::Electrode,
    export,
    field::{rasterize_voltage_field, Raster, VoltageSample, DEFAULT_FIELD_SIZE},
    frame::{build_frame, display_scale, SignalExtraction, SignalFrame},
    montage::{builtin_positions, merge_montages, MontageSet, NamedPosition},
};
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "scalpmap",
    version,
    about = "scalpmap: EEG montage reconciliation and voltage-field tools"
)]
struct Cli {
    /// Base URL of the EEG backend
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MethodArg {
    #[value(name = "knn")]
    Knn,
    #[value(name = "knn-spherical")]
    KnnSpherical,
    #[value(name = "idw")]
    Idw,
}

impl From<MethodArg> for InterpolationMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::Knn => InterpolationMethod::Knn,
            MethodArg::KnnSpherical => InterpolationMethod::KnnSpherical,
            MethodArg::Idw => InterpolationMethod::Idw,
        }
    }
}

/// Session state for online commands: a TOML file, flags, or both (flags
/// win).
#[derive(Args, Debug, Clone)]
struct SessionArgs {
    /// TOML file with patient_id / edf_filename / head_circumference_mm
    #[arg(long)]
    session: Option<PathBuf>,
    #[arg(long)]
    patient_id: Option<String>,
    #[arg(long)]
    edf_filename: Option<String>,
    #[arg(long)]
    head_circumference_mm: Option<f64>,
}

impl SessionArgs {
    fn resolve(&self) -> Result<Session> {
        let mut session: Session = match &self.session {
            Some(path) => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("reading session {}", path.display()))?;
                toml::from_str(&contents)
                    .with_context(|| format!("parsing session {}", path.display()))?
            }
            None => Session::default(),
        };
        if let Some(patient_id) = &self.patient_id {
            session.patient_id = patient_id.clone();
        }
        if let Some(edf_filename) = &self.edf_filename {
            session.edf_filename = edf_filename.clone();
        }
        if let Some(mm) = self.head_circumference_mm {
            session.head_circumference_mm = Some(mm);
        }
        Ok(session)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the built-in 10-20 fallback montage as JSON
    BuiltinMontage {
        /// Target electrode count (16, 32 or 64)
        #[arg(long, default_value_t = 16)]
        count: u32,
    },
    /// Merge real and interpolated montages into one electrode list
    MergeMontages {
        /// JSON file mapping montage size to electrode positions
        #[arg(long)]
        input: PathBuf,
        /// Optional JSON map of electrode name to average voltage (µV)
        #[arg(long)]
        voltages: Option<PathBuf>,
    },
    /// Rebuild a name-keyed signal frame from an extraction payload
    BuildFrame {
        /// JSON file with the extraction response
        #[arg(long)]
        input: PathBuf,
    },
    /// Render a voltage heatmap PNG from a merged electrode list
    RenderField {
        /// JSON file with merged electrodes
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = DEFAULT_FIELD_SIZE)]
        width: u32,
        #[arg(long, default_value_t = DEFAULT_FIELD_SIZE)]
        height: u32,
    },
    /// Export a merged electrode list as a summary CSV
    ExportSummary {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Export a signal frame as TSV (time column + one column per channel)
    ExportFrame {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Upload an EDF recording for a patient
    Upload {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long)]
        file: PathBuf,
    },
    /// Convert a head circumference into montage coordinates
    ConvertCoordinates {
        #[command(flatten)]
        session: SessionArgs,
        /// Montage sizes to request
        #[arg(long, value_delimiter = ',')]
        sizes: Vec<u32>,
    },
    /// Extract raw signals for a time window
    ExtractSignals {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long, value_delimiter = ',')]
        electrodes: Vec<String>,
        #[arg(long, default_value_t = 0.0)]
        tmin: f64,
        #[arg(long, default_value_t = 60.0)]
        tmax: f64,
    },
    /// Run a server-side interpolation between montage sizes
    Interpolate {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long)]
        source: u32,
        #[arg(long)]
        target: u32,
        #[arg(long, default_value = "knn")]
        method: MethodArg,
    },
    /// List the channels present in a recording
    ListChannels {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Show the interpolation history for a patient
    History {
        #[arg(long)]
        patient_id: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::BuiltinMontage { count } => cmd_builtin_montage(count)?,
        Commands::MergeMontages { input, voltages } => {
            cmd_merge_montages(&input, voltages.as_deref())?
        }
        Commands::BuildFrame { input } => cmd_build_frame(&input)?,
        Commands::RenderField {
            input,
            out,
            width,
            height,
        } => cmd_render_field(&input, &out, width, height)?,
        Commands::ExportSummary { input, out } => cmd_export_summary(&input, &out)?,
        Commands::ExportFrame { input, out } => cmd_export_frame(&input, &out)?,
        Commands::Upload { session, file } => cmd_upload(&cli.base_url, &session, &file)?,
        Commands::ConvertCoordinates { session, sizes } => {
            cmd_convert_coordinates(&cli.base_url, &session, &sizes)?
        }
        Commands::ExtractSignals {
            session,
            electrodes,
            tmin,
            tmax,
        } => cmd_extract_signals(&cli.base_url, &session, &electrodes, tmin, tmax)?,
        Commands::Interpolate {
            session,
            source,
            target,
            method,
        } => cmd_interpolate(&cli.base_url, &session, source, target, method.into())?,
        Commands::ListChannels { session } => cmd_list_channels(&cli.base_url, &session)?,
        Commands::History { patient_id } => cmd_history(&cli.base_url, &patient_id)?,
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

fn cmd_builtin_montage(count: u32) -> Result<()> {
    let positions = builtin_positions(count);
    println!("{}", serde_json::to_string(&positions)?);
    Ok(())
}

fn cmd_merge_montages(input: &Path, voltages: Option<&Path>) -> Result<()> {
    let keyed: BTreeMap<String, Vec<NamedPosition>> = read_json(input)?;
    let set = MontageSet::from_keyed(keyed);
    let voltages: Option<HashMap<String, f64>> = match voltages {
        Some(path) => Some(read_json(path)?),
        None => None,
    };
    let merged = merge_montages(&set, voltages.as_ref());
    println!("{}", serde_json::to_string(&merged)?);
    Ok(())
}

#[derive(Serialize)]
struct FrameOutput {
    frame: SignalFrame,
    display_scale: f64,
    missing_electrodes: Vec<String>,
}

fn cmd_build_frame(input: &Path) -> Result<()> {
    let extraction: SignalExtraction = read_json(input)?;
    let result = build_frame(extraction)?;
    for name in &result.missing_electrodes {
        warn!("requested electrode {name} is absent from the recording");
    }
    let output = FrameOutput {
        display_scale: display_scale(&result.frame),
        frame: result.frame,
        missing_electrodes: result.missing_electrodes,
    };
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn cmd_render_field(input: &Path, out: &Path, width: u32, height: u32) -> Result<()> {
    let electrodes: Vec<Electrode> = read_json(input)?;
    let samples: Vec<VoltageSample> = electrodes
        .iter()
        .map(|electrode| VoltageSample {
            position: electrode.position,
            voltage: electrode.voltage,
        })
        .collect();
    let raster = rasterize_voltage_field(&samples, width, height);
    write_raster_png(out, &raster)?;
    println!(
        "{}",
        serde_json::to_string(&serde_json::json!({
            "out": out,
            "width": width,
            "height": height,
            "electrodes": electrodes.len(),
        }))?
    );
    Ok(())
}

/// Composite the RGBA raster over a white page; PNG output carries no
/// alpha channel.
fn write_raster_png(path: &Path, raster: &Raster) -> Result<()> {
    let root = BitMapBackend::new(path, (raster.width, raster.height)).into_drawing_area();
    root.fill(&WHITE)?;
    for y in 0..raster.height {
        for x in 0..raster.width {
            let [r, g, b, a] = raster.pixel(x, y);
            if a == 0 {
                continue;
            }
            root.draw_pixel((x as i32, y as i32), &RGBAColor(r, g, b, a as f64 / 255.0))?;
        }
    }
    root.present()?;
    Ok(())
}

fn cmd_export_summary(input: &Path, out: &Path) -> Result<()> {
    let electrodes: Vec<Electrode> = read_json(input)?;
    export::write_electrode_summary(out, &electrodes)?;
    println!(
        "{}",
        serde_json::to_string(&serde_json::json!({
            "out": out,
            "electrodes": electrodes.len(),
        }))?
    );
    Ok(())
}

fn cmd_export_frame(input: &Path, out: &Path) -> Result<()> {
    let frame: SignalFrame = read_json(input)?;
    export::write_frame_tsv(out, &frame)?;
    println!(
        "{}",
        serde_json::to_string(&serde_json::json!({
            "out": out,
            "channels": frame.signals.len(),
            "samples": frame.timestamps.len(),
        }))?
    );
    Ok(())
}

fn cmd_upload(base_url: &str, args: &SessionArgs, file: &Path) -> Result<()> {
    let session = args.resolve()?;
    let client = EegClient::new(base_url)?;
    let response = client.upload_edf(&session.patient_id, file)?;
    println!(
        "{}",
        serde_json::to_string(&serde_json::json!({
            "filename": response.filename,
            "duration": response.info.duration,
            "sampling_rate": response.info.sfreq,
            "n_channels": response.info.n_channels,
        }))?
    );
    Ok(())
}

fn cmd_convert_coordinates(base_url: &str, args: &SessionArgs, sizes: &[u32]) -> Result<()> {
    let session = args.resolve()?;
    let circumference = session
        .head_circumference_mm
        .context("head circumference is required to convert coordinates")?;
    let sizes: Vec<u32> = if sizes.is_empty() {
        DEFAULT_MONTAGE_SIZES.to_vec()
    } else {
        sizes.to_vec()
    };
    let client = EegClient::new(base_url)?;
    let montages = client.convert_coordinates(&session.patient_id, circumference, &sizes)?;
    println!("{}", serde_json::to_string(&montages)?);
    Ok(())
}

fn cmd_extract_signals(
    base_url: &str,
    args: &SessionArgs,
    electrodes: &[String],
    tmin: f64,
    tmax: f64,
) -> Result<()> {
    let session = args.resolve()?;
    let client = EegClient::new(base_url)?;
    let extraction = client.extract_signals(&session, electrodes, tmin, tmax)?;
    let result = build_frame(extraction)?;
    for name in &result.missing_electrodes {
        warn!("requested electrode {name} is absent from the recording");
    }
    let output = FrameOutput {
        display_scale: display_scale(&result.frame),
        frame: result.frame,
        missing_electrodes: result.missing_electrodes,
    };
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn cmd_interpolate(
    base_url: &str,
    args: &SessionArgs,
    source: u32,
    target: u32,
    method: InterpolationMethod,
) -> Result<()> {
    let session = args.resolve()?;
    let circumference = session
        .head_circumference_mm
        .context("head circumference is required to interpolate")?;
    let client = EegClient::new(base_url)?;
    let summary = client.interpolate(&session, source, target, circumference, method)?;
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn cmd_list_channels(base_url: &str, args: &SessionArgs) -> Result<()> {
    let session = args.resolve()?;
    let client = EegClient::new(base_url)?;
    let channels = client.list_channels(&session)?;
    println!("{}", serde_json::to_string(&channels)?);
    Ok(())
}

fn cmd_history(base_url: &str, patient_id: &str) -> Result<()> {
    let client = EegClient::new(base_url)?;
    let records = client.patient_analyses(patient_id)?;
    println!("{}", serde_json::to_string(&records)?);
    Ok(())
}
