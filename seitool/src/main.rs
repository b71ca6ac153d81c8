//! # seitool
//!
//! Injects and extracts SEI `user_data_unregistered` metadata in raw H.264 Annex-B files.
//!
//! ```bash
//! # Metadata on every keyframe, plus every 30th access unit
//! seitool inject -i clip.h264 --period 30 --meta '{"user":"john"}'
//!
//! # Print every record, with presentation times for a 30 fps stream
//! seitool extract -i clip.sei.h264 --fps 30
//!
//! # Access unit layout
//! seitool scan -i clip.sei.h264
//! ```

mod access_unit;
mod config;

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use common::nal_unit_types;
use memmap::Mmap;
use sei::{uuid_from_str, SeiExtractor, SeiInjector, Timing};
use tracing::{debug, info};

use crate::access_unit::{split_access_units, AccessUnit};
use crate::config::{parse_metadata, PlacementInput, SessionConfig, SessionConfigInput};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a copy of the stream with SEI metadata injected.
    Inject {
        #[arg(short, long)]
        input: PathBuf,

        /// Defaults to `<input stem>.sei.h264` next to the input.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// TOML session config; flags below override it.
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        uuid: Option<String>,

        /// Also inject on every access unit whose index is a multiple of this; 0 means keyframes
        /// only.
        #[arg(long)]
        period: Option<u64>,

        #[arg(long, value_enum)]
        placement: Option<PlacementInput>,

        /// JSON object sent with every injection; `frame` is set to the access unit index.
        #[arg(long)]
        meta: Option<String>,
    },
    /// Print every user data record in the stream.
    Extract {
        #[arg(short, long)]
        input: PathBuf,

        /// Only print records carrying this UUID.
        #[arg(long)]
        uuid: Option<String>,

        /// Frame rate used to derive presentation times from access unit indices.
        #[arg(long)]
        fps: Option<f64>,
    },
    /// Print the NAL unit types of every access unit.
    Scan {
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn map_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    if file.metadata()?.len() == 0 {
        bail!("{} is empty", path.display());
    }
    Ok(unsafe { Mmap::map(&file)? })
}

/// A stream without a single start code is rejected rather than treated as empty.
fn access_units(data: &[u8], path: &Path) -> Result<Vec<AccessUnit>> {
    let units = split_access_units(data);
    if units.is_empty() {
        bail!("{} has no Annex-B start code", path.display());
    }
    Ok(units)
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}.sei.h264"))
}

fn pts_for(au_index: usize, fps: Option<f64>) -> Option<u64> {
    fps.filter(|fps| *fps > 0.0)
        .map(|fps| (au_index as f64 * 1_000_000_000.0 / fps).round() as u64)
}

fn fmt_time(ns: Option<u64>) -> String {
    ns.map_or_else(|| "none".to_string(), |ns| ns.to_string())
}

fn inject(
    input: &Path,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    uuid: Option<String>,
    period: Option<u64>,
    placement: Option<PlacementInput>,
    meta: Option<String>,
) -> Result<()> {
    let file_input = match &config {
        Some(path) => SessionConfigInput::from_toml_str(
            &std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?,
        )?,
        None => SessionConfigInput::default(),
    };
    let flag_input = SessionConfigInput {
        uuid,
        period,
        placement,
        metadata: meta.as_deref().map(parse_metadata).transpose()?,
    };
    let session = file_input.merge(flag_input).resolve()?;
    let output = output.unwrap_or_else(|| default_output_path(input));

    info!(
        input = %input.display(),
        output = %output.display(),
        uuid = %session.uuid,
        period = session.period,
        placement = ?session.placement,
        "injecting"
    );

    let data = map_file(input)?;
    let units = access_units(&data, input)?;
    let mut out = BufWriter::new(
        File::create(&output).with_context(|| format!("creating {}", output.display()))?,
    );
    let injected = write_injected(&data, &units, &session, &mut out)?;
    out.flush()?;

    info!(access_units = units.len(), injected, "done");
    Ok(())
}

/// Copies `data` to `out` with session metadata injected into the selected access units and
/// returns how many were injected. Bytes ahead of the first access unit are copied through.
fn write_injected<W: Write>(
    data: &[u8],
    units: &[AccessUnit],
    session: &SessionConfig,
    out: &mut W,
) -> Result<usize> {
    let mut injector =
        SeiInjector::new(session.uuid, session.period).with_placement(session.placement);

    if let Some(first) = units.first() {
        out.write_all(&data[..first.range.start])?;
    }

    let mut injected = 0usize;
    for unit in units {
        let au_index = injector.au_index();
        let bytes = injector.inject_with(&data[unit.range.clone()], unit.is_keyframe, |frame| {
            let body = session.body_for(frame);
            debug!(frame, payload = %String::from_utf8_lossy(&body), "metadata");
            body
        })?;

        if let Cow::Owned(ref with_sei) = bytes {
            injected += 1;
            debug!(
                au_index,
                key = unit.is_keyframe,
                nals = ?nal_unit_types(with_sei),
                "injected"
            );
        }
        out.write_all(&bytes)?;
    }

    Ok(injected)
}

fn extract(input: &Path, uuid: Option<String>, fps: Option<f64>) -> Result<()> {
    let target = uuid
        .as_deref()
        .map(uuid_from_str)
        .transpose()
        .context("invalid target UUID")?;
    let extractor = SeiExtractor::new(target);

    let data = map_file(input)?;
    let mut found = 0usize;
    for (au_index, unit) in access_units(&data, input)?.iter().enumerate() {
        let timing = Timing {
            pts: pts_for(au_index, fps),
            dts: None,
        };
        for record in extractor.extract(&data[unit.range.clone()], timing) {
            found += 1;
            println!(
                "[SEI] au={au_index} uuid={} pts={} dts={} payload={}",
                record.uuid,
                fmt_time(record.timing.pts),
                fmt_time(record.timing.dts),
                String::from_utf8_lossy(&record.body)
            );
        }
    }

    info!(records = found, "done");
    Ok(())
}

fn scan(input: &Path) -> Result<()> {
    let data = map_file(input)?;
    for (au_index, unit) in access_units(&data, input)?.iter().enumerate() {
        println!(
            "au={au_index} key={} bytes={}..{} nals={:?}",
            unit.is_keyframe,
            unit.range.start,
            unit.range.end,
            nal_unit_types(&data[unit.range.clone()])
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let Args { command } = Args::parse();
    match command {
        Command::Inject {
            input,
            output,
            config,
            uuid,
            period,
            placement,
            meta,
        } => inject(&input, output, config, uuid, period, placement, meta),
        Command::Extract { input, uuid, fps } => extract(&input, uuid, fps),
        Command::Scan { input } => scan(&input),
    }
}
