//! KEY animation file command implementations

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use grim_key::KeyframeAnim;

#[derive(Subcommand)]
pub enum KeyCommands {
    /// Display information about a KEY animation file
    Info {
        /// Path to the KEY file
        file: PathBuf,

        /// Show per-track and per-marker details
        #[arg(short, long)]
        detailed: bool,
    },

    /// Validate a KEY animation file
    Validate {
        /// Path to the KEY file
        file: PathBuf,
    },

    /// Convert a KEY animation between its binary and text forms
    Convert {
        /// Input KEY file (either form)
        input: PathBuf,

        /// Output KEY file
        output: PathBuf,

        /// Output format
        #[arg(short, long, value_enum)]
        to: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Binary layout with the FYEK magic tag
    Binary,
    /// Line-oriented text form
    Text,
}

pub fn execute(cmd: KeyCommands) -> Result<()> {
    match cmd {
        KeyCommands::Info { file, detailed } => handle_info(&file, detailed),
        KeyCommands::Validate { file } => handle_validate(&file),
        KeyCommands::Convert { input, output, to } => handle_convert(&input, &output, to),
    }
}

fn load(file: &Path) -> Result<KeyframeAnim> {
    let data = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let name = file
        .file_name()
        .map_or_else(|| file.display().to_string(), |n| n.to_string_lossy().into_owned());
    KeyframeAnim::from_bytes(&name, &data)
        .with_context(|| format!("failed to parse {}", file.display()))
}

fn handle_info(file: &Path, detailed: bool) -> Result<()> {
    let anim = load(file)?;

    let track_count = anim.tracks().iter().flatten().count();
    let duration = anim.frame_count() as f32 / anim.frame_rate();

    println!("Keyframe Animation: {}", anim.name().bold());
    println!("  Flags: {:#x}", anim.flags().bits());
    println!("  Type: {:#x}", anim.anim_type());
    println!(
        "  Frames: {} ({duration:.2} s at {} fps)",
        anim.frame_count(),
        anim.frame_rate()
    );
    println!("  Joints: {}", anim.joint_count());
    println!("  Tracks: {track_count}");
    println!("  Markers: {}", anim.markers().len());
    if anim.truncated() {
        println!("  {}", "Truncated: malformed data was dropped".yellow());
    }

    if detailed {
        for marker in anim.markers() {
            println!("  Marker: frame {} -> {}", marker.frame, marker.value);
        }
        for track in anim.tracks().iter().flatten() {
            let frames = track.keyframes();
            let range = match (frames.first(), frames.last()) {
                (Some(first), Some(last)) => format!("frames {}..{}", first.frame, last.frame),
                _ => "empty".to_string(),
            };
            println!(
                "  Track {}: {} ({} keyframes, {range})",
                track.node_index(),
                track.mesh_name(),
                frames.len()
            );
        }
    }

    Ok(())
}

fn handle_validate(file: &Path) -> Result<()> {
    let anim = load(file)?;

    match anim.validate() {
        Ok(()) => {
            println!("{} {} is structurally valid", "✓".green(), file.display());
            if anim.truncated() {
                println!(
                    "{} the source stream was truncated during load",
                    "warning:".yellow()
                );
            }
            Ok(())
        }
        Err(error) => {
            println!("{} {}: {error}", "✗".red(), file.display());
            anyhow::bail!("validation failed")
        }
    }
}

fn handle_convert(input: &Path, output: &Path, to: OutputFormat) -> Result<()> {
    let anim = load(input)?;

    let mut buffer = Vec::new();
    match to {
        OutputFormat::Binary => anim.write_binary(&mut buffer)?,
        OutputFormat::Text => anim.write_text(&mut buffer)?,
    }
    fs::write(output, buffer).with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "{} wrote {} ({} tracks, {} markers)",
        "✓".green(),
        output.display(),
        anim.tracks().iter().flatten().count(),
        anim.markers().len()
    );
    Ok(())
}
