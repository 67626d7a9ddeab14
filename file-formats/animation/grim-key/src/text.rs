//! Textual KEY decoding and encoding.
//!
//! The text form is line-oriented and mirrors the binary clip shape:
//!
//! ```text
//! section: header
//! flags 104
//! type 2
//! frames 40
//! fps 15
//! joints 3
//! section: markers
//! markers 1
//! 10 501
//! section: keyframe nodes
//! nodes 1
//! node 0
//! mesh name m_hip
//! entries 2
//! 0: 0 0 1 0 0 0 90 0
//! 0 0 0 0 0 0
//! 1: 20 0 1 0 0 0 95 0
//! 0 0 0 0 0 0
//! ```
//!
//! Entry lines carry an explicit position (`N:`) and may appear out of
//! frame order; each one lands at its stated index. The markers section is
//! optional and its header is the one case-insensitive literal in the
//! grammar. Unlike the binary path, any malformed line is a hard load
//! failure.

use log::debug;
use std::io::Write;

use crate::anim::{KEY_FPS, KeyframeAnim, Marker};
use crate::builder::ClipBuilder;
use crate::error::{KeyframeError, Result};
use crate::keyframe::{Keyframe, KeyframeTrack};
use crate::math::Angle;
use crate::textsplit::TextSplitter;

/// Decode a textual KEY buffer into `builder`
pub(crate) fn decode(name: &str, text: &str, builder: &mut ClipBuilder) -> Result<()> {
    debug!("loading text keyframe animation '{name}'");

    let mut ts = TextSplitter::new(text);

    ts.expect("section: header")?;
    let mut t = ts.tokens()?;
    let flags = t.literal("flags")?.hex()?;
    let mut t = ts.tokens()?;
    let anim_type = t.literal("type")?.hex()?;
    let mut t = ts.tokens()?;
    let frame_count = t.literal("frames")?.u32()?;
    let mut t = ts.tokens()?;
    // The stored rate is scanned for well-formedness and then dropped, the
    // same as on the binary path; playback always runs at KEY_FPS.
    let _rate = t.literal("fps")?.f32()?;
    let mut t = ts.tokens()?;
    let joint_count = t.literal("joints")?.u32()?;

    builder.header(flags, anim_type, frame_count, joint_count);

    if ts.peek_is_ignore_case("section: markers") {
        let _ = ts.next_line();
        let mut t = ts.tokens()?;
        let marker_count = t.literal("markers")?.u32()?;
        for _ in 0..marker_count {
            let mut t = ts.tokens()?;
            let frame = t.f32()?;
            let value = t.i32()?;
            builder.push_marker(Marker { frame, value });
        }
    }

    ts.expect("section: keyframe nodes")?;
    let mut t = ts.tokens()?;
    let node_count = t.literal("nodes")?.u32()?;
    for _ in 0..node_count {
        let mut t = ts.tokens()?;
        let node_index = t.literal("node")?.u32()? as usize;
        let track = parse_track(&mut ts, node_index)?;
        builder.add_track(track)?;
    }

    Ok(())
}

fn parse_track(ts: &mut TextSplitter<'_>, node_index: usize) -> Result<KeyframeTrack> {
    let mut t = ts.tokens()?;
    let mesh_name = t.literal("mesh")?.literal("name")?.word()?.to_string();
    let mut t = ts.tokens()?;
    let entry_count = t.literal("entries")?.u32()? as usize;

    let mut keyframes = vec![Keyframe::default(); entry_count];
    for _ in 0..entry_count {
        let mut t = ts.tokens()?;
        let index = t.index()?;
        if index >= entry_count {
            return Err(KeyframeError::ParseAt {
                line: t.line_number(),
                message: format!("keyframe index {index} out of range ({entry_count} entries)"),
            });
        }
        let frame = t.f32()?;
        let flags = t.hex()?;
        let pos = glam::Vec3::new(t.f32()?, t.f32()?, t.f32()?);
        let pitch = Angle::from_degrees(t.f32()?);
        let yaw = Angle::from_degrees(t.f32()?);
        let roll = Angle::from_degrees(t.f32()?);

        let mut t = ts.tokens()?;
        let dpos = glam::Vec3::new(t.f32()?, t.f32()?, t.f32()?);
        let dpitch = t.f32()?;
        let dyaw = t.f32()?;
        let droll = t.f32()?;

        keyframes[index] = Keyframe {
            frame,
            flags,
            pos,
            pitch,
            yaw,
            roll,
            dpos,
            dpitch,
            dyaw,
            droll,
        };
    }

    Ok(KeyframeTrack::new(mesh_name, node_index, keyframes))
}

/// Encode `anim` in the textual KEY grammar
pub(crate) fn encode<W: Write>(anim: &KeyframeAnim, writer: &mut W) -> Result<()> {
    writeln!(writer, "section: header")?;
    writeln!(writer, "flags {:x}", anim.flags().bits())?;
    writeln!(writer, "type {:x}", anim.anim_type())?;
    writeln!(writer, "frames {}", anim.frame_count())?;
    writeln!(writer, "fps {KEY_FPS}")?;
    writeln!(writer, "joints {}", anim.joint_count())?;

    if !anim.markers().is_empty() {
        writeln!(writer, "section: markers")?;
        writeln!(writer, "markers {}", anim.markers().len())?;
        for marker in anim.markers() {
            writeln!(writer, "{} {}", marker.frame, marker.value)?;
        }
    }

    writeln!(writer, "section: keyframe nodes")?;
    let present = anim.tracks().iter().flatten().count();
    writeln!(writer, "nodes {present}")?;
    for track in anim.tracks().iter().flatten() {
        writeln!(writer, "node {}", track.node_index())?;
        writeln!(writer, "mesh name {}", track.mesh_name())?;
        writeln!(writer, "entries {}", track.keyframes().len())?;
        for (index, k) in track.keyframes().iter().enumerate() {
            writeln!(
                writer,
                "{index}: {} {:x} {} {} {} {} {} {}",
                k.frame,
                k.flags,
                k.pos.x,
                k.pos.y,
                k.pos.z,
                k.pitch.degrees(),
                k.yaw.degrees(),
                k.roll.degrees()
            )?;
            writeln!(
                writer,
                "{} {} {} {} {} {}",
                k.dpos.x, k.dpos.y, k.dpos.z, k.dpitch, k.dyaw, k.droll
            )?;
        }
    }

    Ok(())
}
