use glam::Vec3;
use std::io::{Read, Write};

use crate::error::Result;
use crate::io_ext::{ReadExt, WriteExt};
use crate::math::Angle;

/// One timestamped pose sample on a track.
///
/// Binary layout (56 bytes, all little-endian):
/// - frame: f32
/// - flags: u32
/// - position: 3 × f32
/// - pitch/yaw/roll: 3 × f32 (degrees)
/// - position delta: 3 × f32 (units per frame)
/// - pitch/yaw/roll delta: 3 × f32 (degrees per frame)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Keyframe {
    /// Frame number this sample takes effect at
    pub frame: f32,
    /// Per-sample flag word, carried through but not interpreted
    pub flags: u32,
    /// Absolute position of the node at this frame
    pub pos: Vec3,
    /// Absolute pitch at this frame
    pub pitch: Angle,
    /// Absolute yaw at this frame
    pub yaw: Angle,
    /// Absolute roll at this frame
    pub roll: Angle,
    /// Position change per frame, used for extrapolation past this sample
    pub dpos: Vec3,
    /// Pitch change per frame
    pub dpitch: f32,
    /// Yaw change per frame
    pub dyaw: f32,
    /// Roll change per frame
    pub droll: f32,
}

impl Keyframe {
    /// Parse one keyframe from a reader
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let frame = reader.read_f32_le()?;
        let flags = reader.read_u32_le()?;
        let pos = read_vec3(reader)?;
        let pitch = Angle::from_degrees(reader.read_f32_le()?);
        let yaw = Angle::from_degrees(reader.read_f32_le()?);
        let roll = Angle::from_degrees(reader.read_f32_le()?);
        let dpos = read_vec3(reader)?;
        let dpitch = reader.read_f32_le()?;
        let dyaw = reader.read_f32_le()?;
        let droll = reader.read_f32_le()?;

        Ok(Self {
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
        })
    }

    /// Write one keyframe to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_f32_le(self.frame)?;
        writer.write_u32_le(self.flags)?;
        write_vec3(writer, self.pos)?;
        writer.write_f32_le(self.pitch.degrees())?;
        writer.write_f32_le(self.yaw.degrees())?;
        writer.write_f32_le(self.roll.degrees())?;
        write_vec3(writer, self.dpos)?;
        writer.write_f32_le(self.dpitch)?;
        writer.write_f32_le(self.dyaw)?;
        writer.write_f32_le(self.droll)?;
        Ok(())
    }

    /// Returns the size of a keyframe in bytes (always 56)
    pub const fn size() -> usize {
        56
    }
}

fn read_vec3<R: Read>(reader: &mut R) -> Result<Vec3> {
    let x = reader.read_f32_le()?;
    let y = reader.read_f32_le()?;
    let z = reader.read_f32_le()?;
    Ok(Vec3::new(x, y, z))
}

fn write_vec3<W: Write>(writer: &mut W, v: Vec3) -> Result<()> {
    writer.write_f32_le(v.x)?;
    writer.write_f32_le(v.y)?;
    writer.write_f32_le(v.z)?;
    Ok(())
}

/// An absolute pose produced by sampling a track
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    pub pos: Vec3,
    pub pitch: Angle,
    pub yaw: Angle,
    pub roll: Angle,
}

/// The ordered keyframe sequence animating a single skeleton node.
///
/// Keyframes are held in non-decreasing `frame` order; lookups rely on it.
#[derive(Debug, Clone)]
pub struct KeyframeTrack {
    mesh_name: String,
    node_index: usize,
    keyframes: Vec<Keyframe>,
}

impl KeyframeTrack {
    pub fn new(mesh_name: String, node_index: usize, keyframes: Vec<Keyframe>) -> Self {
        Self {
            mesh_name,
            node_index,
            keyframes,
        }
    }

    /// Mesh name recorded for this track
    pub fn mesh_name(&self) -> &str {
        &self.mesh_name
    }

    /// Index of the skeleton node this track animates
    pub fn node_index(&self) -> usize {
        self.node_index
    }

    /// The keyframes, in frame order
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Index of the nearest keyframe at or before `frame`.
    ///
    /// Returns the greatest `low` with `keyframes[low].frame <= frame`, or
    /// index 0 if `frame` precedes every sample, or `None` on an empty
    /// track. For any non-empty track the result satisfies
    /// `keyframes[low].frame <= frame < keyframes[low + 1].frame` whenever
    /// a successor exists.
    pub fn nearest_index(&self, frame: f32) -> Option<usize> {
        if self.keyframes.is_empty() {
            return None;
        }
        let upper = self.keyframes.partition_point(|k| k.frame <= frame);
        Some(upper.saturating_sub(1))
    }

    /// Sample an absolute pose at `frame`.
    ///
    /// The base pose is the nearest previous keyframe. With `use_delta` the
    /// stored per-frame rates are scaled by the distance from that keyframe
    /// and added on, extrapolating between (and past) samples.
    ///
    /// Linearly advancing pitch/yaw/roll does not move between two
    /// orientations along the shortest arc, so in-between poses are only an
    /// approximation; source data keeps adjacent samples close enough that
    /// this holds up on screen.
    pub fn sample(&self, frame: f32, use_delta: bool) -> Option<Pose> {
        let low = self.nearest_index(frame)?;
        let key = &self.keyframes[low];
        let dt = frame - key.frame;

        let mut pose = Pose {
            pos: key.pos,
            pitch: key.pitch,
            yaw: key.yaw,
            roll: key.roll,
        };

        if use_delta {
            pose.pos += key.dpos * dt;
            pose.pitch += Angle::from_degrees(dt * key.dpitch);
            pose.yaw += Angle::from_degrees(dt * key.dyaw);
            pose.roll += Angle::from_degrees(dt * key.droll);
        }

        Some(pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn key(frame: f32) -> Keyframe {
        Keyframe {
            frame,
            ..Keyframe::default()
        }
    }

    fn track(frames: &[f32]) -> KeyframeTrack {
        KeyframeTrack::new(
            "m_test".to_string(),
            0,
            frames.iter().copied().map(key).collect(),
        )
    }

    #[test]
    fn test_keyframe_size() {
        assert_eq!(Keyframe::size(), 56);
    }

    #[test]
    fn test_keyframe_parse_write_roundtrip() {
        let original = Keyframe {
            frame: 12.0,
            flags: 0x100,
            pos: Vec3::new(1.0, 2.0, 3.0),
            pitch: Angle::from_degrees(10.0),
            yaw: Angle::from_degrees(-20.0),
            roll: Angle::from_degrees(170.0),
            dpos: Vec3::new(0.5, 0.0, -0.5),
            dpitch: 1.0,
            dyaw: 2.0,
            droll: -3.0,
        };

        let mut data = Vec::new();
        original.write(&mut data).unwrap();
        assert_eq!(data.len(), Keyframe::size());

        let parsed = Keyframe::parse(&mut Cursor::new(data)).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_nearest_index_invariant() {
        let track = track(&[0.0, 4.0, 4.0, 10.0, 25.0]);
        for &frame in &[-3.0, 0.0, 3.9, 4.0, 9.0, 10.0, 24.9, 25.0, 400.0] {
            let low = track.nearest_index(frame).unwrap();
            let keys = track.keyframes();
            if frame >= keys[0].frame {
                assert!(keys[low].frame <= frame, "frame {frame}, low {low}");
            }
            if low + 1 < keys.len() && frame >= keys[0].frame {
                assert!(frame < keys[low + 1].frame, "frame {frame}, low {low}");
            }
        }
    }

    #[test]
    fn test_nearest_index_before_first_sample() {
        let track = track(&[5.0, 10.0]);
        assert_eq!(track.nearest_index(1.0), Some(0));
    }

    #[test]
    fn test_empty_track_has_no_pose() {
        let track = track(&[]);
        assert_eq!(track.nearest_index(0.0), None);
        assert!(track.sample(0.0, true).is_none());
    }

    #[test]
    fn test_sample_base_pose_without_delta() {
        let mut a = key(0.0);
        a.pos = Vec3::new(1.0, 0.0, 0.0);
        a.dpos = Vec3::new(10.0, 10.0, 10.0);
        let b = key(8.0);
        let track = KeyframeTrack::new("m_test".to_string(), 0, vec![a, b]);

        let pose = track.sample(4.0, false).unwrap();
        assert_eq!(pose.pos, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_sample_applies_delta_rates() {
        let mut a = key(2.0);
        a.pos = Vec3::new(1.0, 0.0, 0.0);
        a.pitch = Angle::from_degrees(10.0);
        a.dpos = Vec3::new(0.5, 0.0, 0.0);
        a.dpitch = 2.0;
        let b = key(10.0);
        let track = KeyframeTrack::new("m_test".to_string(), 0, vec![a, b]);

        let pose = track.sample(6.0, true).unwrap();
        assert_eq!(pose.pos, Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(pose.pitch.degrees(), 18.0);
    }

    #[test]
    fn test_sample_extrapolates_past_last_keyframe() {
        let mut a = key(0.0);
        a.dpos = Vec3::new(1.0, 0.0, 0.0);
        let track = KeyframeTrack::new("m_test".to_string(), 0, vec![a]);

        let pose = track.sample(3.0, true).unwrap();
        assert_eq!(pose.pos, Vec3::new(3.0, 0.0, 0.0));
    }
}
