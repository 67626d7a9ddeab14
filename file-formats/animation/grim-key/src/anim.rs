use bitflags::bitflags;
use std::io::Write;

use crate::binary;
use crate::builder::ClipBuilder;
use crate::cache::CacheHandle;
use crate::error::{KeyframeError, Result};
use crate::keyframe::{KeyframeTrack, Pose};
use crate::node::ModelNode;
use crate::text;

/// Magic signature for binary KEY files ("FYEK"), compared big-endian
pub const KEY_MAGIC: [u8; 4] = *b"FYEK";

/// Playback rate for every KEY animation, in frames per second.
///
/// Files carry a rate of their own, but using it desynchronizes animations
/// from scene audio and scripting, so the stored value is ignored.
pub const KEY_FPS: f32 = 15.0;

bitflags! {
    /// Clip-level flags as stored in the KEY header
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KeyAnimFlags: u32 {
        /// Keyframes are played verbatim; the per-sample delta rates are
        /// not applied between samples
        const NO_DELTAS = 0x100;
    }
}

/// A time-stamped integer event tag embedded in a clip
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Marker {
    /// Frame the marker fires at
    pub frame: f32,
    /// Opaque value handed back to the caller
    pub value: i32,
}

/// One loaded keyframe animation resource.
///
/// A clip is parsed once — from the binary or the textual format, whichever
/// the magic tag says — and is immutable afterwards: playback queries never
/// touch clip state, only the [`ModelNode`] being animated. Tracks are held
/// sparsely, one optional slot per skeleton node index.
#[derive(Debug)]
pub struct KeyframeAnim {
    name: String,
    flags: KeyAnimFlags,
    anim_type: u32,
    fps: f32,
    frame_count: u32,
    joint_count: u32,
    markers: Vec<Marker>,
    tracks: Vec<Option<KeyframeTrack>>,
    truncated: bool,
    cache: Option<CacheHandle>,
}

impl KeyframeAnim {
    /// Load a clip from raw bytes, dispatching on the 4-byte magic tag
    pub fn from_bytes(name: &str, data: &[u8]) -> Result<Self> {
        Self::load(name, data, None)
    }

    pub(crate) fn load(name: &str, data: &[u8], cache: Option<CacheHandle>) -> Result<Self> {
        let mut builder = ClipBuilder::new();
        if data.len() >= 4 && data[0..4] == KEY_MAGIC {
            binary::decode(name, data, &mut builder)?;
        } else {
            let text = std::str::from_utf8(data).map_err(|_| {
                KeyframeError::Parse(format!("'{name}' is neither binary KEY nor valid text"))
            })?;
            text::decode(name, text, &mut builder)?;
        }

        Ok(Self {
            name: name.to_string(),
            flags: KeyAnimFlags::from_bits_retain(builder.flags),
            anim_type: builder.anim_type,
            fps: KEY_FPS,
            frame_count: builder.frame_count,
            joint_count: builder.joint_count,
            markers: builder.markers,
            tracks: builder.tracks,
            truncated: builder.truncated,
            cache,
        })
    }

    /// Resource name this clip was loaded under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clip-level flags
    pub fn flags(&self) -> KeyAnimFlags {
        self.flags
    }

    /// Animation-category bitmask, matched against node type masks
    pub fn anim_type(&self) -> u32 {
        self.anim_type
    }

    /// Playback rate, always [`KEY_FPS`]
    pub fn frame_rate(&self) -> f32 {
        self.fps
    }

    /// Number of frames; query times clamp here
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Declared number of skeleton nodes (and track slots)
    pub fn joint_count(&self) -> u32 {
        self.joint_count
    }

    /// The clip's markers, in stored (ascending) order
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// The track for `node_index`, if the clip animates that node
    pub fn track(&self, node_index: usize) -> Option<&KeyframeTrack> {
        self.tracks.get(node_index).and_then(Option::as_ref)
    }

    /// All track slots, indexed by skeleton node
    pub fn tracks(&self) -> &[Option<KeyframeTrack>] {
        &self.tracks
    }

    /// True if a malformed binary stream was defensively cut short.
    ///
    /// A truncated clip is still valid; it just animates fewer nodes than
    /// the file intended.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Sample this clip at `time` seconds and blend the result into `node`.
    ///
    /// `node_index` is the node's position in the skeleton, used both for
    /// the track lookup and the defensive joint-count bound (a live model
    /// can legitimately be smaller than the clip thinks). `tagged` selects
    /// whether the caller wants nodes whose type mask intersects the
    /// clip's. The queried pose minus the node's rest pose, scaled by
    /// `fade`, is added to the node's accumulator; angle deltas take the
    /// shortest path. Returns whether anything was applied.
    pub fn animate(
        &self,
        node: &mut ModelNode,
        node_index: usize,
        time: f32,
        fade: f32,
        tagged: bool,
    ) -> bool {
        if node_index >= self.joint_count as usize {
            return false;
        }

        let frame = (time * self.fps).min(self.frame_count as f32);

        let Some(track) = self.track(node_index) else {
            return false;
        };
        if tagged != ((self.anim_type & node.type_mask) != 0) {
            return false;
        }

        let use_delta = !self.flags.contains(KeyAnimFlags::NO_DELTAS);
        let Some(pose) = track.sample(frame, use_delta) else {
            return false;
        };

        self.blend(node, &pose, fade);
        true
    }

    fn blend(&self, node: &mut ModelNode, pose: &Pose, fade: f32) {
        node.anim_pos += (pose.pos - node.pos) * fade;
        node.anim_pitch += (pose.pitch - node.pitch).normalized(-180.0) * fade;
        node.anim_yaw += (pose.yaw - node.yaw).normalized(-180.0) * fade;
        node.anim_roll += (pose.roll - node.roll).normalized(-180.0) * fade;
    }

    /// Value of the first marker within `[start_time, stop_time)` seconds.
    ///
    /// Both bounds are scaled to frames. Markers are scanned in stored
    /// order and the first hit wins even when several fall in the window;
    /// 0 means no marker fired.
    pub fn marker_between(&self, start_time: f32, stop_time: f32) -> i32 {
        let start = start_time * self.fps;
        let stop = stop_time * self.fps;

        self.markers
            .iter()
            .find(|m| m.frame >= start && m.frame < stop)
            .map_or(0, |m| m.value)
    }

    /// Check structural invariants that playback relies on
    pub fn validate(&self) -> Result<()> {
        for (index, track) in self.tracks.iter().enumerate() {
            let Some(track) = track else { continue };
            if track.node_index() != index {
                return Err(KeyframeError::Validation(format!(
                    "track in slot {index} claims node {}",
                    track.node_index()
                )));
            }
            let frames = track.keyframes();
            if let Some(pair) = frames.windows(2).find(|w| w[1].frame < w[0].frame) {
                return Err(KeyframeError::Validation(format!(
                    "node {index}: keyframe at frame {} follows frame {}",
                    pair[1].frame, pair[0].frame
                )));
            }
        }

        if let Some(pair) = self.markers.windows(2).find(|w| w[1].frame < w[0].frame) {
            return Err(KeyframeError::Validation(format!(
                "marker at frame {} follows frame {}",
                pair[1].frame, pair[0].frame
            )));
        }
        if self.markers.len() > binary::MAX_MARKERS {
            return Err(KeyframeError::Validation(format!(
                "{} markers exceed the format's {} slots",
                self.markers.len(),
                binary::MAX_MARKERS
            )));
        }

        Ok(())
    }

    /// Write this clip in the binary KEY layout
    pub fn write_binary<W: Write>(&self, writer: &mut W) -> Result<()> {
        binary::encode(self, writer)
    }

    /// Write this clip in the textual KEY grammar
    pub fn write_text<W: Write>(&self, writer: &mut W) -> Result<()> {
        text::encode(self, writer)
    }
}

impl Drop for KeyframeAnim {
    fn drop(&mut self) {
        // Last reference going away; tell the owning cache, if any, so it
        // does not hand out a name that no longer resolves.
        if let Some(handle) = self.cache.take() {
            handle.release();
        }
    }
}
