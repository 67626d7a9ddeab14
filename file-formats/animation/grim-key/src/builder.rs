use crate::anim::Marker;
use crate::error::{KeyframeError, Result};
use crate::keyframe::KeyframeTrack;

/// Accumulates decoded fields into the shape of a clip.
///
/// Both decoders feed this builder primitive values; the builder owns the
/// shared invariants — one track slot per node index, allocated at most
/// once, and indices bounded by the declared joint count — so neither
/// format has to re-state them.
#[derive(Debug, Default)]
pub(crate) struct ClipBuilder {
    pub(crate) flags: u32,
    pub(crate) anim_type: u32,
    pub(crate) frame_count: u32,
    pub(crate) joint_count: u32,
    pub(crate) markers: Vec<Marker>,
    pub(crate) tracks: Vec<Option<KeyframeTrack>>,
    pub(crate) truncated: bool,
}

impl ClipBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record the header fields and allocate one empty track slot per joint
    pub(crate) fn header(&mut self, flags: u32, anim_type: u32, frame_count: u32, joint_count: u32) {
        self.flags = flags;
        self.anim_type = anim_type;
        self.frame_count = frame_count;
        self.joint_count = joint_count;
        self.tracks = std::iter::repeat_with(|| None)
            .take(joint_count as usize)
            .collect();
    }

    pub(crate) fn push_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    /// Whether the slot for `node_index` is already populated
    pub(crate) fn has_track(&self, node_index: usize) -> bool {
        self.tracks
            .get(node_index)
            .is_some_and(|slot| slot.is_some())
    }

    /// Place `track` into its node slot
    pub(crate) fn add_track(&mut self, track: KeyframeTrack) -> Result<()> {
        let index = track.node_index();
        match self.tracks.get_mut(index) {
            Some(slot) => {
                if slot.is_some() {
                    return Err(KeyframeError::Parse(format!(
                        "duplicate keyframe node record for node {index}"
                    )));
                }
                *slot = Some(track);
                Ok(())
            }
            None => Err(KeyframeError::Parse(format!(
                "node index {index} out of range ({} joints)",
                self.joint_count
            ))),
        }
    }

    /// Record that the remainder of a malformed stream was dropped
    pub(crate) fn mark_truncated(&mut self) {
        self.truncated = true;
    }
}
