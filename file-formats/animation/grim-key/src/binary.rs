//! Binary KEY decoding and encoding.
//!
//! The binary layout is fixed-offset rather than chunked. All multi-byte
//! values are little-endian; only the magic tag is compared big-endian.
//!
//! ```text
//! offset  size  field
//!      0     4  magic "FYEK"
//!      4    36  resource name
//!     40     4  flags
//!     44     4  joint count (duplicate)
//!     48     4  type mask
//!     52     4  frame rate (stored, ignored at playback)
//!     56     4  frame count
//!     60     4  joint count
//!     64     4  unknown
//!     68     4  marker count
//!     72    32  marker frames, 8 slots of f32
//!    104    32  marker values, 8 slots of i32
//!    136     …  keyframe node records
//! ```
//!
//! Each node record is a 44-byte header (32-byte mesh name, node index at
//! +32, entry count at +36) followed by `entry count` 56-byte keyframes.

use log::{debug, warn};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use crate::anim::{KEY_FPS, KEY_MAGIC, KeyframeAnim, Marker};
use crate::builder::ClipBuilder;
use crate::error::{KeyframeError, Result};
use crate::io_ext::{ReadExt, WriteExt};
use crate::keyframe::{Keyframe, KeyframeTrack};

/// Offset of the first keyframe node record.
///
/// The strict field layout would suggest 180, but retail data disagrees:
/// most files lead with a throwaway record that a 180-byte skip would
/// swallow, while ma_card_hold.key starts with a live one. 136 keeps every
/// record visible and lets the node-index range check below sort out the
/// rest. Do not "correct" this without new evidence.
const HEADER_SIZE: u64 = 136;

const FLAGS_OFFSET: u64 = 40;
const TYPE_OFFSET: u64 = 48;
const FRAME_COUNT_OFFSET: u64 = 56;
const MARKER_COUNT_OFFSET: u64 = 68;
const MARKER_FRAMES_OFFSET: u64 = 72;
const MARKER_VALUES_OFFSET: u64 = 104;

const RECORD_HEADER_SIZE: u64 = 44;
const RECORD_NODE_INDEX_OFFSET: u64 = 32;
const NAME_FIELD_SIZE: usize = 32;
const FILENAME_FIELD_SIZE: usize = 36;

/// The header has room for eight markers in each of its two slot arrays
pub(crate) const MAX_MARKERS: usize = 8;

/// Placeholder mesh name for records whose name field is unset
const NULL_NAME: &str = "(null)";

/// Decode a binary KEY buffer into `builder`.
///
/// A record whose node index is outside the declared joint count aborts the
/// rest of the stream: everything decoded so far stays usable and the clip
/// is flagged truncated. That is content-tolerant recovery, not a failure.
pub(crate) fn decode(name: &str, data: &[u8], builder: &mut ClipBuilder) -> Result<()> {
    debug!("loading binary keyframe animation '{name}'");

    let mut cursor = Cursor::new(data);

    cursor.seek(SeekFrom::Start(FLAGS_OFFSET))?;
    let flags = cursor.read_u32_le()?;
    cursor.seek(SeekFrom::Start(TYPE_OFFSET))?;
    let anim_type = cursor.read_u32_le()?;
    // A frame rate is stored at offset 52, but honoring it drifts animations
    // out of sync with the rest of the scene; playback always runs at KEY_FPS.
    cursor.seek(SeekFrom::Start(FRAME_COUNT_OFFSET))?;
    let frame_count = cursor.read_u32_le()?;
    let joint_count = cursor.read_u32_le()?;
    cursor.seek(SeekFrom::Start(MARKER_COUNT_OFFSET))?;
    let marker_count = cursor.read_u32_le()?;

    builder.header(flags, anim_type, frame_count, joint_count);

    if marker_count as usize > MAX_MARKERS {
        warn!("'{name}' declares {marker_count} markers, more than the header holds");
    }
    for i in 0..marker_count as u64 {
        cursor.seek(SeekFrom::Start(MARKER_FRAMES_OFFSET + 4 * i))?;
        let frame = cursor.read_f32_le()?;
        cursor.seek(SeekFrom::Start(MARKER_VALUES_OFFSET + 4 * i))?;
        let value = cursor.read_i32_le()?;
        builder.push_marker(Marker { frame, value });
    }

    cursor.seek(SeekFrom::Start(HEADER_SIZE))?;
    while remaining(&cursor) >= RECORD_HEADER_SIZE {
        let record_start = cursor.position();
        cursor.seek(SeekFrom::Start(record_start + RECORD_NODE_INDEX_OFFSET))?;
        let node_index = cursor.read_u32_le()? as usize;

        if node_index >= joint_count as usize {
            warn!(
                "'{name}': node index {node_index} exceeds the joint count ({joint_count}), \
                 dropping the rest of the stream"
            );
            builder.mark_truncated();
            return Ok(());
        }

        if builder.has_track(node_index) {
            // Null record: same node again, nothing to keep. Skip exactly
            // one record header; nodes 7, 13 and 27 commonly show up here.
            cursor.seek(SeekFrom::Start(record_start + RECORD_HEADER_SIZE))?;
            continue;
        }

        cursor.seek(SeekFrom::Start(record_start))?;
        let track = parse_track(&mut cursor, node_index)?;
        builder.add_track(track)?;
    }

    Ok(())
}

fn remaining(cursor: &Cursor<&[u8]>) -> u64 {
    (cursor.get_ref().len() as u64).saturating_sub(cursor.position())
}

fn parse_track(cursor: &mut Cursor<&[u8]>, node_index: usize) -> Result<KeyframeTrack> {
    let mut name = [0u8; NAME_FIELD_SIZE];
    cursor.read_exact(&mut name)?;
    // An entirely unset name field leads with a zero word
    let mesh_name = if u32::from_le_bytes([name[0], name[1], name[2], name[3]]) == 0 {
        NULL_NAME.to_string()
    } else {
        let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        String::from_utf8_lossy(&name[..end]).to_string()
    };

    let _node = cursor.read_u32_le()?;
    let entry_count = cursor.read_u32_le()? as usize;
    let _unknown = cursor.read_u32_le()?;

    let available = remaining(cursor);
    if entry_count as u64 * Keyframe::size() as u64 > available {
        return Err(KeyframeError::Parse(format!(
            "record for node {node_index} declares {entry_count} keyframes but only \
             {available} bytes remain"
        )));
    }

    let mut keyframes = Vec::with_capacity(entry_count);
    for _ in 0..entry_count {
        keyframes.push(Keyframe::parse(cursor)?);
    }

    Ok(KeyframeTrack::new(mesh_name, node_index, keyframes))
}

/// Encode `anim` in the binary KEY layout.
///
/// Fails if the clip holds more markers than the header's eight slots.
pub(crate) fn encode<W: Write>(anim: &KeyframeAnim, writer: &mut W) -> Result<()> {
    let markers = anim.markers();
    if markers.len() > MAX_MARKERS {
        return Err(KeyframeError::Validation(format!(
            "{} markers cannot be encoded; the header holds {MAX_MARKERS}",
            markers.len()
        )));
    }

    writer.write_all(&KEY_MAGIC)?;
    write_name_field(writer, anim.name(), FILENAME_FIELD_SIZE)?;
    writer.write_u32_le(anim.flags().bits())?;
    writer.write_u32_le(anim.joint_count())?;
    writer.write_u32_le(anim.anim_type())?;
    writer.write_f32_le(KEY_FPS)?;
    writer.write_u32_le(anim.frame_count())?;
    writer.write_u32_le(anim.joint_count())?;
    writer.write_u32_le(0)?;
    writer.write_u32_le(markers.len() as u32)?;
    for i in 0..MAX_MARKERS {
        writer.write_f32_le(markers.get(i).map_or(0.0, |m| m.frame))?;
    }
    for i in 0..MAX_MARKERS {
        writer.write_i32_le(markers.get(i).map_or(0, |m| m.value))?;
    }

    for track in anim.tracks().iter().flatten() {
        write_name_field(writer, track.mesh_name(), NAME_FIELD_SIZE)?;
        writer.write_u32_le(track.node_index() as u32)?;
        writer.write_u32_le(track.keyframes().len() as u32)?;
        writer.write_u32_le(0)?;
        for keyframe in track.keyframes() {
            keyframe.write(writer)?;
        }
    }

    Ok(())
}

fn write_name_field<W: Write>(writer: &mut W, name: &str, width: usize) -> Result<()> {
    let mut field = vec![0u8; width];
    let bytes = name.as_bytes();
    let len = bytes.len().min(width - 1);
    field[..len].copy_from_slice(&bytes[..len]);
    writer.write_all(&field)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a syntactically valid binary header with the given counts
    fn header_bytes(
        flags: u32,
        anim_type: u32,
        frame_count: u32,
        joint_count: u32,
        markers: &[(f32, i32)],
    ) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE as usize];
        data[0..4].copy_from_slice(&KEY_MAGIC);
        data[40..44].copy_from_slice(&flags.to_le_bytes());
        data[48..52].copy_from_slice(&anim_type.to_le_bytes());
        data[52..56].copy_from_slice(&30.0f32.to_le_bytes());
        data[56..60].copy_from_slice(&frame_count.to_le_bytes());
        data[60..64].copy_from_slice(&joint_count.to_le_bytes());
        data[68..72].copy_from_slice(&(markers.len() as u32).to_le_bytes());
        for (i, &(frame, value)) in markers.iter().enumerate() {
            let t = 72 + 4 * i;
            let v = 104 + 4 * i;
            data[t..t + 4].copy_from_slice(&frame.to_le_bytes());
            data[v..v + 4].copy_from_slice(&value.to_le_bytes());
        }
        data
    }

    /// Append a bare 44-byte record header
    fn push_record_header(data: &mut Vec<u8>, name: &[u8], node_index: u32, count: u32) {
        let mut header = [0u8; RECORD_HEADER_SIZE as usize];
        header[..name.len().min(32)].copy_from_slice(&name[..name.len().min(32)]);
        header[32..36].copy_from_slice(&node_index.to_le_bytes());
        header[36..40].copy_from_slice(&count.to_le_bytes());
        data.extend_from_slice(&header);
    }

    /// Append a node record with `count` zeroed keyframes
    fn push_record(data: &mut Vec<u8>, name: &[u8], node_index: u32, count: u32) {
        push_record_header(data, name, node_index, count);
        data.extend_from_slice(&vec![0u8; count as usize * Keyframe::size()]);
    }

    #[test]
    fn test_decode_header_fields() {
        let data = header_bytes(0x104, 0x2, 40, 3, &[(10.0, 5), (20.0, 9)]);
        let mut builder = ClipBuilder::new();
        decode("test.key", &data, &mut builder).unwrap();

        assert_eq!(builder.flags, 0x104);
        assert_eq!(builder.anim_type, 0x2);
        assert_eq!(builder.frame_count, 40);
        assert_eq!(builder.joint_count, 3);
        assert_eq!(builder.markers.len(), 2);
        assert_eq!(builder.markers[1], Marker { frame: 20.0, value: 9 });
        assert!(!builder.truncated);
    }

    #[test]
    fn test_decode_null_record_skips_44_bytes() {
        let mut data = header_bytes(0, 0, 10, 2, &[]);
        push_record(&mut data, b"m_hip", 0, 1);
        // Same node again: a null record is 44 bytes in the file no matter
        // what entry count it declares, so the skip must ignore the count.
        push_record_header(&mut data, b"m_hip", 0, 7);
        push_record(&mut data, b"m_toe", 1, 1);

        let mut builder = ClipBuilder::new();
        decode("test.key", &data, &mut builder).unwrap();

        assert!(builder.has_track(0));
        assert!(builder.has_track(1));
        assert_eq!(builder.tracks[0].as_ref().unwrap().keyframes().len(), 1);
        assert!(!builder.truncated);
    }

    #[test]
    fn test_decode_out_of_range_node_truncates() {
        let mut data = header_bytes(0, 0, 10, 2, &[]);
        push_record(&mut data, b"m_hip", 0, 1);
        push_record(&mut data, b"m_bad", 9, 1);
        push_record(&mut data, b"m_toe", 1, 1);

        let mut builder = ClipBuilder::new();
        decode("test.key", &data, &mut builder).unwrap();

        assert!(builder.truncated);
        assert!(builder.has_track(0));
        // Everything after the offending record is dropped
        assert!(!builder.has_track(1));
    }

    #[test]
    fn test_decode_zero_name_becomes_placeholder() {
        let mut data = header_bytes(0, 0, 10, 1, &[]);
        push_record(&mut data, b"", 0, 0);

        let mut builder = ClipBuilder::new();
        decode("test.key", &data, &mut builder).unwrap();

        assert_eq!(builder.tracks[0].as_ref().unwrap().mesh_name(), "(null)");
    }

    #[test]
    fn test_decode_short_tail_stops_cleanly() {
        let mut data = header_bytes(0, 0, 10, 1, &[]);
        push_record(&mut data, b"m_hip", 0, 0);
        data.extend_from_slice(&[0u8; 20]);

        let mut builder = ClipBuilder::new();
        decode("test.key", &data, &mut builder).unwrap();
        assert!(builder.has_track(0));
        assert!(!builder.truncated);
    }

    #[test]
    fn test_decode_entry_overrun_is_an_error() {
        let mut data = header_bytes(0, 0, 10, 1, &[]);
        push_record(&mut data, b"m_hip", 0, 3);
        data.truncate(data.len() - Keyframe::size());

        let mut builder = ClipBuilder::new();
        assert!(decode("test.key", &data, &mut builder).is_err());
    }
}
