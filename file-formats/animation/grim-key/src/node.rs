use glam::Vec3;

use crate::math::Angle;

/// A skeleton node being animated.
///
/// The rest pose fields come from the model hierarchy and never change;
/// the `anim_*` fields are the accumulator that playing animations blend
/// their weighted deltas into. The accumulator is owned by the caller and
/// must be cleared once per rendered frame ([`reset_animation`]) before any
/// clip blends into it; the final node transform is rest pose plus
/// accumulator.
///
/// [`reset_animation`]: ModelNode::reset_animation
#[derive(Debug, Clone, Default)]
pub struct ModelNode {
    /// Rest position
    pub pos: Vec3,
    /// Rest pitch
    pub pitch: Angle,
    /// Rest yaw
    pub yaw: Angle,
    /// Rest roll
    pub roll: Angle,
    /// Accumulated animated position offset
    pub anim_pos: Vec3,
    /// Accumulated animated pitch offset
    pub anim_pitch: Angle,
    /// Accumulated animated yaw offset
    pub anim_yaw: Angle,
    /// Accumulated animated roll offset
    pub anim_roll: Angle,
    /// Animation-category bitmask this node belongs to
    pub type_mask: u32,
}

impl ModelNode {
    pub fn new(pos: Vec3, pitch: Angle, yaw: Angle, roll: Angle, type_mask: u32) -> Self {
        Self {
            pos,
            pitch,
            yaw,
            roll,
            type_mask,
            ..Self::default()
        }
    }

    /// Clear the animated-pose accumulator
    pub fn reset_animation(&mut self) {
        self.anim_pos = Vec3::ZERO;
        self.anim_pitch = Angle::ZERO;
        self.anim_yaw = Angle::ZERO;
        self.anim_roll = Angle::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_animation_clears_only_the_accumulator() {
        let mut node = ModelNode::new(
            Vec3::new(1.0, 2.0, 3.0),
            Angle::from_degrees(10.0),
            Angle::ZERO,
            Angle::ZERO,
            0x4,
        );
        node.anim_pos = Vec3::ONE;
        node.anim_yaw = Angle::from_degrees(45.0);

        node.reset_animation();

        assert_eq!(node.anim_pos, Vec3::ZERO);
        assert_eq!(node.anim_yaw, Angle::ZERO);
        assert_eq!(node.pos, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(node.pitch.degrees(), 10.0);
        assert_eq!(node.type_mask, 0x4);
    }
}
