use crate::generator::Generator;
use lynx_core::LinkId;

/// Draws ids uniformly from the full 64-bit range.
///
/// Collisions are possible but negligible at realistic occupancy.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomGenerator;

impl RandomGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Generator for RandomGenerator {
    fn generate(&self) -> LinkId {
        LinkId::new(rand::random::<u64>())
    }
}
