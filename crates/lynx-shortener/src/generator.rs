pub mod random;
pub mod seq;

use lynx_core::LinkId;

/// Trait for generating candidate link ids.
///
/// Implementations are pure generators that don't interact with storage.
/// Uniqueness is not required: the link service checks the repository
/// and draws again on collision.
pub trait Generator: Send + Sync + 'static {
    /// Produces the next candidate id.
    fn generate(&self) -> LinkId;
}
