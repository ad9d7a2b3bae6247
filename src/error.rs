use thiserror::Error;

/// Rejected `(capacity, load_factor)` pair passed to a fallible constructor.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidConfiguration {
    /// The table needs at least one bucket to map hashes onto.
    #[error("bucket capacity must be at least 1")]
    ZeroCapacity,
    /// The load factor must lie in `(0, 1]`.
    #[error("load factor {0} is outside (0, 1]")]
    LoadFactor(f32),
}
