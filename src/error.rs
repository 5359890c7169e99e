use thiserror::Error;

/// Failure lowering one named schema. Never aborts the rest of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoweringError {
    /// Dangling `$ref`: the pointer does not land on a schema in the document.
    #[error("cannot resolve reference `{reference}` (at `{path}`)")]
    ReferenceResolution { reference: String, path: String },

    /// Composition nested deeper than `maxDepth`.
    #[error("composition depth {depth} exceeds maxDepth {max_depth} at `{path}`")]
    CompositionDepthExceeded { path: String, depth: usize, max_depth: usize },

    /// A reference cycle met while `circularRefs` is `error`.
    #[error("circular reference `{reference}` (at `{path}`)")]
    CircularReference { reference: String, path: String },

    /// Empty `enum`/`oneOf`/`anyOf` under the `error` degenerate policy.
    #[error("degenerate input at `{path}`: {reason}")]
    DegenerateInput { path: String, reason: String },
}

impl LoweringError {
    /// Stable kind name for summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            LoweringError::ReferenceResolution { .. } => "ReferenceResolutionError",
            LoweringError::CompositionDepthExceeded { .. } => "CompositionDepthExceededError",
            LoweringError::CircularReference { .. } => "CircularReferenceError",
            LoweringError::DegenerateInput { .. } => "DegenerateInputError",
        }
    }
}
