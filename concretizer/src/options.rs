/// How structural problems (malformed directives, arity mismatches, parse
/// warnings) are handled. Evaluation failures are fatal under either policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Record a warning and keep rendering with best-effort state.
    #[default]
    Continue,
    /// Stop at the first structural problem.
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub policy: ErrorPolicy,
    /// Maximum nesting of macro expansions.
    pub max_depth: usize,
}

pub const MAX_DEPTH: usize = 256;

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            policy: ErrorPolicy::Continue,
            max_depth: MAX_DEPTH,
        }
    }
}

impl RenderOptions {
    pub fn strict() -> Self {
        RenderOptions {
            policy: ErrorPolicy::Abort,
            ..Self::default()
        }
    }
}
