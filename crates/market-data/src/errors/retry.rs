/// Classification for what a caller should do after an upstream failure.
///
/// # Behavior Summary
///
/// | Class | Try mirror endpoint? | Degrade to fallback data? |
/// |-------|----------------------|---------------------------|
/// | `Never` | No | Yes |
/// | `NextEndpoint` | Yes | Yes, once the mirror also fails |
/// | `CircuitOpen` | No (provider suppressed) | Yes |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// The request itself is bad or the provider has no data.
    /// Asking a mirror of the same provider won't change the answer.
    Never,

    /// Transport-level or server-side failure.
    /// A mirror endpoint of the same provider may still answer.
    NextEndpoint,

    /// The provider is suppressed by the DNS backoff window.
    CircuitOpen,
}
