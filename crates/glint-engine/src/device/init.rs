use crate::paint::Color;

/// Persistent pipeline state applied once when a context is acquired.
///
/// There is no runtime toggle for either field; acquire a new context on a new
/// surface to change them.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Color used by `GraphicsContext::clear`.
    pub clear_color: Color,

    /// Enables depth testing (less-or-equal) and a depth attachment.
    pub depth_test: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            clear_color: Color::black(),
            depth_test: true,
        }
    }
}
