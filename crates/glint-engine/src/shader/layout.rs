/// Attribute and uniform names a call site wants resolved on a program.
///
/// Required names must exist after linking or compilation fails; optional
/// names are resolved when present and silently skipped otherwise.
///
/// ```
/// use glint_engine::shader::ProgramLayout;
///
/// let layout = ProgramLayout::new()
///     .attribute("a_position")
///     .optional_attribute("a_color")
///     .uniform("u_model_view")
///     .uniform("u_projection");
/// assert_eq!(layout.attributes().count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProgramLayout {
    attributes: Vec<DeclaredName>,
    uniforms: Vec<DeclaredName>,
}

/// One declared name and whether it must resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredName {
    pub name: String,
    pub required: bool,
}

impl ProgramLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(self, name: impl Into<String>) -> Self {
        self.with_attribute(name.into(), true)
    }

    pub fn optional_attribute(self, name: impl Into<String>) -> Self {
        self.with_attribute(name.into(), false)
    }

    pub fn uniform(self, name: impl Into<String>) -> Self {
        self.with_uniform(name.into(), true)
    }

    pub fn optional_uniform(self, name: impl Into<String>) -> Self {
        self.with_uniform(name.into(), false)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &DeclaredName> {
        self.attributes.iter()
    }

    pub fn uniforms(&self) -> impl Iterator<Item = &DeclaredName> {
        self.uniforms.iter()
    }

    fn with_attribute(mut self, name: String, required: bool) -> Self {
        upsert(&mut self.attributes, name, required);
        self
    }

    fn with_uniform(mut self, name: String, required: bool) -> Self {
        upsert(&mut self.uniforms, name, required);
        self
    }
}

// Declaring a name twice keeps one entry; required wins.
fn upsert(list: &mut Vec<DeclaredName>, name: String, required: bool) {
    match list.iter_mut().find(|d| d.name == name) {
        Some(existing) => existing.required |= required,
        None => list.push(DeclaredName { name, required }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_declarations_collapse_and_required_wins() {
        let layout = ProgramLayout::new()
            .optional_uniform("u_tint")
            .uniform("u_tint")
            .optional_uniform("u_tint");

        let uniforms: Vec<_> = layout.uniforms().collect();
        assert_eq!(uniforms.len(), 1);
        assert!(uniforms[0].required);
    }

    #[test]
    fn declaration_order_is_kept() {
        let layout = ProgramLayout::new().attribute("b").attribute("a");
        let names: Vec<_> = layout.attributes().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
    }
}
