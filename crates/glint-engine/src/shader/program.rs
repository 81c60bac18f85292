use std::collections::HashMap;

use crate::device::{AttributeSlot, Backend, GraphicsContext, ProgramId, UniformSlot};
use crate::error::{RenderError, Result};

use super::reflect::{self, LinkedInterface, ProgramDesc};
use super::{ProgramLayout, ShaderStage};

/// A linked vertex/fragment program with its declared locations resolved.
///
/// Locations are looked up once, right after linking, for the names the
/// caller declared in its `ProgramLayout`. The program is immutable afterwards.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    vertex_source: String,
    fragment_source: String,
    attributes: HashMap<String, Attribute>,
    uniforms: HashMap<String, UniformSlot>,
    vertex_inputs: Vec<(String, AttributeSlot)>,
}

/// A resolved vertex input.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Attribute {
    pub slot: AttributeSlot,
    /// Components the shader declares for this input.
    pub components: u32,
}

impl ShaderProgram {
    /// Compiles both stages, links them and resolves `layout`.
    ///
    /// Errors:
    /// - `ShaderCompile { stage, .. }` if either stage fails to parse or validate
    /// - `ShaderLink` if the stages do not fit together or the backend rejects them
    /// - `AttributeNotFound` / `UniformNotFound` for missing required names
    pub fn compile<B: Backend>(
        ctx: &mut GraphicsContext<B>,
        vertex_source: &str,
        fragment_source: &str,
        layout: &ProgramLayout,
    ) -> Result<Self> {
        let vertex = reflect::compile_stage(ShaderStage::Vertex, vertex_source)?;
        let fragment = reflect::compile_stage(ShaderStage::Fragment, fragment_source)?;
        let interface = reflect::link(&vertex, &fragment)?;

        // Resolve before touching the GPU so a missing name leaks nothing.
        let (attributes, uniforms) = resolve(&interface, layout)?;

        let desc = ProgramDesc {
            vertex_source,
            vertex_entry: &vertex.entry,
            fragment_source,
            fragment_entry: &fragment.entry,
            attributes: &interface.attributes,
            uniforms: &interface.uniforms,
        };
        let id = ctx
            .create_program(&desc)
            .map_err(|log| RenderError::ShaderLink { log })?;

        log::debug!(
            "program {id:?} linked ({} attributes, {} uniforms resolved)",
            attributes.len(),
            uniforms.len()
        );

        let vertex_inputs = interface
            .attributes
            .iter()
            .map(|a| (a.name.clone(), AttributeSlot(a.location)))
            .collect();

        Ok(Self {
            id,
            vertex_source: vertex_source.to_owned(),
            fragment_source: fragment_source.to_owned(),
            attributes,
            uniforms,
            vertex_inputs,
        })
    }

    /// Makes this program current for subsequent draws.
    ///
    /// Draws issued while no program is active are dropped by the context.
    pub fn activate<B: Backend>(&self, ctx: &mut GraphicsContext<B>) {
        ctx.use_program(self.id);
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    /// Returns a resolved attribute, `None` if it was optional and absent or never declared.
    pub fn attribute(&self, name: &str) -> Option<Attribute> {
        self.attributes.get(name).copied()
    }

    /// Every vertex input of the linked program by location, declared in the layout or not.
    pub fn vertex_inputs(&self) -> impl Iterator<Item = (&str, AttributeSlot)> + '_ {
        self.vertex_inputs.iter().map(|(name, slot)| (name.as_str(), *slot))
    }

    /// Returns a resolved uniform slot, `None` if it was optional and absent or never declared.
    pub fn uniform(&self, name: &str) -> Option<UniformSlot> {
        self.uniforms.get(name).copied()
    }

    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    /// Releases the GPU program.
    pub fn destroy<B: Backend>(self, ctx: &mut GraphicsContext<B>) {
        ctx.destroy_program(self.id);
    }
}

type Resolved = (HashMap<String, Attribute>, HashMap<String, UniformSlot>);

fn resolve(interface: &LinkedInterface, layout: &ProgramLayout) -> Result<Resolved> {
    let mut attributes = HashMap::new();
    for declared in layout.attributes() {
        match interface.attributes.iter().find(|a| a.name == declared.name) {
            Some(a) => {
                attributes.insert(
                    declared.name.clone(),
                    Attribute {
                        slot: AttributeSlot(a.location),
                        components: a.components,
                    },
                );
            }
            None if declared.required => {
                return Err(RenderError::AttributeNotFound {
                    name: declared.name.clone(),
                });
            }
            None => log::debug!("optional attribute `{}` not present", declared.name),
        }
    }

    let mut uniforms = HashMap::new();
    for declared in layout.uniforms() {
        match interface.uniforms.iter().find(|u| u.name == declared.name) {
            Some(u) => {
                uniforms.insert(declared.name.clone(), UniformSlot(u.binding));
            }
            None if declared.required => {
                return Err(RenderError::UniformNotFound {
                    name: declared.name.clone(),
                });
            }
            None => log::debug!("optional uniform `{}` not present", declared.name),
        }
    }

    Ok((attributes, uniforms))
}
