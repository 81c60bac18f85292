//! WGSL front-end: per-stage compilation, stage linking and interface reflection.

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, Handle, Module, ScalarKind, Type, TypeInner, VectorSize};

use crate::error::{RenderError, Result};

use super::ShaderStage;

/// A parsed and validated single-stage module.
pub(crate) struct CompiledStage {
    pub stage: ShaderStage,
    pub module: Module,
    pub entry: String,
}

/// A vertex input the program exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name: String,
    pub location: u32,
    /// `f32` components per vertex (1..=4).
    pub components: u32,
}

/// A `mat4x4<f32>` uniform the program exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformInfo {
    pub name: String,
    pub binding: u32,
}

/// Everything a backend needs to build a program.
#[derive(Debug, Clone, Copy)]
pub struct ProgramDesc<'a> {
    pub vertex_source: &'a str,
    pub vertex_entry: &'a str,
    pub fragment_source: &'a str,
    pub fragment_entry: &'a str,
    pub attributes: &'a [AttributeInfo],
    pub uniforms: &'a [UniformInfo],
}

/// Resolved interface of a linked vertex/fragment pair.
#[derive(Debug, Default)]
pub(crate) struct LinkedInterface {
    pub attributes: Vec<AttributeInfo>,
    pub uniforms: Vec<UniformInfo>,
}

/// Parses and validates one stage; the stage must declare its entry point.
pub(crate) fn compile_stage(stage: ShaderStage, source: &str) -> Result<CompiledStage> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| RenderError::ShaderCompile {
        stage,
        log: e.emit_to_string(source),
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|e| RenderError::ShaderCompile {
            stage,
            log: e.emit_to_string(source),
        })?;

    let mut entries = module.entry_points.iter().filter(|ep| ep.stage == stage.naga());
    let entry = entries
        .next()
        .map(|ep| ep.name.clone())
        .ok_or_else(|| RenderError::ShaderCompile {
            stage,
            log: format!("no @{stage} entry point in source"),
        })?;

    if entries.next().is_some() {
        log::debug!("{stage} source declares several entry points; using `{entry}`");
    }

    Ok(CompiledStage { stage, module, entry })
}

/// Checks that `fragment` consumes only what `vertex` produces and collects
/// the program's attributes and uniforms.
///
/// Every problem found is reported in one link log.
pub(crate) fn link(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<LinkedInterface> {
    debug_assert_eq!(vertex.stage, ShaderStage::Vertex);
    debug_assert_eq!(fragment.stage, ShaderStage::Fragment);

    let mut problems = Vec::new();

    let outputs = stage_outputs(vertex);
    for input in stage_inputs(fragment) {
        match outputs.iter().find(|o| o.location == input.location) {
            None => problems.push(format!(
                "fragment input `{}` at location {} is not written by the vertex stage",
                input.name, input.location
            )),
            Some(out) if out.ty != input.ty => problems.push(format!(
                "location {}: vertex writes {:?} but fragment reads {:?}",
                input.location, out.ty, input.ty
            )),
            Some(_) => {}
        }
    }

    let mut attributes = Vec::new();
    for input in stage_inputs(vertex) {
        match float_components(&input.ty) {
            Some(components) => attributes.push(AttributeInfo {
                name: input.name,
                location: input.location,
                components,
            }),
            None => problems.push(format!(
                "attribute `{}` must be f32, vec2<f32>, vec3<f32> or vec4<f32>",
                input.name
            )),
        }
    }

    let mut uniforms: Vec<UniformInfo> = Vec::new();
    for stage in [vertex, fragment] {
        for (name, group, binding, ty) in uniform_globals(&stage.module) {
            if group != 0 {
                problems.push(format!("uniform `{name}` must live in @group(0), found @group({group})"));
                continue;
            }
            if !is_mat4(ty) {
                problems.push(format!("uniform `{name}` must be mat4x4<f32>"));
                continue;
            }
            match uniforms.iter().find(|u| u.binding == binding) {
                Some(existing) if existing.name != name => problems.push(format!(
                    "@binding({binding}) is `{}` in one stage and `{name}` in the other",
                    existing.name
                )),
                Some(_) => {}
                None => uniforms.push(UniformInfo { name, binding }),
            }
        }
    }

    if !problems.is_empty() {
        return Err(RenderError::ShaderLink {
            log: problems.join("\n"),
        });
    }

    attributes.sort_by_key(|a| a.location);
    uniforms.sort_by_key(|u| u.binding);
    Ok(LinkedInterface { attributes, uniforms })
}

/// One user-defined (`@location`) value crossing a stage boundary.
#[derive(Debug)]
struct Varying {
    name: String,
    location: u32,
    ty: TypeInner,
}

fn entry_point(stage: &CompiledStage) -> Option<&naga::EntryPoint> {
    stage
        .module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage.stage.naga() && ep.name == stage.entry)
}

fn stage_inputs(stage: &CompiledStage) -> Vec<Varying> {
    let mut out = Vec::new();
    if let Some(ep) = entry_point(stage) {
        for arg in &ep.function.arguments {
            collect_varyings(&stage.module, arg.name.as_deref(), arg.ty, arg.binding.as_ref(), &mut out);
        }
    }
    out
}

fn stage_outputs(stage: &CompiledStage) -> Vec<Varying> {
    let mut out = Vec::new();
    if let Some(result) = entry_point(stage).and_then(|ep| ep.function.result.as_ref()) {
        collect_varyings(&stage.module, None, result.ty, result.binding.as_ref(), &mut out);
    }
    out
}

// Builtins are skipped; unbound structs are flattened into their members.
fn collect_varyings(
    module: &Module,
    name: Option<&str>,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut Vec<Varying>,
) {
    let inner = &module.types[ty].inner;
    match binding {
        Some(Binding::Location { location, .. }) => out.push(Varying {
            name: name.unwrap_or_default().to_string(),
            location: *location,
            ty: inner.clone(),
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = inner {
                for member in members {
                    collect_varyings(module, member.name.as_deref(), member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

fn uniform_globals(module: &Module) -> impl Iterator<Item = (String, u32, u32, &TypeInner)> {
    module.global_variables.iter().filter_map(move |(_, var)| {
        if !matches!(var.space, AddressSpace::Uniform) {
            return None;
        }
        let binding = var.binding.as_ref()?;
        let name = var.name.clone().unwrap_or_default();
        Some((name, binding.group, binding.binding, &module.types[var.ty].inner))
    })
}

fn float_components(ty: &TypeInner) -> Option<u32> {
    match ty {
        TypeInner::Scalar(s) if s.kind == ScalarKind::Float && s.width == 4 => Some(1),
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float && scalar.width == 4 => {
            Some(*size as u32)
        }
        _ => None,
    }
}

fn is_mat4(ty: &TypeInner) -> bool {
    matches!(
        ty,
        TypeInner::Matrix { columns: VectorSize::Quad, rows: VectorSize::Quad, scalar }
            if scalar.kind == ScalarKind::Float && scalar.width == 4
    )
}
