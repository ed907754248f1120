//! Loading, compiling and linking of the WGSL shader pair.
//!
//! Shaders come from two plain-text files on disk, one per stage. Before they
//! reach the GPU each stage is parsed and validated with `naga` (the compiler
//! `wgpu` itself uses), so a broken shader fails with a readable diagnostic
//! instead of a device error on pipeline creation. Linking then checks that the
//! vertex stage actually produces every location the fragment stage reads.

use std::{borrow::Cow, collections::BTreeMap, fmt, fs, path::Path};

use anyhow::{Context, bail};

use crate::config::ShaderPaths;

/// Pipeline stage a source file is compiled for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Name of the entry point every source for this stage has to define.
    pub fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Fragment => "fs_main",
        }
    }

    fn naga_stage(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Read a whole shader file into memory.
pub fn load_source(path: impl AsRef<Path>) -> anyhow::Result<String> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)
        .with_context(|| format!("could not read shader source {}", path.display()))?;
    log::debug!("loaded {} bytes of shader source from {}", source.len(), path.display());
    Ok(source)
}

/// A single validated stage.
#[derive(Debug)]
pub struct CompiledShader {
    stage: ShaderStage,
    label: String,
    source: String,
    module: naga::Module,
}

impl CompiledShader {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn entry_point(&self) -> &'static str {
        self.stage.entry_point()
    }

    /// Descriptor handed to `wgpu::Device::create_shader_module`.
    pub fn module_descriptor(&self) -> wgpu::ShaderModuleDescriptor<'_> {
        wgpu::ShaderModuleDescriptor {
            label: Some(&self.label),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(&self.source)),
        }
    }

    fn entry(&self) -> Option<&naga::EntryPoint> {
        self.module
            .entry_points
            .iter()
            .find(|ep| ep.stage == self.stage.naga_stage() && ep.name == self.stage.entry_point())
    }

    /// User-defined locations of the entry point's inputs.
    fn input_locations(&self) -> BTreeMap<u32, naga::TypeInner> {
        let mut locations = BTreeMap::new();
        if let Some(entry) = self.entry() {
            for argument in &entry.function.arguments {
                collect_locations(&self.module, argument.ty, argument.binding.as_ref(), &mut locations);
            }
        }
        locations
    }

    /// User-defined locations of the entry point's result.
    fn output_locations(&self) -> BTreeMap<u32, naga::TypeInner> {
        let mut locations = BTreeMap::new();
        if let Some(result) = self.entry().and_then(|entry| entry.function.result.as_ref()) {
            collect_locations(&self.module, result.ty, result.binding.as_ref(), &mut locations);
        }
        locations
    }
}

fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut BTreeMap<u32, naga::TypeInner>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            out.insert(*location, module.types[ty].inner.clone());
        }
        Some(naga::Binding::BuiltIn(_)) => (),
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

/// Parse and validate `source` as a shader for `stage`.
///
/// The returned error carries the compiler diagnostic rendered against the source,
/// the same text is logged at error level.
pub fn compile(stage: ShaderStage, label: &str, source: &str) -> anyhow::Result<CompiledShader> {
    let module = match naga::front::wgsl::parse_str(source) {
        Ok(module) => module,
        Err(e) => {
            let diagnostic = e.emit_to_string(source);
            log::error!("{} shader {} failed to compile:\n{}", stage, label, diagnostic);
            bail!("{} shader {} failed to compile:\n{}", stage, label, diagnostic);
        }
    };

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    if let Err(e) = validator.validate(&module) {
        let diagnostic = e.emit_to_string(source);
        log::error!("{} shader {} failed validation:\n{}", stage, label, diagnostic);
        bail!("{} shader {} failed validation:\n{}", stage, label, diagnostic);
    }

    let compiled = CompiledShader {
        stage,
        label: label.to_string(),
        source: source.to_string(),
        module,
    };
    if compiled.entry().is_none() {
        log::error!("{} shader {} has no @{} fn {}", stage, label, stage, stage.entry_point());
        bail!(
            "{} shader {} has no @{} entry point named {}",
            stage,
            label,
            stage,
            stage.entry_point()
        );
    }
    Ok(compiled)
}

/// A vertex and a fragment stage that fit together.
#[derive(Debug)]
pub struct ShaderPair {
    pub vertex: CompiledShader,
    pub fragment: CompiledShader,
}

impl ShaderPair {
    /// Load, compile and link both stages from disk.
    pub fn load(paths: &ShaderPaths) -> anyhow::Result<Self> {
        let vertex_source = load_source(&paths.vertex)?;
        let fragment_source = load_source(&paths.fragment)?;
        let vertex = compile(ShaderStage::Vertex, &label_for(&paths.vertex), &vertex_source)?;
        let fragment = compile(
            ShaderStage::Fragment,
            &label_for(&paths.fragment),
            &fragment_source,
        )?;
        link(vertex, fragment)
    }
}

fn label_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Check the interface between the two stages.
pub fn link(vertex: CompiledShader, fragment: CompiledShader) -> anyhow::Result<ShaderPair> {
    if vertex.stage != ShaderStage::Vertex {
        bail!("{} was compiled as a {} shader, expected vertex", vertex.label, vertex.stage);
    }
    if fragment.stage != ShaderStage::Fragment {
        bail!(
            "{} was compiled as a {} shader, expected fragment",
            fragment.label,
            fragment.stage
        );
    }

    let produced = vertex.output_locations();
    for (location, expected) in fragment.input_locations() {
        match produced.get(&location) {
            Some(ty) if *ty == expected => (),
            Some(ty) => {
                log::error!(
                    "link failed: location {} is {:?} in {} but {:?} in {}",
                    location,
                    ty,
                    vertex.label,
                    expected,
                    fragment.label
                );
                bail!(
                    "shader link failed: @location({}) has type {:?} in {} but {:?} in {}",
                    location,
                    ty,
                    vertex.label,
                    expected,
                    fragment.label
                );
            }
            None => {
                log::error!(
                    "link failed: {} reads location {} which {} never writes",
                    fragment.label,
                    location,
                    vertex.label
                );
                bail!(
                    "shader link failed: {} reads @location({}) which {} does not output",
                    fragment.label,
                    location,
                    vertex.label
                );
            }
        }
    }

    log::info!("linked shader pair {} + {}", vertex.label, fragment.label);
    Ok(ShaderPair { vertex, fragment })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) brightness: f32,
}

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(position, 1.0);
    out.brightness = 1.0;
    return out;
}
"#;

    const FRAGMENT: &str = r#"
@fragment
fn fs_main(@location(0) brightness: f32) -> @location(0) vec4<f32> {
    return vec4<f32>(brightness, 0.0, 0.0, 1.0);
}
"#;

    #[test]
    fn compiles_valid_stages() {
        let vertex = compile(ShaderStage::Vertex, "vert", VERTEX).unwrap();
        assert_eq!(vertex.stage(), ShaderStage::Vertex);
        assert_eq!(vertex.entry_point(), "vs_main");
        assert_eq!(vertex.label(), "vert");
        let fragment = compile(ShaderStage::Fragment, "frag", FRAGMENT).unwrap();
        assert_eq!(fragment.entry_point(), "fs_main");
    }

    #[test]
    fn module_descriptor_carries_label_and_source() {
        let vertex = compile(ShaderStage::Vertex, "vert", VERTEX).unwrap();
        let desc = vertex.module_descriptor();
        assert_eq!(desc.label, Some("vert"));
        match desc.source {
            wgpu::ShaderSource::Wgsl(source) => assert_eq!(source, VERTEX),
            _ => panic!("expected WGSL source"),
        }
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = compile(ShaderStage::Vertex, "broken", "fn vs_main( {").unwrap_err();
        assert!(err.to_string().contains("failed to compile"));
    }

    #[test]
    fn empty_source_has_no_entry_point() {
        let err = compile(ShaderStage::Fragment, "empty", "").unwrap_err();
        assert!(err.to_string().contains("fs_main"));
    }

    #[test]
    fn type_errors_fail_validation() {
        let source = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    let x: f32 = 1.0;
    return x;
}
"#;
        assert!(compile(ShaderStage::Fragment, "mistyped", source).is_err());
    }

    #[test]
    fn wrong_stage_is_rejected() {
        // a fragment source does not satisfy the vertex stage
        let err = compile(ShaderStage::Vertex, "frag-as-vert", FRAGMENT).unwrap_err();
        assert!(err.to_string().contains("vs_main"));
    }

    #[test]
    fn links_matching_pair() {
        let vertex = compile(ShaderStage::Vertex, "vert", VERTEX).unwrap();
        let fragment = compile(ShaderStage::Fragment, "frag", FRAGMENT).unwrap();
        let pair = link(vertex, fragment).unwrap();
        assert_eq!(pair.vertex.label(), "vert");
        assert_eq!(pair.fragment.label(), "frag");
    }

    #[test]
    fn link_rejects_swapped_stages() {
        let vertex = compile(ShaderStage::Vertex, "vert", VERTEX).unwrap();
        let fragment = compile(ShaderStage::Fragment, "frag", FRAGMENT).unwrap();
        assert!(link(fragment, vertex).is_err());
    }

    #[test]
    fn link_rejects_unproduced_location() {
        let fragment = r#"
@fragment
fn fs_main(@location(3) tint: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(tint, 1.0);
}
"#;
        let vertex = compile(ShaderStage::Vertex, "vert", VERTEX).unwrap();
        let fragment = compile(ShaderStage::Fragment, "frag", fragment).unwrap();
        let err = link(vertex, fragment).unwrap_err();
        assert!(err.to_string().contains("@location(3)"));
    }

    #[test]
    fn link_rejects_mismatched_location_type() {
        let fragment = r#"
@fragment
fn fs_main(@location(0) tint: vec4<f32>) -> @location(0) vec4<f32> {
    return tint;
}
"#;
        let vertex = compile(ShaderStage::Vertex, "vert", VERTEX).unwrap();
        let fragment = compile(ShaderStage::Fragment, "frag", fragment).unwrap();
        let err = link(vertex, fragment).unwrap_err();
        assert!(err.to_string().contains("has type"));
    }

    #[test]
    fn load_source_reads_whole_file() {
        let path = std::env::temp_dir().join(format!("trigon-load-{}.wgsl", std::process::id()));
        fs::write(&path, FRAGMENT).unwrap();
        let source = load_source(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(source, FRAGMENT);
    }

    #[test]
    fn load_source_reports_missing_path() {
        let path = std::env::temp_dir().join("trigon-definitely-missing.wgsl");
        let err = load_source(&path).unwrap_err();
        assert!(err.to_string().contains("trigon-definitely-missing.wgsl"));
    }

    #[test]
    fn pair_load_fails_on_missing_fragment() {
        let dir = std::env::temp_dir();
        let vertex = dir.join(format!("trigon-pair-{}.vert.wgsl", std::process::id()));
        fs::write(&vertex, VERTEX).unwrap();
        let paths = ShaderPaths {
            vertex: vertex.clone(),
            fragment: dir.join("trigon-pair-missing.frag.wgsl"),
        };
        let result = ShaderPair::load(&paths);
        fs::remove_file(&vertex).unwrap();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("trigon-pair-missing.frag.wgsl"));
    }
}
