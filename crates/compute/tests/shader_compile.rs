use std::path::PathBuf;

fn shader_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../shaders").join(name)
}

// Parses and validates a WGSL file, returning the module for further checks.
fn validate_wgsl_shader(name: &str) -> naga::Module {
    let path = shader_path(name);
    let shader_source = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => panic!("Failed to read shader file {path:?}: {e}"),
    };

    let module = match naga::front::wgsl::parse_str(&shader_source) {
        Ok(m) => m,
        Err(e) => panic!(
            "WGSL parsing error in {path:?}:\n{error_report}",
            error_report = e.emit_to_string(&shader_source)
        ),
    };

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    if let Err(e) = validator.validate(&module) {
        panic!(
            "WGSL validation error in {path:?}:\n{error_report}",
            error_report = e.emit_to_string(&shader_source)
        );
    }
    module
}

fn struct_span(module: &naga::Module, name: &str) -> u32 {
    let (_, ty) = module
        .types
        .iter()
        .find(|(_, ty)| ty.name.as_deref() == Some(name))
        .unwrap_or_else(|| panic!("struct {name} not declared"));
    match ty.inner {
        naga::TypeInner::Struct { span, .. } => span,
        ref other => panic!("{name} is not a struct: {other:?}"),
    }
}

#[test]
fn validate_raymarch_shader_compiles() {
    validate_wgsl_shader("raymarch.wgsl");
}

#[test]
fn validate_blit_shader_compiles() {
    let module = validate_wgsl_shader("blit.wgsl");
    let stages: Vec<_> = module.entry_points.iter().map(|ep| ep.stage).collect();
    assert!(stages.contains(&naga::ShaderStage::Vertex), "blit needs a vertex stage");
    assert!(stages.contains(&naga::ShaderStage::Fragment), "blit needs a fragment stage");
}

#[test]
fn included_kernel_source_matches_file() {
    let on_disk = std::fs::read_to_string(shader_path("raymarch.wgsl")).unwrap();
    assert_eq!(compute::Kernel::Raymarch.source(), on_disk);
}

#[test]
fn shape_struct_is_tightly_packed() {
    let module = validate_wgsl_shader("raymarch.wgsl");
    assert_eq!(
        struct_span(&module, "Shape") as usize,
        compute::layout::SHAPE_STRIDE,
        "WGSL Shape must match the 56-byte host record"
    );
}

#[test]
fn frame_uniform_matches_host_block() {
    let module = validate_wgsl_shader("raymarch.wgsl");
    assert_eq!(
        struct_span(&module, "Frame") as usize,
        std::mem::size_of::<compute::layout::FrameBlock>()
    );
}

#[test]
fn reflected_group_size_matches_backend_query() {
    let backend = compute::CpuBackend::new();
    let queried = compute::ComputeBackend::kernel_thread_group_size(&backend, &compute::Kernel::Raymarch).unwrap();
    assert_eq!(queried, [8, 8, 1]);
}

#[test]
fn raymarch_bindings_match_host_slots() {
    use compute::layout;

    let module = validate_wgsl_shader("raymarch.wgsl");
    let mut slots: Vec<u32> = module
        .global_variables
        .iter()
        .filter_map(|(_, var)| var.binding.as_ref())
        .filter(|binding| binding.group == 0)
        .map(|binding| binding.binding)
        .collect();
    slots.sort_unstable();
    assert_eq!(slots.len() as u32, compute::Kernel::Raymarch.binding_count());
    assert_eq!(
        slots,
        [layout::TEXTURE_SOURCE, layout::STORAGE_DEST, layout::STORAGE_SHAPES, layout::UNIFORM_FRAME]
    );
}
