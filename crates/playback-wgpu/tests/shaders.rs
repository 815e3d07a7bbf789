//! Parses and validates the WGSL programs without a GPU

use naga::{
    ShaderStage,
    valid::{Capabilities, ValidationFlags, Validator},
};

const YUV_TO_RGB: &str = include_str!("../src/shaders/yuv_to_rgb.wgsl");
const PASSTHROUGH: &str = include_str!("../src/shaders/passthrough.wgsl");

fn validate(name: &str, source: &str) -> naga::Module {
    let module = naga::front::wgsl::parse_str(source).unwrap_or_else(|error| panic!("{name}: {}", error.emit_to_string(source)));

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .unwrap_or_else(|error| panic!("{name}: {error:?}"));

    module
}

fn entry_points(module: &naga::Module) -> Vec<(String, ShaderStage)> {
    module.entry_points.iter().map(|entry| (entry.name.clone(), entry.stage)).collect()
}

fn binding_count(module: &naga::Module) -> usize {
    module.global_variables.iter().filter(|(_, variable)| variable.binding.as_ref().is_some_and(|binding| binding.group == 0)).count()
}

#[test]
fn test_yuv_to_rgb_is_valid() {
    let module = validate("yuv_to_rgb.wgsl", YUV_TO_RGB);

    assert_eq!(entry_points(&module), vec![("vs_main".to_string(), ShaderStage::Vertex), ("fs_main".to_string(), ShaderStage::Fragment)]);
    // Three planes and one sampler
    assert_eq!(binding_count(&module), 4);
}

#[test]
fn test_passthrough_is_valid() {
    let module = validate("passthrough.wgsl", PASSTHROUGH);

    assert_eq!(entry_points(&module), vec![("vs_main".to_string(), ShaderStage::Vertex), ("fs_main".to_string(), ShaderStage::Fragment)]);
    assert_eq!(binding_count(&module), 2);
}
