#[cfg(not(target_arch = "wasm32"))]
fn main() {
    let args: Vec<String> = std::env::args().collect();
    let mut module = glm_wasm::modules::ComputeGlmModule::new();
    std::process::exit(glm_wasm::cmdline::load_parse(&mut module, &args));
}

#[cfg(target_arch = "wasm32")]
fn main() {}
