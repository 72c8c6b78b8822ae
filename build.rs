fn main() {
    println!("cargo:rerun-if-changed=proto/reach.proto");

    let config = prost_build::Config::new();

    if let Err(err) = config.compile_protos(&["proto/reach.proto"], &["proto/"]) {
        println!("cargo:warning=prost-build failed to compile proto/reach.proto: {err}");
        std::process::exit(1);
    }
}
