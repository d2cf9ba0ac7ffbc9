use std::env;
use std::path::PathBuf;

fn main() {
    lalrpop::process_root().unwrap();

    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let header = PathBuf::from(&crate_dir).join("include").join("asset_query.h");

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("ASSET_QUERY_H")
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(header);
        }
        Err(e) => println!("cargo:warning=C header not generated: {}", e),
    }

    println!("cargo:rerun-if-changed=src/ffi/mod.rs");
    println!("cargo:rerun-if-changed=src/parser/filter.lalrpop");
}
