//! Generates the per-arity typed mailbox specializations.

use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let unit = postbox_codegen::emit(postbox_codegen::MAX_ARITY);
    std::fs::write(out_dir.join("typed_mailbox.rs"), unit)
        .expect("failed to write generated typed mailbox unit");
    println!("cargo::rerun-if-changed=build.rs");
}
