//! Build script for the site crate.
//!
//! Exposes a short content hash of `static/css/main.css` as `CSS_HASH` so
//! templates can link `main.css?v={hash}` and let browsers cache it forever.

use std::env;
use std::fs;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

fn main() {
    let manifest_dir = PathBuf::from(
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo"),
    );
    let css_path = manifest_dir.join("static/css/main.css");
    println!("cargo:rerun-if-changed={}", css_path.display());

    let hash = fs::read(&css_path).map_or_else(
        |e| {
            println!("cargo:warning=Could not read main.css: {e}");
            String::from("dev")
        },
        |content| {
            let digest = format!("{:x}", Sha256::digest(&content));
            digest.chars().take(10).collect()
        },
    );

    println!("cargo:rustc-env=CSS_HASH={hash}");
}
