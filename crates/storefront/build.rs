//! Build script for the storefront crate.
//!
//! Hashes the stylesheet and browser scripts into a single `ASSET_VERSION`
//! so templates can append `?v=<hash>` and browsers refetch after a deploy.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Assets whose content feeds the version hash, relative to the crate root.
const HASHED_ASSETS: &[&str] = &[
    "static/css/main.css",
    "static/js/chat.js",
    "static/js/notification.js",
    "static/js/translator.js",
];

fn main() {
    let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") else {
        println!("cargo:rustc-env=ASSET_VERSION=dev");
        return;
    };

    let mut hasher = Sha256::new();
    for asset in HASHED_ASSETS {
        let path = Path::new(&manifest_dir).join(asset);
        println!("cargo:rerun-if-changed={}", path.display());

        match fs::read(&path) {
            Ok(content) => hasher.update(&content),
            Err(e) => println!("cargo:warning=Could not read {asset}: {e}"),
        }
    }

    let hash = format!("{:x}", hasher.finalize());
    let short: String = hash.chars().take(8).collect();
    println!("cargo:rustc-env=ASSET_VERSION={short}");
}
