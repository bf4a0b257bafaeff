use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    // Embed the Windows manifest that requests administrator privileges
    let _ = embed_resource::compile("wuwa-scanner.rc", embed_resource::NONE);
    println!("cargo:rerun-if-changed=wuwa-scanner.rc");
    println!("cargo:rerun-if-changed=wuwa-scanner.exe.manifest");

    // Copy the catalog and config next to the executable
    let target_dir = target_dir();
    copy_data(&target_dir);
    copy_config(&target_dir);
}

/// target/release (or target/debug), found from OUT_DIR.
fn target_dir() -> PathBuf {
    let out_dir = env::var("OUT_DIR").unwrap();
    // OUT_DIR is target/<profile>/build/wuwa-scanner-xxx/out
    Path::new(&out_dir)
        .ancestors()
        .nth(3)
        .expect("Could not find target directory")
        .to_path_buf()
}

/// Recursively copies a directory and its contents.
fn copy_dir_recursive(src: &Path, dst: &Path) {
    let _ = fs::create_dir_all(dst);

    if let Ok(entries) = fs::read_dir(src) {
        for entry in entries.flatten() {
            let src_path = entry.path();
            let dst_path = dst.join(entry.file_name());

            if src_path.is_dir() {
                copy_dir_recursive(&src_path, &dst_path);
            } else {
                let _ = fs::copy(&src_path, &dst_path);
            }
        }
    }
}

/// Copies the catalog tables (data/) to the target directory.
fn copy_data(target_dir: &Path) {
    let data_src = Path::new("data");
    if data_src.exists() {
        copy_dir_recursive(data_src, &target_dir.join("data"));
        println!("cargo:rerun-if-changed=data/");
    }
}

/// Copies config.json to the target directory.
fn copy_config(target_dir: &Path) {
    let config_src = Path::new("config.json");
    if config_src.exists() {
        let _ = fs::copy(config_src, target_dir.join("config.json"));
        println!("cargo:rerun-if-changed=config.json");
    }
}
