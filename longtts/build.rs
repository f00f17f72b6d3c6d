use std::path::Path;
use std::process::Command;

/// Shared libraries some espeak-ng builds link against and do not pull in
/// themselves.
const ESPEAK_COMPANIONS: [&str; 2] = ["sonic", "pcaudio"];

const LIBRARY_DIRS: [&str; 6] = [
    "/lib",
    "/lib64",
    "/usr/lib",
    "/usr/lib64",
    "/usr/local/lib",
    "/usr/lib/x86_64-linux-gnu",
];

fn in_ld_cache(soname: &str) -> bool {
    Command::new("ldconfig")
        .arg("-p")
        .output()
        .map(|out| out.status.success() && String::from_utf8_lossy(&out.stdout).contains(soname))
        .unwrap_or(false)
}

fn library_exists(name: &str) -> bool {
    let soname = format!("lib{name}.so");
    in_ld_cache(&soname) || LIBRARY_DIRS.iter().any(|dir| Path::new(dir).join(&soname).exists())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    if !cfg!(target_os = "linux") {
        return;
    }
    for lib in ESPEAK_COMPANIONS {
        if library_exists(lib) {
            println!("cargo:rustc-link-lib={lib}");
        }
    }
}
