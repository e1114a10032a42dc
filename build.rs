//! Stamps `MARIONETTE_VERSION` into the build.
use std::process::Command;

#[allow(clippy::print_stdout)]
fn main() {
    // Prefer MARIONETTE_VERSION if set (e.g., by a release pipeline),
    // otherwise fall back to git describe for local development builds.
    if let Ok(version) = std::env::var("MARIONETTE_VERSION") {
        println!("cargo:rustc-env=MARIONETTE_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=MARIONETTE_VERSION={version}");
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=MARIONETTE_VERSION");
}
