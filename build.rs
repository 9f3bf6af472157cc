// Bakes the short git hash into `glyphcam --version`. Builds outside a git
// checkout simply report the crate version.
fn main() {
    let Ok(output) = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
    else {
        return;
    };
    if !output.status.success() {
        return;
    }
    if let Ok(hash) = String::from_utf8(output.stdout) {
        println!("cargo:rustc-env=GLYPHCAM_GIT_HASH={}", hash.trim());
    }
}
