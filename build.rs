use std::path::PathBuf;

fn main() {
    // Check if we're in CI - fail hard on missing dependencies
    let is_ci = std::env::var("CI").is_ok();

    // `include_dir!` in `api::static_files` embeds this directory at compile
    // time; it must exist (even empty) or the build fails outright.
    let web_dist = PathBuf::from("web/dist");
    if !web_dist.is_dir() {
        let msg = "web/dist not found. Build the admin SPA first, or commit a placeholder index.html.";
        if is_ci {
            panic!("{msg}");
        } else if let Err(e) = std::fs::create_dir_all(&web_dist) {
            println!("cargo:warning=Failed to create {}: {e}", web_dist.display());
        } else {
            println!("cargo:warning={msg}");
        }
    }

    println!("cargo:rerun-if-changed=web/dist/");
}
