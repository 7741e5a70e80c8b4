fn main() {
    if std::env::var_os("CARGO_FEATURE_LIBOPUS").is_some() {
        println!("cargo:rustc-link-search=native=/opt/homebrew/lib");
        println!("cargo:rustc-link-lib=opus");
    }
}
