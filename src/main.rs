//! Sys2 entry point. The binary requires the `cli` feature.

fn main() {
    std::process::exit(sys2::cli::run_cli());
}
