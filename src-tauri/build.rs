//! Build script for the Lex Laboris Tauri app.
//!
//! Generates the Tauri context (config, capabilities, icons) consumed by
//! `tauri::generate_context!()` in lib.rs.

fn main() {
    tauri_build::build();
}
