// Build metadata from Cargo.toml, shown in the startup log and the dashboard footer

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");

/// `"<name> <version>"`, e.g. `fleetwatch 0.1.0`.
pub fn label() -> String {
    format!("{NAME} {VERSION}")
}
