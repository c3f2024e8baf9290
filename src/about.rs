use crate::config;

pub const LATWEB_DISPLAY_VERSION: &str = env!("LATWEB_DISPLAY_VERSION");
pub const LATWEB_BUILD_N: &str = env!("LATWEB_BUILD_N");

pub fn version_cli_text() -> String {
    format!(
        "latweb {}\nBuild {}\nForm controller for the Lattice Builder service\nBackend: {} ({})",
        LATWEB_DISPLAY_VERSION,
        LATWEB_BUILD_N,
        config::backend_url(),
        config::backend_url_source()
    )
}
