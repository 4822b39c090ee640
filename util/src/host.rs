//! Host environment utility functions

use std::env;
use std::path::PathBuf;

/// Name of the environment variable giving the software root directory.
pub const SW_ROOT_ENV_VAR: &str = "YAWSWING_SW_ROOT";

/// Get the software root directory.
///
/// This is the directory containing the `params` and `sessions` directories.
/// It is taken from the `YAWSWING_SW_ROOT` environment variable if set,
/// otherwise the current working directory is used.
pub fn get_sw_root() -> std::io::Result<PathBuf> {
    match env::var_os(SW_ROOT_ENV_VAR) {
        Some(root) => Ok(PathBuf::from(root)),
        None => env::current_dir(),
    }
}
