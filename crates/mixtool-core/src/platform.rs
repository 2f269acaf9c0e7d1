use std::path::PathBuf;

/// IPC endpoint mixtool expects the player on. The host mpv must be started
/// with `--input-ipc-server=<this>` — or mixtool spawns its own idle player
/// with the same argument.
#[cfg(unix)]
pub fn mpv_socket_name() -> String {
    format!("{}/mixtool-mpv.sock", std::env::temp_dir().display())
}

#[cfg(windows)]
pub fn mpv_socket_name() -> String {
    "mixtool-mpv".to_string()
}

#[cfg(unix)]
pub fn mpv_socket_arg(socket: &str) -> String {
    format!("--input-ipc-server={}", socket)
}

#[cfg(windows)]
pub fn mpv_socket_arg(socket: &str) -> String {
    format!("--input-ipc-server=\\\\.\\pipe\\{}", socket)
}

pub fn data_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("mixtool")
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mixtool")
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".config")
            .join("mixtool")
    }
    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mixtool")
    }
}

/// Locate an mpv binary: PATH first, then a few conventional spots.
pub fn find_mpv_binary() -> Option<PathBuf> {
    if let Ok(path_var) = std::env::var("PATH") {
        for dir in std::env::split_paths(&path_var) {
            let candidate = dir.join(mpv_binary_name());
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    #[cfg(unix)]
    let extra = ["/usr/local/bin/mpv", "/opt/homebrew/bin/mpv"];
    #[cfg(windows)]
    let extra = ["C:\\Program Files\\mpv\\mpv.exe"];

    extra
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

#[cfg(unix)]
fn mpv_binary_name() -> &'static str {
    "mpv"
}

#[cfg(windows)]
fn mpv_binary_name() -> &'static str {
    "mpv.exe"
}
