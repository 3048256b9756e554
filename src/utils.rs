use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Switches the Windows console to UTF-8 with ANSI escapes so the report's
/// emoji and the coloured log output render.
#[cfg(windows)]
pub fn setup_console() {
    use windows_sys::Win32::System::Console::{
        GetConsoleMode, GetStdHandle, SetConsoleMode, SetConsoleOutputCP,
        ENABLE_VIRTUAL_TERMINAL_PROCESSING, STD_OUTPUT_HANDLE,
    };
    unsafe {
        SetConsoleOutputCP(65001);
        let handle = GetStdHandle(STD_OUTPUT_HANDLE);
        let mut mode = 0;
        if GetConsoleMode(handle, &mut mode) != 0 {
            SetConsoleMode(handle, mode | ENABLE_VIRTUAL_TERMINAL_PROCESSING);
        }
    }
}

#[cfg(not(windows))]
pub fn setup_console() {}

/// Cancels `token` on Ctrl-C.
pub async fn cancel_on_ctrl_c(token: CancellationToken) {
    cancel_on(tokio::signal::ctrl_c(), token).await
}

/// If the signal handler cannot be installed the monitor keeps running.
async fn cancel_on(signal: impl Future<Output = std::io::Result<()>>, token: CancellationToken) {
    match signal.await {
        Ok(()) => {
            info!("Shutdown signal received. Stopping health monitor...");
            token.cancel();
        }
        Err(e) => error!("Failed to listen for Ctrl-C, only a process kill will stop the monitor: {}", e),
    }
}
