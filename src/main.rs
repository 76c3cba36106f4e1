mod app;
mod domain;
mod infra;
mod platform;
mod ui;
mod usecase;

#[cfg(test)]
mod tests;

use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = fmt().with_env_filter(filter).with_target(false).try_init() {
        warn!(error = %err, "tracing init failed");
    }
}

#[cfg(feature = "desktop")]
fn main() -> anyhow::Result<()> {
    use crate::platform::desktop::paths::default_webview_data_dir;

    init_tracing();
    let webview_data_dir = default_webview_data_dir()?;

    dioxus::LaunchBuilder::desktop()
        .with_cfg(
            dioxus::desktop::Config::new()
                .with_window(dioxus::desktop::WindowBuilder::new().with_title("OU Linker"))
                .with_data_directory(webview_data_dir),
        )
        .launch(App);
    Ok(())
}

#[cfg(not(feature = "desktop"))]
fn main() {
    init_tracing();
    dioxus::launch(App);
}
