use crate::config::BrowserConfig;
use headless_chrome::browser::default_executable;
use headless_chrome::{Browser, LaunchOptions};
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

/// Launches Chrome.
///
/// With a `user_data_dir` the browser keeps its cookies there, which is what
/// carries the logged-in session between runs. A profile that Chrome cannot
/// open is wiped once and the launch retried.
///
/// The executable comes from `BrowserConfig::chrome_path`, then
/// `QUICKAPPLY_CHROME_PATH`, then the system default.
pub fn create_browser(
    config: &BrowserConfig,
    user_data_dir: Option<PathBuf>,
) -> anyhow::Result<Browser> {
    let user_agent = OsString::from(format!("--user-agent={}", config.user_agent));
    let persistent = user_data_dir.is_some();

    let mut attempts = 0;
    loop {
        let mut options = LaunchOptions::default_builder();
        let mut launch_options = options
            .headless(config.headless)
            .sandbox(false)
            .idle_browser_timeout(Duration::from_secs(600))
            .window_size(Some((1280, 900)))
            .enable_gpu(false)
            .args(vec![
                user_agent.as_os_str(),
                OsStr::new("--no-first-run"),
                OsStr::new("--no-default-browser-check"),
                OsStr::new("--disable-session-crashed-bubble"),
                OsStr::new("--lang=en-US"),
            ])
            .user_data_dir(user_data_dir.clone());

        if let Some(path) = &config.chrome_path {
            launch_options = launch_options.path(Some(path.clone()));
        } else if let Ok(path) = std::env::var("QUICKAPPLY_CHROME_PATH") {
            launch_options = launch_options.path(Some(path.into()));
        } else if let Ok(executable_path) = default_executable() {
            launch_options = launch_options.path(Some(executable_path));
        }

        let launch_options = launch_options
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid browser options: {}", e))?;

        match Browser::new(launch_options) {
            Ok(browser) => return Ok(browser),
            Err(e) => {
                attempts += 1;
                if attempts >= 2 || !persistent {
                    anyhow::bail!("Browser failed to start: {}", e);
                }
                log::warn!("[!] Browser failed to start. Wiping profile and retrying...");
                crate::utils::wipe_user_data_dir().map_err(|e| anyhow::anyhow!("{}", e))?;
            }
        }
    }
}

/// The tab Chrome opened with, or a new one.
pub fn initial_tab(browser: &Browser) -> anyhow::Result<Arc<headless_chrome::Tab>> {
    for _ in 0..10 {
        if let Ok(tabs) = browser.get_tabs().lock() {
            if let Some(tab) = tabs.first() {
                return Ok(Arc::clone(tab));
            }
        }
        sleep(Duration::from_millis(200));
    }
    browser.new_tab()
}
