use anyhow::Result;
use tui_achievement_tracker::config::AppConfig;
use tui_achievement_tracker::internal::ui::app::App;
use tui_achievement_tracker::internal::ui::log_viewer::LOG_FILE_NAME;
use tui_achievement_tracker::tui;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load();

    // While the TUI owns the terminal, logs go to a daily file instead of stderr.
    match tui::init() {
        Ok(terminal) => {
            let log_dir = config.logging.log_directory.as_deref().unwrap_or("logs");
            let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
            let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

            // RUST_LOG wins over the configured levels
            let env_filter = match std::env::var("RUST_LOG") {
                Ok(_) => tracing_subscriber::EnvFilter::from_default_env(),
                Err(_) => tracing_subscriber::EnvFilter::new(config.logging.filter_directives()),
            };

            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .compact()
                .init();

            let res = match App::new(config) {
                Ok(mut app) => app.run(terminal).await,
                Err(e) => Err(e),
            };

            tui::restore()?;

            if let Err(err) = res {
                tracing::error!("{err:?}");
                eprintln!("{err:?}");
            }

            Ok(())
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .init();

            eprintln!("Failed to initialize TUI: {e:?}");
            Err(e.into())
        }
    }
}
