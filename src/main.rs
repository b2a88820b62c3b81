use lab_timetable::config::ServerConfig;
use lab_timetable::server;
use log::error;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = server::run_server(ServerConfig::from_env()).await {
        error!("Failed to start server: {e}");
        std::process::exit(1);
    }
}
