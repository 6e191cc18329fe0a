use dotenvy::dotenv;
use log::info;
use tradehall_bot::{cli::handle_command_line_args, config::BotConfig, daemon::run};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    if handle_command_line_args() {
        return;
    }
    let config = BotConfig::from_env_or_default();

    info!("🚀️ Starting the Tradehall daemon");
    match run(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}
