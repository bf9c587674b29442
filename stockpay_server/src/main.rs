use clap::Parser;
use dotenvy::dotenv;
use log::info;
use stockpay_server::{
    cli::{Arguments, Command},
    commands::run_command,
    config::ServerConfig,
    server::run_server,
};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let args = Arguments::parse();
    let config = ServerConfig::from_env_or_default();
    let result = match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("🚀️ Starting server on {}:{}", config.host, config.port);
            run_server(config).await
        },
        command => run_command(command, config).await,
    };
    match result {
        Ok(_) => println!("Bye!"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        },
    }
}
