use clap::Parser;

use gnode::cli::{Cli, Commands};
use gnode::config::{StaticConfig, get_config, init_config_from};
use gnode::errors::GnodeError;
use gnode::runtime::modes::run_server;
use gnode::system::logging::init_logging;

#[actix_web::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Commands::ConfigGen { output } = cli.command() {
        match output {
            Some(path) => match StaticConfig::default().save_to_file(path) {
                Ok(()) => println!("Sample configuration written to {}", path),
                Err(e) => {
                    eprintln!("{}", GnodeError::file_operation(e.to_string()).format_colored());
                    std::process::exit(1);
                }
            },
            None => print!("{}", StaticConfig::generate_sample_config()),
        }
        return;
    }

    init_config_from(&cli.config);
    let config = get_config();

    // guard 必须存活到进程结束，否则文件日志会丢失
    let _log_guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_server().await {
        match e.downcast_ref::<GnodeError>() {
            Some(err) => eprintln!("{}", err.format_colored()),
            None => eprintln!("Server error: {:#}", e),
        }
        std::process::exit(1);
    }
}
