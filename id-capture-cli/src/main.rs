mod cli;
#[cfg(target_os = "linux")]
mod commands;
#[cfg(target_os = "linux")]
mod delegate;

use std::process::ExitCode;

use clap::Parser;

use cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

#[cfg(target_os = "linux")]
async fn run(args: Args) -> Result<(), String> {
    if args.list_devices {
        let devices = commands::list_devices().await?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&devices).map_err(|e| e.to_string())?);
        } else if devices.is_empty() {
            println!("No cameras found");
        } else {
            println!("Available cameras:");
            for device in &devices {
                println!("  {} - {}", device.id, device.label);
            }
        }
        return Ok(());
    }

    let config = commands::load_configuration(&args)?;
    let report = commands::run_session(&args, config).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?);
    } else if let Some(text) = &report.text {
        println!("{}", text);
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
async fn run(_args: Args) -> Result<(), String> {
    Err("camera capture is only supported on Linux".into())
}
