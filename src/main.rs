//! mousekeys - remap extra mouse buttons to keyboard shortcuts
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  /dev/input/eventN (physical mouse)      │
//! │                  ↓                       │
//! │  Event Loop  →  Mapping Table lookup     │
//! │                  ↓                       │
//! │  Synthesizer (press / sync / release)    │
//! │                  ↓                       │
//! │  uinput virtual keyboard                 │
//! └──────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod event_loop;
mod input;
mod ioctl_helpers;
mod lifecycle;
mod mapping;
mod signals;
mod synth;
mod uinput;

use anyhow::Result;
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::error::MouseKeysError;
use crate::event_loop::LoopOutcome;

/// What the command line asked for
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Help,
    Version,
    InitConfig { force: bool },
    PrintConfig { config: Option<PathBuf> },
    Run {
        device: PathBuf,
        config: Option<PathBuf>,
        verbose: bool,
    },
}

fn parse_args(args: &[String]) -> Result<Command, MouseKeysError> {
    if args.iter().any(|a| a == "--help" || a == "-h") {
        return Ok(Command::Help);
    }
    if args.iter().any(|a| a == "--version" || a == "-V") {
        return Ok(Command::Version);
    }

    let mut config = None;
    let mut verbose = false;
    let mut force = false;
    let mut init_config = false;
    let mut print_config = false;
    let mut positional = Vec::new();

    for arg in args {
        if let Some(path) = arg.strip_prefix("--config=") {
            config = Some(PathBuf::from(path));
        } else if arg == "--verbose" || arg == "-v" {
            verbose = true;
        } else if arg == "--force" || arg == "-f" {
            force = true;
        } else if arg == "--init-config" {
            init_config = true;
        } else if arg == "--print-config" {
            print_config = true;
        } else if arg.starts_with('-') {
            return Err(MouseKeysError::Argument(format!("unknown option: {}", arg)));
        } else {
            positional.push(arg);
        }
    }

    if init_config {
        return Ok(Command::InitConfig { force });
    }
    if print_config {
        return Ok(Command::PrintConfig { config });
    }

    match positional.as_slice() {
        [device] => Ok(Command::Run {
            device: PathBuf::from(device.as_str()),
            config,
            verbose,
        }),
        [] => Err(MouseKeysError::Argument("missing device path".into())),
        _ => Err(MouseKeysError::Argument(format!(
            "expected one device path, got {}",
            positional.len()
        ))),
    }
}

fn print_help() {
    println!(
        r#"mousekeys {} - remap extra mouse buttons to keyboard shortcuts

USAGE:
    mousekeys [OPTIONS] DEVICE

ARGS:
    DEVICE                  Input device node, e.g. /dev/input/event5

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    -v, --verbose           Debug logging (RUST_LOG overrides)
    --config=PATH           Use this config file
    --init-config           Write the default config file
    -f, --force             Overwrite config file with --init-config
    --print-config          Print the effective configuration

EXAMPLES:
    sudo mousekeys /dev/input/by-id/usb-Logitech_USB_Receiver-event-mouse
    mousekeys --init-config

CONFIG FILE:
    ~/.config/mousekeys/config.toml (or $MOUSEKEYS_CONFIG)
"#,
        env!("CARGO_PKG_VERSION")
    );
}

fn print_usage() {
    eprintln!("Usage: mousekeys [OPTIONS] DEVICE (see --help)");
}

fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            init_logger(false);
            eprintln!("mousekeys: {}", e);
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let verbose = matches!(command, Command::Run { verbose: true, .. });
    init_logger(verbose);

    match execute(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mousekeys: {:#}", e);
            if let Some(hint) = e.downcast_ref::<MouseKeysError>().and_then(|e| e.hint()) {
                eprintln!("{}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Command) -> Result<()> {
    match command {
        Command::Help => print_help(),
        Command::Version => println!("mousekeys {}", env!("CARGO_PKG_VERSION")),
        Command::InitConfig { force } => {
            let path = config::Config::write_default_config(force)?;
            println!("Config file generated: {}", path.display());
        }
        Command::PrintConfig { config } => {
            let cfg = config::Config::load(config.as_deref())?;
            print!("{}", cfg.to_toml()?);
        }
        Command::Run { device, config, .. } => {
            info!("mousekeys starting...");
            let cfg = config::Config::load(config.as_deref())?;
            match lifecycle::run(&device, &cfg)? {
                LoopOutcome::Cancelled => info!("Stopped by signal"),
                LoopOutcome::DeviceRemoved => info!("Device removed"),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_device_argument() {
        assert_eq!(
            parse_args(&args(&["/dev/input/event3"])).unwrap(),
            Command::Run {
                device: PathBuf::from("/dev/input/event3"),
                config: None,
                verbose: false,
            }
        );
    }

    #[test]
    fn test_options_with_device() {
        assert_eq!(
            parse_args(&args(&["-v", "--config=/tmp/mk.toml", "/dev/input/event3"])).unwrap(),
            Command::Run {
                device: PathBuf::from("/dev/input/event3"),
                config: Some(PathBuf::from("/tmp/mk.toml")),
                verbose: true,
            }
        );
    }

    #[test]
    fn test_wrong_arity_is_argument_error() {
        assert!(matches!(
            parse_args(&args(&[])),
            Err(MouseKeysError::Argument(_))
        ));
        assert!(matches!(
            parse_args(&args(&["/dev/input/event3", "/dev/input/event4"])),
            Err(MouseKeysError::Argument(_))
        ));
        assert!(matches!(
            parse_args(&args(&["--bogus", "/dev/input/event3"])),
            Err(MouseKeysError::Argument(_))
        ));
    }

    #[test]
    fn test_config_commands() {
        assert_eq!(parse_args(&args(&["--help"])).unwrap(), Command::Help);
        assert_eq!(
            parse_args(&args(&["--init-config", "--force"])).unwrap(),
            Command::InitConfig { force: true }
        );
        assert_eq!(
            parse_args(&args(&["--print-config"])).unwrap(),
            Command::PrintConfig { config: None }
        );
    }
}
