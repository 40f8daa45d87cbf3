//! Command-line entry point: replays a JSON script of editing steps.

use pagemark_app::{Script, ScriptRunner, ShortcutRegistry};
use pagemark_core::EngineConfig;
use pagemark_core::storage::FileStorage;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const USAGE: &str = "Usage: pagemark <script.json> [--config <path>] [--shortcuts]";

struct Args {
    script: PathBuf,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Option<Args>, String> {
    let mut script = None;
    let mut config = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            "--shortcuts" => {
                ShortcutRegistry::print_all();
                return Ok(None);
            }
            "-h" | "--help" => return Ok(None),
            _ if script.is_none() => script = Some(PathBuf::from(arg)),
            _ => return Err(format!("unexpected argument: {}", arg)),
        }
    }
    let script = script.ok_or("missing script path")?;
    Ok(Some(Args { script, config }))
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::load_or_default(args.config.as_deref())?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter))
        .init();
    log::info!("Starting Pagemark");

    let storage = match &config.storage_dir {
        Some(dir) => FileStorage::new(dir.clone())?,
        None => FileStorage::default_location()?,
    };
    log::info!("Pages stored in {}", storage.base_path().display());

    let script = Script::load(&args.script)?;
    let base_dir = args.script.parent().unwrap_or(Path::new(".")).to_path_buf();
    let mut runner = ScriptRunner::new(config, storage, base_dir);
    pollster::block_on(runner.run(&script))?;
    Ok(())
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            return ExitCode::FAILURE;
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("pagemark: {}", e);
            ExitCode::FAILURE
        }
    }
}
