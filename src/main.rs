//! devsmgr host simulator.
//!
//! Runs the program manager against a flash image persisted in a file, so
//! deploys survive "reboots" of the simulator the way they survive power
//! loss on a device.
//!
//! ```text
//! devsmgr-sim [--flash FILE] [--config FILE] <command>
//!
//!   deploy <image>   write an image through the bulk deploy path
//!   clear            erase the stored program
//!   info             print header, hashes and status
//!   dump <out>       write the stored image to <out>
//!   run <ms>         poll the manager for <ms> milliseconds
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use log::{info, warn};

use devsmgr::ProgramManager;
use devsmgr::adapters::log_sink::LogEventSink;
use devsmgr::adapters::memory_pipes::MemoryPipes;
use devsmgr::adapters::sim_engine::SimEngine;
use devsmgr::adapters::sim_flash::SimFlash;
use devsmgr::adapters::time::MonotonicClock;
use devsmgr::app::ports::NoHooks;
use devsmgr::config::ManagerConfig;
use devsmgr::rpc::packet::MAX_PAYLOAD;

type SimManager = ProgramManager<SimFlash, SimEngine>;

const DEFAULT_FLASH: &str = "devsmgr-flash.bin";
const POLL_INTERVAL: Duration = Duration::from_millis(10);

struct Args {
    flash: PathBuf,
    config: Option<PathBuf>,
    command: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut flash = PathBuf::from(DEFAULT_FLASH);
    let mut config = None;
    let mut command = Vec::new();

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--flash" => flash = it.next().context("--flash needs a path")?.into(),
            "--config" => config = Some(it.next().context("--config needs a path")?.into()),
            _ => command.push(arg),
        }
    }
    Ok(Args {
        flash,
        config,
        command,
    })
}

fn load_config(path: Option<&Path>) -> Result<ManagerConfig> {
    let config = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("reading config {}", p.display()))?;
            ManagerConfig::from_json(&text).map_err(|e| anyhow!("config {}: {}", p.display(), e))?
        }
        None => ManagerConfig::default(),
    };
    config
        .validate()
        .map_err(|e| anyhow!("invalid config: {}", e))?;
    Ok(config)
}

fn load_flash(path: &Path, config: &ManagerConfig) -> Result<SimFlash> {
    if !path.exists() {
        info!("SIM: new flash file {}", path.display());
        return Ok(SimFlash::new(config.max_program_size, config.page_size));
    }
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if bytes.len() != config.max_program_size as usize {
        bail!(
            "{} is {} bytes, config expects {}",
            path.display(),
            bytes.len(),
            config.max_program_size
        );
    }
    Ok(SimFlash::from_bytes(bytes, config.page_size))
}

fn save_flash(path: &Path, mgr: SimManager) -> Result<()> {
    std::fs::write(path, mgr.into_flash().into_bytes())
        .with_context(|| format!("writing {}", path.display()))
}

fn print_info(mgr: &SimManager) {
    match mgr.header() {
        Some(hd) => {
            println!("program size  : {} bytes", hd.size);
            println!("program hash  : {:#010x}", hd.hash);
        }
        None => println!("program       : none"),
    }
    let sha: String = mgr
        .store()
        .sha256()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    println!("sha256        : {sha}");
    println!("status        : {:?} ({})", mgr.status(), mgr.status().code());
    println!("runtime       : {:#010x}", mgr.runtime_version());
}

fn run(mgr: &mut SimManager, millis: u64) {
    let clock = MonotonicClock::new();
    let mut pipes = MemoryPipes::new(MAX_PAYLOAD);
    let mut sink = LogEventSink::new();
    let deadline = std::time::Instant::now() + Duration::from_millis(millis);

    while std::time::Instant::now() < deadline {
        mgr.process(clock.now(), &mut pipes, &mut sink);
        std::thread::sleep(POLL_INTERVAL);
    }
    info!(
        "SIM: stopped after {} ms, {} events, status {:?}",
        millis,
        sink.emitted(),
        mgr.status()
    );
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    let config = load_config(args.config.as_deref())?;
    let flash = load_flash(&args.flash, &config)?;

    let clock = MonotonicClock::new();
    let mut mgr = ProgramManager::new(config, flash, SimEngine::new(), NoHooks, clock.now())
        .map_err(|e| anyhow!("manager configuration: {e}"))?;
    let mut sink = LogEventSink::new();

    let cmd: Vec<&str> = args.command.iter().map(String::as_str).collect();
    match cmd.as_slice() {
        ["deploy", image] => {
            let bytes = std::fs::read(image).with_context(|| format!("reading {image}"))?;
            if let Err(e) = mgr.deploy_image(&bytes, clock.now(), &mut sink) {
                // A failed verify still leaves the bytes committed; persist
                // whatever the store now holds.
                warn!("SIM: deploy failed: {} (code {})", e, e.code());
                save_flash(&args.flash, mgr)?;
                bail!("deploy of {image} failed");
            }
            print_info(&mgr);
            save_flash(&args.flash, mgr)?;
        }
        ["clear"] => {
            mgr.deploy_start(0, &mut sink)
                .map_err(|e| anyhow!("clear failed: {}", e))?;
            save_flash(&args.flash, mgr)?;
        }
        ["info"] => print_info(&mgr),
        ["dump", out] => {
            let image = mgr.store().image().context("no program stored")?;
            std::fs::write(out, image).with_context(|| format!("writing {out}"))?;
            println!("wrote {} bytes to {out}", image.len());
        }
        ["run", millis] => {
            let millis: u64 = millis.parse().context("run needs a duration in ms")?;
            run(&mut mgr, millis);
        }
        _ => bail!("usage: devsmgr-sim [--flash FILE] [--config FILE] deploy <image> | clear | info | dump <out> | run <ms>"),
    }
    Ok(())
}
