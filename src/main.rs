//! Framework 16 keyboard backlight bridge
//!
//! Exposes the deck's backlit input modules (keyboard, numpad, macropad)
//! as kernel LED class devices so UPower and desktop environments control
//! them like a built-in keyboard backlight. Brightness flows both ways:
//! writes to the virtual LED reach the modules over their QMK raw-HID
//! endpoint, and hotkey changes on the hardware are polled back into the
//! LED.

mod cli;
mod daemon;
mod devices;
mod group;
mod hotplug;
mod level;
mod notify;
mod uleds;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config();
    if cli.list {
        return list_modules(&config);
    }

    daemon::run(&config).await
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "fw16_kbd_uleds=warn,qmk_via=warn",
        1 => "fw16_kbd_uleds=info,qmk_via=info",
        _ => "fw16_kbd_uleds=debug,qmk_via=debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn list_modules(config: &Config) -> Result<()> {
    let api = hidapi::HidApi::new()?;
    let targets = qmk_via::discover(&api, &config.selectors);
    if targets.is_empty() {
        println!("no backlight modules found");
        return Ok(());
    }
    for target in &targets {
        match devices::find_module(target.pid) {
            Some(module) => println!(
                "{target}  {:<10}  {}  [{}]",
                module.name,
                module.display_name,
                module.category.as_str()
            ),
            None => println!("{target}  (unrecognized module)"),
        }
    }
    Ok(())
}
