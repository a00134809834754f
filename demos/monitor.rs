// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Serial laser monitor example.
//!
//! Connects to a laser module over a serial port, prints every activity log
//! entry and state change, and optionally sets the brightness.
//!
//! # Usage
//!
//! ```bash
//! # List serial ports
//! cargo run --example monitor -- list
//!
//! # Watch the first available port for 60 seconds
//! cargo run --example monitor -- watch
//!
//! # Watch a specific port for 5 minutes
//! cargo run --example monitor -- watch /dev/ttyUSB0 300
//!
//! # Set brightness to 40% once the device reported its state
//! cargo run --example monitor -- pwm /dev/ttyUSB0 40
//! ```

use std::env;
use std::time::Duration;

use laserctl_lib::protocol::SerialProvider;
use laserctl_lib::subscription::Subscribable;
use laserctl_lib::{Brightness, ConnectionState, LaserController, PortSelector};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    match args[1].as_str() {
        "list" => run_list_mode().await,
        "watch" => run_watch_mode(&args).await,
        "pwm" => run_pwm_mode(&args).await,
        mode => {
            eprintln!("Unknown mode: {mode}");
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {program} list");
    eprintln!("  {program} watch [port] [seconds]");
    eprintln!("  {program} pwm <port> <0-100>");
}

fn selector(arg: Option<&String>) -> PortSelector {
    arg.map_or(PortSelector::FirstAvailable, PortSelector::named)
}

/// Prints every port the host can see.
async fn run_list_mode() -> Result<(), Box<dyn std::error::Error>> {
    let controller = LaserController::new(SerialProvider::new());

    let ports = controller.available_ports().await?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => println!("{} (usb {vid:04x}:{pid:04x})", port.name),
            _ => println!("{}", port.name),
        }
    }
    Ok(())
}

/// Prints log entries and state changes until the timeout elapses or the
/// device goes away.
async fn run_watch_mode(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let seconds = args
        .get(3)
        .map(|s| s.parse::<u64>())
        .transpose()?
        .unwrap_or(60);

    let controller = LaserController::new(SerialProvider::new());
    controller.on_log_entry(|entry| println!("{entry}"));
    controller.on_connection_changed(|state| println!("[Connection] {state}"));

    let port = controller.connect(selector(args.get(2))).await?;
    println!("=== Watching {port} for {seconds}s ===");

    let mut state = controller.watch_state();
    let mut connection = controller.watch_connection();
    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline => break,
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let s = state.borrow_and_update().clone();
                println!(
                    "[State] laser {} | brightness {} | fw {} | uptime {} | heap {} B",
                    s.power(),
                    s.brightness(),
                    s.firmware_version(),
                    s.uptime(),
                    s.free_heap_bytes()
                );
            }
            changed = connection.changed() => {
                if changed.is_err() || *connection.borrow() == ConnectionState::Disconnected {
                    println!("Device disconnected");
                    return Ok(());
                }
            }
        }
    }

    controller.disconnect().await?;
    Ok(())
}

/// Sets the brightness once the device has reported its own.
async fn run_pwm_mode(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    if args.len() < 4 {
        eprintln!("pwm mode requires: <port> <0-100>");
        std::process::exit(1);
    }

    let level = Brightness::new(args[3].parse()?)?;

    let controller = LaserController::new(SerialProvider::new());
    controller.on_log_entry(|entry| println!("{entry}"));
    controller.connect(selector(args.get(2))).await?;

    let mut state = controller.watch_state();
    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| s.brightness_initialized()),
    )
    .await??;

    controller.set_brightness(level);

    // Let the debounce window pass so the command goes out.
    tokio::time::sleep(controller.config().debounce() + Duration::from_millis(100)).await;

    controller.disconnect().await?;
    Ok(())
}
