//! Command-line front end for an SMC100-style stage controller.
//!
//! Each invocation opens the port (or the simulator), primes the session,
//! runs one operation until the driver reports all work complete, and
//! prints the resulting device snapshot.
//!
//! ```bash
//! smc100 list-ports
//! smc100 --port /dev/ttyUSB0 home
//! smc100 --port /dev/ttyUSB0 --address 2 move --absolute 12.5
//! RUST_LOG=smc100_lib=debug smc100 --mock status
//! smc100 profile save --name "Bench" --port /dev/ttyUSB0
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use smc100_lib::adapters::{host_session, MockStage, SerialPortFactory};
use smc100_lib::domain::Configuration;
use smc100_lib::ports::{SerialConnection, SerialFactory};
use smc100_lib::profiles::{ProfileStore, DEFAULT_PROFILE};
use smc100_lib::smc::Smc100;

/// Pause between ticks. The driver never blocks, so this sets the poll rate.
const TICK_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Parser, Debug)]
#[command(name = "smc100")]
#[command(about = "Drive an SMC100-style single-axis stage controller")]
#[command(version)]
struct Args {
    /// Serial port (overrides the profile)
    #[arg(long, global = true)]
    port: Option<String>,

    /// Controller address on the serial line (overrides the profile)
    #[arg(long, global = true)]
    address: Option<u8>,

    /// Baud rate (overrides the profile)
    #[arg(long, global = true)]
    baud: Option<u32>,

    /// Profile to load settings from
    #[arg(long, global = true, default_value = DEFAULT_PROFILE)]
    profile: String,

    /// Talk to the built-in simulated stage instead of a serial port
    #[arg(long, global = true)]
    mock: bool,

    /// Give up if the operation has not finished after this many seconds
    #[arg(long, global = true, default_value = "30")]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports on this machine
    ListPorts,

    /// Read status, limits and inputs and print the snapshot
    Status,

    /// Run the home search
    Home,

    /// Move the stage
    Move {
        /// Absolute target, clamped to the controller's software limits
        #[arg(long, conflicts_with = "relative", required_unless_present = "relative")]
        absolute: Option<f64>,

        /// Relative displacement from the current position
        #[arg(long, allow_hyphen_values = true)]
        relative: Option<f64>,

        /// Home first if the controller is not referenced
        #[arg(long)]
        home_first: bool,
    },

    /// Enable or disable the motor driver
    Enable {
        /// Disable instead of enable
        #[arg(long)]
        off: bool,
    },

    /// Set GPIO outputs
    Gpio {
        /// Output pin (0-3; larger values act on pin 3)
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        pin: Option<u8>,

        /// Drive the pin low instead of high
        #[arg(long)]
        low: bool,

        /// Write all outputs at once as a bit pattern
        #[arg(long)]
        all: Option<u8>,
    },

    /// Read the GPIO inputs
    ReadGpio,

    /// Read the analogue input
    ReadAnalogue,

    /// Reset the controller
    Reset,

    /// Manage saved configuration profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// List saved profiles
    List,
    /// Print a profile as JSON
    Show { name: String },
    /// Save the current port/address/baud settings under a name
    Save {
        #[arg(long)]
        name: String,
    },
    /// Delete a saved profile
    Delete { name: String },
}

/// Flags the completion listeners raise from inside `tick()`.
#[derive(Clone, Default)]
struct Completion {
    all: Arc<AtomicBool>,
    moved: Arc<AtomicBool>,
    homed: Arc<AtomicBool>,
    gpio: Arc<AtomicBool>,
}

impl Completion {
    fn attach(&self, session: &mut Smc100) {
        let flag = Arc::clone(&self.all);
        session.on_all_complete(move || flag.store(true, Ordering::SeqCst));
        let flag = Arc::clone(&self.moved);
        session.on_move_complete(move || flag.store(true, Ordering::SeqCst));
        let flag = Arc::clone(&self.homed);
        session.on_home_complete(move || flag.store(true, Ordering::SeqCst));
        let flag = Arc::clone(&self.gpio);
        session.on_gpio_read(move || flag.store(true, Ordering::SeqCst));
    }

    fn reset(&self) {
        for flag in [&self.all, &self.moved, &self.homed, &self.gpio] {
            flag.store(false, Ordering::SeqCst);
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match &args.command {
        Command::ListPorts => list_ports(),
        Command::Profile { action } => manage_profiles(&args, action),
        _ => drive(&args),
    }
}

fn list_ports() -> Result<()> {
    let ports = SerialPortFactory::list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{:<24} {}", port.name, port.port_type);
    }
    Ok(())
}

fn profile_store() -> Result<ProfileStore> {
    Ok(ProfileStore::default_location()?)
}

/// Profile settings with any command-line overrides applied.
fn resolve_config(args: &Args) -> Result<Configuration> {
    let mut config = profile_store()?
        .load_or_default(&args.profile)
        .with_context(|| format!("loading profile '{}'", args.profile))?;
    if let Some(port) = &args.port {
        config.serial_port = Some(port.clone());
    }
    if let Some(address) = args.address {
        config.address = address;
    }
    if let Some(baud) = args.baud {
        config.baud_rate = baud;
    }
    config.validate()?;
    Ok(config)
}

fn manage_profiles(args: &Args, action: &ProfileAction) -> Result<()> {
    let store = profile_store()?;
    match action {
        ProfileAction::List => {
            for name in store.list()? {
                println!("{name}");
            }
        }
        ProfileAction::Show { name } => {
            let config = store.load_or_default(name)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ProfileAction::Save { name } => {
            let mut config = resolve_config(args)?;
            config.name = name.clone();
            store.save(&config)?;
            println!("Saved profile '{name}' in {}", store.dir().display());
        }
        ProfileAction::Delete { name } => store.delete(name)?,
    }
    Ok(())
}

fn open_connection(args: &Args, config: &Configuration) -> Result<Box<dyn SerialConnection>> {
    if args.mock {
        return Ok(Box::new(MockStage::new(config.address)));
    }
    let Some(port) = config.serial_port.as_deref() else {
        bail!("no serial port given; pass --port or save one in a profile (see list-ports)");
    };
    Ok(SerialPortFactory::open(port, config.baud_rate)?)
}

fn drive(args: &Args) -> Result<()> {
    let config = resolve_config(args)?;
    let serial = open_connection(args, &config)?;
    let mut session = host_session(serial, config)?;
    let done = Completion::default();
    done.attach(&mut session);
    let timeout = Duration::from_secs(args.timeout_secs);

    // Priming reads limits before any move is clamped against them
    session.start();
    run_until_idle(&mut session, &done, timeout)?;

    match &args.command {
        Command::Status => {}
        Command::Home => {
            session.home();
            run_until_idle(&mut session, &done, timeout)?;
            if !done.homed.load(Ordering::SeqCst) {
                bail!("home did not complete (status {:?})", session.status());
            }
        }
        Command::Move {
            absolute,
            relative,
            home_first,
        } => {
            if *home_first && !session.is_homed() {
                session.home();
                run_until_idle(&mut session, &done, timeout)?;
            }
            match (absolute, relative) {
                (Some(target), _) => session.move_absolute(*target),
                (None, Some(delta)) => session.move_relative(*delta),
                (None, None) => bail!("give --absolute or --relative"),
            }
            run_until_idle(&mut session, &done, timeout)?;
            if !done.moved.load(Ordering::SeqCst) {
                bail!("move did not complete (status {:?})", session.status());
            }
        }
        Command::Enable { off } => {
            session.enable(!off);
            run_until_idle(&mut session, &done, timeout)?;
        }
        Command::Gpio { pin, low, all } => {
            match (pin, all) {
                (_, Some(bits)) => session.set_gpio_output_all(*bits),
                (Some(pin), None) => session.set_gpio_output(*pin, !low),
                (None, None) => bail!("give --pin or --all"),
            }
            run_until_idle(&mut session, &done, timeout)?;
        }
        Command::ReadGpio => {
            session.request_gpio_input();
            run_until_idle(&mut session, &done, timeout)?;
            if !done.gpio.load(Ordering::SeqCst) {
                bail!("no GPIO reading received");
            }
        }
        Command::ReadAnalogue => {
            session.request_analogue();
            run_until_idle(&mut session, &done, timeout)?;
        }
        Command::Reset => {
            session.reset();
            run_until_idle(&mut session, &done, timeout)?;
        }
        Command::ListPorts | Command::Profile { .. } => {
            bail!("this command does not talk to a controller")
        }
    }

    println!("{}", serde_json::to_string_pretty(session.snapshot())?);
    session.close()?;
    Ok(())
}

/// Tick until the driver reports that the queue has drained.
fn run_until_idle(session: &mut Smc100, done: &Completion, timeout: Duration) -> Result<()> {
    done.reset();
    let deadline = Instant::now() + timeout;
    while !done.all.load(Ordering::SeqCst) {
        if Instant::now() > deadline {
            bail!(
                "timed out after {}s with {} request(s) pending",
                timeout.as_secs(),
                session.pending()
            );
        }
        session.tick();
        thread::sleep(TICK_INTERVAL);
    }
    Ok(())
}
