use clap::{Parser, Subcommand, ValueEnum};
use futures::stream::StreamExt;
use log::error;
use luvo_tools as luvo;

use luvo::drivers::driver::OpenError;
use luvo::lamp::controller::{HsColor, Lamp, TurnOn};
use luvo::protocol::cmd_defs::StepDirection;
use luvo::utils::scene_table;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Direction {
    Brighter,
    Dimmer,
}

impl From<Direction> for StepDirection {
    fn from(dir: Direction) -> StepDirection {
        match dir {
            Direction::Brighter => StepDirection::Brighter,
            Direction::Dimmer => StepDirection::Dimmer,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Query the firmware api version
    Ping,
    /// List the lamp's scenes
    Scenes {
        #[arg(long)]
        json: bool,
    },
    /// Turn the lamp on
    On {
        /// Scene name from `scenes`
        #[arg(long)]
        effect: Option<String>,
        /// Brightness 0-255
        #[arg(long)]
        brightness: Option<u8>,
        /// Uplight hue in degrees, 0-360
        #[arg(long, requires = "sat")]
        hue: Option<u16>,
        /// Uplight saturation in percent
        #[arg(long, requires = "hue")]
        sat: Option<u8>,
        /// Downlight color temperature in kelvin, 2700-4000
        #[arg(long)]
        temp: Option<u16>,
        /// Fade duration for color changes
        #[arg(long, default_value_t = 0)]
        transition_ms: u16,
    },
    /// Turn the lamp off
    Off,
    /// Change brightness relative to the current level, -100 to 100
    Brightness { delta: i8 },
    /// Jump to the next scene by brightness
    Step {
        #[arg(value_enum)]
        direction: Direction,
    },
    /// Show the lamp state
    Status,
}

#[derive(Parser, Debug)]
#[command(about = "Control a Luke Roberts Luvo lamp")]
struct CmdArgs {
    /// Select lamp driver, e.g. btle:address=C4:AC:01:02:03:04
    #[arg(short = 'd', long, default_value = "simulator")]
    device: String,
    /// Reply deadline in milliseconds
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,
    #[command(subcommand)]
    cmd: Cmd,
}

async fn list_scenes(
    driver: Box<dyn luvo::drivers::driver::LampDriver>,
    deadline: Duration,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let driver = Arc::new(Mutex::new(driver));
    let mut stream = scene_table::scene_stream(driver, deadline);
    if json {
        let mut entries = Vec::new();
        while let Some(item) = stream.next().await {
            entries.push(item?);
        }
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        while let Some(item) = stream.next().await {
            let entry = item?;
            println!("{:3}  {}", entry.id, entry.name);
        }
    }
    Ok(())
}

async fn run(args: CmdArgs) -> Result<(), Box<dyn std::error::Error>> {
    let deadline = Duration::from_millis(args.timeout_ms);
    let driver = match luvo::drivers::open(&args.device).await {
        Ok(driver) => driver,
        Err(e) => {
            error!("Failed to open lamp device: {}", e);
            if let OpenError::NotFound = e {
                eprintln!("Available drivers:");
                for name in luvo::drivers::driver_names() {
                    eprintln!("  {}", name);
                }
            }
            return Err(Box::new(e));
        }
    };

    let cmd = match args.cmd {
        Cmd::Scenes { json } => return list_scenes(driver, deadline, json).await,
        cmd => cmd,
    };

    let mut lamp = Lamp::with_deadline(driver, deadline);
    match cmd {
        Cmd::Scenes { .. } => unreachable!(),
        Cmd::Ping => {
            let version = lamp.ping().await?;
            println!("api version {}", version);
        }
        Cmd::On {
            effect,
            brightness,
            hue,
            sat,
            temp,
            transition_ms,
        } => {
            if effect.is_some() {
                // Effect names live in the scene table
                lamp.refresh().await?;
            }
            let color = match (hue, sat) {
                (Some(hue), Some(sat)) => Some(HsColor {
                    hue,
                    saturation: sat,
                }),
                _ => None,
            };
            lamp.turn_on(TurnOn {
                effect,
                brightness,
                color,
                color_temp: temp,
                transition_ms: Some(transition_ms),
            })
            .await?;
        }
        Cmd::Off => {
            lamp.refresh().await?;
            lamp.turn_off().await?;
        }
        Cmd::Brightness { delta } => {
            lamp.adjust_brightness(delta).await?;
        }
        Cmd::Step { direction } => {
            lamp.step_scene(direction.into()).await?;
        }
        Cmd::Status => {
            lamp.refresh().await?;
            let version = lamp.ping().await?;
            println!("api version: {}", version);
            println!("effect: {}", lamp.effect().unwrap_or("unknown"));
            println!("on: {}", lamp.is_on());
            println!("effects: {}", lamp.effects().join(", "));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    if let Err(e) = luvo_tools::drivers::init() {
        error!("Failed to initialize lamp drivers: {}", e);
        return ExitCode::FAILURE;
    }
    let args = CmdArgs::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
