use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use serde::Serialize;

use laser_string_lib::frame::{Frame, FrameOptions};
use laser_string_lib::led::color::{Brightness, ColorResolver, RGB};
use laser_string_lib::led::color_wheel::wheel_gradient;
use laser_string_lib::link::config::{DEFAULT_HOST, DEFAULT_PORT};
use laser_string_lib::link::{LinkConfig, LinkManager};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    handle_cli(cli).await
}

/// This struct defines the command line interface of the application
#[derive(Parser)]
#[clap(
    name = "laser-string",
    about = "Drives an addressable RGB light string over TCP",
    version
)]
pub struct Cli {
    /// Address of the light controller
    #[clap(short = 'c', long, env = "HOST", default_value = DEFAULT_HOST, global = true)]
    pub host: String,

    /// Port of the light controller
    #[clap(short, long, env = "PORT", default_value_t = DEFAULT_PORT, global = true)]
    pub port: u16,

    /// Connect and write timeout in milliseconds
    #[clap(
        short = 't',
        long = "timeout",
        default_value = "5000",
        value_parser = parse_duration,
        global = true
    )]
    pub timeout: Duration,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Supported output formats for the `inspect` command.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    /// Plain text format.
    Plaintext,
    /// JSON format.
    Json,
    /// YAML format.
    Yaml,
}

/// Header fields shared by every frame-building command.
#[derive(Args, Clone, Copy)]
pub struct HeaderArgs {
    /// Delay after the write, in milliseconds (0-255)
    #[clap(long, default_value_t = 0)]
    pub delay: usize,

    /// First light to change (0-255)
    #[clap(long, default_value_t = 0)]
    pub start: usize,
}

/// Options for frames built from color names or hex strings.
#[derive(Args)]
pub struct TokenArgs {
    /// Colors by name (blue, :green) or hex (#112233)
    #[clap(required = true)]
    pub colors: Vec<String>,

    /// Pad the frame with black up to this many lights
    #[clap(long)]
    pub lights: Option<usize>,

    /// Brightness adjustment in percent, -100 to 100
    #[clap(short, long, default_value_t = Brightness::DIM.percent(), allow_negative_numbers = true)]
    pub brightness: f32,

    #[clap(flatten)]
    pub header: HeaderArgs,
}

impl TokenArgs {
    fn build_frame(&self) -> laser_string_lib::Result<Frame> {
        let resolver = ColorResolver::new(Brightness::new(self.brightness));
        let options = FrameOptions {
            light_count: self.lights,
            delay: self.header.delay,
            start_index: self.header.start,
        };
        Frame::from_tokens(self.colors.clone(), &resolver, options)
    }
}

/// Subcommands available for the CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Sends one frame built from colors
    #[clap(name = "send")]
    Send {
        #[clap(flatten)]
        tokens: TokenArgs,
    },
    /// Sends one frame of raw RGB values
    #[clap(name = "write")]
    Write {
        /// R/G/B of each light (R1 G1 B1 R2 G2 B2 ...)
        #[clap(required = true)]
        rgb: Vec<u8>,

        #[clap(flatten)]
        header: HeaderArgs,
    },
    /// Prints the hex form of a frame without sending it
    #[clap(name = "hex")]
    Hex {
        #[clap(flatten)]
        tokens: TokenArgs,
    },
    /// Prints the resolved colors of a frame
    #[clap(name = "inspect")]
    Inspect {
        /// Output format (plaintext, json, yaml)
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Plaintext)]
        output: OutputFormat,

        #[clap(flatten)]
        tokens: TokenArgs,
    },
    /// Streams a rotating color wheel over one connection
    #[clap(name = "wheel")]
    Wheel {
        /// Number of lights in the string
        #[clap(long, default_value_t = 50)]
        lights: usize,

        /// Number of frames to send
        #[clap(long, default_value_t = 100)]
        frames: usize,

        /// Brightness adjustment in percent, -100 to 100
        #[clap(
            short,
            long,
            default_value_t = Brightness::DIM.percent(),
            allow_negative_numbers = true
        )]
        brightness: f32,

        #[clap(flatten)]
        header: HeaderArgs,
    },
}

fn parse_duration(s: &str) -> Result<Duration, &'static str> {
    let millis = s
        .parse::<u64>()
        .map_err(|_| "could not parse duration in milliseconds")?;
    Ok(Duration::from_millis(millis))
}

fn rgb_triplets(values: &[u8]) -> Result<Vec<RGB>> {
    if values.len() % 3 != 0 {
        return Err(anyhow!(
            "Expected R G B triplets, got {} values",
            values.len()
        ));
    }
    Ok(values
        .chunks_exact(3)
        .map(|chunk| RGB::new(chunk[0], chunk[1], chunk[2]))
        .collect())
}

#[derive(Serialize)]
struct FrameReport<'a> {
    delay: u8,
    start_index: u8,
    light_count: u8,
    lights: &'a [RGB],
}

async fn handle_cli(cli: Cli) -> Result<()> {
    let config = LinkConfig::new(cli.host, cli.port).with_timeout(cli.timeout);

    match cli.command {
        Commands::Send { tokens } => {
            let frame = tokens.build_frame()?;
            let manager = LinkManager::new(config);
            let written = manager.send_frame(&frame).await?;
            info!("Sent {} lights ({} bytes)", frame.light_count(), written);
            println!("Sending: {}", frame.to_hex());
        }
        Commands::Write { rgb, header } => {
            let options = FrameOptions::default()
                .with_delay(header.delay)
                .with_start_index(header.start);
            let frame = Frame::from_colors(rgb_triplets(&rgb)?, options)?;
            eprintln!("Sending packet: {}", frame.to_hex());
            LinkManager::new(config).send_frame(frame).await?;
        }
        Commands::Hex { tokens } => {
            println!("{}", tokens.build_frame()?.to_hex());
        }
        Commands::Inspect { output, tokens } => {
            let frame = tokens.build_frame()?;
            let report = FrameReport {
                delay: frame.delay(),
                start_index: frame.start_index(),
                light_count: frame.light_count(),
                lights: frame.lights(),
            };
            match output {
                OutputFormat::Plaintext => {
                    println!(
                        "delay: {}, start index: {}, lights: {}",
                        report.delay, report.start_index, report.light_count
                    );
                    for (index, light) in report.lights.iter().enumerate() {
                        println!("{:>3}: {}", index, light);
                    }
                }
                OutputFormat::Json => {
                    let json = serde_json::to_string(&report)?;
                    println!("{}", json);
                }
                OutputFormat::Yaml => {
                    let yaml = serde_yaml::to_string(&report)?;
                    println!("{}", yaml);
                }
            }
        }
        Commands::Wheel {
            lights,
            frames,
            brightness,
            header,
        } => {
            let brightness = Brightness::new(brightness);
            let options = FrameOptions::default()
                .with_delay(header.delay)
                .with_start_index(header.start);
            let stream = (0..frames)
                .map(|offset| {
                    let colors = wheel_gradient(lights, offset)
                        .into_iter()
                        .map(|color| brightness.apply(color));
                    Frame::from_colors(colors, options)
                })
                .collect::<laser_string_lib::Result<Vec<Frame>>>()?;

            let written = LinkManager::new(config).send_stream(stream).await?;
            println!("Color wheel sent: {} frames, {} bytes", frames, written);
        }
    }

    Ok(())
}
