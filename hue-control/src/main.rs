use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use hue_control_lib::control_interface::HubClient;
use hue_control_lib::light::batch::apply_updates;
use hue_control_lib::light::color_sweep::ColorAnimator;
use hue_control_lib::light::gamut::GamutRegistry;
use hue_control_lib::light::light_ref::LightRef;
use hue_control_lib::light::light_state::{
    hue_from_degrees, level_from_fraction, level_from_raw, LightStateUpdate,
};
use hue_control_lib::sensor::button_watcher::ButtonWatcher;
use hue_control_lib::util::auth::{PairingFlow, PairingOutcome};
use hue_control_lib::util::config::HubConfig;
use hue_control_lib::util::error::HubError;
use hue_control_lib::util::literal::{parse_light_refs, parse_xy};
use hue_control_lib::util::task::SweepTask;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    match handle_cli(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            if let Some(hint) = err.downcast_ref::<HubError>().and_then(HubError::remediation) {
                eprintln!("{}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

/// This struct defines the command line interface of the application
#[derive(Parser)]
#[clap(
    name = "hue_control",
    about = "Controls lights and switches through a local hub",
    version
)]
pub struct Cli {
    /// Hostname or IP of the hub. Defaults to the contents of the file "bridge", then
    /// Philips-hue.local
    #[clap(long, global = true)]
    bridge: Option<String>,

    /// Access code for the hub. Defaults to the contents of the file "accesscode"
    #[clap(long, global = true)]
    user: Option<String>,

    /// Directory holding the "bridge" and "accesscode" files
    #[clap(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    /// Log requests and responses
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Subcommands available for the CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Obtains an access code from the hub. Press the link button on the hub first.
    #[clap(name = "pair")]
    Pair {
        /// Name this client registers under
        name: String,

        /// Replace an existing access code without asking
        #[clap(long)]
        yes: bool,
    },
    /// Prints the color gamut of every color light.
    #[clap(name = "gamuts")]
    Gamuts,
    /// Sets hue, saturation, brightness or xy color of lights.
    #[clap(name = "set")]
    Set {
        /// Lights to change, e.g. 1,3. Defaults to all lights
        #[clap(long)]
        lamps: Option<String>,

        /// Hue in degrees (0..360)
        #[clap(long)]
        hue: Option<f64>,

        /// Saturation (0..1)
        #[clap(long)]
        sat: Option<f64>,

        /// Brightness (0..1)
        #[clap(long, conflicts_with = "bri_raw")]
        bri: Option<f64>,

        /// Brightness in native units (0..255)
        #[clap(long)]
        bri_raw: Option<i64>,

        /// xy color, e.g. 0.3,0.7
        #[clap(long, allow_hyphen_values = true)]
        xy: Option<String>,
    },
    /// Sweeps every color light around its gamut until interrupted.
    #[clap(name = "sweep")]
    Sweep,
    /// Rotates light hues while the off button of a switch is held, until interrupted.
    #[clap(name = "watch-button")]
    WatchButton {
        /// Sensor id of the switch
        sensor: String,
    },
}

async fn handle_cli(cli: Cli) -> Result<()> {
    let config = HubConfig::resolve(&cli.config_dir, cli.bridge, cli.user)
        .context("Failed to read hub configuration")?;

    match cli.command {
        Commands::Pair { name, yes } => {
            let client = HubClient::new(config.session())?;
            let mut store = config.token_store();
            let mut confirm = |_: &str, _: &str| yes || ask_overwrite();
            let outcome = PairingFlow::new(&client)
                .pair(&name, &mut store, &mut confirm)
                .await?;
            match outcome {
                PairingOutcome::Stored { name, token } => {
                    println!("Access code for name {}: {}", name, token);
                    println!("Saved to {}", config.token_path.display());
                }
                PairingOutcome::Declined { name, token } => {
                    println!("Access code for name {}: {}", name, token);
                    println!("Existing access code kept.");
                }
            }
        }
        Commands::Gamuts => {
            let client = HubClient::new(config.session())?;
            let registry = fetch_registry(&client).await?;
            for (light, gamut) in registry.iter() {
                let [a, b, c] = gamut.vertices();
                println!(
                    "{}: ({:.4}, {:.4}) ({:.4}, {:.4}) ({:.4}, {:.4})",
                    light, a.x, a.y, b.x, b.y, c.x, c.y
                );
            }
        }
        Commands::Set {
            lamps,
            hue,
            sat,
            bri,
            bri_raw,
            xy,
        } => {
            let mut updates = Vec::new();
            if let Some(degrees) = hue {
                updates.push(LightStateUpdate::Hue(hue_from_degrees(degrees)?));
            }
            if let Some(fraction) = sat {
                updates.push(LightStateUpdate::Saturation(level_from_fraction(fraction)?));
            }
            if let Some(xy) = xy {
                updates.push(LightStateUpdate::Xy(parse_xy(&xy)?));
            }
            if let Some(fraction) = bri {
                updates.push(LightStateUpdate::Brightness(level_from_fraction(fraction)?));
            }
            if let Some(level) = bri_raw {
                updates.push(LightStateUpdate::Brightness(level_from_raw(level)?));
            }
            if updates.is_empty() {
                bail!("Nothing to set; give at least one of --hue, --sat, --bri, --bri-raw, --xy");
            }

            let client = HubClient::new(config.session())?;
            let lights = match lamps {
                Some(lamps) => parse_light_refs(&lamps)?,
                None => {
                    let mut lights: Vec<LightRef> = client
                        .get_lights()
                        .await?
                        .keys()
                        .map(|id| LightRef::new(id.as_str()))
                        .collect();
                    lights.sort();
                    lights
                }
            };

            let pairs = lights
                .iter()
                .flat_map(|light| updates.iter().map(move |update| (light.clone(), *update)));
            let report = apply_updates(&client, pairs).await.check_fatal()?;
            for (light, err) in &report.failed {
                eprintln!("Light {}: {}", light, err);
            }
            if !report.is_clean() {
                bail!("{} updates were rejected", report.failed.len());
            }
        }
        Commands::Sweep => {
            let client = HubClient::new(config.session())?;
            let registry = fetch_registry(&client).await?;
            let task = ColorAnimator::new(client, registry).start();
            run_until_interrupted(task).await?;
        }
        Commands::WatchButton { sensor } => {
            let client = HubClient::new(config.session())?;
            let registry = fetch_registry(&client).await?;
            let task = ButtonWatcher::new(client, sensor, registry.lights()).start();
            run_until_interrupted(task).await?;
        }
    }

    Ok(())
}

async fn fetch_registry(client: &HubClient) -> Result<GamutRegistry> {
    let lights = client.get_lights().await?;
    let registry = GamutRegistry::build(&lights)?;
    if registry.is_empty() {
        return Err(anyhow!("The hub reports no color lights"));
    }
    Ok(registry)
}

async fn run_until_interrupted(task: SweepTask) -> Result<()> {
    let cancel = task.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });
    task.join().await?;
    Ok(())
}

fn ask_overwrite() -> bool {
    print!("Erase old access code to store the new one? [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
        Err(_) => false,
    }
}
