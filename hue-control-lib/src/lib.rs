//! # Hue Control Library
//!
//! `hue-control-lib` drives smart lights through the HTTP/JSON API of a local lighting hub.
//! It pairs with the hub, reads what each light can display and changes light state, either
//! one update at a time or through two long running loops.
//!
//! ## Features
//!
//! - Pairing with the hub's link button to obtain an access token
//! - Explicit classification of hub responses into results and typed errors
//! - Per-light color gamut extraction
//! - A color sweep that walks every light around the corners of its own gamut
//! - A button watcher that rotates hues while a switch button is held down
//!
//! ## Example
//!
//! Sweep all color lights until Ctrl-C is pressed:
//!
//! ```no_run
//! use hue_control_lib::control_interface::{HubClient, HubSession};
//! use hue_control_lib::light::color_sweep::ColorAnimator;
//! use hue_control_lib::light::gamut::GamutRegistry;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HubClient::new(HubSession::new("192.168.1.20", "my-access-token"))?;
//!     let registry = GamutRegistry::build(&client.get_lights().await?)?;
//!
//!     let sweep = ColorAnimator::new(client, registry).start();
//!     tokio::signal::ctrl_c().await?;
//!     sweep.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Disclaimer
//!
//! This project is not affiliated with, authorized by, endorsed by, or in any way officially
//! connected with any lighting hub vendor.
//!
//! ## License
//!
//! This project is dual-licensed under the MIT License and the Apache License, Version 2.0.
//! You may choose to use either license, depending on your project needs.

// The `control_interface` module talks HTTP to the hub. It builds request URLs from the
// session, sends JSON bodies and turns every response into either a `HubResponse` or a
// `HubError`.
//
// Example usage:
//
// ```
// use hue_control_lib::control_interface::{HubClient, HubSession};
//
// #[tokio::main]
// async fn main() {
//     let client = HubClient::new(HubSession::new("192.168.1.20", "token")).unwrap();
//     let lights = client.get_lights().await.unwrap();
// }
// ```
pub mod control_interface;

// The `light` module holds light identifiers, gamut triangles, state value conversions and
// the color sweep.
pub mod light;

// The `sensor` module polls switches. It contains the long press state machine and the hue
// rotation it drives.
pub mod sensor;

// The `util` module provides pairing, configuration and credential files, the error types, the
// literal list parser used for command line input and the task handle for the light loops.
pub mod util;
