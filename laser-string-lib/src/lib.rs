//! # Laser String Library
//!
//! `laser-string-lib` drives an addressable string of RGB lights that listens on a TCP
//! port. It resolves color names and hex strings into dimmed RGB values, packs them
//! into the controller's compact binary write frame, and streams those frames over
//! short-lived connections.
//!
//! ## Features
//!
//! - Color resolution from CSS names (`blue`, `:green`) and hex strings (`#112233`)
//! - Configurable brightness adjustment, dim by default
//! - Frame encoding and decoding with explicit range checks
//! - Scoped connections that are always closed, serialized per controller
//! - A color wheel helper for rainbow animations
//!
//! ## Example
//!
//! Send six lights to a controller, then print the same frame as hex:
//!
//! ```no_run
//! use laser_string_lib::frame::{Frame, FrameOptions};
//! use laser_string_lib::led::color::ColorResolver;
//! use laser_string_lib::link::{LinkConfig, LinkManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let lights = [":blue", ":blue", ":blue", ":green", ":green", ":blue"];
//!
//!     let manager = LinkManager::new(LinkConfig::new("192.168.60.207", 10000));
//!     manager.send_frame(lights).await?;
//!
//!     let frame = Frame::from_tokens(lights, &ColorResolver::default(), FrameOptions::default())?;
//!     println!("Sent: {}", frame.to_hex());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## License
//!
//! This project is dual-licensed under the MIT License and the Apache License, Version 2.0.
//! You may choose to use either license, depending on your project needs.

// The `error` module defines the crate-wide error type. Encoding errors are raised
// before any socket is opened; transport errors carry the failed action and endpoint.
pub mod error;

// The `frame` module builds write frames from color tokens or raw RGB values and
// converts them to and from the wire format.
//
// Example usage:
//
// ```
// use laser_string_lib::frame::{encode, FrameOptions};
// use laser_string_lib::led::color::ColorResolver;
//
// let bytes = encode("blue", &ColorResolver::default(), FrameOptions::default()).unwrap();
// assert_eq!(bytes.len(), 10);
// ```
pub mod frame;

// The `led` module contains the color type, the color resolver with its brightness
// adjustment, and the color wheel used for animations.
pub mod led;

// The `link` module owns the connection to the controller. A `LinkManager` opens a
// connection per operation and closes it on every exit path.
pub mod link;

pub use error::{Error, Result};
