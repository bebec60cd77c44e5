//! # Particle Engine
//!
//! Client-side particle simulation for voxel games.
//!
//! ## Features
//!
//! - **Spawners**: Timed or continuous emission with parameters that evolve over the spawner's lifetime
//! - **Physics**: Drag, jitter, per-axis bounce and optional collision against the world
//! - **Attractors**: Point, line and plane attraction/repulsion with optional kill-on-arrival
//! - **Lighting**: Particles pick up day/night voxel light and glow
//! - **Animation**: Vertical-strip and 2D sheet texture animation
//! - **Threading**: Network events and simulation steps can run on different threads
//!
//! ## Architecture Design
//!
//! The crate owns no map, renderer or asset store. Everything it needs from the
//! host game is reached through the traits in [`environment`], bundled in a
//! [`environment::ParticleContext`]. [`particles::ParticleManager`] owns all
//! spawners and particles; [`render`] turns the simulated state into
//! API-agnostic quads.
//!
//! ### Example
//!
//! ```ignore
//! use particle_engine::config::ParticleConfig;
//! use particle_engine::particles::{ParticleEvent, ParticleManager};
//!
//! let manager = ParticleManager::new(ParticleConfig::load_or_default(), ctx);
//! let queue = manager.event_queue();
//! queue.push(ParticleEvent::DeleteSpawner { id: 3 });
//! manager.step(1.0 / 60.0);
//! let quads = manager.collect_quads();
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Error types and shared macros
//! - [`config`]: Configuration and logging setup
//! - [`math`]: Ranged parameters and rotations
//! - [`environment`]: Collaborator traits (map, collision, content, textures)
//! - [`particles`]: Particles, spawners and the manager
//! - [`render`]: Quad generation for drawing

/// Error types and shared macros
#[macro_use]
pub mod core;
/// Configuration system
pub mod config;
/// Ranged parameters, tweens and rotations
pub mod math;
/// Interfaces to the host game
pub mod environment;
/// Particle simulation
pub mod particles;
/// Renderer-facing quad generation
pub mod render;

pub use config::{init_logging, ParticleConfig};
pub use core::{ParticleError, ParticleResult};
pub use particles::{ParticleEvent, ParticleEventQueue, ParticleManager};
