//! Bernoulli bit-stream sampler
//!
//! This crate owns the parts of sampling that sit around the executor: a
//! uniform random generator, buffer sizing and alignment checks, and
//! unpacking of sampled blocks into individual bits.
//!
//! # Example
//!
//! ```rust
//! use bernoulli_sampler::{Sampler, SamplerOptions};
//!
//! let mut sampler = Sampler::new(&SamplerOptions::new(0.3).with_seed(42)).unwrap();
//!
//! let mut buf = sampler.make_buffer(1 << 16);
//! let outputs = sampler.sample(&mut buf).unwrap();
//! assert_eq!(outputs, (1 << 16) / 256);
//!
//! let bits = sampler.sample_bits(1000);
//! assert_eq!(bits.len(), 1000);
//! ```

pub mod error;
pub mod expand;
pub mod sampler;
pub mod validate;

pub use error::{Error, Result};
pub use expand::expand;
pub use sampler::{Sampler, SamplerOptions};
pub use validate::{buffer_size, validate, ALIGNMENT};
