//! Real-time microphone array processing.
//!
//! The crate is organized as a set of small processing stages that pass
//! labelled signal containers between them: time-domain hops enter a
//! short-time Fourier transform, spatial covariance is aggregated and
//! whitened, cross-correlation yields time differences of arrival, a grid
//! search turns those into candidate directions, a probabilistic tracker
//! keeps stable identities over time, and a delay-and-sum beamformer
//! enhances the signal arriving from each direction.
//!
//! The stages can be wired freely, but most callers want one of the
//! prebuilt compositions in the [`pipeline`] module:
//!
//! - [`pipeline::SslPipeline`] localizes instantaneous sources.
//! - [`pipeline::SstPipeline`] localizes and tracks sources.
//! - [`pipeline::DelaySumPipeline`] beamforms toward the dominant sources.
//! - [`pipeline::SteeringDelaySumPipeline`] beamforms toward caller-supplied
//!   directions.
//! - [`pipeline::SstDelaySumPipeline`] tracks sources and beamforms toward
//!   each tracked identity.
//!
//! All processing is synchronous and allocation-free after construction.
//! Frames must be delivered in acquisition order; the overlap buffers, the
//! covariance recursion and the tracker state are invalidated by reordering.

pub mod beamformer;
pub mod delaysum;
pub mod error;
mod fft;
pub mod gcc;
pub mod math;
pub mod mic;
pub mod mixer;
pub mod mvdr;
pub mod pcm;
pub mod phat;
pub mod pipeline;
pub mod points;
pub mod prelude;
pub mod scm;
pub mod signal;
pub mod ssl;
pub mod sst;
pub mod steering;
pub mod stft;

pub use error::{Error, Result};

/// Speed of sound in air (m/s) used as the default by the pipelines.
pub const SPEED_OF_SOUND: f32 = 343.0;
