//! Convenience re-exports.

pub use crate::beamformer::Beamformer;
pub use crate::delaysum::DelaySum;
pub use crate::error::{Error, Result};
pub use crate::gcc::Gcc;
pub use crate::math::Xyz;
pub use crate::mic::{Hardware, Mic, Mics, Pattern};
pub use crate::mixer::Mixer;
pub use crate::mvdr::Mvdr;
pub use crate::pcm::{decode_interleaved, encode_interleaved, SampleFormat};
pub use crate::phat::Phat;
pub use crate::pipeline::{
    AudioFrame, DelaySumPipeline, DelaySumResult, DirectionEstimate, PipelineConfig,
    SslPipeline, SslResult, SstDelaySumPipeline, SstDelaySumResult, SstPipeline, SstResult,
    SteeringDelaySumPipeline,
};
pub use crate::points::{Geometry, Points};
pub use crate::scm::Scm;
pub use crate::signal::{
    Covs, Doa, DoaKind, Doas, Dsf, Freqs, Hops, Masks, Tdoa, Tdoas, Weights,
};
pub use crate::ssl::Ssl;
pub use crate::sst::Sst;
pub use crate::steering::Steering;
pub use crate::stft::{Istft, Stft, Window};
pub use crate::SPEED_OF_SOUND;
