//! Prebuilt processing pipelines.
//!
//! Each pipeline owns every stage and container it needs, validates its
//! configuration up front and reuses all buffers across frames. `process`
//! takes one channel-major audio frame (`channels x hop_length` floats in
//! [-1, 1]) and returns a reference to an internally reused result struct;
//! the caller must copy anything it wants to keep beyond the next frame.

use crate::beamformer::Beamformer;
use crate::delaysum::DelaySum;
use crate::error::{Error, Result};
use crate::gcc::Gcc;
use crate::math::Xyz;
use crate::mic::Mics;
use crate::phat::Phat;
use crate::points::{Geometry, Points};
use crate::scm::Scm;
use crate::signal::{Covs, Doa, DoaKind, Doas, Dsf, Freqs, Hops, Masks, Tdoas, Weights};
use crate::ssl::Ssl;
use crate::sst::Sst;
use crate::steering::Steering;
use crate::stft::{Istft, Stft, Window};

/// Configuration shared by the pipelines. Fields irrelevant to a particular
/// pipeline are ignored by it.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub sample_rate: f32,
    /// Samples consumed per frame and per channel.
    pub hop_length: usize,
    /// Correlation peaks extracted per pair.
    pub num_sources: usize,
    /// Potential directions emitted by the localizer.
    pub num_directions: usize,
    /// Track slots maintained by the tracker.
    pub num_tracks: usize,
    pub fft_length: usize,
    pub window: Window,
    pub sound_speed: f32,
    /// Grid scanned by the localizer.
    pub geometry: Geometry,
    /// Mixing factor of the covariance recursion.
    pub scm_alpha: f32,
    /// History length of the tracker.
    pub sst_num_pasts: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000.0,
            hop_length: 128,
            num_sources: 1,
            num_directions: 2,
            num_tracks: 3,
            fft_length: 512,
            window: Window::Hann,
            sound_speed: crate::SPEED_OF_SOUND,
            geometry: Geometry::HalfSphere,
            scm_alpha: 0.5,
            sst_num_pasts: 40,
        }
    }
}

impl PipelineConfig {
    fn num_bins(&self) -> usize {
        self.fft_length / 2 + 1
    }

    /// Peak search bound in samples derived from the array aperture, with a
    /// one-sample margin.
    fn max_delay(&self, mics: &Mics) -> f32 {
        mics.aperture() * self.sample_rate / self.sound_speed + 1.0
    }
}

/// One localized direction: unit coordinate and energy in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionEstimate {
    pub coord: Xyz,
    pub energy: f32,
}

/// Beamformed audio, `num_channels x hop_length`, channel-major.
#[derive(Clone, Debug, Default)]
pub struct AudioFrame {
    samples: Vec<f32>,
    num_channels: usize,
    hop_length: usize,
}

impl AudioFrame {
    fn from_hops(&mut self, hops: &Hops) {
        self.num_channels = hops.num_channels();
        self.hop_length = hops.num_shifts();
        self.samples.clear();
        self.samples.extend_from_slice(hops.data());
    }

    fn zero_channel(&mut self, channel: usize) {
        let start = channel * self.hop_length;
        self.samples[start..start + self.hop_length].fill(0.0);
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// All samples, channel-major.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index * self.hop_length..(index + 1) * self.hop_length]
    }
}

fn collect_potentials(doas: &Doas, out: &mut Vec<DirectionEstimate>) {
    out.clear();
    for doa in doas.iter() {
        if doa.kind == DoaKind::Potential {
            out.push(DirectionEstimate {
                coord: doa.coord,
                energy: doa.energy,
            });
        }
    }
}

fn collect_tracked(doas: &Doas, out: &mut Vec<(usize, DirectionEstimate)>) {
    out.clear();
    for (slot, doa) in doas.iter().enumerate() {
        if doa.kind == DoaKind::Tracked {
            out.push((
                slot,
                DirectionEstimate {
                    coord: doa.coord,
                    energy: doa.energy,
                },
            ));
        }
    }
}

/// Result of one localization frame.
#[derive(Clone, Debug, Default)]
pub struct SslResult {
    pub potentials: Vec<DirectionEstimate>,
}

/// Localization pipeline: STFT -> SCM -> PHAT -> GCC -> SSL.
pub struct SslPipeline {
    hops: Hops,
    freqs: Freqs,
    masks: Masks,
    covs: Covs,
    covs_phat: Covs,
    tdoas: Tdoas,
    doas: Doas,
    stft: Stft,
    scm: Scm,
    phat: Phat,
    gcc: Gcc,
    ssl: Ssl,
    result: SslResult,
}

impl SslPipeline {
    pub fn new(mics: &Mics, config: &PipelineConfig) -> Result<Self> {
        let channels = mics.len();
        let bins = config.num_bins();
        Ok(Self {
            hops: Hops::new("xs", channels, config.hop_length)?,
            freqs: Freqs::new("Xs", channels, bins)?,
            masks: ones(channels, bins)?,
            covs: Covs::new("XXs", channels, bins)?,
            covs_phat: Covs::new("XXps", channels, bins)?,
            tdoas: Tdoas::new("tdoas", channels, config.num_sources)?,
            doas: Doas::new("doas", config.num_directions)?,
            stft: Stft::new(channels, config.fft_length, config.hop_length, config.window)?,
            scm: Scm::new(channels, bins, config.scm_alpha)?,
            phat: Phat::new(channels, bins),
            gcc: Gcc::new(config.num_sources, channels, bins)?
                .with_max_delay(config.max_delay(mics)),
            ssl: Ssl::new(
                mics,
                Points::shared(config.geometry),
                config.sample_rate,
                config.sound_speed,
                config.num_sources,
                config.num_directions,
            )?,
            result: SslResult::default(),
        })
    }

    pub fn process(&mut self, audio: &[f32]) -> Result<&SslResult> {
        self.hops.load_f32(audio)?;
        self.stft.process(&self.hops, &mut self.freqs)?;
        self.scm.process(&self.freqs, &self.masks, &mut self.covs)?;
        self.phat.process(&self.covs, &mut self.covs_phat)?;
        self.gcc.process(&self.covs_phat, &mut self.tdoas)?;
        self.ssl.process(&self.tdoas, &mut self.doas)?;
        collect_potentials(&self.doas, &mut self.result.potentials);
        Ok(&self.result)
    }
}

/// Result of one tracking frame.
#[derive(Clone, Debug, Default)]
pub struct SstResult {
    pub potentials: Vec<DirectionEstimate>,
    /// Tracked directions keyed by stable slot index.
    pub tracked: Vec<(usize, DirectionEstimate)>,
}

/// Tracking pipeline: the localization pipeline followed by SST.
pub struct SstPipeline {
    hops: Hops,
    freqs: Freqs,
    masks: Masks,
    covs: Covs,
    covs_phat: Covs,
    tdoas: Tdoas,
    doas_potential: Doas,
    doas_tracked: Doas,
    dsf: Dsf,
    stft: Stft,
    scm: Scm,
    phat: Phat,
    gcc: Gcc,
    ssl: Ssl,
    sst: Sst,
    result: SstResult,
}

impl SstPipeline {
    pub fn new(mics: &Mics, config: &PipelineConfig) -> Result<Self> {
        let channels = mics.len();
        let bins = config.num_bins();
        Ok(Self {
            hops: Hops::new("xs", channels, config.hop_length)?,
            freqs: Freqs::new("Xs", channels, bins)?,
            masks: ones(channels, bins)?,
            covs: Covs::new("XXs", channels, bins)?,
            covs_phat: Covs::new("XXps", channels, bins)?,
            tdoas: Tdoas::new("tdoas", channels, config.num_sources)?,
            doas_potential: Doas::new("doas_potential", config.num_directions)?,
            doas_tracked: Doas::new("doas_tracked", config.num_tracks)?,
            dsf: Dsf::new("dsf")?,
            stft: Stft::new(channels, config.fft_length, config.hop_length, config.window)?,
            scm: Scm::new(channels, bins, config.scm_alpha)?,
            phat: Phat::new(channels, bins),
            gcc: Gcc::new(config.num_sources, channels, bins)?
                .with_max_delay(config.max_delay(mics)),
            ssl: Ssl::new(
                mics,
                Points::shared(config.geometry),
                config.sample_rate,
                config.sound_speed,
                config.num_sources,
                config.num_directions,
            )?,
            sst: Sst::new(config.num_tracks, config.num_directions, config.sst_num_pasts)?,
            result: SstResult::default(),
        })
    }

    /// Tracker tuning parameters.
    pub fn dsf(&self) -> &Dsf {
        &self.dsf
    }

    pub fn dsf_mut(&mut self) -> &mut Dsf {
        &mut self.dsf
    }

    pub fn process(&mut self, audio: &[f32]) -> Result<&SstResult> {
        self.hops.load_f32(audio)?;
        self.stft.process(&self.hops, &mut self.freqs)?;
        self.scm.process(&self.freqs, &self.masks, &mut self.covs)?;
        self.phat.process(&self.covs, &mut self.covs_phat)?;
        self.gcc.process(&self.covs_phat, &mut self.tdoas)?;
        self.ssl.process(&self.tdoas, &mut self.doas_potential)?;
        self.sst
            .process(&self.dsf, &self.doas_potential, &mut self.doas_tracked)?;
        collect_potentials(&self.doas_potential, &mut self.result.potentials);
        collect_tracked(&self.doas_tracked, &mut self.result.tracked);
        Ok(&self.result)
    }
}

/// Result of one beamforming frame.
#[derive(Clone, Debug, Default)]
pub struct DelaySumResult {
    pub audio: AudioFrame,
}

/// Blind beamforming pipeline: the correlation front end steers a
/// delay-and-sum beamformer at the strongest correlation peaks.
pub struct DelaySumPipeline {
    hops_in: Hops,
    freqs_in: Freqs,
    masks: Masks,
    covs: Covs,
    covs_phat: Covs,
    tdoas: Tdoas,
    weights: Weights,
    freqs_out: Freqs,
    hops_out: Hops,
    stft: Stft,
    scm: Scm,
    phat: Phat,
    gcc: Gcc,
    delaysum: DelaySum,
    beamformer: Beamformer,
    istft: Istft,
    result: DelaySumResult,
}

impl DelaySumPipeline {
    pub fn new(mics: &Mics, config: &PipelineConfig) -> Result<Self> {
        let channels = mics.len();
        let bins = config.num_bins();
        Ok(Self {
            hops_in: Hops::new("xs", channels, config.hop_length)?,
            freqs_in: Freqs::new("Xs", channels, bins)?,
            masks: ones(channels, bins)?,
            covs: Covs::new("XXs", channels, bins)?,
            covs_phat: Covs::new("XXps", channels, bins)?,
            tdoas: Tdoas::new("tdoas", channels, config.num_sources)?,
            weights: Weights::new("Ws", config.num_sources, channels, bins)?,
            freqs_out: Freqs::new("Ys", config.num_sources, bins)?,
            hops_out: Hops::new("ys", config.num_sources, config.hop_length)?,
            stft: Stft::new(channels, config.fft_length, config.hop_length, config.window)?,
            scm: Scm::new(channels, bins, config.scm_alpha)?,
            phat: Phat::new(channels, bins),
            gcc: Gcc::new(config.num_sources, channels, bins)?
                .with_max_delay(config.max_delay(mics)),
            delaysum: DelaySum::new(config.num_sources, channels, bins)?,
            beamformer: Beamformer::new(config.num_sources, channels, bins),
            istft: Istft::new(config.num_sources, config.fft_length, config.hop_length, config.window)?,
            result: DelaySumResult::default(),
        })
    }

    pub fn process(&mut self, audio: &[f32]) -> Result<&DelaySumResult> {
        self.hops_in.load_f32(audio)?;
        self.stft.process(&self.hops_in, &mut self.freqs_in)?;
        self.scm.process(&self.freqs_in, &self.masks, &mut self.covs)?;
        self.phat.process(&self.covs, &mut self.covs_phat)?;
        self.gcc.process(&self.covs_phat, &mut self.tdoas)?;
        self.delaysum.process(&self.tdoas, &mut self.weights)?;
        self.beamformer
            .process(&self.freqs_in, &self.weights, &mut self.freqs_out)?;
        self.istft.process(&self.freqs_out, &mut self.hops_out)?;
        self.result.audio.from_hops(&self.hops_out);
        Ok(&self.result)
    }
}

/// Beamforming pipeline steered by caller-supplied directions.
pub struct SteeringDelaySumPipeline {
    hops_in: Hops,
    freqs_in: Freqs,
    doas: Doas,
    tdoas: Tdoas,
    weights: Weights,
    freqs_out: Freqs,
    hops_out: Hops,
    stft: Stft,
    steering: Steering,
    delaysum: DelaySum,
    beamformer: Beamformer,
    istft: Istft,
    result: DelaySumResult,
}

impl SteeringDelaySumPipeline {
    pub fn new(mics: &Mics, config: &PipelineConfig) -> Result<Self> {
        let channels = mics.len();
        let bins = config.num_bins();
        let tdoas = Tdoas::new("tdoas", channels, config.num_sources)?;
        let mut weights = Weights::new("Ws", config.num_sources, channels, bins)?;
        let delaysum = DelaySum::new(config.num_sources, channels, bins)?;
        // Until directions are set, zero delays make the beamformer a plain
        // channel average.
        delaysum.process(&tdoas, &mut weights)?;
        Ok(Self {
            hops_in: Hops::new("xs", channels, config.hop_length)?,
            freqs_in: Freqs::new("Xs", channels, bins)?,
            doas: Doas::new("doas", config.num_sources)?,
            tdoas,
            weights,
            freqs_out: Freqs::new("Ys", config.num_sources, bins)?,
            hops_out: Hops::new("ys", config.num_sources, config.hop_length)?,
            stft: Stft::new(channels, config.fft_length, config.hop_length, config.window)?,
            steering: Steering::new(mics, config.sample_rate, config.sound_speed, config.num_sources)?,
            delaysum,
            beamformer: Beamformer::new(config.num_sources, channels, bins),
            istft: Istft::new(config.num_sources, config.fft_length, config.hop_length, config.window)?,
            result: DelaySumResult::default(),
        })
    }

    /// Update the directions to listen to. The slice length must equal the
    /// configured number of sources; every vector must be finite and
    /// nonzero, and is renormalized to unit length.
    pub fn set_directions(&mut self, directions: &[Xyz]) -> Result<()> {
        if directions.len() != self.doas.len() {
            return Err(Error::Dimension {
                role: "directions",
                dim: "entries",
                expected: self.doas.len(),
                actual: directions.len(),
            });
        }
        for direction in directions {
            if !direction.is_finite() || direction.mag() < 1.0e-6 {
                return Err(Error::NotUnit {
                    x: direction.x,
                    y: direction.y,
                    z: direction.z,
                });
            }
        }
        for (slot, direction) in directions.iter().enumerate() {
            self.doas
                .set(slot, Doa::new(DoaKind::Target, direction.unit(), 1.0));
        }
        self.steering.process(&self.doas, &mut self.tdoas)?;
        self.delaysum.process(&self.tdoas, &mut self.weights)?;
        Ok(())
    }

    pub fn process(&mut self, audio: &[f32]) -> Result<&DelaySumResult> {
        self.hops_in.load_f32(audio)?;
        self.stft.process(&self.hops_in, &mut self.freqs_in)?;
        self.beamformer
            .process(&self.freqs_in, &self.weights, &mut self.freqs_out)?;
        self.istft.process(&self.freqs_out, &mut self.hops_out)?;
        self.result.audio.from_hops(&self.hops_out);
        Ok(&self.result)
    }
}

/// Result of one tracking-and-beamforming frame.
#[derive(Clone, Debug, Default)]
pub struct SstDelaySumResult {
    pub potentials: Vec<DirectionEstimate>,
    /// Tracked directions keyed by stable slot index.
    pub tracked: Vec<(usize, DirectionEstimate)>,
    /// One audio channel per track slot; slots without a live track are
    /// all-zero.
    pub audio: AudioFrame,
}

/// Tracking pipeline branched into a delay-and-sum beamformer: each live
/// track gets its own enhanced audio channel.
pub struct SstDelaySumPipeline {
    hops_in: Hops,
    freqs_in: Freqs,
    masks: Masks,
    covs: Covs,
    covs_phat: Covs,
    tdoas: Tdoas,
    doas_potential: Doas,
    doas_tracked: Doas,
    tdoas_tracked: Tdoas,
    dsf: Dsf,
    weights: Weights,
    freqs_out: Freqs,
    hops_out: Hops,
    stft: Stft,
    scm: Scm,
    phat: Phat,
    gcc: Gcc,
    ssl: Ssl,
    sst: Sst,
    steering: Steering,
    delaysum: DelaySum,
    beamformer: Beamformer,
    istft: Istft,
    result: SstDelaySumResult,
}

impl SstDelaySumPipeline {
    pub fn new(mics: &Mics, config: &PipelineConfig) -> Result<Self> {
        let channels = mics.len();
        let bins = config.num_bins();
        Ok(Self {
            hops_in: Hops::new("xs", channels, config.hop_length)?,
            freqs_in: Freqs::new("Xs", channels, bins)?,
            masks: ones(channels, bins)?,
            covs: Covs::new("XXs", channels, bins)?,
            covs_phat: Covs::new("XXps", channels, bins)?,
            tdoas: Tdoas::new("tdoas", channels, config.num_sources)?,
            doas_potential: Doas::new("doas_potential", config.num_directions)?,
            doas_tracked: Doas::new("doas_tracked", config.num_tracks)?,
            tdoas_tracked: Tdoas::new("tdoas_tracked", channels, config.num_tracks)?,
            dsf: Dsf::new("dsf")?,
            weights: Weights::new("Ws", config.num_tracks, channels, bins)?,
            freqs_out: Freqs::new("Ys", config.num_tracks, bins)?,
            hops_out: Hops::new("ys", config.num_tracks, config.hop_length)?,
            stft: Stft::new(channels, config.fft_length, config.hop_length, config.window)?,
            scm: Scm::new(channels, bins, config.scm_alpha)?,
            phat: Phat::new(channels, bins),
            gcc: Gcc::new(config.num_sources, channels, bins)?
                .with_max_delay(config.max_delay(mics)),
            ssl: Ssl::new(
                mics,
                Points::shared(config.geometry),
                config.sample_rate,
                config.sound_speed,
                config.num_sources,
                config.num_directions,
            )?,
            sst: Sst::new(config.num_tracks, config.num_directions, config.sst_num_pasts)?,
            steering: Steering::new(mics, config.sample_rate, config.sound_speed, config.num_tracks)?,
            delaysum: DelaySum::new(config.num_tracks, channels, bins)?,
            beamformer: Beamformer::new(config.num_tracks, channels, bins),
            istft: Istft::new(config.num_tracks, config.fft_length, config.hop_length, config.window)?,
            result: SstDelaySumResult::default(),
        })
    }

    /// Tracker tuning parameters.
    pub fn dsf(&self) -> &Dsf {
        &self.dsf
    }

    pub fn dsf_mut(&mut self) -> &mut Dsf {
        &mut self.dsf
    }

    pub fn process(&mut self, audio: &[f32]) -> Result<&SstDelaySumResult> {
        self.hops_in.load_f32(audio)?;
        self.stft.process(&self.hops_in, &mut self.freqs_in)?;
        self.scm.process(&self.freqs_in, &self.masks, &mut self.covs)?;
        self.phat.process(&self.covs, &mut self.covs_phat)?;
        self.gcc.process(&self.covs_phat, &mut self.tdoas)?;
        self.ssl.process(&self.tdoas, &mut self.doas_potential)?;
        self.sst
            .process(&self.dsf, &self.doas_potential, &mut self.doas_tracked)?;

        self.steering
            .process(&self.doas_tracked, &mut self.tdoas_tracked)?;
        self.delaysum.process(&self.tdoas_tracked, &mut self.weights)?;
        self.beamformer
            .process(&self.freqs_in, &self.weights, &mut self.freqs_out)?;
        self.istft.process(&self.freqs_out, &mut self.hops_out)?;

        self.result.audio.from_hops(&self.hops_out);
        for (slot, doa) in self.doas_tracked.iter().enumerate() {
            if doa.kind != DoaKind::Tracked {
                self.result.audio.zero_channel(slot);
            }
        }
        collect_potentials(&self.doas_potential, &mut self.result.potentials);
        collect_tracked(&self.doas_tracked, &mut self.result.tracked);
        Ok(&self.result)
    }
}

fn ones(channels: usize, bins: usize) -> Result<Masks> {
    let mut masks = Masks::new("Ms", channels, bins)?;
    masks.set_ones();
    Ok(masks)
}
