//! Forward mapping from directions to per-pair delays.

use crate::error::{check_dim, Error, Result};
use crate::mic::Mics;
use crate::signal::{DoaKind, Doas, Tdoa, Tdoas};

/// Computes, for each direction slot, the time difference of arrival of
/// every microphone pair: `tau_ij(u) = (p_j - p_i) . u * fs / c` samples.
///
/// Undefined slots produce zeroed rows; any other slot must hold a unit
/// direction. Amplitudes are set to 1.
pub struct Steering {
    positions: Vec<crate::math::Xyz>,
    num_channels: usize,
    num_pairs: usize,
    num_sources: usize,
    sample_rate: f32,
    sound_speed: f32,
}

impl Steering {
    pub fn new(
        mics: &Mics,
        sample_rate: f32,
        sound_speed: f32,
        num_sources: usize,
    ) -> Result<Self> {
        if mics.len() < 2 {
            return Err(Error::Parameter {
                what: "microphone count",
                why: "must be at least 2",
            });
        }
        if !(sample_rate > 0.0) || !(sound_speed > 0.0) {
            return Err(Error::Parameter {
                what: "sample rate or sound speed",
                why: "must be positive",
            });
        }
        Ok(Self {
            positions: mics.iter().map(|m| m.position).collect(),
            num_channels: mics.len(),
            num_pairs: crate::signal::pair_count(mics.len()),
            num_sources,
            sample_rate,
            sound_speed,
        })
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_pairs(&self) -> usize {
        self.num_pairs
    }

    pub fn num_sources(&self) -> usize {
        self.num_sources
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn sound_speed(&self) -> f32 {
        self.sound_speed
    }

    pub fn process(&self, doas: &Doas, tdoas: &mut Tdoas) -> Result<()> {
        check_dim("input", "directions", self.num_sources, doas.len())?;
        check_dim("output", "channels", self.num_channels, tdoas.num_channels())?;
        check_dim("output", "sources", self.num_sources, tdoas.num_sources())?;

        let scale = self.sample_rate / self.sound_speed;
        for (s, doa) in doas.iter().enumerate() {
            if doa.kind == DoaKind::Undefined {
                tdoas.source_mut(s).fill(Tdoa::default());
                continue;
            }
            let u = doa.coord;
            if !u.is_finite() || !u.is_unit(1.0e-3) {
                return Err(Error::NotUnit {
                    x: u.x,
                    y: u.y,
                    z: u.z,
                });
            }
            let mut pair = 0;
            for i in 0..self.num_channels {
                for j in i + 1..self.num_channels {
                    let delay = (self.positions[j] - self.positions[i]).dot(u) * scale;
                    tdoas.set(s, pair, Tdoa { delay, amplitude: 1.0 });
                    pair += 1;
                }
            }
        }
        Ok(())
    }
}
