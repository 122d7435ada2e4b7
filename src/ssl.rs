//! Grid-search sound source localization.

use crate::error::{check_dim, Error, Result};
use crate::mic::Mics;
use crate::points::Points;
use crate::signal::{Doa, DoaKind, Doas, Tdoas};

/// Expected delay of one (point, pair) combination, split into the nearest
/// integer sample and the sub-sample remainder.
#[derive(Clone, Copy)]
struct ExpectedDelay {
    nearest: i32,
    remainder: f32,
}

/// Scores every grid direction against the measured delays and emits the
/// best-separated top directions as potential sources.
///
/// For each grid point the per-pair delays are precomputed from the
/// microphone geometry. A frame's score for a point sums, over pairs and
/// over the correlation peaks of every source, the peak amplitude weighted
/// by the triangular kernel `max(0, 1 - |expected - measured|)`; a peak
/// contributes fully when it lands exactly on the expected delay and not at
/// all beyond one sample. Energies are scores normalized by the pair count.
///
/// Selection is greedy by descending score with an angular exclusion radius
/// of twice the grid spacing, so the emitted directions never collapse onto
/// one lobe.
pub struct Ssl {
    num_channels: usize,
    num_pairs: usize,
    num_sources: usize,
    num_directions: usize,
    num_points: usize,
    sample_rate: f32,
    sound_speed: f32,
    points: &'static Points,
    expected: Vec<ExpectedDelay>,
    scores: Vec<f32>,
    order: Vec<u32>,
    selected: Vec<usize>,
    exclusion_cos: f32,
}

impl Ssl {
    pub fn new(
        mics: &Mics,
        points: &'static Points,
        sample_rate: f32,
        sound_speed: f32,
        num_sources: usize,
        num_directions: usize,
    ) -> Result<Self> {
        if mics.len() < 2 {
            return Err(Error::Parameter {
                what: "microphone count",
                why: "must be at least 2",
            });
        }
        if num_directions == 0 || num_sources == 0 {
            return Err(Error::Parameter {
                what: "source or direction count",
                why: "must be at least 1",
            });
        }
        if !(sample_rate > 0.0) || !(sound_speed > 0.0) {
            return Err(Error::Parameter {
                what: "sample rate or sound speed",
                why: "must be positive",
            });
        }

        let num_channels = mics.len();
        let num_pairs = crate::signal::pair_count(num_channels);
        let scale = sample_rate / sound_speed;
        let mut expected = Vec::with_capacity(points.len() * num_pairs);
        for point in points.iter() {
            for i in 0..num_channels {
                for j in i + 1..num_channels {
                    let tau = (mics[j].position - mics[i].position).dot(*point) * scale;
                    let nearest = tau.round();
                    expected.push(ExpectedDelay {
                        nearest: nearest as i32,
                        remainder: tau - nearest,
                    });
                }
            }
        }

        let exclusion = 2.0 * points.spacing();
        Ok(Self {
            num_channels,
            num_pairs,
            num_sources,
            num_directions,
            num_points: points.len(),
            sample_rate,
            sound_speed,
            points,
            expected,
            scores: vec![0.0; points.len()],
            order: Vec::with_capacity(points.len()),
            selected: Vec::with_capacity(num_directions),
            exclusion_cos: exclusion.cos(),
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

    pub fn num_directions(&self) -> usize {
        self.num_directions
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn sound_speed(&self) -> f32 {
        self.sound_speed
    }

    pub fn points(&self) -> &'static Points {
        self.points
    }

    pub fn process(&mut self, tdoas: &Tdoas, doas: &mut Doas) -> Result<()> {
        check_dim("input", "channels", self.num_channels, tdoas.num_channels())?;
        check_dim("input", "sources", self.num_sources, tdoas.num_sources())?;
        check_dim("output", "directions", self.num_directions, doas.len())?;

        for (point, score) in self.scores.iter_mut().enumerate() {
            let expected = &self.expected[point * self.num_pairs..(point + 1) * self.num_pairs];
            let mut accumulator = 0.0;
            for source in 0..self.num_sources {
                for (pair, delay) in expected.iter().enumerate() {
                    let measured = tdoas.get(source, pair);
                    if measured.amplitude <= 0.0 {
                        continue;
                    }
                    let tau = delay.nearest as f32 + delay.remainder;
                    let distance = (tau - measured.delay).abs();
                    if distance < 1.0 {
                        accumulator += measured.amplitude * (1.0 - distance);
                    }
                }
            }
            *score = accumulator;
        }

        self.order.clear();
        self.order.extend(0..self.num_points as u32);
        let scores = &self.scores;
        self.order
            .sort_unstable_by(|&a, &b| scores[b as usize].total_cmp(&scores[a as usize]));

        self.selected.clear();
        for &candidate in self.order.iter() {
            if self.selected.len() == self.num_directions {
                break;
            }
            let point = self.points.get(candidate as usize);
            let close = self
                .selected
                .iter()
                .any(|&chosen| point.dot(self.points.get(chosen)) > self.exclusion_cos);
            if !close {
                self.selected.push(candidate as usize);
            }
        }

        for slot in 0..self.num_directions {
            let doa = match self.selected.get(slot) {
                Some(&index) => Doa::new(
                    DoaKind::Potential,
                    self.points.get(index),
                    (self.scores[index] / self.num_pairs as f32).clamp(0.0, 1.0),
                ),
                None => Doa::default(),
            };
            doas.set(slot, doa);
        }
        Ok(())
    }
}
