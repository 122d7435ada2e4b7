//! Probabilistic multi-source tracking.

use crate::error::{check_dim, Error, Result};
use crate::math::Xyz;
use crate::signal::{Doa, DoaKind, Doas, Dsf};

#[inline]
fn logistic(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// One track slot.
#[derive(Clone, Debug)]
struct Track {
    active: bool,
    /// Existence probability.
    probability: f32,
    /// Smoothed unit direction.
    direction: Xyz,
    /// Ring of the most recent association likelihoods.
    pasts: Vec<f32>,
    cursor: usize,
    filled: usize,
}

impl Track {
    fn new(num_pasts: usize) -> Self {
        Self {
            active: false,
            probability: 0.0,
            direction: Xyz::default(),
            pasts: vec![0.0; num_pasts],
            cursor: 0,
            filled: 0,
        }
    }

    fn push_past(&mut self, likelihood: f32) {
        self.pasts[self.cursor] = likelihood;
        self.cursor = (self.cursor + 1) % self.pasts.len();
        self.filled = (self.filled + 1).min(self.pasts.len());
    }

    /// Mean likelihood over the recorded history.
    fn activity(&self) -> f32 {
        if self.filled == 0 {
            return 0.0;
        }
        self.pasts[..self.filled].iter().sum::<f32>() / self.filled as f32
    }

    fn free(&mut self) {
        self.active = false;
        self.probability = 0.0;
        self.direction = Xyz::default();
        self.pasts.fill(0.0);
        self.cursor = 0;
        self.filled = 0;
    }
}

/// Maps potential directions onto a bounded set of stable tracks.
///
/// Each frame, every active track is associated with the potential
/// observation it likes best; the association likelihood is the logistic
/// `sigma(slope (mean - angle))` of the angular distance, weighted by the
/// observation energy. A detection above the tracked-source threshold feeds
/// the existence filter `P <- (1 - g) P + g a`, whose gain
/// `g = rate a / (a + sigma2)` discounts weak associations by the
/// observation variance, and pulls the smoothed direction toward the
/// observation; silence relaxes P at the base rate until the delete
/// threshold, after which P decays multiplicatively and the slot is
/// eventually freed. One track may be born per frame from the most
/// energetic unclaimed observation.
///
/// Slot identity is stable: a track created in slot `k` keeps reporting at
/// index `k` until it dies.
pub struct Sst {
    num_tracks: usize,
    num_directions: usize,
    num_pasts: usize,
    tracks: Vec<Track>,
    claimed: Vec<bool>,
}

impl Sst {
    pub fn new(num_tracks: usize, num_directions: usize, num_pasts: usize) -> Result<Self> {
        if num_tracks == 0 || num_directions == 0 {
            return Err(Error::Parameter {
                what: "track or direction count",
                why: "must be at least 1",
            });
        }
        if num_pasts == 0 {
            return Err(Error::Parameter {
                what: "history length",
                why: "must be at least 1",
            });
        }
        Ok(Self {
            num_tracks,
            num_directions,
            num_pasts,
            tracks: (0..num_tracks).map(|_| Track::new(num_pasts)).collect(),
            claimed: vec![false; num_directions],
        })
    }

    pub fn num_tracks(&self) -> usize {
        self.num_tracks
    }

    pub fn num_directions(&self) -> usize {
        self.num_directions
    }

    pub fn num_pasts(&self) -> usize {
        self.num_pasts
    }

    /// Drop all tracks.
    pub fn reset(&mut self) {
        for track in self.tracks.iter_mut() {
            track.free();
        }
    }

    pub fn process(&mut self, dsf: &Dsf, doas_in: &Doas, doas_out: &mut Doas) -> Result<()> {
        check_dim("input", "directions", self.num_directions, doas_in.len())?;
        check_dim("output", "tracks", self.num_tracks, doas_out.len())?;

        self.claimed.fill(false);

        // Update existing tracks from their best associations.
        for track in self.tracks.iter_mut().filter(|t| t.active) {
            let mut best = 0.0f32;
            let mut best_index = None;
            for (index, observation) in doas_in.iter().enumerate() {
                if observation.kind != DoaKind::Potential {
                    continue;
                }
                let angle = track.direction.angle(observation.coord);
                let likelihood = logistic(dsf.sigmoid_slope * (dsf.sigmoid_mean - angle))
                    * observation.energy.clamp(0.0, 1.0);
                if likelihood > best {
                    best = likelihood;
                    best_index = Some(index);
                }
            }

            if let Some(index) = best_index.filter(|_| best >= dsf.tracked_source_threshold) {
                self.claimed[index] = true;
                // The observation variance discounts the gain of weak
                // detections.
                let gain = dsf.tracked_source_rate * best
                    / (best + dsf.tracked_source_sigma2);
                track.probability = (1.0 - gain) * track.probability + gain * best;
                let pull = dsf.tracked_source_rate * best;
                track.direction =
                    ((1.0 - pull) * track.direction + pull * doas_in.get(index).coord).unit();
                track.push_past(best);
            } else {
                track.push_past(0.0);
                if track.probability >= dsf.delete_threshold {
                    track.probability *= 1.0 - dsf.tracked_source_rate;
                } else {
                    track.probability *= dsf.delete_decay;
                }
            }

            if track.probability < 0.5 * dsf.delete_threshold {
                track.free();
            }
        }

        // At most one birth per frame: the most energetic unclaimed
        // observation above the new-source threshold takes the lowest
        // free slot.
        let newborn = doas_in
            .iter()
            .enumerate()
            .filter(|(index, observation)| {
                observation.kind == DoaKind::Potential
                    && !self.claimed[*index]
                    && observation.energy > dsf.new_threshold
            })
            .max_by(|a, b| a.1.energy.total_cmp(&b.1.energy));
        if let Some((_, observation)) = newborn {
            if let Some(track) = self.tracks.iter_mut().find(|t| !t.active) {
                track.active = true;
                track.probability =
                    observation.energy.clamp(0.0, 1.0) * (1.0 - dsf.new_source_sigma2);
                track.direction = observation.coord.unit();
                track.push_past(observation.energy.clamp(0.0, 1.0));
            }
        }

        for (slot, track) in self.tracks.iter().enumerate() {
            let doa = if track.active {
                Doa::new(DoaKind::Tracked, track.direction, track.activity())
            } else {
                Doa::default()
            };
            doas_out.set(slot, doa);
        }
        Ok(())
    }
}
