//! Microphone geometry: single elements, arrays and hardware presets.

use crate::math::Xyz;

/// Directivity pattern of one microphone element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Pattern {
    #[default]
    Omnidirectional,
    Cardioid,
}

/// One microphone: position in meters, facing direction and pattern.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mic {
    pub position: Xyz,
    pub direction: Xyz,
    pub pattern: Pattern,
}

impl Mic {
    pub fn new(position: Xyz, direction: Xyz, pattern: Pattern) -> Self {
        Self {
            position,
            direction,
            pattern,
        }
    }

    /// Directivity gain toward the unit direction `u` (from the microphone
    /// toward the source): 1 for an omnidirectional element,
    /// `(1 + d . u) / 2` for a cardioid with facing direction `d`.
    pub fn gain(&self, u: Xyz) -> f32 {
        match self.pattern {
            Pattern::Omnidirectional => 1.0,
            Pattern::Cardioid => (1.0 + self.direction.unit().dot(u)) / 2.0,
        }
    }
}

/// Well-known array geometries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hardware {
    /// ReSpeaker USB 4-mic square array, 0.064 m across.
    RespeakerUsb4,
    /// ReSpeaker 6-mic circular array, 0.0463 m radius.
    RespeakerUsb6,
    /// miniDSP UMA-8: one center element plus a 0.043 m ring of six.
    MinidspUma,
    /// 16-element planar demo array, 4 x 4 grid at 0.04 m pitch.
    Sc16DemoArray,
    /// 16-element circular array, 0.08 m radius.
    Sc16F,
    /// IntRoLab 4-mic circular array, 0.088 m radius.
    IntrolabCircular,
    /// Vibe.us 6-mic circular array, 0.045 m radius.
    VibeusCircular,
    /// Soundskrit mug: three outward-facing cardioids on a 0.0375 m ring.
    SoundskritMug,
}

/// A microphone array.
#[derive(Clone, Debug, PartialEq)]
pub struct Mics {
    mics: Vec<Mic>,
}

const UP: Xyz = Xyz::new(0.0, 0.0, 1.0);

fn ring(count: usize, radius: f32, start_degrees: f32) -> impl Iterator<Item = Xyz> {
    (0..count).map(move |i| {
        let theta = (start_degrees + i as f32 * 360.0 / count as f32).to_radians();
        Xyz::new(radius * theta.cos(), radius * theta.sin(), 0.0)
    })
}

impl Mics {
    pub fn new(mics: Vec<Mic>) -> Self {
        Self { mics }
    }

    /// The geometry of a known device.
    pub fn from_hardware(hardware: Hardware) -> Self {
        let mics = match hardware {
            Hardware::RespeakerUsb4 => vec![
                Mic::new(Xyz::new(-0.032, 0.0, 0.0), UP, Pattern::Omnidirectional),
                Mic::new(Xyz::new(0.0, -0.032, 0.0), UP, Pattern::Omnidirectional),
                Mic::new(Xyz::new(0.032, 0.0, 0.0), UP, Pattern::Omnidirectional),
                Mic::new(Xyz::new(0.0, 0.032, 0.0), UP, Pattern::Omnidirectional),
            ],
            Hardware::RespeakerUsb6 => ring(6, 0.0463, 0.0)
                .map(|p| Mic::new(p, UP, Pattern::Omnidirectional))
                .collect(),
            Hardware::MinidspUma => core::iter::once(Xyz::new(0.0, 0.0, 0.0))
                .chain(ring(6, 0.043, 90.0))
                .map(|p| Mic::new(p, UP, Pattern::Omnidirectional))
                .collect(),
            Hardware::Sc16DemoArray => {
                let mut mics = Vec::with_capacity(16);
                for row in 0..4 {
                    for column in 0..4 {
                        let x = -0.06 + 0.04 * column as f32;
                        let y = -0.06 + 0.04 * row as f32;
                        mics.push(Mic::new(
                            Xyz::new(x, y, 0.0),
                            UP,
                            Pattern::Omnidirectional,
                        ));
                    }
                }
                mics
            }
            Hardware::Sc16F => ring(16, 0.08, 0.0)
                .map(|p| Mic::new(p, UP, Pattern::Omnidirectional))
                .collect(),
            Hardware::IntrolabCircular => ring(4, 0.088, 0.0)
                .map(|p| Mic::new(p, UP, Pattern::Omnidirectional))
                .collect(),
            Hardware::VibeusCircular => ring(6, 0.045, 180.0)
                .map(|p| Mic::new(p, UP, Pattern::Omnidirectional))
                .collect(),
            Hardware::SoundskritMug => ring(3, 0.0375, 0.0)
                .map(|p| Mic::new(p, p.unit(), Pattern::Cardioid))
                .collect(),
        };
        Self { mics }
    }

    pub fn len(&self) -> usize {
        self.mics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mics.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> &Mic {
        &self.mics[index]
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Mic> {
        self.mics.iter()
    }

    pub fn as_slice(&self) -> &[Mic] {
        &self.mics
    }

    /// Largest distance between any two elements, in meters.
    pub fn aperture(&self) -> f32 {
        let mut largest = 0.0f32;
        for i in 0..self.mics.len() {
            for j in i + 1..self.mics.len() {
                largest = largest.max((self.mics[j].position - self.mics[i].position).mag());
            }
        }
        largest
    }
}

impl core::ops::Index<usize> for Mics {
    type Output = Mic;
    fn index(&self, index: usize) -> &Mic {
        &self.mics[index]
    }
}
