//! Channel selection and reordering.

use crate::error::{Error, Result};
use crate::signal::Hops;

/// Copies selected input channels to the output in mapping order.
pub struct Mixer {
    mapping: Vec<usize>,
}

impl Mixer {
    pub fn new(mapping: Vec<usize>) -> Result<Self> {
        if mapping.is_empty() {
            return Err(Error::Parameter {
                what: "channel mapping",
                why: "must not be empty",
            });
        }
        Ok(Self { mapping })
    }

    /// Number of output channels.
    pub fn num_channels(&self) -> usize {
        self.mapping.len()
    }

    pub fn mapping(&self) -> &[usize] {
        &self.mapping
    }

    pub fn process(&self, hops_in: &Hops, hops_out: &mut Hops) -> Result<()> {
        let required = self.mapping.iter().max().copied().unwrap_or(0) + 1;
        if hops_in.num_channels() < required {
            return Err(Error::Dimension {
                role: "input",
                dim: "channels",
                expected: required,
                actual: hops_in.num_channels(),
            });
        }
        if hops_out.num_channels() != self.mapping.len() {
            return Err(Error::Dimension {
                role: "output",
                dim: "channels",
                expected: self.mapping.len(),
                actual: hops_out.num_channels(),
            });
        }
        if hops_out.num_shifts() != hops_in.num_shifts() {
            return Err(Error::Dimension {
                role: "output",
                dim: "shifts",
                expected: hops_in.num_shifts(),
                actual: hops_out.num_shifts(),
            });
        }
        for (out_channel, &in_channel) in self.mapping.iter().enumerate() {
            hops_out
                .channel_mut(out_channel)
                .copy_from_slice(hops_in.channel(in_channel));
        }
        Ok(())
    }
}
