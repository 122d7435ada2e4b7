//! Cached real FFT plans shared by the frequency-domain stages.

use std::sync::Arc;

use num_complex::Complex32;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

/// A forward and inverse real FFT of one fixed power-of-two length.
///
/// Plans and scratch space are created once; processing never allocates.
/// Both directions are unnormalized, matching the underlying library: a
/// forward-inverse round trip gains a factor of the transform length.
pub(crate) struct Rfft {
    len: usize,
    r2c: Arc<dyn RealToComplex<f32>>,
    c2r: Arc<dyn ComplexToReal<f32>>,
    scratch_r2c: Vec<Complex32>,
    scratch_c2r: Vec<Complex32>,
}

impl Rfft {
    /// `len` must be a power of two; validated by the callers.
    pub fn new(len: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let r2c = planner.plan_fft_forward(len);
        let c2r = planner.plan_fft_inverse(len);
        let scratch_r2c = r2c.make_scratch_vec();
        let scratch_c2r = c2r.make_scratch_vec();
        Self {
            len,
            r2c,
            c2r,
            scratch_r2c,
            scratch_c2r,
        }
    }

    /// Transform length.
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of half-spectrum bins, `len / 2 + 1`.
    pub fn bins(&self) -> usize {
        self.len / 2 + 1
    }

    /// Real to complex transform. `time` is clobbered as scratch.
    pub fn forward(&mut self, time: &mut [f32], spectrum: &mut [Complex32]) {
        self.r2c
            .process_with_scratch(time, spectrum, &mut self.scratch_r2c)
            .expect("fft buffer lengths are fixed at construction");
    }

    /// Complex to real transform. `spectrum` is clobbered as scratch.
    ///
    /// The imaginary parts of the first and last bins have no real-signal
    /// counterpart and are forced to zero before transforming.
    pub fn inverse(&mut self, spectrum: &mut [Complex32], time: &mut [f32]) {
        spectrum[0].im = 0.0;
        let last = spectrum.len() - 1;
        spectrum[last].im = 0.0;
        self.c2r
            .process_with_scratch(spectrum, time, &mut self.scratch_c2r)
            .expect("fft buffer lengths are fixed at construction");
    }
}
