//! Covariance, whitening, correlation and beamforming stage tests.

use beamdsp::prelude::*;
use num_complex::Complex32;

fn complex(re: f32, im: f32) -> Complex32 {
    Complex32::new(re, im)
}

#[test]
fn scm_reports_configuration() {
    let scm = Scm::new(4, 8, 0.5).unwrap();
    assert_eq!(scm.num_channels(), 4);
    assert_eq!(scm.num_pairs(), 6);
    assert_eq!(scm.num_bins(), 8);
    assert_eq!(scm.alpha(), 0.5);

    assert!(Scm::new(4, 8, 0.0).is_err());
    assert!(Scm::new(4, 8, 1.5).is_err());
    assert!(Scm::new(1, 8, 0.5).is_err());
}

#[test]
fn scm_rejects_mismatched_containers() {
    let scm = Scm::new(4, 8, 0.5).unwrap();
    let freqs = Freqs::new("", 4, 8).unwrap();
    let masks = Masks::new("", 4, 8).unwrap();
    let mut covs = Covs::new("", 4, 8).unwrap();

    let bad_freqs = Freqs::new("", 5, 8).unwrap();
    assert!(scm.process(&bad_freqs, &masks, &mut covs).is_err());
    let bad_freqs = Freqs::new("", 4, 9).unwrap();
    assert!(scm.process(&bad_freqs, &masks, &mut covs).is_err());
    let bad_masks = Masks::new("", 5, 8).unwrap();
    assert!(scm.process(&freqs, &bad_masks, &mut covs).is_err());
    let bad_masks = Masks::new("", 4, 9).unwrap();
    assert!(scm.process(&freqs, &bad_masks, &mut covs).is_err());
    let mut bad_covs = Covs::new("", 5, 8).unwrap();
    assert!(scm.process(&freqs, &masks, &mut bad_covs).is_err());
    let mut bad_covs = Covs::new("", 4, 9).unwrap();
    assert!(scm.process(&freqs, &masks, &mut bad_covs).is_err());
}

#[test]
fn scm_mixes_cross_and_auto_spectra() {
    let scm = Scm::new(3, 4, 0.1).unwrap();
    let mut freqs = Freqs::new("", 3, 4).unwrap();
    let mut masks = Masks::new("", 3, 4).unwrap();
    let mut covs = Covs::new("", 3, 4).unwrap();
    masks.set_ones();

    freqs
        .load(&[
            complex(1.0, 2.0),
            complex(-1.0, 0.0),
            complex(3.0, -2.0),
            complex(0.0, 1.0),
            complex(0.0, -2.0),
            complex(2.0, 2.0),
            complex(1.0, 1.0),
            complex(-2.0, -1.0),
            complex(2.0, 0.0),
            complex(3.0, 2.0),
            complex(1.0, 1.0),
            complex(-1.0, -2.0),
        ])
        .unwrap();
    scm.process(&freqs, &masks, &mut covs).unwrap();

    let expected_xcorrs = [
        [
            complex(-0.4, 0.2),
            complex(-0.2, 0.2),
            complex(0.1, -0.5),
            complex(-0.1, -0.2),
        ],
        [
            complex(0.2, 0.4),
            complex(-0.3, 0.2),
            complex(0.1, -0.5),
            complex(-0.2, -0.1),
        ],
        [
            complex(0.0, -0.4),
            complex(1.0, 0.2),
            complex(0.2, 0.0),
            complex(0.4, -0.3),
        ],
    ];
    let expected_acorrs = [
        [0.5, 0.1, 1.3, 0.1],
        [0.4, 0.8, 0.2, 0.5],
        [0.4, 1.3, 0.2, 0.5],
    ];

    for pair in 0..3 {
        for bin in 0..4 {
            let got = covs.xcorr(pair)[bin];
            let want = expected_xcorrs[pair][bin];
            assert!((got - want).norm() < 1.0e-5, "pair {pair} bin {bin}");
        }
    }
    for channel in 0..3 {
        for bin in 0..4 {
            let got = covs.acorr(channel)[bin];
            let want = expected_acorrs[channel][bin];
            assert!((got - want).abs() < 1.0e-5, "channel {channel} bin {bin}");
        }
    }

    // A second identical frame advances the recursion to 1.9x.
    scm.process(&freqs, &masks, &mut covs).unwrap();
    for pair in 0..3 {
        for bin in 0..4 {
            let got = covs.xcorr(pair)[bin];
            let want = expected_xcorrs[pair][bin] * 1.9;
            assert!((got - want).norm() < 1.0e-5);
        }
    }
}

#[test]
fn phat_whitens_to_unit_magnitude() {
    let phat = Phat::new(3, 4);
    assert_eq!(phat.num_pairs(), 3);

    let mut covs_in = Covs::new("XXs", 3, 4).unwrap();
    let mut covs_out = Covs::new("XXps", 3, 4).unwrap();

    covs_in
        .load_xcorrs(&[
            complex(2.0, 1.0),
            complex(-3.0, 2.0),
            complex(1.0, -2.0),
            complex(2.0, -1.0),
            complex(1.0, -3.0),
            complex(-2.0, 1.0),
            complex(4.0, 2.0),
            complex(-1.0, 1.0),
            complex(-2.0, 2.0),
            complex(0.0, 0.0),
            complex(-1.0, 2.0),
            complex(-3.0, 1.0),
        ])
        .unwrap();
    covs_in
        .load_acorrs(&[2.0, 1.0, 3.0, 2.0, 1.0, 2.0, 1.0, 3.0, 2.0, 2.0, 2.0, 4.0])
        .unwrap();

    phat.process(&covs_in, &mut covs_out).unwrap();

    for pair in 0..3 {
        for bin in 0..4 {
            let magnitude = covs_out.xcorr(pair)[bin].norm();
            let want = if pair == 2 && bin == 1 { 0.0 } else { 1.0 };
            assert!((magnitude - want).abs() < 1.0e-6, "pair {pair} bin {bin}");
        }
    }
    for channel in 0..3 {
        for bin in 0..4 {
            assert!((covs_out.acorr(channel)[bin] - 1.0).abs() < 1.0e-3);
        }
    }
}

/// Whitening is idempotent: unit-magnitude input passes through unchanged.
#[test]
fn phat_is_idempotent() {
    let phat = Phat::new(3, 4);
    let mut covs_in = Covs::new("XXs", 3, 4).unwrap();
    let mut once = Covs::new("a", 3, 4).unwrap();
    let mut twice = Covs::new("b", 3, 4).unwrap();

    let values: Vec<Complex32> = (0..12)
        .map(|i| Complex32::from_polar(3.0, 0.7 * i as f32))
        .collect();
    covs_in.load_xcorrs(&values).unwrap();
    covs_in.load_acorrs(&[1.0; 12]).unwrap();

    phat.process(&covs_in, &mut once).unwrap();
    phat.process(&once, &mut twice).unwrap();

    for pair in 0..3 {
        for bin in 0..4 {
            let a = once.xcorr(pair)[bin];
            let b = twice.xcorr(pair)[bin];
            assert!((a - b).norm() < 1.0e-6);
        }
    }
}

#[test]
fn phat_rejects_mismatched_containers() {
    let phat = Phat::new(4, 8);
    let covs = Covs::new("", 4, 8).unwrap();

    let bad = Covs::new("", 5, 8).unwrap();
    let mut out = Covs::new("", 4, 8).unwrap();
    assert!(matches!(
        phat.process(&bad, &mut out),
        Err(Error::Dimension { role: "input", dim: "channels", expected: 4, actual: 5 })
    ));
    let bad = Covs::new("", 4, 9).unwrap();
    assert!(matches!(
        phat.process(&bad, &mut out),
        Err(Error::Dimension { role: "input", dim: "bins", expected: 8, actual: 9 })
    ));
    let mut bad_out = Covs::new("", 5, 8).unwrap();
    assert!(matches!(
        phat.process(&covs, &mut bad_out),
        Err(Error::Dimension { role: "output", dim: "channels", .. })
    ));
    let mut bad_out = Covs::new("", 4, 9).unwrap();
    assert!(matches!(
        phat.process(&covs, &mut bad_out),
        Err(Error::Dimension { role: "output", dim: "bins", .. })
    ));
}

#[test]
fn gcc_rejects_invalid_bin_counts() {
    assert!(matches!(Gcc::new(2, 4, 8), Err(Error::BinCount(8))));
    assert!(matches!(Gcc::new(2, 4, 10), Err(Error::BinCount(10))));
    assert!(Gcc::new(2, 4, 9).is_ok());
    assert!(Gcc::new(2, 4, 257).is_ok());
}

#[test]
fn gcc_rejects_mismatched_containers() {
    let mut gcc = Gcc::new(2, 4, 9).unwrap();

    let covs = Covs::new("", 5, 9).unwrap();
    let mut tdoas = Tdoas::new("", 4, 2).unwrap();
    assert!(gcc.process(&covs, &mut tdoas).is_err());

    let covs = Covs::new("", 4, 17).unwrap();
    assert!(gcc.process(&covs, &mut tdoas).is_err());

    let covs = Covs::new("", 4, 9).unwrap();
    let mut tdoas = Tdoas::new("", 5, 2).unwrap();
    assert!(gcc.process(&covs, &mut tdoas).is_err());
    let mut tdoas = Tdoas::new("", 4, 3).unwrap();
    assert!(gcc.process(&covs, &mut tdoas).is_err());
}

/// Synthetic phase ramps over the first 100 of 257 bins recover their
/// delays to sub-sample accuracy and an amplitude of 2 * 100 / 512.
#[test]
fn gcc_recovers_fractional_delays() {
    let num_bins = 257;
    let cropped = 100;
    let delays = [2.3f32, -15.25, 6.5];

    let mut gcc = Gcc::new(1, 3, num_bins).unwrap();
    let mut covs = Covs::new("XXs", 3, num_bins).unwrap();
    let mut tdoas = Tdoas::new("tdoas", 3, 1).unwrap();

    let mut xcorrs = vec![Complex32::default(); 3 * num_bins];
    for (pair, &delay) in delays.iter().enumerate() {
        for bin in 0..cropped {
            let omega = core::f32::consts::TAU * bin as f32 / ((num_bins - 1) * 2) as f32;
            xcorrs[pair * num_bins + bin] = Complex32::from_polar(1.0, -omega * delay);
        }
    }
    covs.load_xcorrs(&xcorrs).unwrap();

    gcc.process(&covs, &mut tdoas).unwrap();

    for (pair, &delay) in delays.iter().enumerate() {
        let tdoa = tdoas.get(0, pair);
        assert!(
            (tdoa.delay - delay).abs() < 0.2,
            "pair {pair}: got delay {}, want {delay}",
            tdoa.delay
        );
        assert!(
            (tdoa.amplitude - 0.39).abs() < 0.025,
            "pair {pair}: got amplitude {}",
            tdoa.amplitude
        );
    }
}

/// Identical cross-spectra on every pair yield identical sub-sample outputs.
#[test]
fn gcc_is_deterministic_across_pairs() {
    let num_bins = 129;
    let mut gcc = Gcc::new(2, 3, num_bins).unwrap();
    let mut covs = Covs::new("XXs", 3, num_bins).unwrap();
    let mut tdoas = Tdoas::new("tdoas", 3, 2).unwrap();

    let mut xcorrs = vec![Complex32::default(); 3 * num_bins];
    for pair in 0..3 {
        for bin in 0..num_bins {
            let omega = core::f32::consts::TAU * bin as f32 / ((num_bins - 1) * 2) as f32;
            xcorrs[pair * num_bins + bin] = Complex32::from_polar(1.0, -omega * 3.5);
        }
    }
    covs.load_xcorrs(&xcorrs).unwrap();
    gcc.process(&covs, &mut tdoas).unwrap();

    for source in 0..2 {
        let first = tdoas.get(source, 0);
        for pair in 1..3 {
            assert_eq!(tdoas.get(source, pair), first);
        }
    }
    assert!((tdoas.get(0, 0).delay - 3.5).abs() < 0.2);
}

/// The peak search honors the configured physical delay bound.
#[test]
fn gcc_limits_the_search_window() {
    let num_bins = 257;
    let mut gcc = Gcc::new(1, 2, num_bins).unwrap().with_max_delay(10.0);
    assert_eq!(gcc.max_delay(), 10.0);

    let mut covs = Covs::new("XXs", 2, num_bins).unwrap();
    let mut tdoas = Tdoas::new("tdoas", 2, 1).unwrap();

    let mut xcorrs = vec![Complex32::default(); num_bins];
    for (bin, x) in xcorrs.iter_mut().enumerate() {
        let omega = core::f32::consts::TAU * bin as f32 / ((num_bins - 1) * 2) as f32;
        *x = Complex32::from_polar(1.0, -omega * 30.0);
    }
    covs.load_xcorrs(&xcorrs).unwrap();
    gcc.process(&covs, &mut tdoas).unwrap();

    assert!(tdoas.get(0, 0).delay.abs() <= 10.5);
}

#[test]
fn delaysum_weights_have_uniform_magnitude_and_steering_phase() {
    let num_sources = 3;
    let num_channels = 4;
    let num_bins = 9;
    let delays = [
        [-1.4927, -2.9854, -1.4927, -1.4927, 0.0, 1.4927],
        [1.4927, 0.0, -1.4927, -1.4927, -2.9854, -1.4927],
        [0.0, 2.1107, 2.1107, 2.1107, 2.1107, 0.0],
    ];

    let delaysum = DelaySum::new(num_sources, num_channels, num_bins).unwrap();
    let mut tdoas = Tdoas::new("tdoas", num_channels, num_sources).unwrap();
    let mut weights = Weights::new("Ws", num_sources, num_channels, num_bins).unwrap();

    for (s, row) in delays.iter().enumerate() {
        for (p, &delay) in row.iter().enumerate() {
            tdoas.set(s, p, Tdoa { delay, amplitude: 1.0 });
        }
    }
    delaysum.process(&tdoas, &mut weights).unwrap();

    for s in 0..num_sources {
        for c in 0..num_channels {
            // The per-channel delay comes from pair (0, c).
            let delta = if c == 0 { 0.0 } else { delays[s][c - 1] };
            for b in 0..num_bins {
                let phase =
                    core::f32::consts::TAU * b as f32 * delta / (2 * (num_bins - 1)) as f32;
                let want = Complex32::from_polar(0.25, phase);
                let got = weights.at(s, c)[b];
                assert!((got - want).norm() < 1.0e-3, "source {s} channel {c} bin {b}");
                assert!((got.norm() - 0.25).abs() < 1.0e-4);
            }
        }
    }
}

#[test]
fn delaysum_rejects_mismatched_containers() {
    let delaysum = DelaySum::new(3, 4, 9).unwrap();
    let tdoas = Tdoas::new("", 4, 3).unwrap();

    let bad = Tdoas::new("", 5, 3).unwrap();
    let mut weights = Weights::new("", 3, 4, 9).unwrap();
    assert!(delaysum.process(&bad, &mut weights).is_err());
    let bad = Tdoas::new("", 4, 4).unwrap();
    assert!(delaysum.process(&bad, &mut weights).is_err());
    let mut bad_weights = Weights::new("", 4, 4, 9).unwrap();
    assert!(delaysum.process(&tdoas, &mut bad_weights).is_err());
    let mut bad_weights = Weights::new("", 3, 5, 9).unwrap();
    assert!(delaysum.process(&tdoas, &mut bad_weights).is_err());
    let mut bad_weights = Weights::new("", 3, 4, 10).unwrap();
    assert!(delaysum.process(&tdoas, &mut bad_weights).is_err());
}

#[test]
fn beamformer_applies_conjugated_weights() {
    let beamformer = Beamformer::new(2, 4, 5);

    let mut freqs_in = Freqs::new("Xs", 4, 5).unwrap();
    let mut weights = Weights::new("Ms", 2, 4, 5).unwrap();
    let mut freqs_out = Freqs::new("Ys", 2, 5).unwrap();

    freqs_in
        .load(&[
            complex(1.0, -2.0),
            complex(-2.0, 1.0),
            complex(3.0, -1.0),
            complex(1.0, 2.0),
            complex(-2.0, 0.0),
            complex(-1.0, -1.0),
            complex(1.0, 0.0),
            complex(-2.0, 2.0),
            complex(2.0, 1.0),
            complex(-1.0, 1.0),
            complex(0.0, 3.0),
            complex(-1.0, -1.0),
            complex(1.0, 0.0),
            complex(0.0, 1.0),
            complex(-1.0, 1.0),
            complex(0.0, 0.0),
            complex(-1.0, 3.0),
            complex(2.0, -2.0),
            complex(4.0, 1.0),
            complex(-1.0, 3.0),
        ])
        .unwrap();

    let source0 = [
        [complex(2.0, -1.0), complex(-1.0, 2.0), complex(0.0, -1.0), complex(2.0, 2.0), complex(1.0, -1.0)],
        [complex(-2.0, 4.0), complex(-3.0, -2.0), complex(1.0, 3.0), complex(-2.0, -2.0), complex(0.0, 1.0)],
        [complex(1.0, 1.0), complex(-1.0, 1.0), complex(0.0, -2.0), complex(0.0, -1.0), complex(1.0, 1.0)],
        [complex(0.0, 2.0), complex(3.0, 0.0), complex(-2.0, 0.0), complex(-1.0, -2.0), complex(-1.0, 2.0)],
    ];
    let source1 = [
        [complex(0.0, 1.0), complex(2.0, 1.0), complex(-2.0, -2.0), complex(1.0, 1.0), complex(-1.0, 0.0)],
        [complex(-2.0, 2.0), complex(-1.0, -4.0), complex(2.0, 4.0), complex(-1.0, -4.0), complex(2.0, 0.0)],
        [complex(2.0, 0.0), complex(-2.0, 1.0), complex(1.0, -2.0), complex(2.0, -2.0), complex(-3.0, 0.0)],
        [complex(-2.0, 0.0), complex(1.0, 3.0), complex(1.0, 2.0), complex(-2.0, -1.0), complex(-3.0, -1.0)],
    ];
    for c in 0..4 {
        weights.at_mut(0, c).copy_from_slice(&source0[c]);
        weights.at_mut(1, c).copy_from_slice(&source1[c]);
    }

    beamformer.process(&freqs_in, &weights, &mut freqs_out).unwrap();

    let expected = [
        [
            complex(5.0, 6.0),
            complex(-2.0, 16.0),
            complex(1.0, 17.0),
            complex(-7.0, 11.0),
            complex(6.0, 0.0),
        ],
        [
            complex(-2.0, 9.0),
            complex(5.0, 17.0),
            complex(-1.0, 16.0),
            complex(-14.0, 12.0),
            complex(3.0, -11.0),
        ],
    ];
    for s in 0..2 {
        for b in 0..5 {
            let got = freqs_out.channel(s)[b];
            assert!((got - expected[s][b]).norm() < 1.0e-4, "source {s} bin {b}");
        }
    }
}

#[test]
fn beamformer_rejects_mismatched_containers() {
    let beamformer = Beamformer::new(2, 4, 8);
    let freqs_in = Freqs::new("", 4, 8).unwrap();
    let weights = Weights::new("", 2, 4, 8).unwrap();

    let bad = Freqs::new("", 5, 8).unwrap();
    let mut out = Freqs::new("", 2, 8).unwrap();
    assert!(beamformer.process(&bad, &weights, &mut out).is_err());
    let bad_weights = Weights::new("", 3, 4, 8).unwrap();
    assert!(beamformer.process(&freqs_in, &bad_weights, &mut out).is_err());
    let mut bad_out = Freqs::new("", 3, 8).unwrap();
    assert!(beamformer.process(&freqs_in, &weights, &mut bad_out).is_err());
    let mut bad_out = Freqs::new("", 2, 9).unwrap();
    assert!(beamformer.process(&freqs_in, &weights, &mut bad_out).is_err());
}

/// With a diagonal covariance the MVDR solution is the whitened steering
/// vector, normalized for distortionless response.
#[test]
fn mvdr_solves_the_diagonal_case() {
    let mut mvdr = Mvdr::new(4, 2).unwrap();
    assert_eq!(mvdr.num_channels(), 4);
    assert_eq!(mvdr.num_bins(), 2);

    let mut covs = Covs::new("NNs", 4, 2).unwrap();
    covs.load_acorrs(&[1.0, 2.0, 2.0, 1.0, 4.0, 2.0, 1.0, 4.0]).unwrap();

    let mut weights = Weights::new("Ws", 1, 4, 2).unwrap();
    let steering = [
        complex(0.25, 0.0),
        complex(0.0, 0.25),
        complex(-0.25, 0.0),
        complex(0.0, -0.25),
    ];
    for (c, &a) in steering.iter().enumerate() {
        weights.at_mut(0, c)[0] = a;
        weights.at_mut(0, c)[1] = a;
    }

    mvdr.process(&covs, &mut weights).unwrap();

    // Bin 0 variances are [1, 2, 4, 1].
    let scale = 16.0 / 2.75;
    let expected = [
        complex(0.25 * scale, 0.0),
        complex(0.0, 0.125 * scale),
        complex(-0.0625 * scale, 0.0),
        complex(0.0, -0.25 * scale),
    ];
    for c in 0..4 {
        let got = weights.at(0, c)[0];
        assert!((got - expected[c]).norm() < 1.0e-3, "channel {c}");
    }

    // Distortionless response in both bins.
    for b in 0..2 {
        let mut response = Complex32::default();
        for (c, &a) in steering.iter().enumerate() {
            response += weights.at(0, c)[b].conj() * a;
        }
        assert!((response - complex(1.0, 0.0)).norm() < 1.0e-4, "bin {b}");
    }
}

#[test]
fn mvdr_rejects_mismatched_containers() {
    let mut mvdr = Mvdr::new(4, 8).unwrap();
    let covs = Covs::new("", 4, 8).unwrap();

    let bad = Covs::new("", 5, 8).unwrap();
    let mut weights = Weights::new("", 1, 4, 8).unwrap();
    assert!(mvdr.process(&bad, &mut weights).is_err());
    let bad = Covs::new("", 4, 9).unwrap();
    assert!(mvdr.process(&bad, &mut weights).is_err());
    let mut bad_weights = Weights::new("", 1, 5, 8).unwrap();
    assert!(mvdr.process(&covs, &mut bad_weights).is_err());
    let mut bad_weights = Weights::new("", 1, 4, 9).unwrap();
    assert!(mvdr.process(&covs, &mut bad_weights).is_err());
}

#[test]
fn mixer_selects_channels() {
    let mixer = Mixer::new(vec![0, 3]).unwrap();
    assert_eq!(mixer.num_channels(), 2);

    let mut hops_in = Hops::new("in", 4, 5).unwrap();
    let mut hops_out = Hops::new("out", 2, 5).unwrap();
    hops_in
        .load_f32(&[
            0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.9, 0.8, 0.7, 0.6, 0.5, 0.4,
            0.3, 0.2, 0.1, 0.0,
        ])
        .unwrap();
    mixer.process(&hops_in, &mut hops_out).unwrap();

    assert_eq!(hops_out.channel(0), &[0.0, 0.1, 0.2, 0.3, 0.4]);
    assert_eq!(hops_out.channel(1), &[0.4, 0.3, 0.2, 0.1, 0.0]);
}

#[test]
fn mixer_rejects_bad_shapes() {
    assert!(Mixer::new(vec![]).is_err());
    let mixer = Mixer::new(vec![0, 3]).unwrap();

    let hops_in = Hops::new("in", 3, 5).unwrap();
    let mut hops_out = Hops::new("out", 2, 5).unwrap();
    assert!(mixer.process(&hops_in, &mut hops_out).is_err());

    let hops_in = Hops::new("in", 4, 5).unwrap();
    let mut hops_out = Hops::new("out", 3, 5).unwrap();
    assert!(mixer.process(&hops_in, &mut hops_out).is_err());

    let mut hops_out = Hops::new("out", 2, 6).unwrap();
    assert!(mixer.process(&hops_in, &mut hops_out).is_err());
}
