//! IIR filters for EMG conditioning.
//!
//! Filters are built as cascades of biquad (second-order) sections rather
//! than single high-order transfer functions; the cascade form keeps the
//! 10th-order band-pass numerically stable. Designs are derived from the
//! analog Butterworth prototype via the bilinear transform.

use std::f64::consts::PI;

use crate::error::{Error, Result};

/// A single second-order section.
///
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2),
/// realised in Direct Form II Transposed.
#[derive(Debug, Clone)]
pub struct Biquad {
    /// Numerator coefficients [b0, b1, b2].
    b: [f64; 3],
    /// Denominator coefficients [a1, a2] (a0 normalised to 1).
    a: [f64; 2],
    state: [f64; 2],
}

impl Biquad {
    pub fn new(b: [f64; 3], a: [f64; 2]) -> Self {
        Self { b, a, state: [0.0; 2] }
    }

    /// Process one sample through the section.
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b[0] * input + self.state[0];
        self.state[0] = self.b[1] * input - self.a[0] * output + self.state[1];
        self.state[1] = self.b[2] * input - self.a[1] * output;
        output
    }

    pub fn reset(&mut self) {
        self.state = [0.0; 2];
    }

    /// Stability check: both poles strictly inside the unit circle.
    pub fn is_stable(&self) -> bool {
        self.a[1].abs() < 1.0 && self.a[0].abs() < 1.0 + self.a[1]
    }

    /// Complex magnitude of H(e^{jw}) at normalised angular frequency `w`.
    fn magnitude_at(&self, w: f64) -> f64 {
        let (cos1, sin1) = ((-w).cos(), (-w).sin());
        let (cos2, sin2) = ((-2.0 * w).cos(), (-2.0 * w).sin());

        let num_re = self.b[0] + self.b[1] * cos1 + self.b[2] * cos2;
        let num_im = self.b[1] * sin1 + self.b[2] * sin2;
        let den_re = 1.0 + self.a[0] * cos1 + self.a[1] * cos2;
        let den_im = self.a[0] * sin1 + self.a[1] * sin2;

        let num = (num_re * num_re + num_im * num_im).sqrt();
        let den = (den_re * den_re + den_im * den_im).sqrt();
        num / den
    }
}

/// An analog-prototype pole. Only the real part and squared magnitude are
/// needed for the bilinear transform of a conjugate pair, so plain floats
/// suffice.
#[derive(Debug, Clone, Copy)]
struct Pole {
    re: f64,
    im: f64,
}

impl Pole {
    fn scaled(self, wc: f64) -> Pole {
        Pole {
            re: self.re * wc,
            im: self.im * wc,
        }
    }

    fn mag_sq(self) -> f64 {
        self.re * self.re + self.im * self.im
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Lowpass,
    Highpass,
}

/// A causal IIR filter as a cascade of biquad sections.
#[derive(Debug, Clone)]
pub struct FilterChain {
    sections: Vec<Biquad>,
}

impl FilterChain {
    /// Design a Butterworth band-pass filter of the given order per edge
    /// (a 5th-order design yields a 10th-order filter overall), realised as
    /// an order-`order` lowpass at `high_hz` cascaded with an
    /// order-`order` highpass at `low_hz`.
    pub fn butterworth_bandpass(
        order: usize,
        low_hz: f64,
        high_hz: f64,
        sample_rate: f64,
    ) -> Result<Self> {
        let nyquist = sample_rate / 2.0;
        if order == 0 || order > 10 {
            return Err(Error::InvalidSignal(format!(
                "unsupported band-pass order {order}"
            )));
        }
        if !(low_hz > 0.0 && low_hz < high_hz && high_hz < nyquist) {
            return Err(Error::InvalidSignal(format!(
                "band-pass edges {low_hz}-{high_hz} Hz infeasible at {sample_rate} Hz sampling \
                 (Nyquist {nyquist} Hz)"
            )));
        }

        let mut sections = design_butterworth(order, high_hz, sample_rate, Edge::Lowpass);
        sections.extend(design_butterworth(order, low_hz, sample_rate, Edge::Highpass));
        Ok(Self { sections })
    }

    /// Design a second-order notch (band-stop) at `center_hz`.
    ///
    /// The stop band spans `center_hz - 1/q` to `center_hz + 1/q` Hz,
    /// matching a quality factor of `q` applied in Nyquist-normalised units.
    pub fn notch(center_hz: f64, q: f64, sample_rate: f64) -> Result<Self> {
        let nyquist = sample_rate / 2.0;
        if !(center_hz > 0.0 && center_hz < nyquist) {
            return Err(Error::InvalidSignal(format!(
                "notch centre {center_hz} Hz infeasible at {sample_rate} Hz sampling"
            )));
        }
        if q <= 0.0 {
            return Err(Error::InvalidSignal(format!("notch quality factor {q} must be positive")));
        }

        let w0 = 2.0 * PI * center_hz / sample_rate;
        let bandwidth_hz = 2.0 / q;
        let q_eff = center_hz / bandwidth_hz;
        let alpha = w0.sin() / (2.0 * q_eff);
        let cos_w0 = w0.cos();

        let a0 = 1.0 + alpha;
        let b = [1.0 / a0, -2.0 * cos_w0 / a0, 1.0 / a0];
        let a = [-2.0 * cos_w0 / a0, (1.0 - alpha) / a0];

        Ok(Self {
            sections: vec![Biquad::new(b, a)],
        })
    }

    /// Apply the filter causally to a block of samples, from zero initial
    /// state.
    pub fn apply(&mut self, input: &[f64]) -> Vec<f64> {
        for section in &mut self.sections {
            section.reset();
        }
        input
            .iter()
            .map(|&sample| {
                self.sections
                    .iter_mut()
                    .fold(sample, |acc, section| section.process(acc))
            })
            .collect()
    }

    pub fn is_stable(&self) -> bool {
        self.sections.iter().all(Biquad::is_stable)
    }

    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }

    /// Magnitude of the cascade's frequency response at `freq_hz`.
    pub fn magnitude_response(&self, freq_hz: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * freq_hz / sample_rate;
        self.sections
            .iter()
            .map(|section| section.magnitude_at(w))
            .product()
    }
}

/// Left-half-plane poles of the normalised Butterworth prototype.
fn butterworth_poles(order: usize) -> Vec<Pole> {
    (0..order)
        .map(|k| {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            Pole {
                re: theta.cos(),
                im: theta.sin(),
            }
        })
        .collect()
}

/// Pre-warp a cutoff for the bilinear transform.
fn prewarp(freq_hz: f64, sample_rate: f64) -> f64 {
    2.0 * sample_rate * (PI * freq_hz / sample_rate).tan()
}

fn design_butterworth(order: usize, cutoff_hz: f64, sample_rate: f64, edge: Edge) -> Vec<Biquad> {
    let wc = prewarp(cutoff_hz, sample_rate);
    let k = 2.0 * sample_rate;
    let poles = butterworth_poles(order);

    let mut sections = Vec::new();
    let mut i = 0;
    while i < poles.len() {
        if poles[i].im.abs() < 1e-10 {
            // Real pole, first-order section.
            let (b, a) = bilinear_1pole(poles[i].re * wc, k, edge);
            sections.push(Biquad::new(b, a));
            i += 1;
        } else {
            // Each complex pole stands in for its conjugate pair; stepping
            // by two over the symmetric pole set visits each pair once.
            let (b, a) = bilinear_2pole(poles[i].scaled(wc), k, edge);
            sections.push(Biquad::new(b, a));
            i += 2;
        }
    }

    sections
}

/// Bilinear transform of a single real analog pole.
fn bilinear_1pole(p: f64, k: f64, edge: Edge) -> ([f64; 3], [f64; 2]) {
    let alpha = k - p;
    let beta = k + p;

    match edge {
        // H(s) = -p / (s - p), unity gain at DC.
        Edge::Lowpass => ([-p / alpha, -p / alpha, 0.0], [-beta / alpha, 0.0]),
        // H(s) = s / (s - p), unity gain at Nyquist.
        Edge::Highpass => ([k / alpha, -k / alpha, 0.0], [-beta / alpha, 0.0]),
    }
}

/// Bilinear transform of a complex conjugate pole pair.
///
/// `p` is one pole of the pair, already scaled by the pre-warped cutoff.
fn bilinear_2pole(p: Pole, k: f64, edge: Edge) -> ([f64; 3], [f64; 2]) {
    let mag_sq = p.mag_sq();
    let k2 = k * k;
    let d = k2 - 2.0 * k * p.re + mag_sq;

    let a1 = 2.0 * (mag_sq - k2) / d;
    let a2 = (k2 + 2.0 * k * p.re + mag_sq) / d;

    match edge {
        // H(s) = |p|^2 / (s^2 - 2*Re(p)*s + |p|^2)
        Edge::Lowpass => {
            let b0 = mag_sq / d;
            ([b0, 2.0 * b0, b0], [a1, a2])
        }
        // H(s) = s^2 / (s^2 - 2*Re(p)*s + |p|^2)
        Edge::Highpass => {
            let b0 = k2 / d;
            ([b0, -2.0 * b0, b0], [a1, a2])
        }
    }
}
