#![allow(dead_code)]

use flate2::{write::GzEncoder, Compression};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

const BLOCK: usize = 2880;

/// Empty scratch folder unique to a test
pub fn scratch(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("focus-finder-{}-{}", name, std::process::id()));
    if path.exists() {
        fs::remove_dir_all(&path).unwrap();
    }
    fs::create_dir_all(&path).unwrap();
    path
}

/// Header value written to a card
pub enum Card {
    Int(i64),
    Real(f64),
    Text(&'static str),
}

/// Synthetic arc lamp frame
pub struct Frame {
    pub n_rows: usize,
    pub n_cols: usize,
    pub background: f64,
    pub amplitude: f64,
    pub lines: Vec<f64>,
    pub sigma: f64,
    pub cards: Vec<(&'static str, Card)>,
}
impl Frame {
    /// Frame of the default instrument configuration taken at `focus`
    ///
    /// The line width follows `3 + 2e-4 focus^2`.
    pub fn focus(focus: f64) -> Self {
        Self {
            n_rows: 120,
            n_cols: 400,
            background: 100.,
            amplitude: 800.,
            lines: vec![100., 200., 300.],
            sigma: 3. + 2e-4 * focus * focus,
            cards: vec![
                ("OBSTYPE", Card::Text("FOCUS")),
                ("CAM_FOC", Card::Real(focus)),
                ("CAM_TARG", Card::Real(11.)),
                ("GRT_TARG", Card::Real(5.6)),
                ("FILTER", Card::Text("NO_FILTER")),
                ("FILTER2", Card::Text("NO_FILTER")),
                ("GRATING", Card::Text("400_SYZY")),
                ("SLIT", Card::Text("1.0_LONG_SLIT")),
                ("WAVMODE", Card::Text("400_M2")),
                ("RDNOISE", Card::Real(3.89)),
                ("GAIN", Card::Real(1.48)),
                ("ROI", Card::Text("Spectroscopic 2x2")),
            ],
        }
    }
    /// Replaces or adds a header card
    pub fn with(mut self, key: &'static str, value: Card) -> Self {
        self.cards.retain(|(k, _)| *k != key);
        self.cards.push((key, value));
        self
    }
    pub fn without(mut self, key: &str) -> Self {
        self.cards.retain(|(k, _)| *k != key);
        self
    }
    fn pixel(&self, col: usize) -> f64 {
        self.background
            + self
                .lines
                .iter()
                .map(|c| self.amplitude * (-0.5 * ((col as f64 - c) / self.sigma).powi(2)).exp())
                .sum::<f64>()
    }
    /// Primary header with the given axis lengths
    fn header(&self, naxis1: i64, naxis2: i64) -> Vec<u8> {
        let mut text = String::new();
        let mut card = |s: String| text.push_str(&format!("{:<80}", s));
        card(format!("{:<8}= {:>20}", "SIMPLE", "T"));
        card(format!("{:<8}= {:>20}", "BITPIX", -64));
        card(format!("{:<8}= {:>20}", "NAXIS", 2));
        card(format!("{:<8}= {:>20}", "NAXIS1", naxis1));
        card(format!("{:<8}= {:>20}", "NAXIS2", naxis2));
        for (key, value) in &self.cards {
            card(match value {
                Card::Int(i) => format!("{:<8}= {:>20}", key, i),
                Card::Real(x) => format!("{:<8}= {:>20?}", key, x),
                Card::Text(s) => format!("{:<8}= '{:<8}'", key, s),
            });
        }
        card("END".to_string());
        let mut bytes = text.into_bytes();
        bytes.resize(bytes.len().div_ceil(BLOCK) * BLOCK, b' ');
        bytes
    }
    /// FITS file content, pixels as 64-bit floats
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header(self.n_cols as i64, self.n_rows as i64);
        let row: Vec<f64> = (0..self.n_cols).map(|j| self.pixel(j)).collect();
        for _ in 0..self.n_rows {
            for x in &row {
                bytes.extend_from_slice(&x.to_be_bytes());
            }
        }
        bytes.resize(bytes.len().div_ceil(BLOCK) * BLOCK, 0);
        bytes
    }
    /// Header only file with a negative `NAXIS1`
    pub fn write_corrupt(&self, path: &Path) {
        let mut bytes = self.header(-1, self.n_rows as i64);
        bytes.resize(bytes.len() + BLOCK, 0);
        fs::write(path, bytes).unwrap();
    }
    pub fn write(&self, path: &Path) {
        fs::write(path, self.to_bytes()).unwrap();
    }
    pub fn write_gz(&self, path: &Path) {
        let mut encoder = GzEncoder::new(fs::File::create(path).unwrap(), Compression::fast());
        encoder.write_all(&self.to_bytes()).unwrap();
        encoder.finish().unwrap();
    }
}

/// Focus settings of the reference sequence
pub const SEQUENCE: [f64; 7] = [-200., -150., -100., -50., 0., 50., 100.];

/// Writes the reference sequence into `dir`
pub fn write_sequence(dir: &Path) {
    for (i, focus) in SEQUENCE.iter().enumerate() {
        Frame::focus(*focus).write(&dir.join(format!("{:04}_focus.fits", i + 1)));
    }
}
