//! FITS primary HDU access through cfitsio

use fitsio::{hdu::HduInfo, FitsFile};
use nalgebra::DMatrix;
use std::{path::Path, sync::Mutex};

/// cfitsio is not reentrant unless built so, files are read one at a time
static CFITSIO: Mutex<()> = Mutex::new(());

#[derive(thiserror::Error, Debug)]
pub enum FitsError {
    #[error("cfitsio error")]
    Fitsio(#[from] fitsio::errors::Error),
    #[error("primary HDU is not an image")]
    NotAnImage,
    #[error("expected a 2-D image, found NAXIS = {0}")]
    Dimensions(usize),
    #[error("invalid image size NAXIS1 = {0}, NAXIS2 = {1}")]
    InvalidSize(i64, i64),
    #[error("expected {expected} pixels, read {read}")]
    PixelCount { expected: usize, read: usize },
}
type Result<T> = std::result::Result<T, FitsError>;

/// Values of header keywords, in the order they were read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<(String, String)>,
}
impl Header {
    /// Keyword value, keywords are case insensitive
    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.cards
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(keyword))
            .map(|(_, v)| v.as_str())
    }
    /// Numeric keyword value, Fortran `D` exponents included
    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        self.get(keyword)?.trim().replace(['D', 'd'], "E").parse().ok()
    }
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, keyword: K, value: V) {
        let keyword = keyword.into();
        let value = value.into();
        match self.cards.iter_mut().find(|(k, _)| *k == keyword) {
            Some(card) => card.1 = value,
            None => self.cards.push((keyword, value)),
        }
    }
    pub fn len(&self) -> usize {
        self.cards.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Image size `(n_rows, n_cols)` from `NAXIS1` and `NAXIS2`
pub fn dimensions(naxis1: i64, naxis2: i64) -> Result<(usize, usize)> {
    let invalid = || FitsError::InvalidSize(naxis1, naxis2);
    let n_cols = usize::try_from(naxis1).map_err(|_| invalid())?;
    let n_rows = usize::try_from(naxis2).map_err(|_| invalid())?;
    match n_rows.checked_mul(n_cols) {
        Some(n) if n > 0 && n <= isize::MAX as usize / std::mem::size_of::<f64>() => {
            Ok((n_rows, n_cols))
        }
        _ => Err(invalid()),
    }
}

fn read_keys(
    fptr: &mut FitsFile,
    hdu: &fitsio::hdu::FitsHdu,
    keywords: &[&str],
) -> Header {
    let mut header = Header::default();
    for &keyword in keywords {
        if let Ok(value) = hdu.read_key::<String>(fptr, keyword) {
            header.insert(keyword, value.trim());
        }
    }
    header
}

/// Primary HDU image
#[derive(Debug, Clone)]
pub struct Fits {
    /// The keywords requested when reading
    pub header: Header,
    /// Pixels with `NAXIS2` rows and `NAXIS1` columns
    pub data: DMatrix<f64>,
}
impl Fits {
    /// Reads the given keywords of the primary header, missing keywords are left out
    ///
    /// Gzip compressed files are read transparently.
    pub fn read_header<P: AsRef<Path>>(path: P, keywords: &[&str]) -> Result<Header> {
        let _lock = CFITSIO.lock().unwrap_or_else(|e| e.into_inner());
        let mut fptr = FitsFile::open(path.as_ref())?;
        let hdu = fptr.primary_hdu()?;
        Ok(read_keys(&mut fptr, &hdu, keywords))
    }
    /// Reads the given keywords and the 2-D image of the primary HDU
    ///
    /// `BSCALE` and `BZERO` are applied by cfitsio.
    pub fn read<P: AsRef<Path>>(path: P, keywords: &[&str]) -> Result<Self> {
        let _lock = CFITSIO.lock().unwrap_or_else(|e| e.into_inner());
        let mut fptr = FitsFile::open(path.as_ref())?;
        let hdu = fptr.primary_hdu()?;
        match &hdu.info {
            HduInfo::ImageInfo { shape, .. } if shape.len() == 2 => (),
            HduInfo::ImageInfo { shape, .. } => return Err(FitsError::Dimensions(shape.len())),
            _ => return Err(FitsError::NotAnImage),
        }
        let naxis1: i64 = hdu.read_key(&mut fptr, "NAXIS1")?;
        let naxis2: i64 = hdu.read_key(&mut fptr, "NAXIS2")?;
        let (n_rows, n_cols) = dimensions(naxis1, naxis2)?;
        let header = read_keys(&mut fptr, &hdu, keywords);
        // NAXIS1 (columns) is the fastest varying axis
        let pixels: Vec<f64> = hdu.read_image(&mut fptr)?;
        if pixels.len() != n_rows * n_cols {
            return Err(FitsError::PixelCount {
                expected: n_rows * n_cols,
                read: pixels.len(),
            });
        }
        Ok(Self {
            header,
            data: DMatrix::from_row_slice(n_rows, n_cols, &pixels),
        })
    }
}
