use crate::fits::{Fits, FitsError, Header};
use nalgebra::DMatrix;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum ImageError {
    #[error("failed to read image")]
    Fits(#[from] FitsError),
    #[error("no numeric focus value under keyword {0}")]
    MissingFocus(String),
}
type Result<T> = std::result::Result<T, ImageError>;

/// Calibration frame taken at a given focus setting
#[derive(Debug, Clone)]
pub struct Image {
    /// Pixel intensities (rows x columns)
    pub data: DMatrix<f64>,
    /// Focus mechanism position
    pub focus: f64,
    pub header: Header,
}
impl Image {
    pub fn new(data: DMatrix<f64>, focus: f64) -> Self {
        Self {
            data,
            focus,
            header: Header::default(),
        }
    }
    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }
    pub fn n_cols(&self) -> usize {
        self.data.ncols()
    }
}

/// Source of [Image]s
pub trait ImageLoader {
    fn load(&self, path: &Path) -> Result<Image>;
}

/// Loads FITS images, the focus value being read from the header
#[derive(Debug, Clone)]
pub struct FitsLoader {
    focus_keyword: String,
}
impl Default for FitsLoader {
    fn default() -> Self {
        Self {
            focus_keyword: String::from("CAM_FOC"),
        }
    }
}
impl FitsLoader {
    pub fn new<S: Into<String>>(focus_keyword: S) -> Self {
        Self {
            focus_keyword: focus_keyword.into(),
        }
    }
}
impl ImageLoader for FitsLoader {
    fn load(&self, path: &Path) -> Result<Image> {
        let Fits { header, data } = Fits::read(path, &[self.focus_keyword.as_str()])?;
        let focus = header
            .get_f64(&self.focus_keyword)
            .ok_or_else(|| ImageError::MissingFocus(self.focus_keyword.clone()))?;
        Ok(Image {
            data,
            focus,
            header,
        })
    }
}
