//! Best focus search over a directory of focus sequences

use crate::{
    features::{fit_fwhm, FeatureModel},
    focus::{CurveConfig, FocusCurve, FocusCurveFit, FocusGroup, FocusSample},
    grouping::{self, GroupingError, ImageGroup, Keywords},
    image::{FitsLoader, ImageLoader},
    peaks::find_peaks,
    plot::PlotSink,
    profile::extract_profile,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    #[error("data location {0:?} does not exist")]
    NoDirectory(PathBuf),
    #[error("there are no files matching {pattern:?} in the folder {path:?}")]
    NoMatchingFiles { pattern: String, path: PathBuf },
    #[error("no group of {0} images with a common configuration")]
    NoGroups(String),
    #[error("failed to find the focus sequences")]
    Grouping(#[from] GroupingError),
}
type Result<T> = std::result::Result<T, FinderError>;

/// Outcome of the best focus search for one configuration group
#[derive(Debug, Clone)]
pub struct FocusResult {
    pub group: ImageGroup,
    /// FWHM samples of the images with a usable FWHM
    pub samples: FocusGroup,
    /// Focus curve, `None` if it could not be fitted
    pub fit: Option<FocusCurveFit>,
}
impl FocusResult {
    pub fn best_focus(&self) -> Option<f64> {
        self.fit.as_ref().map(|fit| fit.best_focus)
    }
}

/// Best focus finder
pub struct FocusFinder {
    data_path: PathBuf,
    file_pattern: String,
    obstype: String,
    features_model: FeatureModel,
    debug: bool,
    keywords: Keywords,
    curve: CurveConfig,
}
impl Default for FocusFinder {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("."),
            file_pattern: String::from("*.fits"),
            obstype: String::from("FOCUS"),
            features_model: FeatureModel::default(),
            debug: false,
            keywords: Keywords::default(),
            curve: CurveConfig::default(),
        }
    }
}
impl FocusFinder {
    /// Folder where the data is located
    pub fn data_path<P: AsRef<Path>>(self, data_path: P) -> Self {
        Self {
            data_path: data_path.as_ref().to_path_buf(),
            ..self
        }
    }
    /// Pattern the file names must match
    pub fn file_pattern<S: Into<String>>(self, file_pattern: S) -> Self {
        Self {
            file_pattern: file_pattern.into(),
            ..self
        }
    }
    /// Observation type of the focus sequence images
    pub fn obstype<S: Into<String>>(self, obstype: S) -> Self {
        Self {
            obstype: obstype.into(),
            ..self
        }
    }
    /// Model fitted to the lines
    pub fn features_model(self, features_model: FeatureModel) -> Self {
        Self {
            features_model,
            ..self
        }
    }
    /// Sends the profile of every image to the plot sink
    pub fn debug(self, debug: bool) -> Self {
        Self { debug, ..self }
    }
    pub fn keywords(self, keywords: Keywords) -> Self {
        Self { keywords, ..self }
    }
    pub fn curve(self, curve: CurveConfig) -> Self {
        Self { curve, ..self }
    }

    /// Checks that the data location exists and holds matching files
    pub fn validate(&self) -> Result<Vec<PathBuf>> {
        if !self.data_path.is_dir() {
            return Err(FinderError::NoDirectory(self.data_path.clone()));
        }
        let files = grouping::discover(&self.data_path, &self.file_pattern)?;
        if files.is_empty() {
            return Err(FinderError::NoMatchingFiles {
                pattern: self.file_pattern.clone(),
                path: self.data_path.clone(),
            });
        }
        Ok(files)
    }
    /// Focus sequences found in the data location
    pub fn groups(&self) -> Result<Vec<ImageGroup>> {
        let files = self.validate()?;
        log::info!("Found {} files matching {:?}", files.len(), self.file_pattern);
        let groups = grouping::group_files(&files, &self.obstype, &self.keywords);
        if groups.is_empty() {
            return Err(FinderError::NoGroups(self.obstype.clone()));
        }
        log::info!("Found {} focus groups", groups.len());
        Ok(groups)
    }

    /// FWHM of one image
    ///
    /// Returns `None` if the image cannot be loaded or has no usable FWHM.
    pub fn measure<L: ImageLoader>(
        &self,
        loader: &L,
        path: &Path,
        sink: &dyn PlotSink,
    ) -> Option<FocusSample> {
        log::debug!("Processing file: {:?}", path);
        let image = loader
            .load(path)
            .map_err(|e| log::error!("File: {:?} cannot be processed: {}", path, e))
            .ok()?;
        let profile = extract_profile(&image);
        let peaks = find_peaks(&profile);
        if self.debug {
            sink.profile(&file_name(path), &profile, &peaks);
        }
        let fwhm = fit_fwhm(&peaks, &profile, self.features_model);
        match fwhm {
            Some(fwhm) => {
                log::info!("File: {:?} Focus: {} FWHM: {}", path, image.focus, fwhm);
                Some(FocusSample::from((image.focus, fwhm)))
            }
            None => {
                log::warn!("File: {:?} FWHM is: None FOCUS: {}", path, image.focus);
                None
            }
        }
    }

    /// Best focus of a group using the given image loader
    pub fn find_best_focus_with<L: ImageLoader>(
        &self,
        loader: &L,
        group: &ImageGroup,
        sink: &dyn PlotSink,
    ) -> FocusResult {
        let (samples, files): (Vec<FocusSample>, Vec<PathBuf>) = group
            .files
            .iter()
            .filter_map(|path| {
                self.measure(loader, path, sink)
                    .map(|sample| (sample, path.clone()))
            })
            .unzip();
        let samples = FocusGroup::new(samples, files);
        let fit = FocusCurve::new(self.curve).solve(&samples);
        match &fit {
            Some(fit) => {
                log::info!("Best Focus for {} is {}", group, fit.best_focus);
                sink.focus_curve(&group_name(group), &samples, fit);
            }
            None => log::error!("No best focus for {}", group),
        }
        FocusResult {
            group: group.clone(),
            samples,
            fit,
        }
    }
    /// Best focus of a group of FITS images
    pub fn find_best_focus(&self, group: &ImageGroup, sink: &dyn PlotSink) -> FocusResult {
        let loader = FitsLoader::new(self.keywords.focus.clone());
        self.find_best_focus_with(&loader, group, sink)
    }
    /// Best focus of every focus sequence in the data location
    ///
    /// Groups are processed in parallel.
    pub fn run(&self, sink: &dyn PlotSink) -> Result<Vec<FocusResult>> {
        let groups = self.groups()?;
        Ok(groups
            .par_iter()
            .map(|group| self.find_best_focus(group, sink))
            .collect())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn group_name(group: &ImageGroup) -> String {
    group
        .configuration
        .iter()
        .map(|(_, value)| value.as_str())
        .collect::<Vec<&str>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        image::{Image, ImageError},
        peaks::Peak,
        plot::NoPlot,
        profile::Profile,
    };
    use nalgebra::DMatrix;
    use std::sync::Mutex;

    /// Synthetic frames whose line width is encoded in the file name
    struct Synthetic;
    impl ImageLoader for Synthetic {
        fn load(&self, path: &Path) -> std::result::Result<Image, ImageError> {
            let focus: f64 = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| ImageError::MissingFocus("name".into()))?;
            let sigma = 3. + 2e-4 * focus * focus;
            Ok(Image::new(
                DMatrix::from_fn(120, 400, |_, j| {
                    100. + 800. * (-0.5 * ((j as f64 - 200.) / sigma).powi(2)).exp()
                }),
                focus,
            ))
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);
    impl PlotSink for Recorder {
        fn profile(&self, name: &str, _: &Profile, _: &[Peak]) {
            self.0.lock().unwrap().push(format!("profile {}", name));
        }
        fn focus_curve(&self, name: &str, _: &FocusGroup, _: &FocusCurveFit) {
            self.0.lock().unwrap().push(format!("focus {}", name));
        }
    }
    fn group(focus: &[&str]) -> ImageGroup {
        ImageGroup {
            configuration: vec![("GRATING".into(), "400".into())],
            files: focus.iter().map(|f| PathBuf::from(format!("{}.fits", f))).collect(),
        }
    }

    #[test]
    fn builder() {
        let finder = FocusFinder::default()
            .data_path("/data")
            .file_pattern("*.fz")
            .features_model(FeatureModel::Moffat)
            .debug(true);
        assert_eq!(finder.data_path, PathBuf::from("/data"));
        assert_eq!(finder.file_pattern, "*.fz");
        assert_eq!(finder.obstype, "FOCUS");
        assert_eq!(finder.features_model, FeatureModel::Moffat);
        assert!(finder.debug);
    }

    #[test]
    fn missing_directory() {
        let finder = FocusFinder::default().data_path("/no/such/directory");
        assert!(matches!(finder.validate(), Err(FinderError::NoDirectory(_))));
    }

    #[test]
    fn synthetic_sequence() {
        let g = group(&["-200", "-150", "-100", "-50", "0", "50", "100"]);
        let recorder = Recorder::default();
        let result = FocusFinder::default()
            .debug(true)
            .find_best_focus_with(&Synthetic, &g, &recorder);
        assert_eq!(result.samples.len(), 7);
        let best = result.best_focus().unwrap();
        assert!(best.abs() < 10., "{}", best);
        let calls = recorder.0.into_inner().unwrap();
        assert_eq!(calls.len(), 8);
        assert_eq!(calls.last().unwrap(), "focus 400");
    }

    #[test]
    fn unreadable_images_are_skipped() {
        let g = group(&["-200", "-150", "bad", "-100", "-50", "0", "50", "100"]);
        let result = FocusFinder::default().find_best_focus_with(&Synthetic, &g, &NoPlot);
        assert_eq!(result.samples.len(), 7);
        assert!(!result.samples.files.contains(&PathBuf::from("bad.fits")));
        assert!(result.best_focus().is_some());
    }

    #[test]
    fn too_few_images() {
        let g = group(&["-100", "0", "100"]);
        let result = FocusFinder::default().find_best_focus_with(&Synthetic, &g, &NoPlot);
        assert_eq!(result.samples.len(), 3);
        assert_eq!(result.best_focus(), None);
    }
}
