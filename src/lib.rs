/*!
# Focus finder

Best focus of a spectrograph from a sequence of calibration frames taken at
different focus settings.

For each frame, a 1-D profile is extracted from the central rows and its
continuum removed ([profile]), the lines are detected ([peaks]) and fitted with
a Gaussian or a Moffat profile ([features]) to get the mean FWHM of the frame.
The FWHM versus focus samples of frames sharing the same instrument
configuration ([grouping]) are fitted with a polynomial and the best focus is
where the polynomial derivative vanishes ([focus]).

## Usage

```rust,no_run
use focus_finder::{FeatureModel, FocusFinder, NoPlot};

let results = FocusFinder::default()
    .data_path("/data/focus")
    .file_pattern("*.fits")
    .features_model(FeatureModel::Gaussian)
    .run(&NoPlot)?;
for result in results {
    println!("{}: {:?}", result.group, result.best_focus());
}
# Ok::<(), focus_finder::Error>(())
```
*/

pub mod error;
pub mod features;
pub mod finder;
pub mod fits;
pub mod focus;
pub mod grouping;
pub mod image;
pub mod lm;
pub mod peaks;
pub mod plot;
pub mod polynomial;
pub mod profile;
pub mod stats;

pub use error::Error;
pub use features::{aggregate_fwhm, fit_fwhm, FeatureFit, FeatureModel};
pub use finder::{FinderError, FocusFinder, FocusResult};
pub use focus::{CurveConfig, FocusCurve, FocusCurveFit, FocusGroup, FocusSample};
pub use grouping::{ImageGroup, Keywords};
pub use image::{FitsLoader, Image, ImageLoader};
pub use lm::{LMConfig, LineShape};
pub use peaks::{find_peaks, Peak};
#[cfg(feature = "plot")]
pub use plot::SvgPlot;
pub use plot::{NoPlot, PlotSink};
pub use polynomial::Polynomial;
pub use profile::{extract_profile, Profile};
