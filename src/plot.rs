//! Diagnostic plots

use crate::{
    focus::{FocusCurveFit, FocusGroup},
    peaks::Peak,
    profile::Profile,
};

/// Receiver of the diagnostic plots
///
/// All methods default to doing nothing.
pub trait PlotSink: Sync {
    /// Raw profile, background model and background-subtracted profile of an image
    fn profile(&self, _name: &str, _profile: &Profile, _peaks: &[Peak]) {}
    /// Focus samples, fitted focus curve and best focus of a group
    fn focus_curve(&self, _name: &str, _group: &FocusGroup, _fit: &FocusCurveFit) {}
}

/// Discards all plots
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPlot;
impl PlotSink for NoPlot {}

#[cfg(feature = "plot")]
pub use svg::SvgPlot;

#[cfg(feature = "plot")]
mod svg {
    use super::*;
    use plotters::prelude::*;
    use std::{error::Error, path::PathBuf};

    type Result = std::result::Result<(), Box<dyn Error>>;

    const SIZE: (u32, u32) = (768, 512);

    fn minmax<'a>(values: impl IntoIterator<Item = &'a f64>) -> (f64, f64) {
        values
            .into_iter()
            .filter(|x| x.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), &x| {
                (a.min(x), b.max(x))
            })
    }

    fn padded((min, max): (f64, f64)) -> std::ops::Range<f64> {
        let pad = if max > min { 0.05 * (max - min) } else { 1. };
        min - pad..max + pad
    }

    /// Writes the plots as SVG files into a directory
    #[derive(Debug, Clone)]
    pub struct SvgPlot {
        path: PathBuf,
    }
    impl SvgPlot {
        pub fn new<P: Into<PathBuf>>(path: P) -> Self {
            Self { path: path.into() }
        }
        fn filename(&self, name: &str, suffix: &str) -> PathBuf {
            let stem: String = name
                .chars()
                .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
                .collect();
            self.path.join(format!("{}_{}.svg", stem, suffix))
        }
        fn draw_profile(&self, name: &str, profile: &Profile, peaks: &[Peak]) -> Result {
            let filename = self.filename(name, "profile");
            let plot = SVGBackend::new(&filename, SIZE).into_drawing_area();
            plot.fill(&WHITE)?;

            let background = profile.background_curve();
            let x_range = minmax(&profile.x_axis);
            let y_range = minmax(profile.raw.iter().chain(&profile.data).chain(&background));
            let mut chart = ChartBuilder::on(&plot)
                .caption(
                    format!("{} {:.3}", name, profile.clipped.mean()),
                    ("sans-serif", 16),
                )
                .set_label_area_size(LabelAreaPosition::Left, 60)
                .set_label_area_size(LabelAreaPosition::Bottom, 40)
                .margin(10)
                .build_cartesian_2d(padded(x_range), padded(y_range))?;
            chart
                .configure_mesh()
                .x_desc("Pixel")
                .y_desc("Intensity")
                .draw()?;

            let series: [(&str, &[f64]); 3] = [
                ("Raw Profile", &profile.raw),
                ("Background Level", &background),
                ("Background Subtracted Profile", &profile.data),
            ];
            for ((label, values), color) in series.into_iter().zip(colorous::TABLEAU10) {
                let rgb = RGBColor(color.r, color.g, color.b);
                chart
                    .draw_series(LineSeries::new(
                        profile.x_axis.iter().cloned().zip(values.iter().cloned()),
                        &rgb,
                    ))?
                    .label(label)
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &rgb));
            }
            chart
                .draw_series(
                    profile
                        .clipped
                        .kept()
                        .map(|(i, y)| Circle::new((profile.x_axis[i], y), 1, BLACK.mix(0.3).filled())),
                )?
                .label("Background Samples")
                .legend(|(x, y)| Circle::new((x + 10, y), 2, BLACK.filled()));
            chart
                .draw_series(
                    peaks
                        .iter()
                        .map(|p| Cross::new((p.position, p.value), 4, RED.stroke_width(2))),
                )?
                .label("Peaks")
                .legend(|(x, y)| Cross::new((x + 10, y), 4, &RED));
            chart
                .configure_series_labels()
                .border_style(&BLACK)
                .background_style(WHITE.mix(0.8))
                .position(SeriesLabelPosition::UpperRight)
                .draw()?;
            plot.present()?;
            log::debug!("profile plot written to {:?}", filename);
            Ok(())
        }
        fn draw_focus_curve(&self, name: &str, group: &FocusGroup, fit: &FocusCurveFit) -> Result {
            let filename = self.filename(name, "focus");
            let plot = SVGBackend::new(&filename, SIZE).into_drawing_area();
            plot.fill(&WHITE)?;

            let (focus, fwhm) = group.unzip();
            let curve = fit.curve(1000);
            let y_range = minmax(fwhm.iter().chain(curve.iter().map(|(_, y)| y)));
            let mut chart = ChartBuilder::on(&plot)
                .caption(format!("Best Focus: {}", fit.best_focus), ("sans-serif", 16))
                .set_label_area_size(LabelAreaPosition::Left, 60)
                .set_label_area_size(LabelAreaPosition::Bottom, 40)
                .margin(10)
                .build_cartesian_2d(padded(fit.range), padded(y_range))?;
            chart
                .configure_mesh()
                .x_desc("Focus")
                .y_desc("FWHM [pixel]")
                .draw()?;

            chart
                .draw_series(
                    focus
                        .iter()
                        .zip(&fwhm)
                        .map(|(&x, &y)| Cross::new((x, y), 5, BLACK.stroke_width(2))),
                )?
                .label("FWHM")
                .legend(|(x, y)| Cross::new((x + 10, y), 5, &BLACK));
            chart
                .draw_series(LineSeries::new(curve, &BLUE))?
                .label("Model")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
            let y = padded(y_range);
            chart.draw_series(LineSeries::new(
                [(fit.best_focus, y.start), (fit.best_focus, y.end)],
                &RED,
            ))?;
            chart
                .configure_series_labels()
                .border_style(&BLACK)
                .background_style(WHITE.mix(0.8))
                .position(SeriesLabelPosition::UpperRight)
                .draw()?;
            plot.present()?;
            log::info!("focus curve plot written to {:?}", filename);
            Ok(())
        }
    }
    impl PlotSink for SvgPlot {
        fn profile(&self, name: &str, profile: &Profile, peaks: &[Peak]) {
            if let Err(e) = self.draw_profile(name, profile, peaks) {
                log::error!("failed to plot the profile of {}: {}", name, e);
            }
        }
        fn focus_curve(&self, name: &str, group: &FocusGroup, fit: &FocusCurveFit) {
            if let Err(e) = self.draw_focus_curve(name, group, fit) {
                log::error!("failed to plot the focus curve of {}: {}", name, e);
            }
        }
    }

}
