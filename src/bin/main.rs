use focus_finder::{CurveConfig, FeatureModel, FocusFinder, NoPlot, PlotSink};
use std::{io::Write, path::PathBuf};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "focus-finder", about = "Spectrograph best focus finder")]
struct Opt {
    /// Folder where the focus sequences are located
    #[structopt(long, default_value = ".")]
    data_path: PathBuf,
    /// Pattern the file names must match
    #[structopt(long, default_value = "*.fits")]
    file_pattern: String,
    /// Observation type of the focus sequence images
    #[structopt(long, default_value = "FOCUS")]
    obstype: String,
    /// Model fitted to the lines: gaussian or moffat
    #[structopt(long, default_value = "gaussian")]
    features_model: FeatureModel,
    /// Debug logging and profile plots of every image
    #[structopt(short, long)]
    debug: bool,
    /// Plot the focus curves
    #[structopt(short, long)]
    plot: bool,
    /// Folder the plots are written to
    #[structopt(long, default_value = ".")]
    plot_path: PathBuf,
    /// Degree of the focus curve polynomial
    #[structopt(long, default_value = "5")]
    degree: usize,
    /// Minimum number of images with a FWHM to fit the focus curve
    #[structopt(long, default_value = "6")]
    min_samples: usize,
}

#[cfg(feature = "plot")]
fn plot_sink(opt: &Opt) -> Box<dyn PlotSink> {
    if opt.plot || opt.debug {
        Box::new(focus_finder::SvgPlot::new(&opt.plot_path))
    } else {
        Box::new(NoPlot)
    }
}
#[cfg(not(feature = "plot"))]
fn plot_sink(opt: &Opt) -> Box<dyn PlotSink> {
    if opt.plot || opt.debug {
        log::warn!("plotting requires the `plot` feature");
    }
    Box::new(NoPlot)
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();

    let level = if opt.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}][{}]: {}",
                buf.timestamp_seconds(),
                record.level(),
                record.args()
            )
        })
        .init();

    let finder = FocusFinder::default()
        .data_path(&opt.data_path)
        .file_pattern(opt.file_pattern.as_str())
        .obstype(opt.obstype.as_str())
        .features_model(opt.features_model)
        .debug(opt.debug)
        .curve(CurveConfig {
            degree: opt.degree,
            min_samples: opt.min_samples,
            ..Default::default()
        });
    let sink = plot_sink(&opt);

    let results = finder.run(sink.as_ref())?;
    for result in &results {
        match result.best_focus() {
            Some(focus) => println!("{}: best focus {:.3}", result.group, focus),
            None => println!("{}: no best focus", result.group),
        }
    }

    Ok(())
}
