use crate::{
    finder::FinderError, fits::FitsError, grouping::GroupingError, image::ImageError,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `finder` module")]
    Finder(#[from] FinderError),
    #[error("Error in the `fits` module")]
    Fits(#[from] FitsError),
    #[error("Error in the `grouping` module")]
    Grouping(#[from] GroupingError),
    #[error("Error in the `image` module")]
    Image(#[from] ImageError),
}
