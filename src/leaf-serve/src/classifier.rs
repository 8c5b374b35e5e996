use std::fmt;
use std::io::Read;
use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;
use log::debug;
use serde::Serialize;

use crate::{Crop, Error, Model, Result, Timer};

/// Top-1 outcome of classifying one leaf photo.
#[derive(Debug, Serialize)]
pub struct Prediction {
    /// Crop whose model produced the prediction
    pub crop: Crop,

    /// Most likely class name
    pub label: &'static str,

    /// Softmax score of `label`, in percent
    pub confidence: f32,

    /// Time spent fetching image from URL
    pub time_url_fetch: i64,

    /// Time spent loading image in memory
    pub time_image_load: i64,

    /// Time resizing image
    pub time_image_resize: i64,

    /// Time spent on running session
    pub time_session_run: i64,
}

impl Prediction {
    pub fn sentence(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "This image most likely belongs to {} with a {:.2} percent confidence.",
            self.label, self.confidence
        )
    }
}

/// Normalised exponentials of `scores`.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    exps.into_iter().map(|e| e / sum).collect()
}

/// Index and value of the highest probability. The first index wins a tie.
pub fn top_class(probabilities: &[f32]) -> Option<(usize, f32)> {
    probabilities
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((i, p)),
        })
}

/// Classifier for one crop.
pub struct Classifier {
    crop: Crop,
    model: Box<dyn Model>,
}

impl Classifier {
    pub fn new(crop: Crop, model: Box<dyn Model>) -> Self {
        Classifier { crop, model }
    }

    pub fn crop(&self) -> Crop {
        self.crop
    }

    /// Resizes `image` to the model's input size and returns the RGB pixels as
    /// floats in `0.0..=255.0`.
    pub fn preprocess(&self, image: &DynamicImage) -> Vec<f32> {
        let side = self.crop.image_side();
        let rgb = image.to_rgb8();

        let resized = image::imageops::resize(&rgb, side, side, FilterType::Nearest);

        resized.into_raw().into_iter().map(f32::from).collect()
    }

    pub fn run(&self, image: &[f32]) -> Result<Prediction> {
        let mut t = Timer::new_start(&format!("Running {} model", self.crop));

        let scores = self.model.forward(image, self.crop.image_side())?;

        t.stop();

        let labels = self.crop.labels();
        if scores.len() != labels.len() {
            return Err(Error::OutputMismatch {
                expected: labels.len(),
                actual: scores.len(),
            });
        }

        let probabilities = softmax(&scores);
        debug!("{} scores: {:?}", self.crop, probabilities);

        let (best, probability) = top_class(&probabilities).ok_or(Error::EmptyOutput)?;

        Ok(Prediction {
            crop: self.crop,
            label: labels[best],
            confidence: 100.0 * probability,
            time_url_fetch: 0,
            time_image_load: 0,
            time_image_resize: 0,
            time_session_run: t.duration(),
        })
    }

    pub fn classify(&self, image: &DynamicImage) -> Result<Prediction> {
        let mut t = Timer::new_start("Resizing image");

        let raw_image = self.preprocess(image);

        t.stop();

        let mut prediction = self.run(&raw_image)?;
        prediction.time_image_resize = t.duration();

        Ok(prediction)
    }

    pub fn classify_from_raw(&self, data: &[u8]) -> Result<Prediction> {
        let mut t = Timer::new_start("Load image from memory");

        let image = image::load_from_memory(data)?;

        t.stop();

        let mut prediction = self.classify(&image)?;
        prediction.time_image_load = t.duration();

        Ok(prediction)
    }

    pub fn classify_from_path(&self, path: &Path) -> Result<Prediction> {
        let mut t = Timer::new_start(&format!("Load image from {}", path.display()));

        let image = image::open(path)?;

        t.stop();

        let mut prediction = self.classify(&image)?;
        prediction.time_image_load = t.duration();

        Ok(prediction)
    }

    pub fn classify_from_url(&self, url: &str) -> Result<Prediction> {
        let mut t = Timer::new_start(&format!("Fetching image from {}", url));

        let mut resp = reqwest::blocking::get(url)?.error_for_status()?;

        let mut buf: Vec<u8> = vec![];
        resp.read_to_end(&mut buf)?;

        t.stop();

        let mut prediction = self.classify_from_raw(&buf)?;
        prediction.time_url_fetch = t.duration();

        Ok(prediction)
    }
}
