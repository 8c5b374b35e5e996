use std::collections::HashMap;
use std::path::Path;

use log::info;

use crate::{Classifier, Crop, Error, Prediction, Result, SavedModel};

/// Per-crop classifiers, read-only once loaded.
pub struct Registry {
    classifiers: HashMap<Crop, Classifier>,
}

impl Registry {
    /// Loads the SavedModel of every crop from `models_dir`.
    pub fn load(models_dir: &Path) -> Result<Self> {
        let mut classifiers = Vec::with_capacity(Crop::ALL.len());

        for &crop in Crop::ALL.iter() {
            let model = SavedModel::load(&models_dir.join(crop.model_dir_name()))?;
            classifiers.push(Classifier::new(crop, Box::new(model)));
        }

        info!("Loaded {} models from {}", classifiers.len(), models_dir.display());

        Ok(Registry::from_classifiers(classifiers))
    }

    pub fn from_classifiers<I>(classifiers: I) -> Self
    where
        I: IntoIterator<Item = Classifier>,
    {
        Registry {
            classifiers: classifiers.into_iter().map(|c| (c.crop(), c)).collect(),
        }
    }

    pub fn classifier(&self, crop: Crop) -> Result<&Classifier> {
        self.classifiers
            .get(&crop)
            .ok_or(Error::ModelUnavailable(crop))
    }

    /// Classifies an encoded image with the model of `crop`.
    pub fn predict(&self, crop: Crop, data: &[u8]) -> Result<Prediction> {
        self.classifier(crop)?.classify_from_raw(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::tests::FixedModel;
    use image::{DynamicImage, ImageOutputFormat, RgbImage};
    use std::io::Cursor;

    fn jpeg() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(250, 250))
            .write_to(&mut buf, ImageOutputFormat::Jpeg(90))
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn dispatches_by_crop() {
        let registry = Registry::from_classifiers(vec![
            Classifier::new(Crop::Corn, Box::new(FixedModel(vec![0.0, 3.0, 0.0, 0.0]))),
            Classifier::new(
                Crop::Tomato,
                Box::new(FixedModel(vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 9.0])),
            ),
        ]);

        let corn = registry.predict(Crop::Corn, &jpeg()).unwrap();
        assert_eq!(corn.label, "Corn___Common_rust");

        let tomato = registry.predict(Crop::Tomato, &jpeg()).unwrap();
        assert_eq!(tomato.label, "Tomato___healthy");
        assert_eq!(tomato.crop, Crop::Tomato);
    }

    #[test]
    fn missing_model_is_an_error() {
        let registry = Registry::from_classifiers(Vec::new());

        match registry.predict(Crop::Apple, &jpeg()) {
            Err(Error::ModelUnavailable(Crop::Apple)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn loading_from_an_empty_directory_fails() {
        let dir = std::env::temp_dir().join("leaf-serve-no-models");
        assert!(Registry::load(&dir).is_err());
    }
}
