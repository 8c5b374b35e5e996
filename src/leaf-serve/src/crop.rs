use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::Error;

/// Plant categories with their own pretrained classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Crop {
    Corn,
    Apple,
    Tomato,
    Potato,
}

const TOMATO_LABELS: &[&str] = &[
    "Tomato___Bacterial_spot",
    "Tomato___Early_blight",
    "Tomato___Late_blight",
    "Tomato___Leaf_Mold",
    "Tomato___Septoria_leaf_spot",
    "Tomato___Spider_mites Two-spotted_spider_mite",
    "Tomato___Target_Spot",
    "Tomato___Tomato_Yellow_Leaf_Curl_Virus",
    "Tomato___Tomato_mosaic_virus",
    "Tomato___healthy",
];

// Output order of the potato model, not alphabetical.
const POTATO_LABELS: &[&str] = &[
    "Potato___Early_blight",
    "Potato___healthy",
    "Potato___Late_blight",
];

const CORN_LABELS: &[&str] = &[
    "Corn___Cercospora_leaf_spot Gray_leaf_spot",
    "Corn___Common_rust",
    "Corn___healthy",
    "Corn___Northern_Leaf_Blight",
];

const APPLE_LABELS: &[&str] = &[
    "Apple___Apple_scab",
    "Apple___Black_rot",
    "Apple___Cedar_apple_rust",
    "Apple___healthy",
];

impl Crop {
    /// All crops, in the order they are offered on the options form.
    pub const ALL: [Crop; 4] = [Crop::Corn, Crop::Apple, Crop::Tomato, Crop::Potato];

    pub fn name(self) -> &'static str {
        match self {
            Crop::Corn => "Corn",
            Crop::Apple => "Apple",
            Crop::Tomato => "Tomato",
            Crop::Potato => "Potato",
        }
    }

    /// Class names in the order of the model's output scores.
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            Crop::Corn => CORN_LABELS,
            Crop::Apple => APPLE_LABELS,
            Crop::Tomato => TOMATO_LABELS,
            Crop::Potato => POTATO_LABELS,
        }
    }

    /// Side length of the square image the model was trained on.
    pub fn image_side(self) -> u32 {
        match self {
            Crop::Tomato => 180,
            Crop::Corn | Crop::Apple | Crop::Potato => 200,
        }
    }

    /// Name of the exported model under the models directory.
    pub fn model_dir_name(self) -> &'static str {
        match self {
            Crop::Corn => "CornModel",
            Crop::Apple => "AppleModel",
            Crop::Tomato => "tomato",
            Crop::Potato => "potato",
        }
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Crop {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Crop::ALL
            .iter()
            .copied()
            .find(|crop| crop.name() == s)
            .ok_or_else(|| Error::UnknownCrop(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::Crop;

    #[test]
    fn parses_exact_names_only() {
        assert_eq!("Tomato".parse::<Crop>().unwrap(), Crop::Tomato);
        assert_eq!("Corn".parse::<Crop>().unwrap(), Crop::Corn);
        assert!("tomato".parse::<Crop>().is_err());
        assert!(" Apple".parse::<Crop>().is_err());
        assert!("Grape".parse::<Crop>().is_err());
    }

    #[test]
    fn name_round_trips_through_display() {
        for crop in Crop::ALL.iter() {
            assert_eq!(crop.to_string().parse::<Crop>().unwrap(), *crop);
        }
    }

    #[test]
    fn label_sets_match_the_models() {
        assert_eq!(Crop::Tomato.labels().len(), 10);
        assert_eq!(Crop::Potato.labels().len(), 3);
        assert_eq!(Crop::Corn.labels().len(), 4);
        assert_eq!(Crop::Apple.labels().len(), 4);

        for crop in Crop::ALL.iter() {
            let prefix = format!("{}___", crop.name());
            assert!(crop.labels().iter().all(|l| l.starts_with(&prefix)));
        }
        assert_eq!(Crop::Potato.labels()[2], "Potato___Late_blight");
    }

    #[test]
    fn tomato_model_takes_smaller_images() {
        assert_eq!(Crop::Tomato.image_side(), 180);
        assert_eq!(Crop::Potato.image_side(), 200);
        assert_eq!(Crop::Corn.image_side(), 200);
        assert_eq!(Crop::Apple.image_side(), 200);
    }
}
