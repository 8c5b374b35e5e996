use leaf_serve::Crop;
use serde::Deserialize;
use subtle::ConstantTimeEq;

pub const CSRF_MISSING: &str = "The CSRF token is missing.";
pub const CSRF_INVALID: &str = "The CSRF token is invalid.";
pub const INVALID_CHOICE: &str = "Not a valid choice.";

/// Submission of the crop selection form.
#[derive(Debug, Default, Deserialize)]
pub struct OptionsForm {
    pub crop: Option<String>,
    pub csrf_token: Option<String>,
}

impl OptionsForm {
    /// Decodes an urlencoded body. A body that cannot be decoded counts as an
    /// empty submission.
    pub fn parse(body: &[u8]) -> Self {
        serde_urlencoded::from_bytes(body).unwrap_or_default()
    }

    /// Returns the chosen crop, or every message to show next to the form.
    pub fn validate(&self, csrf_token: &str) -> Result<Crop, Vec<&'static str>> {
        let mut errors = Vec::new();

        match self.csrf_token.as_deref() {
            None | Some("") => errors.push(CSRF_MISSING),
            Some(token) if !bool::from(token.as_bytes().ct_eq(csrf_token.as_bytes())) => {
                errors.push(CSRF_INVALID)
            }
            Some(_) => {}
        }

        let crop = self.crop.as_deref().and_then(|c| c.parse::<Crop>().ok());
        if crop.is_none() {
            errors.push(INVALID_CHOICE);
        }

        match crop {
            Some(crop) if errors.is_empty() => Ok(crop),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_crop_with_matching_token() {
        let form = OptionsForm::parse(b"crop=Tomato&csrf_token=t0k&submit=Next");
        assert_eq!(form.validate("t0k"), Ok(Crop::Tomato));
    }

    #[test]
    fn reports_every_problem() {
        let form = OptionsForm::parse(b"crop=Grape&csrf_token=wrong");
        assert_eq!(form.validate("t0k"), Err(vec![CSRF_INVALID, INVALID_CHOICE]));

        let form = OptionsForm::parse(b"crop=Corn");
        assert_eq!(form.validate("t0k"), Err(vec![CSRF_MISSING]));
    }

    #[test]
    fn nothing_selected_is_not_a_valid_choice() {
        let form = OptionsForm::parse(b"csrf_token=t0k&submit=Next");
        assert_eq!(form.validate("t0k"), Err(vec![INVALID_CHOICE]));
    }

    #[test]
    fn garbage_body_is_an_empty_submission() {
        let form = OptionsForm::parse(&[0xff, 0xfe, b'=', b'%']);
        assert!(form.validate("t0k").is_err());
    }

    #[test]
    fn token_must_match_exactly() {
        for forged in &["t0j", "t0", "t0kk", "T0K"] {
            let form = OptionsForm {
                crop: Some("Apple".to_owned()),
                csrf_token: Some((*forged).to_owned()),
            };
            assert_eq!(form.validate("t0k"), Err(vec![CSRF_INVALID]), "{}", forged);
        }
    }
}
