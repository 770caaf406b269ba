/// Longest tag allowed by BCP 47 implementations in practice
const MAX_CODE_LEN: usize = 35;

/// Ordered list of acceptable caption languages; earlier entries win.
///
/// An empty preference accepts any language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguagePreference(Vec<String>);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LanguageError {
    #[error("preferred_languages[{0}] is empty")]
    Empty(usize),

    #[error("preferred_languages[{index}] {code:?} is not a language code")]
    InvalidCharacters { index: usize, code: String },

    #[error("preferred_languages[{index}] is longer than 35 characters")]
    TooLong { index: usize },
}

impl LanguagePreference {
    /// Validate a list of language codes, keeping their order
    pub fn parse<I, S>(codes: I) -> Result<Self, LanguageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codes: Vec<String> = codes.into_iter().map(Into::into).collect();

        for (index, code) in codes.iter().enumerate() {
            if code.is_empty() {
                return Err(LanguageError::Empty(index));
            }
            if code.len() > MAX_CODE_LEN {
                return Err(LanguageError::TooLong { index });
            }
            if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                return Err(LanguageError::InvalidCharacters {
                    index,
                    code: code.clone(),
                });
            }
        }

        Ok(Self(codes))
    }

    /// Preference that accepts any language
    pub fn any() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}
