//! Output fields

use crate::extractors::Extractor;

/// A named output value computed by one extractor
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub extractor: Extractor,
    /// Documents where this field is falsy are dropped
    pub required: bool,
    /// Left out of the output entirely
    pub skip: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, extractor: Extractor) -> Self {
        Field {
            name: name.into(),
            extractor,
            required: false,
            skip: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }
}
