//! External file extraction
//!
//! Hands the file named by the `associated_file` metadata key to a handler.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::error;

use super::Context;
use crate::error::{Error, Result, TransformError};

/// Metadata key naming the file an [`StreamHandler`] reads
pub const ASSOCIATED_FILE: &str = "associated_file";

type HandlerFn = dyn Fn(&mut dyn std::io::BufRead) -> std::result::Result<Value, TransformError> + Send + Sync;

/// Reads a value out of an opened associated file
#[derive(Clone)]
pub struct StreamHandler(Arc<HandlerFn>);

impl StreamHandler {
    pub fn new(
        f: impl Fn(&mut dyn std::io::BufRead) -> std::result::Result<Value, TransformError> + Send + Sync + 'static,
    ) -> Self {
        StreamHandler(Arc::new(f))
    }

    pub(super) fn extract(&self, ctx: &Context<'_>) -> Result<Value> {
        let path = ctx
            .metadata
            .get(ASSOCIATED_FILE)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MissingMetadata(ASSOCIATED_FILE.to_string()))?;

        let file = File::open(Path::new(path))?;
        let mut reader = BufReader::new(file);
        match (self.0)(&mut reader) {
            Ok(value) => Ok(value),
            Err(e) => {
                error!(extractor = "ExternalFile", value = path, error = %e, "Stream handler failed");
                Ok(Value::Null)
            }
        }
    }
}

impl fmt::Debug for StreamHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StreamHandler(..)")
    }
}
