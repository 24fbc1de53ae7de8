//! Multipart form parsing.
//!
//! Register and product forms arrive as `multipart/form-data` with text
//! fields plus an image file. This module collects a request's fields up
//! front so handlers can validate presence before touching any
//! collaborator.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::AppError;

/// An image file received in a multipart form.
pub struct UploadedImage {
    /// Client-provided file name.
    pub filename: String,
    /// Declared content type.
    pub content_type: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

/// All fields of a multipart form, collected.
#[derive(Default)]
pub struct FormData {
    texts: HashMap<String, String>,
    images: HashMap<String, UploadedImage>,
}

impl FormData {
    /// Drain a multipart stream into memory.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the form data is malformed or a
    /// field body cannot be read.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed form data: {e}")))?
        {
            let Some(name) = field.name().map(ToOwned::to_owned) else {
                continue;
            };

            if let Some(filename) = field.file_name().map(ToOwned::to_owned) {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Malformed form data: {e}")))?
                    .to_vec();

                form.images.insert(
                    name,
                    UploadedImage {
                        filename,
                        content_type,
                        bytes,
                    },
                );
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Malformed form data: {e}")))?;
                form.texts.insert(name, value);
            }
        }

        Ok(form)
    }

    /// A text field's trimmed value; `None` if absent or blank.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// An image field; `None` if absent.
    #[must_use]
    pub fn image(&self, name: &str) -> Option<&UploadedImage> {
        self.images.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_counts_as_absent() {
        let mut form = FormData::default();
        form.texts.insert("name".to_owned(), "  ".to_owned());
        assert_eq!(form.text("name"), None);
    }

    #[test]
    fn test_text_is_trimmed() {
        let mut form = FormData::default();
        form.texts.insert("name".to_owned(), " Mug ".to_owned());
        assert_eq!(form.text("name"), Some("Mug"));
    }

    #[test]
    fn test_missing_fields_are_none() {
        let form = FormData::default();
        assert_eq!(form.text("name"), None);
        assert!(form.image("file").is_none());
    }
}
