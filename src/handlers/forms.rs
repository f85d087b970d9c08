use std::future::Future;

use axum::extract::Multipart;

use crate::error::AppError;
use crate::models::user::Level;
use crate::services::account_service::{AccountRequest, AccountServiceError};
use crate::services::upload_store::{ImageUpload, UploadStore};

/// A parsed multipart account form. The image is held in memory until the
/// rest of the submission is accepted for processing.
#[derive(Debug, Default)]
pub struct AccountForm {
    pub request: AccountRequest,
    pub role: Option<String>,
    pub image: Option<ImageUpload>,
}

fn parse_level(value: &str) -> Result<Option<Level>, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<Level>()
        .map(Some)
        .map_err(|_| AppError::Validation("Level must be between 1 and 4".to_string()))
}

pub async fn read_account_form(mut multipart: Multipart) -> Result<AccountForm, AppError> {
    let mut form = AccountForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await?;

            // Browsers send an empty part when no file was chosen
            if bytes.is_empty() {
                continue;
            }
            form.image = Some(ImageUpload::new(file_name, content_type, bytes.to_vec())?);
            continue;
        }

        let value = field.text().await?;
        match name.as_str() {
            "first_name" => form.request.first_name = value,
            "last_name" => form.request.last_name = value,
            "phone_num" => form.request.phone_num = Some(value),
            "email" => form.request.email = value,
            "password" => form.request.password = Some(value),
            "gender" => form.request.gender = Some(value),
            "level" => form.request.level = parse_level(&value)?,
            "role" => form.role = Some(value),
            other => tracing::debug!("Ignoring unknown form field {}", other),
        }
    }

    Ok(form)
}

/// Stores the form's image, runs `submit` with the stored filename filled in,
/// and deletes the image again if the submission is rejected.
pub async fn submit_account_form<T, F, Fut>(
    uploads: &UploadStore,
    form: AccountForm,
    submit: F,
) -> Result<T, AppError>
where
    F: FnOnce(AccountRequest) -> Fut,
    Fut: Future<Output = Result<T, AccountServiceError>>,
{
    let AccountForm {
        mut request, image, ..
    } = form;

    let stored = match image {
        Some(ref image) => Some(uploads.save(image).await?),
        None => None,
    };
    request.image = stored.clone();

    match submit(request).await {
        Ok(value) => Ok(value),
        Err(e) => {
            if let Some(name) = stored {
                uploads.remove(&name).await;
            }
            Err(e.into())
        }
    }
}
