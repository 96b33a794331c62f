use formpack_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("invalid export settings: {message}")]
    InvalidSettings { message: String },

    #[error("submission does not match the form: {message}")]
    ShapeMismatch { message: String },
}

pub type Result<T> = std::result::Result<T, ExportError>;
