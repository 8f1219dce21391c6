use crate::scene::validate::Defect;

pub type PhotonResult<T> = Result<T, PhotonError>;

#[derive(thiserror::Error, Debug)]
pub enum PhotonError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {} defect(s): {}", .defects.len(), join_defects(.defects))]
    Serialization { defects: Vec<Defect> },

    #[error("sweep error: {0}")]
    Sweep(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("assembly error: {0}")]
    Assembly(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PhotonError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn sweep(msg: impl Into<String>) -> Self {
        Self::Sweep(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn assembly(msg: impl Into<String>) -> Self {
        Self::Assembly(msg.into())
    }

    /// Wrap a non-empty defect list produced by [`crate::validate`].
    pub fn defects(defects: Vec<Defect>) -> Self {
        Self::Serialization { defects }
    }
}

fn join_defects(defects: &[Defect]) -> String {
    defects
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
