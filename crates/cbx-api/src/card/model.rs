use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateCardRequest {
    pub question: String,
    pub answer: String,
}

/// Partial update; absent sides are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCardRequest {
    pub question: Option<String>,
    pub answer: Option<String>,
}
