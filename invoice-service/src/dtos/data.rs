use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoadFromFileRequest {
    #[validate(length(min = 1, max = 4096))]
    pub file_path: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoadFromJsonRequest {
    #[validate(length(min = 2))]
    pub json_content: String,
}
