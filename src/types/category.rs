use serde::Deserialize;

fn default_top_n() -> usize {
    3
}

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub text: String,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

#[derive(Debug, Deserialize)]
pub struct AddCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}
