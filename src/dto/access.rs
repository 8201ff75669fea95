use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    pub required: Option<String>,
}
