use crate::AppState;
use axum::{extract::State, response::Html};

const INDEX_TEMPLATE: &str = include_str!("../../../assets/index.html");

/// Renders the upload page with the configured limits filled in
pub fn render_index(allowed_extensions: &[String], max_file_size: usize) -> String {
    let accept = allowed_extensions
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(",");
    let formats = allowed_extensions
        .iter()
        .map(|ext| ext.to_uppercase())
        .collect::<Vec<_>>()
        .join(" or ");

    INDEX_TEMPLATE
        .replace("{{ACCEPT}}", &accept)
        .replace("{{FORMATS}}", &formats)
        .replace("{{MAX_FILE_SIZE}}", &max_file_size.to_string())
        .replace("{{MAX_FILE_SIZE_MB}}", &(max_file_size / 1024 / 1024).to_string())
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(
        state.intake.allowed_extensions(),
        state.config.max_file_size,
    ))
}
