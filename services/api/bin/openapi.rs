//! Writes the OpenAPI document of the quiz API (`/rounds`, `/health`) to
//! `openapi.json` for client generation.

use thereis_api::router::ApiDoc;
use utoipa::OpenApi;

/// Renders `api_doc` as pretty JSON at `path`.
fn generate_spec(
    api_doc: utoipa::openapi::OpenApi,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let spec_json = api_doc.to_pretty_json()?;
    std::fs::write(path, spec_json)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    generate_spec(ApiDoc::openapi(), "openapi.json")?;
    Ok(())
}
