//! OpenAPI documentation.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::auth::models::{LoginRequest, TokenResponse};
use crate::error::ErrorResponse;
use crate::handlers;
use crate::handlers::cleanup::CleanupResponse;
use crate::handlers::generate::{DniRequest, GenerateResponse};
use crate::handlers::list::{ListResponse, PdfInfo};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Crediport API",
        version = "0.1.0",
        description = "Credential-gated API that generates credit-report PDFs by DNI, with artifact listing, download, and age-based cleanup."
    ),
    paths(
        handlers::token::issue_token,
        handlers::generate::generate_pdf,
        handlers::generate::generate_and_download_pdf,
        handlers::download::download_pdf,
        handlers::list::list_pdfs,
        handlers::cleanup::cleanup_pdfs,
    ),
    components(schemas(
        LoginRequest,
        TokenResponse,
        DniRequest,
        GenerateResponse,
        ListResponse,
        PdfInfo,
        CleanupResponse,
        ErrorResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Token issuance"),
        (name = "reports", description = "Report generation and artifact lifecycle")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
