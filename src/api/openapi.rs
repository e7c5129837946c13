use crate::api::handlers::{auth, health};
use utoipa::openapi::{tag::TagBuilder, Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` spec.
/// Routes added outside (like `GET /`) are intentionally not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    // `routes!` reads #[utoipa::path] to bind HTTP method + path and add the route to OpenAPI.
    OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(auth::signup::signup))
        .routes(routes!(auth::signin::signin))
        .routes(routes!(auth::refresh::refresh))
        .routes(routes!(auth::logout::logout))
        .routes(routes!(auth::logout::logout_all))
        .routes(routes!(auth::federated::google))
        .routes(routes!(auth::federated::github))
        .routes(routes!(auth::csrf_token::csrf_token))
        .routes(routes!(auth::csrf_token::verify_csrf))
        .routes(routes!(auth::availability::validate))
        .routes(routes!(auth::availability::generate))
        .routes(routes!(auth::availability::check_email))
        .routes(routes!(auth::availability::check_username))
        .routes(routes!(auth::users::set_admin_flag))
        .routes(routes!(auth::users::update_profile, auth::users::delete_account))
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    // Tags ride on the seed document; `routes!` only merges paths into it.
    OpenApiBuilder::new()
        .info(info)
        .tags(Some(service_tags()))
        .build()
}

fn service_tags() -> Vec<Tag> {
    vec![
        TagBuilder::new()
            .name("auth")
            .description(Some("Session and token authentication API"))
            .build(),
        TagBuilder::new()
            .name("users")
            .description(Some("Account administration API"))
            .build(),
    ]
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_all_auth_routes() {
        let spec = openapi();
        let paths = &spec.paths.paths;
        for path in [
            "/health",
            "/api/auth/signup",
            "/api/auth/signin",
            "/api/auth/refresh",
            "/api/auth/logout",
            "/api/auth/logout-all",
            "/api/auth/google",
            "/api/auth/github",
            "/api/auth/csrf-token",
            "/api/auth/verify-csrf",
            "/api/auth/validate-password",
            "/api/auth/generate-password",
            "/api/auth/check-email/{email}",
            "/api/auth/check-username/{username}",
            "/api/user/{id}/admin",
            "/api/user/{id}",
        ] {
            assert!(paths.contains_key(path), "missing path: {path}");
        }
    }

    #[test]
    fn openapi_info_comes_from_cargo_metadata() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn openapi_carries_the_service_tags() {
        let spec = openapi();
        let tags = spec.tags.expect("tags should be set");
        let names: Vec<&str> = tags.iter().map(|tag| tag.name.as_str()).collect();
        assert!(names.contains(&"auth"));
        assert!(names.contains(&"users"));
    }
}
