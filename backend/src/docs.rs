#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::models::{
    device_session::DeviceSessionResponse,
    user::{
        ConfirmationCodePayload, CreateUserRequest, EmailPayload, LoginRequest, LoginResponse,
        MeResponse, NewPasswordPayload,
    },
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        registration_doc,
        registration_confirmation_doc,
        registration_email_resending_doc,
        login_doc,
        refresh_token_doc,
        logout_doc,
        me_doc,
        password_recovery_doc,
        new_password_doc,
        list_devices_doc,
        terminate_other_devices_doc,
        terminate_device_doc
    ),
    components(
        schemas(
            CreateUserRequest,
            ConfirmationCodePayload,
            EmailPayload,
            LoginRequest,
            LoginResponse,
            MeResponse,
            NewPasswordPayload,
            DeviceSessionResponse
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Auth", description = "Registration, login, token rotation, password recovery"),
        (name = "SecurityDevices", description = "Active device sessions")
    ),
    security(("BearerAuth" = []))
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT".to_string());

        components.add_security_scheme("BearerAuth", SecurityScheme::Http(bearer));
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/registration",
    request_body = CreateUserRequest,
    responses(
        (status = 204, description = "Account created, confirmation code sent"),
        (status = 400, description = "Login or email already taken"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "Auth",
    security(())
)]
fn registration_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/registration-confirmation",
    request_body = ConfirmationCodePayload,
    responses(
        (status = 204, description = "Account confirmed"),
        (status = 400, description = "Code incorrect or expired")
    ),
    tag = "Auth",
    security(())
)]
fn registration_confirmation_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/registration-email-resending",
    request_body = EmailPayload,
    responses(
        (status = 204, description = "Fresh confirmation code sent"),
        (status = 400, description = "Unknown email or already confirmed")
    ),
    tag = "Auth",
    security(())
)]
fn registration_email_resending_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token in body, refresh token as httpOnly cookie", body = LoginResponse),
        (status = 401, description = "Invalid login or password"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "Auth",
    security(())
)]
fn login_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/refresh-token",
    responses(
        (status = 200, description = "Rotated token pair", body = LoginResponse),
        (status = 401, description = "Invalid, expired, or already used refresh token"),
        (status = 403, description = "Session no longer active")
    ),
    tag = "Auth",
    security(())
)]
fn refresh_token_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Session closed, cookie cleared"),
        (status = 401, description = "Invalid or already used refresh token")
    ),
    tag = "Auth",
    security(())
)]
fn logout_doc() {}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses((status = 200, description = "Identity of the caller", body = MeResponse)),
    tag = "Auth"
)]
fn me_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/password-recovery",
    request_body = EmailPayload,
    responses((status = 204, description = "Recovery code sent if the email is registered")),
    tag = "Auth",
    security(())
)]
fn password_recovery_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/new-password",
    request_body = NewPasswordPayload,
    responses(
        (status = 204, description = "Password replaced"),
        (status = 400, description = "Recovery code incorrect or expired")
    ),
    tag = "Auth",
    security(())
)]
fn new_password_doc() {}

#[utoipa::path(
    get,
    path = "/api/security/devices",
    responses((status = 200, description = "Live sessions of the caller", body = [DeviceSessionResponse])),
    tag = "SecurityDevices",
    security(())
)]
fn list_devices_doc() {}

#[utoipa::path(
    delete,
    path = "/api/security/devices",
    responses((status = 204, description = "All sessions except the caller's device terminated")),
    tag = "SecurityDevices",
    security(())
)]
fn terminate_other_devices_doc() {}

#[utoipa::path(
    delete,
    path = "/api/security/devices/{device_id}",
    params(("device_id" = String, Path, description = "Device session to terminate")),
    responses(
        (status = 204, description = "Session terminated"),
        (status = 403, description = "Session belongs to another user"),
        (status = 404, description = "Unknown device session")
    ),
    tag = "SecurityDevices",
    security(())
)]
fn terminate_device_doc() {}
