// marketplace/src/web/extractors.rs

//! Request-boundary identity. Authentication itself happens upstream; the
//! gateway forwards the resolved company and role as headers.

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::identity::{CompanyType, Identity, Role};

pub const COMPANY_ID_HEADER: &str = "X-Company-Id";
pub const COMPANY_TYPE_HEADER: &str = "X-Company-Type";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

impl FromRequest for Identity {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(identity_from_headers(req))
  }
}

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
  req.headers().get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

fn identity_from_headers(req: &HttpRequest) -> Result<Identity, AppError> {
  let company_id = header(req, COMPANY_ID_HEADER)
    .and_then(|raw| Uuid::parse_str(raw).ok())
    .ok_or_else(|| {
      warn!("Identity extractor: Missing or invalid {} header.", COMPANY_ID_HEADER);
      AppError::Unauthorized("Authentication required.".to_string())
    })?;

  let company_type = header(req, COMPANY_TYPE_HEADER)
    .and_then(CompanyType::parse)
    .ok_or_else(|| {
      warn!("Identity extractor: Missing or invalid {} header.", COMPANY_TYPE_HEADER);
      AppError::Unauthorized("Authentication required.".to_string())
    })?;

  let role = match header(req, USER_ROLE_HEADER) {
    None | Some("") => Role::Member,
    Some(raw) => Role::parse(raw).ok_or_else(|| AppError::Unauthorized(format!("Unknown role '{}'.", raw)))?,
  };

  Ok(Identity {
    company_id,
    company_type,
    role,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::test::TestRequest;

  #[test]
  fn reads_identity_headers() {
    let id = Uuid::new_v4();
    let req = TestRequest::default()
      .insert_header((COMPANY_ID_HEADER, id.to_string()))
      .insert_header((COMPANY_TYPE_HEADER, "Distributor"))
      .to_http_request();

    let identity = identity_from_headers(&req).unwrap();
    assert_eq!(identity.company_id, id);
    assert_eq!(identity.company_type, CompanyType::Distributor);
    assert_eq!(identity.role, Role::Member);
  }

  #[test]
  fn missing_or_bad_headers_are_unauthorized() {
    let req = TestRequest::default().to_http_request();
    assert!(matches!(identity_from_headers(&req), Err(AppError::Unauthorized(_))));

    let req = TestRequest::default()
      .insert_header((COMPANY_ID_HEADER, "not-a-uuid"))
      .insert_header((COMPANY_TYPE_HEADER, "customer"))
      .to_http_request();
    assert!(matches!(identity_from_headers(&req), Err(AppError::Unauthorized(_))));

    let req = TestRequest::default()
      .insert_header((COMPANY_ID_HEADER, Uuid::new_v4().to_string()))
      .insert_header((COMPANY_TYPE_HEADER, "customer"))
      .insert_header((USER_ROLE_HEADER, "superuser"))
      .to_http_request();
    assert!(matches!(identity_from_headers(&req), Err(AppError::Unauthorized(_))));
  }
}
