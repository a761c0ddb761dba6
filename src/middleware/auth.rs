use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, entity::sea_orm_active_enums::Role, error::AppError, state::AppState};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

/// Everything an endpoint may ask of the caller, evaluated in one place
/// against the resolved identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Platform administration: approvals, role changes, reporting.
    Administer,
    CreateEvents,
    /// Edit, cancel or delete an event and add ticket types to it.
    ManageEvent { organizer_id: Uuid },
    /// Pay for or cancel an order. Only the buyer may do this.
    ActOnOrder { owner_id: Uuid },
    ViewOrder { owner_id: Uuid },
    CheckInTicket { organizer_id: Uuid },
    ViewTicket { owner_id: Uuid, organizer_id: Uuid },
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn can(&self, capability: Capability) -> bool {
        match capability {
            Capability::Administer => self.is_admin(),
            Capability::CreateEvents => matches!(self.role, Role::Organizer | Role::Admin),
            Capability::ManageEvent { organizer_id }
            | Capability::CheckInTicket { organizer_id } => {
                self.is_admin() || self.user_id == organizer_id
            }
            Capability::ActOnOrder { owner_id } => self.user_id == owner_id,
            Capability::ViewOrder { owner_id } => self.is_admin() || self.user_id == owner_id,
            Capability::ViewTicket {
                owner_id,
                organizer_id,
            } => self.is_admin() || self.user_id == owner_id || self.user_id == organizer_id,
        }
    }

    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

        let user_id = Uuid::parse_str(&decoded.claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

        Ok(AuthUser {
            user_id,
            role: decoded.claims.role,
        })
    }
}
