use serde::{Deserialize, Serialize};

/// Closed role set served by the backend. Anything unrecognized is treated
/// as unprivileged staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    Admin,
    Doctor,
    Patient,
    Staff,
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Role::parse(&s)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Staff
    }
}

impl Role {
    pub fn parse(s: &str) -> Role {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "doctor" => Role::Doctor,
            "patient" => Role::Patient,
            _ => Role::Staff,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Patient => "patient",
            Role::Staff => "staff",
        }
    }

    /// Landing route a route guard redirects to after authentication.
    pub fn landing_route(&self) -> &'static str {
        match self {
            Role::Admin => "/admin-dashboard",
            Role::Doctor => "/doctor-dashboard",
            Role::Patient => "/patient-dashboard",
            Role::Staff => "/dashboard",
        }
    }
}

/// User profile as served by GET /profile/. Optional fields default so a
/// minimal `{id, username, role}` record still deserializes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_and_default() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("Doctor"), Role::Doctor);
        assert_eq!(Role::parse("patient"), Role::Patient);
        assert_eq!(Role::parse("nurse"), Role::Staff);
        assert_eq!(Role::parse(""), Role::Staff);
    }

    #[test]
    fn role_landing_routes() {
        assert_eq!(Role::Admin.landing_route(), "/admin-dashboard");
        assert_eq!(Role::Doctor.landing_route(), "/doctor-dashboard");
        assert_eq!(Role::Patient.landing_route(), "/patient-dashboard");
        assert_eq!(Role::Staff.landing_route(), "/dashboard");
    }

    #[test]
    fn user_round_trips_through_json() {
        let user = User {
            id: 7,
            username: "alice".into(),
            role: Role::Doctor,
            email: Some("alice@example.com".into()),
            first_name: Some("Alice".into()),
            last_name: None,
            phone_number: None,
        };
        let s = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&s).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn minimal_profile_deserializes() {
        let user: User =
            serde_json::from_str(r#"{"id":1,"username":"bob","role":"patient"}"#).unwrap();
        assert_eq!(user.role, Role::Patient);
        assert_eq!(user.email, None);
    }

    #[test]
    fn unknown_role_deserializes_as_staff() {
        let user: User =
            serde_json::from_str(r#"{"id":2,"username":"eve","role":"wizard"}"#).unwrap();
        assert_eq!(user.role, Role::Staff);
    }
}
