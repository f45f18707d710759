use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Fixed set of account roles. Stored and sent as lowercase text.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Attachee,
    Intern,
    Staff,
    Hr,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        value.parse().ok()
    }

    pub fn is_hr(self) -> bool {
        self == Role::Hr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_the_fixed_lowercase_set() {
        assert_eq!(Role::parse("attachee"), Some(Role::Attachee));
        assert_eq!(Role::parse("intern"), Some(Role::Intern));
        assert_eq!(Role::parse("staff"), Some(Role::Staff));
        assert_eq!(Role::parse("hr"), Some(Role::Hr));
        assert_eq!(Role::parse("HR"), None);
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn text_form_round_trips_with_storage() {
        assert_eq!(Role::Intern.as_ref(), "intern");
        assert_eq!(Role::Hr.to_string(), "hr");
    }
}
