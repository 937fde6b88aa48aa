use serde::Serialize;
use strum_macros::{Display, EnumString};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!("HR".parse::<Role>().unwrap(), Role::Hr);
        assert_eq!(" admin ".trim().parse::<Role>().unwrap(), Role::Admin);
        assert!("manager".parse::<Role>().is_err());
        assert_eq!(Role::Employee.to_string(), "employee");
    }

    #[test]
    fn ids_round_trip() {
        for role in [Role::Admin, Role::Hr, Role::Employee] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(9), None);
    }
}
