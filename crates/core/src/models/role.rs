use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Seeded by the initial migration; cannot be renamed or deleted.
    pub is_system: bool,
}

/// Roles the application grants permissions to.
///
/// Custom roles may exist in the `roles` table but only these names carry privileges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    Admin,
    Doctor,
    Receptionist,
    LabTechnician,
}

impl SystemRole {
    pub const ALL: [SystemRole; 4] = [
        SystemRole::Admin,
        SystemRole::Doctor,
        SystemRole::Receptionist,
        SystemRole::LabTechnician,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SystemRole::Admin => "admin",
            SystemRole::Doctor => "doctor",
            SystemRole::Receptionist => "receptionist",
            SystemRole::LabTechnician => "lab_technician",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == name)
    }
}

impl std::fmt::Display for SystemRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
