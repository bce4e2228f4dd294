/// Module catalog
///
/// Modules are the feature areas a plan can include or exclude. The catalog is
/// fixed configuration compiled into the binary; only the per-plan settings
/// (see [`crate::models::plan_module`]) live in the database.
///
/// | Module     | Counted resource | Default limit |
/// |------------|------------------|---------------|
/// | `USERS`    | users            | 5             |
/// | `CONTACTS` | companies        | 500           |
/// | `CRM`      | opportunities    | 1000          |
///
/// # Example
///
/// ```
/// use controly_shared::models::module::ModuleType;
///
/// let module = ModuleType::from_str("CONTACTS").unwrap();
/// assert_eq!(module.definition().name, "Contacts");
/// assert_eq!(module.definition().default_limit, Some(500));
/// ```

use serde::{Deserialize, Serialize};

/// Feature area that can be independently included in a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "module_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleType {
    /// Team members of a business account
    Users,

    /// Companies and their contact data
    Contacts,

    /// Opportunities and logged activities
    Crm,
}

impl ModuleType {
    /// Every module, in catalog order
    pub const ALL: [ModuleType; 3] = [ModuleType::Users, ModuleType::Contacts, ModuleType::Crm];

    /// Wire/database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleType::Users => "USERS",
            ModuleType::Contacts => "CONTACTS",
            ModuleType::Crm => "CRM",
        }
    }

    /// Parses a module type, accepting any letter case
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "USERS" => Some(ModuleType::Users),
            "CONTACTS" => Some(ModuleType::Contacts),
            "CRM" => Some(ModuleType::Crm),
            _ => None,
        }
    }

    /// Static catalog entry for this module
    pub fn definition(&self) -> &'static Module {
        match self {
            ModuleType::Users => &CATALOG[0],
            ModuleType::Contacts => &CATALOG[1],
            ModuleType::Crm => &CATALOG[2],
        }
    }
}

impl std::fmt::Display for ModuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog entry describing a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    /// Module identifier
    #[serde(rename = "type")]
    pub module_type: ModuleType,

    /// Display name
    pub name: &'static str,

    /// Short description shown in plan selection
    pub description: &'static str,

    /// Whether plans may cap the number of items in this module
    pub has_limits: bool,

    /// Limit applied when a plan includes the module without naming one
    pub default_limit: Option<u32>,
}

static CATALOG: [Module; 3] = [
    Module {
        module_type: ModuleType::Users,
        name: "Users",
        description: "Invite team members and manage their access",
        has_limits: true,
        default_limit: Some(5),
    },
    Module {
        module_type: ModuleType::Contacts,
        name: "Contacts",
        description: "Companies and their contact details",
        has_limits: true,
        default_limit: Some(500),
    },
    Module {
        module_type: ModuleType::Crm,
        name: "CRM",
        description: "Sales opportunities and activity logging",
        has_limits: true,
        default_limit: Some(1000),
    },
];

/// Returns the full module catalog
pub fn catalog() -> &'static [Module] {
    &CATALOG
}
