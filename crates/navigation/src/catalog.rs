//! Navigation data model and the built-in fallback catalog.
//!
//! Menus are two levels deep at most: an entry is either a direct link or a
//! dropdown holding sub-entries, and sub-entries never nest further.
//!
//! On the wire (remote menu API) entries use the flat camelCase shape
//! `{ id, name, path, icon, roles, order, requiresAuth, showUsername,
//! isDropdown, subItems }`; conversion into the closed [`EntryKind`] variant
//! happens at deserialization time.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use portal_auth::Role;
use portal_core::{DomainError, DomainResult, MenuId};

/// Optional descriptive fields shown inside a dropdown panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubMenuDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strengths: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weaknesses: Option<String>,
}

/// Entry inside a dropdown. Always a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SubMenuEntryDto", into = "SubMenuEntryDto")]
pub struct SubMenuEntry {
    pub id: MenuId,
    pub name: String,
    pub path: String,
    pub icon: Option<String>,
    pub roles: Vec<Role>,
    pub order: i32,
    /// Carried for wire fidelity only; gating comes from the parent dropdown.
    pub requires_auth: bool,
    pub details: SubMenuDetails,
}

impl SubMenuEntry {
    pub fn new(
        id: MenuId,
        name: impl Into<String>,
        path: impl Into<String>,
        roles: &[Role],
    ) -> Self {
        Self {
            id,
            name: name.into(),
            path: path.into(),
            icon: None,
            roles: roles.to_vec(),
            order: 0,
            requires_auth: false,
            details: SubMenuDetails::default(),
        }
    }

    pub fn with_details(mut self, details: SubMenuDetails) -> Self {
        self.details = details;
        self
    }

    pub fn allows(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.path.trim().is_empty() {
            return Err(DomainError::validation(format!("sub-entry '{}' has no path", self.id)));
        }
        if self.roles.is_empty() {
            return Err(DomainError::validation(format!("sub-entry '{}' has no roles", self.id)));
        }
        Ok(())
    }
}

/// What an entry does when activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Link { path: String },
    Dropdown { sub_items: Vec<SubMenuEntry> },
}

/// Top-level navigation entry.
///
/// # Invariants
/// - `roles` is non-empty.
/// - a link has a non-blank path; a dropdown has at least one sub-entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MenuEntryDto", into = "MenuEntryDto")]
pub struct MenuEntry {
    pub id: MenuId,
    pub name: String,
    pub icon: Option<String>,
    pub roles: Vec<Role>,
    pub order: i32,
    pub requires_auth: bool,
    /// Render the signed-in username instead of `name`.
    pub show_username: bool,
    pub kind: EntryKind,
}

impl MenuEntry {
    pub fn link(
        id: MenuId,
        name: impl Into<String>,
        path: impl Into<String>,
        roles: &[Role],
        order: i32,
    ) -> Self {
        Self::with_kind(id, name, roles, order, EntryKind::Link { path: path.into() })
    }

    pub fn dropdown(
        id: MenuId,
        name: impl Into<String>,
        roles: &[Role],
        order: i32,
        sub_items: Vec<SubMenuEntry>,
    ) -> Self {
        Self::with_kind(id, name, roles, order, EntryKind::Dropdown { sub_items })
    }

    fn with_kind(
        id: MenuId,
        name: impl Into<String>,
        roles: &[Role],
        order: i32,
        kind: EntryKind,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            icon: None,
            roles: roles.to_vec(),
            order,
            requires_auth: false,
            show_username: false,
            kind,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn requiring_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    pub fn showing_username(mut self) -> Self {
        self.show_username = true;
        self
    }

    pub fn path(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Link { path } => Some(path),
            EntryKind::Dropdown { .. } => None,
        }
    }

    pub fn sub_items(&self) -> &[SubMenuEntry] {
        match &self.kind {
            EntryKind::Link { .. } => &[],
            EntryKind::Dropdown { sub_items } => sub_items,
        }
    }

    pub fn is_dropdown(&self) -> bool {
        matches!(self.kind, EntryKind::Dropdown { .. })
    }

    pub fn allows(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.roles.is_empty() {
            return Err(DomainError::validation(format!("entry '{}' has no roles", self.id)));
        }
        match &self.kind {
            EntryKind::Link { path } if path.trim().is_empty() => Err(DomainError::validation(
                format!("link entry '{}' has no path", self.id),
            )),
            EntryKind::Dropdown { sub_items } if sub_items.is_empty() => Err(
                DomainError::validation(format!("dropdown entry '{}' has no sub-entries", self.id)),
            ),
            EntryKind::Dropdown { sub_items } => {
                sub_items.iter().try_for_each(SubMenuEntry::validate)
            }
            EntryKind::Link { .. } => Ok(()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubMenuEntryDto {
    id: String,
    name: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    order: i32,
    #[serde(default, skip_serializing_if = "is_false")]
    requires_auth: bool,
    #[serde(flatten)]
    details: SubMenuDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MenuEntryDto {
    id: String,
    name: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    order: i32,
    #[serde(default, deserialize_with = "null_as_false")]
    requires_auth: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    show_username: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    is_dropdown: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    sub_items: Vec<serde_json::Value>,
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Known roles from a wire role list. Unknown names grant nobody access, so
/// they are dropped rather than mapped to a real role.
fn parse_roles(names: &[String], owner: &str) -> DomainResult<Vec<Role>> {
    let mut roles = Vec::with_capacity(names.len());
    for name in names {
        match name.parse::<Role>() {
            Ok(role) if !roles.contains(&role) => roles.push(role),
            Ok(_) => {}
            Err(err) => tracing::debug!("menu '{owner}': ignoring role: {err}"),
        }
    }
    if roles.is_empty() {
        return Err(DomainError::validation(format!("'{owner}' has no recognised roles")));
    }
    Ok(roles)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl TryFrom<SubMenuEntryDto> for SubMenuEntry {
    type Error = DomainError;

    fn try_from(dto: SubMenuEntryDto) -> Result<Self, Self::Error> {
        let id = MenuId::new(dto.id)?;
        let roles = parse_roles(&dto.roles, id.as_str())?;
        let path = non_blank(dto.path)
            .ok_or_else(|| DomainError::validation(format!("sub-entry '{id}' has no path")))?;

        Ok(Self {
            id,
            name: dto.name,
            path,
            icon: non_blank(dto.icon),
            roles,
            order: dto.order,
            requires_auth: dto.requires_auth,
            details: dto.details,
        })
    }
}

impl From<SubMenuEntry> for SubMenuEntryDto {
    fn from(entry: SubMenuEntry) -> Self {
        Self {
            id: entry.id.into(),
            name: entry.name,
            path: Some(entry.path),
            icon: entry.icon,
            roles: entry.roles.iter().map(|r| r.as_str().to_string()).collect(),
            order: entry.order,
            requires_auth: entry.requires_auth,
            details: entry.details,
        }
    }
}

impl TryFrom<MenuEntryDto> for MenuEntry {
    type Error = DomainError;

    fn try_from(dto: MenuEntryDto) -> Result<Self, Self::Error> {
        let id = MenuId::new(dto.id)?;
        let roles = parse_roles(&dto.roles, id.as_str())?;

        let mut sub_items = Vec::new();
        if dto.is_dropdown {
            for raw in dto.sub_items {
                match serde_json::from_value::<SubMenuEntry>(raw) {
                    Ok(sub) => sub_items.push(sub),
                    Err(err) => tracing::warn!("menu '{id}': dropping invalid sub-entry: {err}"),
                }
            }
        }

        let kind = match non_blank(dto.path) {
            _ if !sub_items.is_empty() => EntryKind::Dropdown { sub_items },
            Some(path) => EntryKind::Link { path },
            None => {
                return Err(DomainError::validation(format!(
                    "entry '{id}' is neither a link nor a non-empty dropdown"
                )));
            }
        };

        Ok(Self {
            id,
            name: dto.name,
            icon: non_blank(dto.icon),
            roles,
            order: dto.order,
            requires_auth: dto.requires_auth,
            show_username: dto.show_username,
            kind,
        })
    }
}

impl From<MenuEntry> for MenuEntryDto {
    fn from(entry: MenuEntry) -> Self {
        let (path, is_dropdown, sub_items) = match entry.kind {
            EntryKind::Link { path } => (Some(path), false, Vec::new()),
            EntryKind::Dropdown { sub_items } => (
                None,
                true,
                sub_items
                    .into_iter()
                    .filter_map(|sub| serde_json::to_value(sub).ok())
                    .collect(),
            ),
        };
        Self {
            id: entry.id.into(),
            name: entry.name,
            path,
            icon: entry.icon,
            roles: entry.roles.iter().map(|r| r.as_str().to_string()).collect(),
            order: entry.order,
            requires_auth: entry.requires_auth,
            show_username: entry.show_username,
            is_dropdown,
            sub_items,
        }
    }
}

/// Decode a remote menu payload.
///
/// The body must be a JSON array; anything else is an error. Individual
/// entries that fail validation are dropped (and logged) so one bad row
/// does not take the whole menu down.
pub fn decode_entries(body: &[u8]) -> Result<Vec<MenuEntry>, serde_json::Error> {
    let raw: Vec<serde_json::Value> = serde_json::from_slice(body)?;
    let total = raw.len();
    let entries: Vec<MenuEntry> = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<MenuEntry>(value) {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("dropping invalid menu entry: {err}");
                None
            }
        })
        .collect();

    if entries.len() != total {
        tracing::warn!("decoded {} of {} menu entries", entries.len(), total);
    }
    Ok(entries)
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered collection of menu entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationCatalog {
    entries: Vec<MenuEntry>,
}

impl NavigationCatalog {
    /// Build a catalog, rejecting invalid entries and duplicate ids.
    pub fn from_entries(entries: Vec<MenuEntry>) -> DomainResult<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            entry.validate()?;
            if !seen.insert(entry.id.clone()) {
                return Err(DomainError::invariant(format!("duplicate menu id '{}'", entry.id)));
            }
        }
        Ok(Self { entries })
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&MenuEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Entries sorted by `order`; ties keep declaration order.
    pub fn sorted(&self) -> Vec<MenuEntry> {
        let mut entries = self.entries.clone();
        entries.sort_by_key(|e| e.order);
        entries
    }

    /// Built-in catalog used when the remote menu source is unreachable.
    pub fn static_fallback() -> Self {
        use Role::{Admin, Guest, Manager, User};

        const EVERYONE: &[Role] = &[Guest, User, Manager, Admin];
        const MEMBERS: &[Role] = &[User, Manager, Admin];
        const STAFF: &[Role] = &[Manager, Admin];
        const ADMINS: &[Role] = &[Admin];

        let model = |id: &'static str, name: &str, details: [&str; 5]| {
            let [subtitle, description, application, strengths, weaknesses] = details;
            SubMenuEntry::new(MenuId::from_static(id), name, format!("/models/{id}"), MEMBERS)
                .with_details(SubMenuDetails {
                    subtitle: Some(subtitle.to_string()),
                    description: Some(description.to_string()),
                    application: Some(application.to_string()),
                    strengths: Some(strengths.to_string()),
                    weaknesses: Some(weaknesses.to_string()),
                })
        };

        let models = vec![
            model("isolation-forest", "Isolation Forest", [
                "Isolation forest",
                "Anomalies are easier to isolate than normal points",
                "Flags abnormal sensor combinations immediately",
                "Real-time anomaly detection, fast",
                "Ignores temporal patterns",
            ]),
            model("lstm", "LSTM", [
                "Long short-term memory",
                "Gating keeps long-range memory",
                "Learns patterns from 30-60 minutes back",
                "Captures complex time-series dependencies",
                "Slow to train and data hungry",
            ]),
            model("gru", "GRU", [
                "Gated recurrent unit",
                "Simplified LSTM with two gates",
                "Detects sudden changes over 5-15 minutes",
                "Faster and leaner than LSTM",
                "Degrades on very long sequences",
            ]),
            model("random-forest", "Random Forest", [
                "Random forest",
                "Votes or averages across many decision trees",
                "Statistical analysis of sensor features",
                "Feature importances, resists overfitting",
                "Does not consider temporal order",
            ]),
            model("xgboost", "XGBoost", [
                "Extreme gradient boosting",
                "Improves sequentially by learning previous errors",
                "Learns complex interactions between sensors",
                "Top-tier accuracy, fast",
                "Hyperparameter tuning is involved",
            ]),
        ];

        let entries = vec![
            MenuEntry::link(MenuId::from_static("home"), "Home", "/", EVERYONE, 1)
                .with_icon("Home"),
            MenuEntry::link(
                MenuId::from_static("dashboard"),
                "Dashboard",
                "/dashboard",
                EVERYONE,
                2,
            )
            .with_icon("BarChart"),
            MenuEntry::link(MenuId::from_static("boards"), "Boards", "/boards", EVERYONE, 3)
                .with_icon("MessageSquare"),
            MenuEntry::dropdown(MenuId::from_static("models"), "Models", MEMBERS, 4, models)
                .with_icon("Brain"),
            MenuEntry::link(MenuId::from_static("products"), "Products", "/products", MEMBERS, 5)
                .with_icon("Package"),
            MenuEntry::link(MenuId::from_static("orders"), "Orders", "/orders", MEMBERS, 6)
                .with_icon("ShoppingCart")
                .requiring_auth(),
            MenuEntry::link(MenuId::from_static("demo"), "Demo", "/demo", ADMINS, 7)
                .with_icon("Sparkles"),
            MenuEntry::link(MenuId::from_static("profile"), "Profile", "/profile", MEMBERS, 8)
                .with_icon("User")
                .requiring_auth()
                .showing_username(),
            MenuEntry::link(MenuId::from_static("admin"), "Admin Panel", "/admin", STAFF, 9)
                .with_icon("Shield")
                .requiring_auth(),
            MenuEntry::link(
                MenuId::from_static("messages"),
                "Messages",
                "/messages/inbox",
                EVERYONE,
                10,
            )
            .with_icon("MessageSquare"),
        ];

        Self { entries }
    }
}
