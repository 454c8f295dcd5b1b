//! Resource/action vocabulary and the permission map carried by every role.
//!
//! Permission checks are plain string lookups so that roles loaded from
//! storage can carry resources or actions this crate does not know about.
//! [`Resource`] and [`Action`] give the known vocabulary a typed spelling.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Resources a project role can grant actions on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Contacts,
    Appointments,
    Users,
    Project,
    Reports,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Self::Contacts,
        Self::Appointments,
        Self::Users,
        Self::Project,
        Self::Reports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contacts => "contacts",
            Self::Appointments => "appointments",
            Self::Users => "users",
            Self::Project => "project",
            Self::Reports => "reports",
        }
    }

    /// Exact, case-sensitive match against the stored vocabulary.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions a role may perform on a [`Resource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Assign,
    Invite,
    Remove,
    ManageRoles,
    Settings,
    Export,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Self::View,
        Self::Create,
        Self::Edit,
        Self::Delete,
        Self::Assign,
        Self::Invite,
        Self::Remove,
        Self::ManageRoles,
        Self::Settings,
        Self::Export,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Assign => "assign",
            Self::Invite => "invite",
            Self::Remove => "remove",
            Self::ManageRoles => "manage_roles",
            Self::Settings => "settings",
            Self::Export => "export",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from resource name to the action names granted on it.
///
/// Serializes as a JSON object of string arrays, which is also the shape
/// stored in the `roles.permissions` column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeMap<String, Vec<String>>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `actions` on a known resource, replacing any previous grant.
    pub fn grant(self, resource: Resource, actions: &[Action]) -> Self {
        self.grant_raw(resource.as_str(), actions.iter().map(|a| a.as_str()))
    }

    /// Grant arbitrary action names on an arbitrary resource name.
    pub fn grant_raw<I, S>(mut self, resource: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .insert(resource.into(), actions.into_iter().map(Into::into).collect());
        self
    }

    /// True iff `resource` is present and lists `action`. Anything else,
    /// including unknown names and empty strings, is a denial.
    pub fn allows(&self, resource: &str, action: &str) -> bool {
        self.0
            .get(resource)
            .is_some_and(|actions| actions.iter().any(|a| a == action))
    }

    pub fn actions(&self, resource: &str) -> &[String] {
        self.0.get(resource).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.0
    }
}

impl From<BTreeMap<String, Vec<String>>> for PermissionSet {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Self(map)
    }
}
