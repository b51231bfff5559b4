// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::*;
use crate::list::ListRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Purchasing,
    Supplier,
}

impl Role {
    pub const ALL: [Self; 3] = [Self::Admin, Self::Purchasing, Self::Supplier];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Purchasing => "purchasing",
            Self::Supplier => "supplier",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "purchasing" => Some(Self::Purchasing),
            "supplier" => Some(Self::Supplier),
            _ => None,
        }
    }

    /// Screens a signed-in role may open, in rotation order.
    pub const fn screens(self) -> &'static [ScreenKind] {
        match self {
            Self::Admin => &[
                ScreenKind::Dashboard,
                ScreenKind::Users,
                ScreenKind::Verifications,
                ScreenKind::Profile,
            ],
            Self::Purchasing => &[
                ScreenKind::Dashboard,
                ScreenKind::Offers,
                ScreenKind::Profile,
            ],
            Self::Supplier => &[
                ScreenKind::Dashboard,
                ScreenKind::Offers,
                ScreenKind::Profile,
            ],
        }
    }

    pub fn sees(self, screen: ScreenKind) -> bool {
        self.screens().contains(&screen)
    }

    pub const fn may_invoke(self, action: RowAction) -> bool {
        match (self, action) {
            (Self::Admin, RowAction::ToggleStatus | RowAction::Delete) => true,
            (Self::Admin, RowAction::Verify | RowAction::Reject) => true,
            (Self::Admin, RowAction::Accept | RowAction::Decline) => false,
            (Self::Purchasing, RowAction::Accept | RowAction::Decline) => true,
            (
                Self::Purchasing,
                RowAction::ToggleStatus | RowAction::Delete | RowAction::Verify | RowAction::Reject,
            ) => false,
            (Self::Supplier, _) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl AccountStatus {
    /// Wire form used by the status endpoint.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "1",
            Self::Inactive => "0",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "1" => Some(Self::Active),
            "0" => Some(Self::Inactive),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferStatus {
    Pending,
    Accepted,
    Declined,
}

impl OfferStatus {
    pub const ALL: [Self; 3] = [Self::Pending, Self::Accepted, Self::Declined];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub const ALL: [Self; 3] = [Self::Pending, Self::Verified, Self::Rejected];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "verified" => Some(Self::Verified),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScreenKind {
    Dashboard,
    Users,
    Offers,
    Verifications,
    Profile,
}

impl ScreenKind {
    pub const ALL: [Self; 5] = [
        Self::Dashboard,
        Self::Users,
        Self::Offers,
        Self::Verifications,
        Self::Profile,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Users => "users",
            Self::Offers => "offers",
            Self::Verifications => "verifications",
            Self::Profile => "profile",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Users => "Users",
            Self::Offers => "Offers",
            Self::Verifications => "Verifications",
            Self::Profile => "Profile",
        }
    }

    pub const fn is_list(self) -> bool {
        match self {
            Self::Users | Self::Offers | Self::Verifications => true,
            Self::Dashboard | Self::Profile => false,
        }
    }

    /// Closed value set of the discriminant field the filter picker offers.
    pub const fn filter_values(self) -> &'static [&'static str] {
        match self {
            Self::Users => &["admin", "purchasing", "supplier"],
            Self::Offers => &["pending", "accepted", "declined"],
            Self::Verifications => &["pending", "verified", "rejected"],
            Self::Dashboard | Self::Profile => &[],
        }
    }

    pub const fn row_actions(self) -> &'static [RowAction] {
        match self {
            Self::Users => &[RowAction::ToggleStatus, RowAction::Delete],
            Self::Offers => &[RowAction::Accept, RowAction::Decline],
            Self::Verifications => &[RowAction::Verify, RowAction::Reject],
            Self::Dashboard | Self::Profile => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowAction {
    ToggleStatus,
    Delete,
    Accept,
    Decline,
    Verify,
    Reject,
}

impl RowAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ToggleStatus => "toggle status",
            Self::Delete => "delete",
            Self::Accept => "accept",
            Self::Decline => "decline",
            Self::Verify => "verify",
            Self::Reject => "reject",
        }
    }

    /// Status toggles are reversible; everything else gets a confirm prompt.
    pub const fn needs_confirm(self) -> bool {
        match self {
            Self::ToggleStatus => false,
            Self::Delete | Self::Accept | Self::Decline | Self::Verify | Self::Reject => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Login,
    Nav,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserSortKey {
    Name,
    Email,
    Role,
}

impl UserSortKey {
    pub const ALL: [Self; 3] = [Self::Name, Self::Email, Self::Role];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Role => "role",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferSortKey {
    Tender,
    Company,
    Price,
    Submitted,
}

impl OfferSortKey {
    pub const ALL: [Self; 4] = [Self::Tender, Self::Company, Self::Price, Self::Submitted];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Tender => "tender",
            Self::Company => "company",
            Self::Price => "price",
            Self::Submitted => "submitted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationSortKey {
    Company,
    Status,
    Submitted,
}

impl VerificationSortKey {
    pub const ALL: [Self; 3] = [Self::Company, Self::Status, Self::Submitted];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Status => "status",
            Self::Submitted => "submitted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    pub company: Option<String>,
    pub deleted: bool,
}

impl ListRecord for UserRecord {
    type SortKey = UserSortKey;

    fn record_id(&self) -> i64 {
        self.id.get()
    }

    fn discriminant(&self) -> &str {
        self.role.as_str()
    }

    fn search_values(&self) -> Vec<&str> {
        let mut values = vec![self.name.as_str(), self.email.as_str()];
        if let Some(company) = &self.company {
            values.push(company.as_str());
        }
        values
    }

    fn sort_value(&self, key: UserSortKey) -> Option<&str> {
        match key {
            UserSortKey::Name => Some(self.name.as_str()),
            UserSortKey::Email => Some(self.email.as_str()),
            UserSortKey::Role => Some(self.role.as_str()),
        }
    }

    fn deleted(&self) -> bool {
        self.deleted
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRecord {
    pub id: OfferId,
    pub tender: String,
    pub company: String,
    pub price: Option<String>,
    pub status: OfferStatus,
    pub submitted_at: Option<String>,
    pub deleted: bool,
}

impl ListRecord for OfferRecord {
    type SortKey = OfferSortKey;

    fn record_id(&self) -> i64 {
        self.id.get()
    }

    fn discriminant(&self) -> &str {
        self.status.as_str()
    }

    fn search_values(&self) -> Vec<&str> {
        vec![self.tender.as_str(), self.company.as_str()]
    }

    fn sort_value(&self, key: OfferSortKey) -> Option<&str> {
        match key {
            OfferSortKey::Tender => Some(self.tender.as_str()),
            OfferSortKey::Company => Some(self.company.as_str()),
            OfferSortKey::Price => self.price.as_deref(),
            OfferSortKey::Submitted => self.submitted_at.as_deref(),
        }
    }

    fn deleted(&self) -> bool {
        self.deleted
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub id: VerificationId,
    pub company: String,
    pub email: Option<String>,
    pub status: VerificationStatus,
    pub submitted_at: Option<String>,
    pub deleted: bool,
}

impl ListRecord for VerificationRecord {
    type SortKey = VerificationSortKey;

    fn record_id(&self) -> i64 {
        self.id.get()
    }

    fn discriminant(&self) -> &str {
        self.status.as_str()
    }

    fn search_values(&self) -> Vec<&str> {
        let mut values = vec![self.company.as_str()];
        if let Some(email) = &self.email {
            values.push(email.as_str());
        }
        values
    }

    fn sort_value(&self, key: VerificationSortKey) -> Option<&str> {
        match key {
            VerificationSortKey::Company => Some(self.company.as_str()),
            VerificationSortKey::Status => Some(self.status.as_str()),
            VerificationSortKey::Submitted => self.submitted_at.as_deref(),
        }
    }

    fn deleted(&self) -> bool {
        self.deleted
    }
}

/// Everything established at login and torn down at logout. Components
/// receive this by value or reference; nothing reads session state from
/// globals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub token: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub company: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PortalCounts {
    pub users: usize,
    pub offers_pending: usize,
    pub verifications_pending: usize,
}
