// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use procura_app::{
    AccountStatus, OfferId, OfferRecord, OfferStatus, PortalCounts, Role, SessionContext, UserId,
    UserRecord, VerificationId, VerificationRecord, VerificationStatus,
};

const COMPANY_STEMS: [&str; 14] = [
    "Sanoh",
    "Arita",
    "Mitra",
    "Karya",
    "Prima",
    "Delta",
    "Nusa",
    "Andalan",
    "Sentosa",
    "Baruna",
    "Cemerlang",
    "Harapan",
    "Sumber",
    "Tritunggal",
];
const COMPANY_SUFFIXES: [&str; 6] = [
    "Indonesia",
    "Parts",
    "Industries",
    "Manufacturing",
    "Components",
    "Logistics",
];

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];

const TENDER_ITEMS: [&str; 12] = [
    "Brake hose assembly",
    "Fuel line clamp set",
    "Coolant pipe",
    "Wire harness",
    "Steel tubing lot",
    "Rubber grommets",
    "Machined brackets",
    "Injection molding dies",
    "Packaging crates",
    "Fastener assortment",
    "Filter cartridges",
    "Gasket sheets",
];

const OFFER_STATUSES: [OfferStatus; 3] = [
    OfferStatus::Pending,
    OfferStatus::Pending,
    OfferStatus::Accepted,
];
const VERIFICATION_STATUSES: [VerificationStatus; 3] = [
    VerificationStatus::Pending,
    VerificationStatus::Pending,
    VerificationStatus::Verified,
];

const REFERENCE_YEAR: i32 = 2026;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Deterministic portal fixtures: the same seed always produces the same
/// users, offers, and verification requests. Drives demo mode and tests.
#[derive(Debug, Clone)]
pub struct PortalFaker {
    rng: DeterministicRng,
}

impl PortalFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn users(&mut self, count: usize) -> Vec<UserRecord> {
        (1..=count as i64).map(|id| self.user(id)).collect()
    }

    pub fn user(&mut self, id: i64) -> UserRecord {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        // Mostly suppliers, with a sprinkle of staff accounts.
        let role = match self.rng.int_n(10) {
            0 => Role::Admin,
            1 | 2 => Role::Purchasing,
            _ => Role::Supplier,
        };
        let company = match role {
            Role::Supplier => Some(self.company_name()),
            Role::Admin | Role::Purchasing => None,
        };
        let status = if self.rng.int_n(10) < 8 {
            AccountStatus::Active
        } else {
            AccountStatus::Inactive
        };

        UserRecord {
            id: UserId::new(id),
            name: format!("{first} {last}"),
            email: format!(
                "{}.{}@procura.test",
                first.to_ascii_lowercase(),
                last.to_ascii_lowercase()
            ),
            role,
            status,
            company,
            deleted: self.rng.int_n(12) == 0,
        }
    }

    pub fn offers(&mut self, count: usize) -> Vec<OfferRecord> {
        (1..=count as i64).map(|id| self.offer(id)).collect()
    }

    pub fn offer(&mut self, id: i64) -> OfferRecord {
        let item = self.pick(&TENDER_ITEMS);
        let status = OFFER_STATUSES[self.rng.int_n(OFFER_STATUSES.len())];
        let price = if self.rng.int_n(10) < 8 {
            Some(format!(
                "{}.{:02}",
                self.int_range(500, 250_000),
                self.int_range(0, 99),
            ))
        } else {
            None
        };

        OfferRecord {
            id: OfferId::new(id),
            tender: format!("T-{:04} {item}", self.int_range(1, 9_999)),
            company: self.company_name(),
            price,
            status,
            submitted_at: Some(self.date_string()),
            deleted: false,
        }
    }

    pub fn verifications(&mut self, count: usize) -> Vec<VerificationRecord> {
        (1..=count as i64).map(|id| self.verification(id)).collect()
    }

    pub fn verification(&mut self, id: i64) -> VerificationRecord {
        let company = self.company_name();
        let contact = self.pick(&LAST_NAMES).to_ascii_lowercase();
        let status = VERIFICATION_STATUSES[self.rng.int_n(VERIFICATION_STATUSES.len())];

        VerificationRecord {
            id: VerificationId::new(id),
            email: Some(format!(
                "{contact}@{}.test",
                company.split(' ').next().unwrap_or("supplier").to_ascii_lowercase(),
            )),
            company,
            status,
            submitted_at: Some(self.date_string()),
            deleted: false,
        }
    }

    pub fn session(&mut self, role: Role) -> SessionContext {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let company = match role {
            Role::Supplier => Some(self.company_name()),
            Role::Admin | Role::Purchasing => None,
        };
        SessionContext {
            token: format!("demo-{:08x}", self.rng.next_u64() as u32),
            name: format!("{first} {last}"),
            email: format!(
                "{}.{}@procura.test",
                first.to_ascii_lowercase(),
                last.to_ascii_lowercase()
            ),
            role,
            company,
        }
    }

    pub fn company_name(&mut self) -> String {
        format!(
            "{} {}",
            self.pick(&COMPANY_STEMS),
            self.pick(&COMPANY_SUFFIXES)
        )
    }

    fn date_string(&mut self) -> String {
        format!(
            "{REFERENCE_YEAR}-{:02}-{:02}",
            self.int_range(1, 12),
            self.int_range(1, 28),
        )
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }
}

/// Derives dashboard counts the way the backend reports them: suppliers are
/// not counted among users they cannot see, pending rows only.
pub fn counts_for(
    users: &[UserRecord],
    offers: &[OfferRecord],
    verifications: &[VerificationRecord],
) -> PortalCounts {
    PortalCounts {
        users: users.iter().filter(|user| !user.deleted).count(),
        offers_pending: offers
            .iter()
            .filter(|offer| offer.status == OfferStatus::Pending)
            .count(),
        verifications_pending: verifications
            .iter()
            .filter(|verification| verification.status == VerificationStatus::Pending)
            .count(),
    }
}
