// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Runtime implementations behind the portal UI: a live one backed by
//! the HTTP client and a deterministic in-memory one for demo mode.

use anyhow::{Result, bail};
use procura_api::Client;
use procura_app::{
    ListRecord, OfferId, OfferRecord, PortalCounts, Role, ScreenKind, SessionContext, UserId,
    UserRecord, VerificationId, VerificationRecord,
};
use procura_store::Store;
use procura_testkit::{PortalFaker, counts_for};
use procura_tui::{InternalEvent, PortalRuntime, RowPatch, ScreenData};
use std::sync::mpsc::Sender;
use std::thread;

const DEMO_SEED: u64 = 2026;

fn fetch_screen(client: &Client, screen: ScreenKind, token: &str) -> Result<ScreenData> {
    match screen {
        ScreenKind::Users => Ok(ScreenData::Users(client.fetch_users(token)?)),
        ScreenKind::Offers => Ok(ScreenData::Offers(client.fetch_offers(token)?)),
        ScreenKind::Verifications => {
            Ok(ScreenData::Verifications(client.fetch_verifications(token)?))
        }
        ScreenKind::Dashboard | ScreenKind::Profile => {
            bail!("screen {} has no record list", screen.as_str())
        }
    }
}

fn run_action(client: &Client, record_id: i64, patch: RowPatch, token: &str) -> Result<()> {
    match patch {
        RowPatch::UserStatus(status) => {
            client.set_user_status(token, UserId::new(record_id), status)
        }
        RowPatch::UserDeleted => client.delete_user(token, UserId::new(record_id)),
        RowPatch::OfferStatus(status) => {
            client.decide_offer(token, OfferId::new(record_id), status)
        }
        RowPatch::VerificationStatus(status) => {
            client.decide_verification(token, VerificationId::new(record_id), status)
        }
    }
}

/// Live runtime: portal requests go to the HTTP API on background
/// threads, persistence goes to the local store on the UI thread.
pub struct ApiRuntime {
    client: Client,
    store: Store,
    page_size: usize,
    show_deleted: bool,
}

impl ApiRuntime {
    pub fn new(client: Client, store: Store, page_size: usize, show_deleted: bool) -> Self {
        Self {
            client,
            store,
            page_size,
            show_deleted,
        }
    }
}

impl PortalRuntime for ApiRuntime {
    fn login(&mut self, email: &str, password: &str) -> Result<SessionContext> {
        self.client.login(email, password)
    }

    fn logout(&mut self) -> Result<()> {
        self.store.clear_session()
    }

    fn restore_session(&mut self) -> Result<Option<SessionContext>> {
        match self.store.load_session() {
            Ok(session) => Ok(session),
            Err(error) => {
                // A saved session that no longer decodes must not wedge
                // every startup; drop it and report once.
                let _ = self.store.clear_session();
                Err(error)
            }
        }
    }

    fn fetch_dataset(&mut self, screen: ScreenKind, token: &str) -> Result<ScreenData> {
        fetch_screen(&self.client, screen, token)
    }

    fn fetch_counts(&mut self, token: &str) -> Result<PortalCounts> {
        self.client.fetch_counts(token)
    }

    fn run_row_action(&mut self, record_id: i64, patch: RowPatch, token: &str) -> Result<()> {
        run_action(&self.client, record_id, patch, token)
    }

    fn save_session(&mut self, session: &SessionContext) -> Result<()> {
        self.store.save_session(session)
    }

    fn save_page(&mut self, screen: ScreenKind, page: usize) -> Result<()> {
        self.store.save_page(screen, page)
    }

    fn load_page(&mut self, screen: ScreenKind) -> Result<Option<usize>> {
        self.store.load_page(screen)
    }

    fn save_show_deleted(&mut self, show_deleted: bool) -> Result<()> {
        self.store.save_show_deleted(show_deleted)
    }

    fn save_page_size(&mut self, page_size: usize) -> Result<()> {
        self.store.save_page_size(page_size)
    }

    fn initial_page_size(&mut self) -> usize {
        self.page_size
    }

    fn initial_show_deleted(&mut self) -> bool {
        self.show_deleted
    }

    fn spawn_login(
        &mut self,
        request_id: u64,
        email: &str,
        password: &str,
        internal_tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        let email = email.to_owned();
        let password = password.to_owned();
        thread::spawn(move || {
            let result = client
                .login(&email, &password)
                .map_err(|error| format!("{error:#}"));
            let _ = internal_tx.send(InternalEvent::LoginFinished { request_id, result });
        });
        Ok(())
    }

    fn spawn_fetch(
        &mut self,
        screen: ScreenKind,
        request_id: u64,
        token: &str,
        internal_tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        let token = token.to_owned();
        thread::spawn(move || {
            let result =
                fetch_screen(&client, screen, &token).map_err(|error| format!("{error:#}"));
            let _ = internal_tx.send(InternalEvent::DatasetLoaded {
                screen,
                request_id,
                result,
            });
        });
        Ok(())
    }

    fn spawn_counts(&mut self, token: &str, internal_tx: Sender<InternalEvent>) -> Result<()> {
        let client = self.client.clone();
        let token = token.to_owned();
        thread::spawn(move || {
            let result = client
                .fetch_counts(&token)
                .map_err(|error| format!("{error:#}"));
            let _ = internal_tx.send(InternalEvent::CountsLoaded { result });
        });
        Ok(())
    }

    fn spawn_row_action(
        &mut self,
        record_id: i64,
        patch: RowPatch,
        token: &str,
        internal_tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        let token = token.to_owned();
        thread::spawn(move || {
            let result =
                run_action(&client, record_id, patch, &token).map_err(|error| format!("{error:#}"));
            let _ = internal_tx.send(InternalEvent::ActionFinished {
                record_id,
                patch,
                result,
            });
        });
        Ok(())
    }
}

/// Demo runtime: a seeded fake portal that lives entirely in memory.
/// Any credentials sign in as an admin, and row actions mutate the
/// local dataset so the optimistic patches line up with refetches.
/// It keeps the default inline `spawn_*` implementations, so demo mode
/// never races.
pub struct DemoRuntime {
    store: Store,
    session: SessionContext,
    users: Vec<UserRecord>,
    offers: Vec<OfferRecord>,
    verifications: Vec<VerificationRecord>,
    page_size: usize,
    show_deleted: bool,
}

impl DemoRuntime {
    pub fn new(store: Store, page_size: usize, show_deleted: bool) -> Self {
        let mut faker = PortalFaker::new(DEMO_SEED);
        let session = faker.session(Role::Admin);
        let users = faker.users(25);
        let offers = faker.offers(18);
        let verifications = faker.verifications(9);
        Self {
            store,
            session,
            users,
            offers,
            verifications,
            page_size,
            show_deleted,
        }
    }
}

fn patch_record<R: ListRecord>(
    rows: &mut [R],
    record_id: i64,
    apply: impl FnOnce(&mut R),
) -> Result<()> {
    match rows.iter_mut().find(|row| row.record_id() == record_id) {
        Some(row) => {
            apply(row);
            Ok(())
        }
        None => bail!("record {record_id} not found"),
    }
}

impl PortalRuntime for DemoRuntime {
    fn login(&mut self, _email: &str, _password: &str) -> Result<SessionContext> {
        Ok(self.session.clone())
    }

    fn logout(&mut self) -> Result<()> {
        self.store.clear_session()
    }

    fn restore_session(&mut self) -> Result<Option<SessionContext>> {
        self.store.load_session()
    }

    fn fetch_dataset(&mut self, screen: ScreenKind, _token: &str) -> Result<ScreenData> {
        match screen {
            ScreenKind::Users => Ok(ScreenData::Users(self.users.clone())),
            ScreenKind::Offers => Ok(ScreenData::Offers(self.offers.clone())),
            ScreenKind::Verifications => {
                Ok(ScreenData::Verifications(self.verifications.clone()))
            }
            ScreenKind::Dashboard | ScreenKind::Profile => {
                bail!("screen {} has no record list", screen.as_str())
            }
        }
    }

    fn fetch_counts(&mut self, _token: &str) -> Result<PortalCounts> {
        Ok(counts_for(&self.users, &self.offers, &self.verifications))
    }

    fn run_row_action(&mut self, record_id: i64, patch: RowPatch, _token: &str) -> Result<()> {
        match patch {
            RowPatch::UserStatus(status) => {
                patch_record(&mut self.users, record_id, |user| user.status = status)
            }
            RowPatch::UserDeleted => {
                patch_record(&mut self.users, record_id, |user| user.deleted = true)
            }
            RowPatch::OfferStatus(status) => {
                patch_record(&mut self.offers, record_id, |offer| offer.status = status)
            }
            RowPatch::VerificationStatus(status) => {
                patch_record(&mut self.verifications, record_id, |verification| {
                    verification.status = status
                })
            }
        }
    }

    fn save_session(&mut self, session: &SessionContext) -> Result<()> {
        self.store.save_session(session)
    }

    fn save_page(&mut self, screen: ScreenKind, page: usize) -> Result<()> {
        self.store.save_page(screen, page)
    }

    fn load_page(&mut self, screen: ScreenKind) -> Result<Option<usize>> {
        self.store.load_page(screen)
    }

    fn save_show_deleted(&mut self, show_deleted: bool) -> Result<()> {
        self.store.save_show_deleted(show_deleted)
    }

    fn save_page_size(&mut self, page_size: usize) -> Result<()> {
        self.store.save_page_size(page_size)
    }

    fn initial_page_size(&mut self) -> usize {
        self.page_size
    }

    fn initial_show_deleted(&mut self) -> bool {
        self.show_deleted
    }
}
