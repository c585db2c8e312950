//! Reservation request supplied at startup.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::lock::DEFAULT_LOCK_FILE;
use crate::portal::DEFAULT_PORTAL_NAME;
use crate::slot::{SlotPredicate, SlotWindow};

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub city: String,
    /// Service category, e.g. `USG`.
    pub service_type: String,
    pub service: String,
}

/// Everything one booking run needs. Never mutated after construction.
#[derive(Clone)]
pub struct ReservationRequest {
    pub credentials: Credentials,
    pub search: SearchCriteria,
    pub predicate: Arc<dyn SlotPredicate>,
    pub email_from: String,
    pub email_to: Vec<String>,
    pub lock_path: PathBuf,
    /// Stop short of the final confirm click.
    pub dry_run: bool,
    pub headless: bool,
    /// Portal name used in email subjects and the lock file header.
    pub portal_name: String,
}

impl ReservationRequest {
    pub fn new(credentials: Credentials, search: SearchCriteria, email_to: Vec<String>) -> Self {
        Self {
            credentials,
            search,
            predicate: Arc::new(SlotWindow::default()),
            email_from: "visitbot@localhost".to_string(),
            email_to,
            lock_path: PathBuf::from(DEFAULT_LOCK_FILE),
            dry_run: false,
            headless: true,
            portal_name: DEFAULT_PORTAL_NAME.to_string(),
        }
    }

    pub fn found_subject(&self) -> String {
        format!("Free slot at {}!", self.portal_name)
    }

    pub fn booked_subject(&self) -> String {
        format!("Slot booked at {}!", self.portal_name)
    }

    pub fn lock_header(&self) -> String {
        format!("Booked in {}!", self.portal_name)
    }
}

impl fmt::Debug for ReservationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReservationRequest")
            .field("credentials", &self.credentials)
            .field("search", &self.search)
            .field("email_from", &self.email_from)
            .field("email_to", &self.email_to)
            .field("lock_path", &self.lock_path)
            .field("dry_run", &self.dry_run)
            .field("headless", &self.headless)
            .field("portal_name", &self.portal_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_password() {
        let request = ReservationRequest::new(
            Credentials::new("alice", "hunter2"),
            SearchCriteria {
                city: "Kraków".to_string(),
                service_type: "USG".to_string(),
                service: "USG 2 stawów kolanowych".to_string(),
            },
            vec!["ops@example.com".to_string()],
        );

        let rendered = format!("{:?}", request);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
        assert_eq!(request.lock_path, PathBuf::from("visit.txt"));
        assert_eq!(request.booked_subject(), "Slot booked at enel-med!");
        assert_eq!(request.lock_header(), "Booked in enel-med!");
    }
}
