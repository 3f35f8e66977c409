use std::fmt;

use log::{debug, info};
use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    client::TunesClient,
    error::{RemoteError, Result, TunesError},
    util::{bool_at, encode_segment, set_at, string_at},
};

/// Which family of beta testers a record belongs to. Each kind talks to its own
/// set of iTunes Connect endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TesterKind {
    Internal,
    External,
}

/// Endpoint paths for one tester kind, relative to the iTunes Connect base URL.
/// `{app_id}` in the app-scoped entries is substituted per call.
#[derive(Debug, Clone, Copy)]
pub struct Endpoints {
    pub index: &'static str,
    pub index_by_app: &'static str,
    pub create: Option<&'static str>,
    pub delete: Option<&'static str>,
    pub update_by_app: &'static str,
}

const EXTERNAL: Endpoints = Endpoints {
    index: "ra/users/pre/ext",
    index_by_app: "ra/user/externalTesters/{app_id}/",
    create: Some("ra/users/pre/create"),
    delete: Some("ra/users/pre/ext/delete"),
    update_by_app: "ra/user/externalTesters/{app_id}/",
};

const INTERNAL: Endpoints = Endpoints {
    index: "ra/users/pre/int",
    index_by_app: "ra/user/internalTesters/{app_id}/",
    create: None,
    delete: None,
    update_by_app: "ra/user/internalTesters/{app_id}/",
};

impl Endpoints {
    pub fn index_by_app(&self, app_id: &str) -> String {
        self.index_by_app.replace("{app_id}", &encode_segment(app_id))
    }

    pub fn update_by_app(&self, app_id: &str) -> String {
        self.update_by_app.replace("{app_id}", &encode_segment(app_id))
    }
}

impl TesterKind {
    pub fn endpoints(self) -> &'static Endpoints {
        match self {
            TesterKind::External => &EXTERNAL,
            TesterKind::Internal => &INTERNAL,
        }
    }

    /// Looks up an optional endpoint, failing before any request is made when
    /// this kind does not offer the operation.
    pub fn require(self, operation: TesterOperation) -> Result<&'static str> {
        let endpoints = self.endpoints();
        let path = match operation {
            TesterOperation::Create => endpoints.create,
            TesterOperation::Delete => endpoints.delete,
        };
        path.ok_or(TunesError::UnsupportedOperation {
            kind: self,
            operation,
        })
    }
}

impl fmt::Display for TesterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TesterKind::Internal => f.write_str("internal"),
            TesterKind::External => f.write_str("external"),
        }
    }
}

/// Operations whose endpoint is optional per [`TesterKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TesterOperation {
    Create,
    Delete,
}

impl fmt::Display for TesterOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TesterOperation::Create => f.write_str("create"),
            TesterOperation::Delete => f.write_str("delete"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TesterField {
    TesterId,
    Email,
    FirstName,
    LastName,
    Testing,
    LatestBuild,
}

/// Wire path of every tester attribute. Used both to read server records and to
/// build request bodies, so the two cannot disagree.
pub const ATTR_MAPPING: &[(&str, TesterField)] = &[
    ("testerId", TesterField::TesterId),
    ("emailAddress.value", TesterField::Email),
    ("firstName.value", TesterField::FirstName),
    ("lastName.value", TesterField::LastName),
    ("testing.value", TesterField::Testing),
    ("latestBuild", TesterField::LatestBuild),
];

/// Local projection of a beta tester record held by iTunes Connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tester {
    pub kind: TesterKind,
    /// Assigned by iTunes Connect; `None` until the tester has been created.
    pub tester_id: Option<String>,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub testing: bool,
    /// e.g. `0.2.9 (37)`. Only present in app-scoped listings.
    pub latest_build: Option<String>,
}

impl Tester {
    pub fn new(kind: TesterKind, email: impl Into<String>) -> Self {
        Self {
            kind,
            tester_id: None,
            email: email.into(),
            first_name: None,
            last_name: None,
            testing: false,
            latest_build: None,
        }
    }

    pub fn with_name(mut self, first_name: Option<String>, last_name: Option<String>) -> Self {
        self.first_name = first_name;
        self.last_name = last_name;
        self
    }

    /// Builds a tester from a raw server record using [`ATTR_MAPPING`].
    pub fn from_record(kind: TesterKind, record: &Value) -> Result<Self, RemoteError> {
        let mut tester = Tester::new(kind, String::new());
        let mut has_email = false;
        for &(path, field) in ATTR_MAPPING {
            match field {
                TesterField::TesterId => tester.tester_id = string_at(record, path),
                TesterField::Email => {
                    if let Some(email) = string_at(record, path) {
                        tester.email = email;
                        has_email = true;
                    }
                }
                TesterField::FirstName => tester.first_name = string_at(record, path),
                TesterField::LastName => tester.last_name = string_at(record, path),
                TesterField::Testing => tester.testing = bool_at(record, path).unwrap_or(false),
                TesterField::LatestBuild => tester.latest_build = string_at(record, path),
            }
        }
        if !has_email {
            return Err(RemoteError::Malformed(format!(
                "tester record without emailAddress.value: {}",
                record
            )));
        }
        Ok(tester)
    }

    /// Inverse of [`Tester::from_record`]. Absent optional fields are left out,
    /// except names which the service expects as empty strings.
    pub fn to_record(&self) -> Value {
        let mut record = json!({});
        for &(path, field) in ATTR_MAPPING {
            let value = match field {
                TesterField::TesterId => self.tester_id.clone().map(Value::String),
                TesterField::Email => Some(Value::String(self.email.clone())),
                TesterField::FirstName => {
                    Some(Value::String(self.first_name.clone().unwrap_or_default()))
                }
                TesterField::LastName => {
                    Some(Value::String(self.last_name.clone().unwrap_or_default()))
                }
                TesterField::Testing => Some(Value::Bool(self.testing)),
                TesterField::LatestBuild => self.latest_build.clone().map(Value::String),
            };
            if let Some(value) = value {
                set_at(&mut record, path, value);
            }
        }
        record
    }

    /// Matches on tester id or email, whichever the caller has.
    pub fn matches(&self, identifier: &str) -> bool {
        self.tester_id.as_deref() == Some(identifier) || self.email == identifier
    }

    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }
}

impl fmt::Display for Tester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}",
            self.tester_id.as_deref().unwrap_or("-"),
            self.email,
            self.display_name()
        )?;
        if let Some(build) = &self.latest_build {
            write!(f, "\t{}", build)?;
        }
        Ok(())
    }
}

/// Beta tester operations against iTunes Connect.
pub struct TesterRegistry<'a, C: TunesClient> {
    client: &'a C,
}

impl<'a, C: TunesClient> TesterRegistry<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    pub async fn list(&self, kind: TesterKind) -> Result<Vec<Tester>> {
        let records = self.client.testers(kind.endpoints().index).await?;
        debug!("loaded {} {} testers", records.len(), kind);
        Self::materialize(kind, &records)
    }

    /// First tester in list order whose id or email equals `identifier`.
    pub async fn find(&self, kind: TesterKind, identifier: &str) -> Result<Option<Tester>> {
        let testers = self.list(kind).await?;
        Ok(testers.into_iter().find(|t| t.matches(identifier)))
    }

    pub async fn list_by_app(&self, kind: TesterKind, app_id: &str) -> Result<Vec<Tester>> {
        let path = kind.endpoints().index_by_app(app_id);
        let records = self.client.testers_by_app(&path).await?;
        debug!("loaded {} {} testers for app {}", records.len(), kind, app_id);
        Self::materialize(kind, &records)
    }

    pub async fn find_by_app(
        &self,
        kind: TesterKind,
        app_id: &str,
        identifier: &str,
    ) -> Result<Option<Tester>> {
        let testers = self.list_by_app(kind, app_id).await?;
        Ok(testers.into_iter().find(|t| t.matches(identifier)))
    }

    pub async fn create(
        &self,
        kind: TesterKind,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<Tester> {
        let path = kind.require(TesterOperation::Create)?;
        let draft = Tester::new(kind, email)
            .with_name(first_name.map(str::to_string), last_name.map(str::to_string));
        let record = self.client.create_tester(path, &draft).await?;
        let created = Tester::from_record(kind, &record)?;
        info!(
            "created {} tester {} ({})",
            kind,
            created.email,
            created.tester_id.as_deref().unwrap_or("no id")
        );
        Ok(created)
    }

    /// Removes the tester remotely. The passed value is stale afterwards.
    pub async fn delete(&self, tester: &Tester) -> Result<()> {
        let path = tester.kind.require(TesterOperation::Delete)?;
        self.client.delete_tester(path, tester).await?;
        info!("deleted {} tester {}", tester.kind, tester.email);
        Ok(())
    }

    pub async fn add_to_app(&self, tester: &Tester, app_id: &str) -> Result<()> {
        let path = tester.kind.endpoints().update_by_app(app_id);
        self.client.add_tester_to_app(&path, tester).await?;
        debug!("added {} to app {}", tester.email, app_id);
        Ok(())
    }

    pub async fn remove_from_app(&self, tester: &Tester, app_id: &str) -> Result<()> {
        let path = tester.kind.endpoints().update_by_app(app_id);
        self.client.remove_tester_from_app(&path, tester).await?;
        debug!("removed {} from app {}", tester.email, app_id);
        Ok(())
    }

    /// Adds every tester of `kind` to the app, one request per tester. Stops at the
    /// first failure; testers already added stay added.
    // TODO: send a single `users` body with every tester once the batch form is confirmed.
    pub async fn add_all_to_app(&self, kind: TesterKind, app_id: &str) -> Result<usize> {
        let testers = self.list(kind).await?;
        for tester in &testers {
            self.add_to_app(tester, app_id).await?;
        }
        info!("added {} {} testers to app {}", testers.len(), kind, app_id);
        Ok(testers.len())
    }

    fn materialize(kind: TesterKind, records: &[Value]) -> Result<Vec<Tester>> {
        records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                Tester::from_record(kind, r).map_err(|e| match e {
                    RemoteError::Malformed(msg) => {
                        TunesError::from(RemoteError::Malformed(format!("record {}: {}", i, msg)))
                    }
                    other => TunesError::from(other),
                })
            })
            .collect()
    }
}
