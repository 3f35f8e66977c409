#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Value, json};
use tunes::{RemoteError, Tester, TunesClient};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    AppList {
        apps: Vec<String>,
        measures: Vec<String>,
        start: NaiveDate,
        end: NaiveDate,
    },
    TimeSeries {
        apps: Vec<String>,
        measures: Vec<String>,
        start: NaiveDate,
        end: NaiveDate,
    },
    AllTime {
        apps: Vec<String>,
        measures: Vec<String>,
    },
    Reviews {
        app: String,
        country: String,
    },
    Testers(String),
    TestersByApp(String),
    Create {
        endpoint: String,
        email: String,
        first_name: Option<String>,
        last_name: Option<String>,
    },
    Delete {
        endpoint: String,
        email: String,
    },
    AddToApp {
        endpoint: String,
        email: String,
    },
    RemoveFromApp {
        endpoint: String,
        email: String,
    },
}

/// In-memory collaborator that records every call and answers from canned data.
#[derive(Default)]
pub struct RecordingClient {
    pub calls: Mutex<Vec<Call>>,
    pub testers: Vec<Value>,
    pub testers_by_app: Vec<Value>,
    /// Zero-based index of the add-to-app call that should fail.
    pub fail_add_at: Option<usize>,
}

impl RecordingClient {
    pub fn with_testers(testers: Vec<Value>) -> Self {
        Self {
            testers,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }
}

pub fn record(id: &str, email: &str) -> Value {
    json!({
        "testerId": id,
        "emailAddress": {"value": email},
        "firstName": {"value": "First"},
        "lastName": {"value": "Last"},
        "testing": {"value": true},
    })
}

#[async_trait]
impl TunesClient for RecordingClient {
    async fn analytics_app_list(
        &self,
        app_ids: &[String],
        measures: &[&str],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Value, RemoteError> {
        self.record(Call::AppList {
            apps: app_ids.to_vec(),
            measures: Self::owned(measures),
            start,
            end,
        });
        Ok(json!({"kind": "app-list"}))
    }

    async fn analytics_time_series(
        &self,
        app_ids: &[String],
        measures: &[&str],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Value, RemoteError> {
        self.record(Call::TimeSeries {
            apps: app_ids.to_vec(),
            measures: Self::owned(measures),
            start,
            end,
        });
        Ok(json!({"kind": "time-series"}))
    }

    async fn analytics_all_time(
        &self,
        app_ids: &[String],
        measures: &[&str],
    ) -> Result<Value, RemoteError> {
        self.record(Call::AllTime {
            apps: app_ids.to_vec(),
            measures: Self::owned(measures),
        });
        Ok(json!({"kind": "all-time"}))
    }

    async fn reviews(&self, app_id: &str, country_code: &str) -> Result<Value, RemoteError> {
        self.record(Call::Reviews {
            app: app_id.to_string(),
            country: country_code.to_string(),
        });
        if app_id == "broken" {
            return Err(RemoteError::Service(vec!["app not found".into()]));
        }
        Ok(json!([{"title": "Great"}]))
    }

    async fn testers(&self, endpoint: &str) -> Result<Vec<Value>, RemoteError> {
        self.record(Call::Testers(endpoint.to_string()));
        Ok(self.testers.clone())
    }

    async fn testers_by_app(&self, endpoint: &str) -> Result<Vec<Value>, RemoteError> {
        self.record(Call::TestersByApp(endpoint.to_string()));
        Ok(self.testers_by_app.clone())
    }

    async fn create_tester(&self, endpoint: &str, tester: &Tester) -> Result<Value, RemoteError> {
        self.record(Call::Create {
            endpoint: endpoint.to_string(),
            email: tester.email.clone(),
            first_name: tester.first_name.clone(),
            last_name: tester.last_name.clone(),
        });
        let mut echoed = tester.to_record();
        echoed["testerId"] = json!("new-id");
        Ok(echoed)
    }

    async fn delete_tester(&self, endpoint: &str, tester: &Tester) -> Result<(), RemoteError> {
        self.record(Call::Delete {
            endpoint: endpoint.to_string(),
            email: tester.email.clone(),
        });
        Ok(())
    }

    async fn add_tester_to_app(&self, endpoint: &str, tester: &Tester) -> Result<(), RemoteError> {
        let index = self
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::AddToApp { .. }))
            .count();
        self.record(Call::AddToApp {
            endpoint: endpoint.to_string(),
            email: tester.email.clone(),
        });
        if self.fail_add_at == Some(index) {
            return Err(RemoteError::Malformed("add failed".into()));
        }
        Ok(())
    }

    async fn remove_tester_from_app(
        &self,
        endpoint: &str,
        tester: &Tester,
    ) -> Result<(), RemoteError> {
        self.record(Call::RemoveFromApp {
            endpoint: endpoint.to_string(),
            email: tester.email.clone(),
        });
        Ok(())
    }
}
