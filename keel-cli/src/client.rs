//! Blocking HTTP implementation of [`RemoteRegistry`] on top of `ureq`.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use keel_core::records::{TestBlock, TestDefinition};
use keel_core::{Platform, RemoteId};
use keel_sync::remote::{
    PushReceipt, RemoteApp, RemoteTest, RemoteTestSummary, RemoteWorkflowSummary,
};
use keel_sync::{RemoteError, RemoteRegistry};

use crate::config::RegistryConfig;

const TEST_PAGE: usize = 100;
const APP_PAGE: usize = 100;
const MAX_ERROR_BODY: usize = 200;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SimpleTest {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    platform: String,
}

#[derive(Deserialize)]
struct TestListPage {
    #[serde(default)]
    tests: Vec<SimpleTest>,
    #[serde(default)]
    count: usize,
}

#[derive(Deserialize)]
struct SimpleWorkflow {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct WorkflowList {
    #[serde(default)]
    workflows: Vec<SimpleWorkflow>,
}

#[derive(Deserialize)]
struct TestBody {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    platform: String,
    #[serde(default)]
    tasks: Value,
    #[serde(default)]
    version: u64,
    #[serde(default)]
    build_var_id: Option<String>,
    #[serde(default)]
    pinned_version: Option<String>,
}

#[derive(Serialize)]
struct UpdateTestBody<'a> {
    tasks: &'a [TestBlock],
    expected_version: u64,
}

#[derive(Deserialize)]
struct UpdateTestReply {
    version: u64,
}

#[derive(Deserialize)]
struct BuildVar {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    platform: String,
}

#[derive(Deserialize)]
struct BuildVarPage {
    #[serde(default)]
    items: Vec<BuildVar>,
    #[serde(default)]
    has_next: bool,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    detail: Value,
}

impl From<BuildVar> for RemoteApp {
    fn from(var: BuildVar) -> Self {
        RemoteApp {
            id: RemoteId::from(var.id),
            name: var.name,
            platform: var.platform,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct HttpRegistry {
    agent: ureq::Agent,
    base_url: String,
    auth: String,
}

impl HttpRegistry {
    pub fn new(config: &RegistryConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("keel/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: config.api_url.clone(),
            auth: format!("Bearer {}", config.api_key),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, RemoteError> {
        let mut request = self
            .agent
            .get(&self.url(path))
            .set("Authorization", &self.auth)
            .set("Content-Type", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }
        debug!(path, "GET");
        decode(request.call())
    }

    fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, RemoteError> {
        let request = self
            .agent
            .put(&self.url(path))
            .set("Authorization", &self.auth)
            .set("Content-Type", "application/json");
        debug!(path, "PUT");
        decode(request.send_json(body))
    }
}

impl RemoteRegistry for HttpRegistry {
    fn list_tests(&self) -> Result<Vec<RemoteTestSummary>, RemoteError> {
        let mut tests = Vec::new();
        loop {
            let page: TestListPage = self.get(
                "/api/v1/tests/get_simple_tests",
                &[("limit", TEST_PAGE.to_string()), ("offset", tests.len().to_string())],
            )?;
            let fetched = page.tests.len();
            tests.extend(page.tests.into_iter().map(|t| RemoteTestSummary {
                id: RemoteId::from(t.id),
                name: t.name,
                platform: t.platform,
            }));
            if fetched == 0 || fetched < TEST_PAGE || tests.len() >= page.count {
                return Ok(tests);
            }
        }
    }

    fn list_workflows(&self) -> Result<Vec<RemoteWorkflowSummary>, RemoteError> {
        let list: WorkflowList = self.get("/api/v1/workflows/get_simple_workflows", &[])?;
        Ok(list
            .workflows
            .into_iter()
            .map(|w| RemoteWorkflowSummary {
                id: RemoteId::from(w.id),
                name: w.name,
            })
            .collect())
    }

    fn get_test(&self, id: &RemoteId) -> Result<RemoteTest, RemoteError> {
        let body: TestBody = self.get(&format!("/api/v1/tests/get_test_by_id/{id}"), &[])?;
        let blocks = blocks_from_tasks(body.tasks)?;

        // Build name is cosmetic; a failed lookup leaves it unset.
        let build_name = body
            .build_var_id
            .filter(|var| !var.trim().is_empty())
            .and_then(|var| self.get_app(&RemoteId::from(var)).ok())
            .map(|app| app.name);

        Ok(RemoteTest {
            id: RemoteId::from(body.id),
            name: body.name,
            platform: body.platform,
            version: body.version,
            blocks,
            build_name,
            pinned_version: body.pinned_version.filter(|v| !v.trim().is_empty()),
        })
    }

    fn push_test(
        &self,
        id: &RemoteId,
        test: &TestDefinition,
        expected_version: u64,
    ) -> Result<PushReceipt, RemoteError> {
        let reply: UpdateTestReply = self.put(
            &format!("/api/v1/tests/update/{id}"),
            &UpdateTestBody {
                tasks: &test.blocks,
                expected_version,
            },
        )?;
        Ok(PushReceipt {
            version: reply.version,
        })
    }

    fn get_app(&self, id: &RemoteId) -> Result<RemoteApp, RemoteError> {
        let var: BuildVar = self.get(&format!("/api/v1/builds/vars/{id}"), &[])?;
        Ok(var.into())
    }

    fn list_apps(&self, platform: Option<Platform>) -> Result<Vec<RemoteApp>, RemoteError> {
        let mut apps = Vec::new();
        for page in 1.. {
            let mut query = vec![("page", page.to_string()), ("page_size", APP_PAGE.to_string())];
            if let Some(platform) = platform {
                query.push(("platform", platform.as_str().to_string()));
            }
            let page: BuildVarPage = self.get("/api/v1/builds/vars", &query)?;
            apps.extend(page.items.into_iter().map(RemoteApp::from));
            if !page.has_next {
                break;
            }
        }
        Ok(apps)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn decode<T: DeserializeOwned>(result: Result<ureq::Response, ureq::Error>) -> Result<T, RemoteError> {
    match result {
        Ok(response) => response
            .into_json::<T>()
            .map_err(|e| RemoteError::Decode(e.to_string())),
        Err(ureq::Error::Status(code, response)) => {
            let body = response.into_string().unwrap_or_default();
            Err(RemoteError::from_status(code, error_message(&body)))
        }
        Err(ureq::Error::Transport(transport)) => Err(RemoteError::Transport(transport.to_string())),
    }
}

/// Best human-readable message from an error body: `error`, then `message`,
/// then `detail`, then the raw body truncated.
fn error_message(body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let detail = match parsed.detail {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    };
    [parsed.error, parsed.message, detail]
        .into_iter()
        .find(|s| !s.trim().is_empty())
        .unwrap_or_else(|| truncate(body.trim(), MAX_ERROR_BODY))
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Registry `tasks` are either a bare block list or an object with `blocks`.
fn blocks_from_tasks(tasks: Value) -> Result<Vec<TestBlock>, RemoteError> {
    let list = match tasks {
        Value::Null => return Ok(Vec::new()),
        Value::Object(mut map) => map.remove("blocks").unwrap_or(Value::Array(Vec::new())),
        other => other,
    };
    serde_json::from_value(list).map_err(|e| RemoteError::Decode(format!("test tasks: {e}")))
}
