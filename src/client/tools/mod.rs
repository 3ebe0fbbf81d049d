//! Recipe tools: recipe finder, cravings solver, recipe makeover.
//!
//! Each panel turns user input into a fixed prompt, sends it through the
//! relay under the `tools` tag, and parses the model's JSON reply into typed
//! cards. Failures end up as an inline error message on the panel.

pub mod parse;
pub mod relay_client;

pub use parse::{first_candidate_text, parse_fenced_json, strip_fences};
pub use relay_client::{PromptRelay, RelayClient};

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::bootstrap::Readiness;
use crate::error::{BootstrapError, ToolError};
use crate::relay::{RelayRequest, TaskType};

// ── Cards ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Makeover {
    #[serde(default)]
    pub estimated_savings: Option<String>,
    pub swaps: Vec<Swap>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swap {
    pub original: String,
    pub swap: String,
    #[serde(default)]
    pub notes: String,
}

// ── Tool kinds ──────────────────────────────────────────────────────────

/// What distinguishes one panel from another.
pub trait ToolKind: Send + Sync + 'static {
    type Output: DeserializeOwned + Clone + Send + Sync;

    /// Shown when the reply has no candidates.
    const NO_CONTENT: &'static str;
    /// Shown when the JSON parses but has the wrong shape.
    const INVALID_FORMAT: &'static str;

    fn prompt(input: &str) -> String;
}

pub struct RecipeFinder;

impl ToolKind for RecipeFinder {
    type Output = Vec<Recipe>;
    const NO_CONTENT: &'static str =
        "No recipes were generated. Please try again with ingredients separated by commas.";
    const INVALID_FORMAT: &'static str = "Received invalid recipe format.";

    fn prompt(input: &str) -> String {
        format!(
            "Find 2 simple indian homemade recipes using: {input}. Respond with a valid JSON array. \
             Each object must have \"title\", \"ingredients\" (array of strings), and \"instructions\" \
             (array of strings). The response must be only the JSON array."
        )
    }
}

pub struct CravingSolver;

impl ToolKind for CravingSolver {
    type Output = Vec<Alternative>;
    const NO_CONTENT: &'static str = "No content was found.";
    const INVALID_FORMAT: &'static str = "Received invalid alternatives format.";

    fn prompt(input: &str) -> String {
        format!(
            "I'm craving {input}. Suggest 2 healthy indian alternatives. Respond with a valid JSON array. \
             Each object must have \"name\" and \"description\" (a brief, one-sentence explanation). \
             The response must be only the JSON array."
        )
    }
}

pub struct RecipeMakeover;

impl ToolKind for RecipeMakeover {
    type Output = Makeover;
    const NO_CONTENT: &'static str = "No makeover suggestions were generated.";
    const INVALID_FORMAT: &'static str = "Received an invalid format for the makeover.";

    fn prompt(input: &str) -> String {
        format!(
            "Analyze this recipe: \"{input}\". Suggest 2-3 indian healthier swaps. Respond with a valid \
             JSON object with two keys: \"estimated_savings\" (a string like \"You could save up to 150 \
             calories and 10g of fat.\") and \"swaps\" (an array of objects, where each object has \
             \"original\", \"swap\", and \"notes\"). The response must be only the JSON object."
        )
    }
}

// ── Panel ───────────────────────────────────────────────────────────────

/// What a panel currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelView<T> {
    Idle,
    Loading,
    Ready(T),
    Error(String),
}

/// One tool panel. The busy flag stands in for the disabled submit button.
pub struct ToolPanel<K: ToolKind> {
    relay: Arc<dyn PromptRelay>,
    view: RwLock<PanelView<K::Output>>,
    busy: AtomicBool,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ToolKind> ToolPanel<K> {
    pub fn new(relay: Arc<dyn PromptRelay>) -> Self {
        Self {
            relay,
            view: RwLock::new(PanelView::Idle),
            busy: AtomicBool::new(false),
            _kind: PhantomData,
        }
    }

    pub async fn view(&self) -> PanelView<K::Output> {
        self.view.read().await.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Submit user input. Blank input is ignored (`None`); a submit while
    /// another is in flight is rejected with [`ToolError::Busy`].
    pub async fn submit(&self, input: &str) -> Option<Result<K::Output, ToolError>> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if self.busy.swap(true, Ordering::SeqCst) {
            debug!("Tool panel busy, ignoring submit");
            return Some(Err(ToolError::Busy));
        }
        let _busy = BusyGuard(&self.busy);

        *self.view.write().await = PanelView::Loading;
        let result = self.run(input).await;
        *self.view.write().await = match &result {
            Ok(output) => PanelView::Ready(output.clone()),
            Err(e) => PanelView::Error(e.to_string()),
        };
        Some(result)
    }

    pub async fn clear(&self) {
        *self.view.write().await = PanelView::Idle;
    }

    async fn run(&self, input: &str) -> Result<K::Output, ToolError> {
        let request = RelayRequest::text(K::prompt(input), TaskType::Tools);
        let response = self.relay.send(&request).await?;
        parse_reply::<K>(&response)
    }
}

/// Clears a panel's busy flag on drop, so a cancelled submit releases it too.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Turn a relay response into the tool's cards.
pub fn parse_reply<K: ToolKind>(response: &serde_json::Value) -> Result<K::Output, ToolError> {
    let text = first_candidate_text(response)
        .ok_or(ToolError::NoContent(K::NO_CONTENT))?
        .ok_or(ToolError::ResponseParse)?;
    let value = parse_fenced_json(text)?;
    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "Model reply has the wrong shape");
        ToolError::InvalidFormat(K::INVALID_FORMAT)
    })
}

/// The three panels of the tools page.
pub struct ToolPanels {
    pub recipes: ToolPanel<RecipeFinder>,
    pub cravings: ToolPanel<CravingSolver>,
    pub makeover: ToolPanel<RecipeMakeover>,
}

impl ToolPanels {
    pub fn new(relay: Arc<dyn PromptRelay>) -> Self {
        Self {
            recipes: ToolPanel::new(Arc::clone(&relay)),
            cravings: ToolPanel::new(Arc::clone(&relay)),
            makeover: ToolPanel::new(relay),
        }
    }

    /// Build the panels only after the client is ready.
    pub async fn after_ready(
        readiness: &mut Readiness,
        relay: Arc<dyn PromptRelay>,
    ) -> Result<Self, BootstrapError> {
        readiness.wait().await?;
        Ok(Self::new(relay))
    }
}
