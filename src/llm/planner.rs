use crate::categories::normalize_name;
use crate::error::{FinancePlannerError, Result};
use crate::llm::client::ChatClient;
use crate::llm::extract::extract_typed;
use crate::llm::prompts::{plan_command_user_prompt, SYSTEM_PROMPT_PLAN_COMMAND};
use crate::llm::types::ChatMessage;
use crate::planning::{PlanItem, Priority, TaskStatus};
use crate::store::{AuditEntry, RecordStore};
use chrono::{NaiveDate, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const PLAN_COMMAND_OPERATION: &str = "interpret_plan_command";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlanCommand {
    Add {
        title: String,
        #[serde(default)]
        date: Option<NaiveDate>,
        #[serde(default)]
        priority: Priority,
        #[serde(default)]
        estimated_minutes: Option<u32>,
    },
    Complete {
        title: String,
    },
    Move {
        title: String,
        to: NaiveDate,
    },
    Delete {
        title: String,
    },
    Unknown {
        #[serde(default)]
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlanOutcome {
    Added { item: PlanItem },
    Updated { item: PlanItem },
    Deleted { id: String, title: String },
}

/// Turns Turkish free-text planning commands into [`PlanCommand`]s.
pub struct PlanCommandInterpreter {
    client: ChatClient,
}

impl PlanCommandInterpreter {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }

    /// Unusable model output is written to the audit log and reported as
    /// [`FinancePlannerError::CommandNotUnderstood`].
    pub async fn interpret(
        &self,
        user_id: &str,
        command: &str,
        today: NaiveDate,
        store: &dyn RecordStore,
    ) -> Result<PlanCommand> {
        let command = command.trim();
        if command.is_empty() {
            return Err(FinancePlannerError::InvalidInput(
                "command is empty".to_string(),
            ));
        }

        let open_titles: Vec<String> = store
            .plan_items(user_id)?
            .into_iter()
            .filter(|i| i.status.is_open())
            .map(|i| i.title)
            .collect();

        let messages = [
            ChatMessage::system(SYSTEM_PROMPT_PLAN_COMMAND),
            ChatMessage::user(plan_command_user_prompt(
                &today.format("%Y-%m-%d").to_string(),
                &open_titles,
                command,
            )),
        ];

        let raw = self.client.complete(&messages).await?;

        let failure = match extract_typed::<PlanCommand>(&raw) {
            Ok(PlanCommand::Unknown { reason }) => reason,
            Ok(parsed) => {
                info!("Interpreted plan command for {}: {:?}", user_id, parsed);
                return Ok(parsed);
            }
            Err(e) => e.to_string(),
        };

        warn!("Plan command not understood: {}", command);
        store.record_audit(AuditEntry {
            user_id: user_id.to_string(),
            operation: PLAN_COMMAND_OPERATION.to_string(),
            input: command.to_string(),
            raw_response: raw,
            error: failure,
            created_at: Utc::now(),
        })?;

        Err(FinancePlannerError::CommandNotUnderstood(command.to_string()))
    }
}

/// Exact normalized title first, then the first open item whose title contains the query.
fn find_item<'a>(items: &'a [PlanItem], title: &str) -> Option<&'a PlanItem> {
    let query = normalize_name(title);
    items
        .iter()
        .find(|i| normalize_name(&i.title) == query)
        .or_else(|| {
            items
                .iter()
                .filter(|i| i.status.is_open())
                .find(|i| normalize_name(&i.title).contains(&query))
        })
}

fn next_item_id(items: &[PlanItem], date: NaiveDate) -> String {
    let prefix = date.format("%Y%m%d");
    let mut n = items.len() + 1;
    loop {
        let id = format!("{}-{}", prefix, n);
        if items.iter().all(|i| i.id != id) {
            return id;
        }
        n += 1;
    }
}

pub fn apply_plan_command(
    store: &dyn RecordStore,
    user_id: &str,
    command: &PlanCommand,
    today: NaiveDate,
) -> Result<PlanOutcome> {
    let items = store.plan_items(user_id)?;
    let target = |title: &str| {
        find_item(&items, title).cloned().ok_or_else(|| {
            FinancePlannerError::InvalidInput(format!("no plan item matches '{}'", title))
        })
    };

    let outcome = match command {
        PlanCommand::Add {
            title,
            date,
            priority,
            estimated_minutes,
        } => {
            let date = date.unwrap_or(today);
            let item = PlanItem {
                priority: *priority,
                estimated_minutes: *estimated_minutes,
                ..PlanItem::new(next_item_id(&items, date), title.trim(), date)
            };
            store.upsert_plan_item(user_id, &item)?;
            PlanOutcome::Added { item }
        }
        PlanCommand::Complete { title } => {
            let item = PlanItem {
                status: TaskStatus::Done,
                ..target(title.as_str())?
            };
            store.upsert_plan_item(user_id, &item)?;
            PlanOutcome::Updated { item }
        }
        PlanCommand::Move { title, to } => {
            let existing = target(title.as_str())?;
            let item = PlanItem {
                date: *to,
                carried_over_from: existing.carried_over_from.or(Some(existing.date)),
                ..existing
            };
            store.upsert_plan_item(user_id, &item)?;
            PlanOutcome::Updated { item }
        }
        PlanCommand::Delete { title } => {
            let item = target(title.as_str())?;
            store.delete_plan_item(user_id, &item.id)?;
            PlanOutcome::Deleted {
                id: item.id,
                title: item.title,
            }
        }
        PlanCommand::Unknown { reason } => {
            return Err(FinancePlannerError::CommandNotUnderstood(reason.clone()))
        }
    };

    Ok(outcome)
}
