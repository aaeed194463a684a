//! On-prem host application control and renaming
//!
//! Every update re-sends the host's display name; the API clears it
//! otherwise.

use crate::client::{B1Client, HostSelector};
use crate::error::B1Error;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

const FLAG_OFF: &str = "0";
const FLAG_ON: &str = "1";

/// BloxOne application running on an on-prem host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppType {
    Dfp,
    Dns,
    Dhcp,
    Cdc,
}

impl AppType {
    /// `application_type` code used by the API
    pub fn code(self) -> &'static str {
        match self {
            AppType::Dfp => "1",
            AppType::Dns => "2",
            AppType::Dhcp => "3",
            AppType::Cdc => "7",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AppType::Dfp => "dfp",
            AppType::Dns => "dns",
            AppType::Dhcp => "dhcp",
            AppType::Cdc => "cdc",
        }
    }
}

impl FromStr for AppType {
    type Err = B1Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dfp" => Ok(AppType::Dfp),
            "dns" => Ok(AppType::Dns),
            "dhcp" => Ok(AppType::Dhcp),
            "cdc" => Ok(AppType::Cdc),
            _ => Err(B1Error::InvalidInput(format!(
                "Unknown application {} (expected cdc, dfp, dhcp or dns)",
                s
            ))),
        }
    }
}

impl fmt::Display for AppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What to do with an application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    Enable,
    Disable,
    Start,
    Stop,
}

impl HostAction {
    /// Past tense, for result messages
    pub fn done(self) -> &'static str {
        match self {
            HostAction::Enable => "enabled",
            HostAction::Disable => "disabled",
            HostAction::Start => "started",
            HostAction::Stop => "stopped",
        }
    }

    /// `(disabled, desired_state)` the host should end up with
    fn target_flags(self) -> (&'static str, &'static str) {
        match self {
            HostAction::Enable => (FLAG_OFF, FLAG_OFF),
            HostAction::Disable => (FLAG_ON, FLAG_OFF),
            HostAction::Start => (FLAG_OFF, FLAG_ON),
            HostAction::Stop => (FLAG_OFF, FLAG_OFF),
        }
    }
}

impl FromStr for HostAction {
    type Err = B1Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enable" => Ok(HostAction::Enable),
            "disable" => Ok(HostAction::Disable),
            "start" => Ok(HostAction::Start),
            "stop" => Ok(HostAction::Stop),
            _ => Err(B1Error::InvalidInput(format!(
                "Unknown action {} (expected enable, disable, start or stop)",
                s
            ))),
        }
    }
}

impl fmt::Display for HostAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HostAction::Enable => "enable",
            HostAction::Disable => "disable",
            HostAction::Start => "start",
            HostAction::Stop => "stop",
        })
    }
}

/// An on-prem host as returned by `GET /on_prem_hosts`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OnPremHost {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub applications: Vec<HostApplication>,
}

impl OnPremHost {
    fn application(&self, app: AppType) -> Option<&HostApplication> {
        self.applications
            .iter()
            .find(|a| a.application_type == app.code())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HostApplication {
    #[serde(deserialize_with = "string_or_number")]
    pub application_type: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub disabled: String,
    #[serde(default)]
    pub state: Option<ApplicationState>,
}

impl HostApplication {
    fn is_disabled(&self) -> bool {
        self.disabled == FLAG_ON
    }

    fn is_running(&self) -> bool {
        self.state
            .as_ref()
            .and_then(|s| s.current_state.as_deref())
            == Some(FLAG_ON)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApplicationState {
    #[serde(default)]
    pub current_state: Option<String>,
    #[serde(default)]
    pub desired_state: Option<String>,
}

/// Body of `PUT /on_prem_hosts/<id>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostUpdate {
    pub display_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub applications: Vec<ApplicationUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationUpdate {
    pub application_type: String,
    pub disabled: String,
    pub state: DesiredState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesiredState {
    pub desired_state: String,
}

/// Why no update was sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoChange {
    AlreadyEnabled,
    AlreadyDisabled,
    AlreadyStarted,
    AlreadyStopped,
    NotPresent,
    NotEnabled,
}

impl fmt::Display for NoChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoChange::AlreadyEnabled => "app already enabled",
            NoChange::AlreadyDisabled => "app already disabled",
            NoChange::AlreadyStarted => "app already started",
            NoChange::AlreadyStopped => "app already stopped",
            NoChange::NotPresent => "app not present",
            NoChange::NotEnabled => "app not enabled",
        })
    }
}

/// Decision for one action on one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPlan {
    Update(HostUpdate),
    /// Host already in the requested state
    Skip(NoChange),
    /// Action cannot be applied in the host's current state
    Refuse(NoChange),
}

/// Result of acting on a host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    Unchanged(NoChange),
    Refused(NoChange),
    HostNotFound,
}

impl ActionOutcome {
    /// Whether the host now is in the requested state
    pub fn succeeded(&self) -> bool {
        matches!(self, ActionOutcome::Applied | ActionOutcome::Unchanged(_))
    }
}

/// Decide what `action` on `app` requires for `host`
pub fn plan_action(host: &OnPremHost, app: AppType, action: HostAction) -> ActionPlan {
    let current = host.application(app);

    let skip = match (action, current) {
        (HostAction::Enable, Some(a)) if !a.is_disabled() => Some(ActionPlan::Skip(NoChange::AlreadyEnabled)),
        (HostAction::Enable, _) => None,

        (HostAction::Disable, None) => Some(ActionPlan::Skip(NoChange::NotPresent)),
        (HostAction::Disable, Some(a)) if a.is_disabled() => Some(ActionPlan::Skip(NoChange::AlreadyDisabled)),
        (HostAction::Disable, Some(_)) => None,

        (HostAction::Start, None) => Some(ActionPlan::Refuse(NoChange::NotEnabled)),
        (HostAction::Start, Some(a)) if a.is_disabled() => Some(ActionPlan::Refuse(NoChange::NotEnabled)),
        (HostAction::Start, Some(a)) if a.is_running() => Some(ActionPlan::Skip(NoChange::AlreadyStarted)),
        (HostAction::Start, Some(_)) => None,

        (HostAction::Stop, None) => Some(ActionPlan::Skip(NoChange::NotPresent)),
        (HostAction::Stop, Some(a)) if a.is_disabled() => Some(ActionPlan::Skip(NoChange::NotEnabled)),
        (HostAction::Stop, Some(a)) if !a.is_running() => Some(ActionPlan::Skip(NoChange::AlreadyStopped)),
        (HostAction::Stop, Some(_)) => None,
    };
    if let Some(plan) = skip {
        return plan;
    }

    let (disabled, desired_state) = action.target_flags();
    ActionPlan::Update(HostUpdate {
        display_name: host.display_name.clone(),
        applications: vec![ApplicationUpdate {
            application_type: app.code().to_string(),
            disabled: disabled.to_string(),
            state: DesiredState {
                desired_state: desired_state.to_string(),
            },
        }],
    })
}

/// Look up the host and apply `action` to `app` if needed
pub async fn apply_action(
    client: &B1Client,
    selector: &HostSelector,
    app: AppType,
    action: HostAction,
) -> Result<ActionOutcome, B1Error> {
    let Some(host) = client.find_host(selector).await? else {
        return Ok(ActionOutcome::HostNotFound);
    };

    match plan_action(&host, app, action) {
        ActionPlan::Update(update) => {
            client.update_host(&host.id, &update).await?;
            info!(host = %selector, app = %app, "Application {}", action.done());
            Ok(ActionOutcome::Applied)
        }
        ActionPlan::Skip(reason) => Ok(ActionOutcome::Unchanged(reason)),
        ActionPlan::Refuse(reason) => Ok(ActionOutcome::Refused(reason)),
    }
}

/// Look up the host and give it a new display name
pub async fn rename_host(
    client: &B1Client,
    selector: &HostSelector,
    new_name: &str,
) -> Result<ActionOutcome, B1Error> {
    if new_name.trim().is_empty() {
        return Err(B1Error::InvalidInput(
            "new name must be a nonblank string".to_string(),
        ));
    }

    let Some(host) = client.find_host(selector).await? else {
        return Ok(ActionOutcome::HostNotFound);
    };

    let update = HostUpdate {
        display_name: new_name.to_string(),
        applications: Vec::new(),
    };
    client.update_host(&host.id, &update).await?;
    info!(host = %selector, new_name, "Host renamed");
    Ok(ActionOutcome::Applied)
}

/// Accept `"1"` and `1` alike; the API is not consistent about flag types
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Text(String),
        Number(i64),
        Bool(bool),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Text(s) => s,
        Flag::Number(n) => n.to_string(),
        Flag::Bool(b) => (if b { FLAG_ON } else { FLAG_OFF }).to_string(),
    })
}
