use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Driver name whose task config carries a container image.
pub const DOCKER_DRIVER: &str = "docker";

/// Decodes `null` as the field's zero value, like a missing field.
fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Summary row returned by `GET /v1/jobs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JobSummary {
    /// Job identifier.
    #[serde(rename = "ID", deserialize_with = "null_default")]
    pub id: String,
    /// Human readable name.
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    /// Scheduler type (`service`, `batch`, `system`).
    #[serde(rename = "Type", deserialize_with = "null_default")]
    pub job_type: String,
    /// Scheduling priority.
    #[serde(deserialize_with = "null_default")]
    pub priority: i64,
    /// Current status.
    #[serde(deserialize_with = "null_default")]
    pub status: String,
    /// Status details.
    #[serde(deserialize_with = "null_default")]
    pub status_description: String,
    /// Raft index at creation.
    #[serde(deserialize_with = "null_default")]
    pub create_index: u64,
    /// Raft index at last modification.
    #[serde(deserialize_with = "null_default")]
    pub modify_index: u64,
}

/// Full job definition as returned by `GET /v1/job/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Job {
    /// Region the job runs in.
    #[serde(deserialize_with = "null_default")]
    pub region: String,
    /// Job identifier.
    #[serde(rename = "ID", deserialize_with = "null_default")]
    pub id: String,
    /// Human readable name.
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    /// Scheduler type.
    #[serde(rename = "Type", deserialize_with = "null_default")]
    pub job_type: String,
    /// Scheduling priority.
    #[serde(deserialize_with = "null_default")]
    pub priority: i64,
    /// Place all task groups at once or not at all.
    #[serde(deserialize_with = "null_default")]
    pub all_at_once: bool,
    /// Datacenters eligible for placement.
    pub datacenters: Option<Vec<String>>,
    /// Job-level placement constraints.
    pub constraints: Option<Vec<Constraint>>,
    /// Task groups in declaration order.
    pub task_groups: Option<Vec<TaskGroup>>,
    /// Rolling update strategy.
    pub update: Option<UpdateStrategy>,
    /// Periodic launch configuration.
    pub periodic: Option<PeriodicConfig>,
    /// Free-form metadata.
    pub meta: Option<BTreeMap<String, String>>,
    /// Current status.
    #[serde(deserialize_with = "null_default")]
    pub status: String,
    /// Status details.
    #[serde(deserialize_with = "null_default")]
    pub status_description: String,
    /// Raft index at creation.
    #[serde(deserialize_with = "null_default")]
    pub create_index: u64,
    /// Raft index at last modification.
    #[serde(deserialize_with = "null_default")]
    pub modify_index: u64,
}

/// Placement constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Constraint {
    /// Left-hand target, e.g. `${attr.kernel.name}`.
    #[serde(rename = "LTarget", deserialize_with = "null_default")]
    pub l_target: String,
    /// Right-hand target.
    #[serde(rename = "RTarget", deserialize_with = "null_default")]
    pub r_target: String,
    /// Comparison operator.
    #[serde(deserialize_with = "null_default")]
    pub operand: String,
}

/// A countable, co-scheduled set of tasks. `Count` is validated by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TaskGroup {
    /// Group name.
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    /// Number of instances.
    #[serde(deserialize_with = "null_default")]
    pub count: i64,
    /// Group-level constraints.
    pub constraints: Option<Vec<Constraint>>,
    /// How failed tasks are restarted.
    pub restart_policy: Option<RestartPolicy>,
    /// Tasks in declaration order.
    pub tasks: Option<Vec<Task>>,
    /// Free-form metadata.
    pub meta: Option<BTreeMap<String, String>>,
}

/// Restart behaviour for a task group. Durations are nanoseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RestartPolicy {
    /// Window in which `attempts` are counted.
    #[serde(deserialize_with = "null_default")]
    pub interval: i64,
    /// Restarts allowed per interval.
    #[serde(deserialize_with = "null_default")]
    pub attempts: i64,
    /// Wait between restarts.
    #[serde(deserialize_with = "null_default")]
    pub delay: i64,
    /// Restart tasks that exit successfully.
    #[serde(deserialize_with = "null_default")]
    pub restart_on_success: bool,
    /// `delay` or `fail` once attempts are exhausted.
    #[serde(deserialize_with = "null_default")]
    pub mode: String,
}

/// The smallest executable unit, bound to a driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Task {
    /// Task name.
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    /// Execution driver, e.g. `docker`, `exec`, `raw_exec`.
    #[serde(deserialize_with = "null_default")]
    pub driver: String,
    /// Driver-specific configuration.
    pub config: Option<BTreeMap<String, ConfigValue>>,
    /// Environment variables.
    pub env: Option<BTreeMap<String, String>>,
    /// Registered services.
    pub services: Option<Vec<Service>>,
    /// Task-level constraints.
    pub constraints: Option<Vec<Constraint>>,
    /// Resource requirements.
    pub resources: Option<Resources>,
    /// Free-form metadata.
    pub meta: Option<BTreeMap<String, String>>,
    /// Grace period before a kill signal is escalated (ns).
    #[serde(deserialize_with = "null_default")]
    pub kill_timeout: i64,
}

impl Task {
    /// Whether this task runs under the docker driver.
    pub fn is_docker(&self) -> bool {
        self.driver == DOCKER_DRIVER
    }
}

/// Untyped driver configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// JSON `null`.
    Null,
    /// Boolean.
    Bool(bool),
    /// Any JSON number.
    Number(serde_json::Number),
    /// String.
    String(String),
    /// List of values.
    List(Vec<ConfigValue>),
    /// Nested mapping.
    Map(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    /// Borrow the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Null => "null",
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Number(_) => "number",
            ConfigValue::String(_) => "string",
            ConfigValue::List(_) => "list",
            ConfigValue::Map(_) => "map",
        }
    }
}

/// Service registered for a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Service {
    /// Service identifier.
    #[serde(rename = "ID", deserialize_with = "null_default")]
    pub id: String,
    /// Service name.
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    /// Tags.
    pub tags: Option<Vec<String>>,
    /// Port label the service listens on.
    #[serde(deserialize_with = "null_default")]
    pub port_label: String,
    /// Health checks.
    pub checks: Option<Vec<ServiceCheck>>,
}

/// Health check attached to a [`Service`]. Durations are nanoseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceCheck {
    /// Check identifier.
    #[serde(rename = "ID", deserialize_with = "null_default")]
    pub id: String,
    /// Check name.
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    /// `http`, `tcp` or `script`.
    #[serde(rename = "Type", deserialize_with = "null_default")]
    pub check_type: String,
    /// Script to run for `script` checks.
    #[serde(deserialize_with = "null_default")]
    pub script: String,
    /// HTTP path for `http` checks.
    #[serde(deserialize_with = "null_default")]
    pub path: String,
    /// Protocol for `http` checks.
    #[serde(deserialize_with = "null_default")]
    pub protocol: String,
    /// Interval between checks.
    #[serde(deserialize_with = "null_default")]
    pub interval: i64,
    /// Per-check timeout.
    #[serde(deserialize_with = "null_default")]
    pub timeout: i64,
}

/// Resource requirements of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    /// CPU in MHz.
    #[serde(rename = "CPU", deserialize_with = "null_default")]
    pub cpu: i64,
    /// Memory in MB.
    #[serde(rename = "MemoryMB", deserialize_with = "null_default")]
    pub memory_mb: i64,
    /// Disk in MB.
    #[serde(rename = "DiskMB", deserialize_with = "null_default")]
    pub disk_mb: i64,
    /// Disk IOPS.
    #[serde(rename = "IOPS", deserialize_with = "null_default")]
    pub iops: i64,
    /// Network requirements.
    #[serde(rename = "Networks")]
    pub networks: Option<Vec<NetworkResource>>,
}

/// Network requirement of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NetworkResource {
    /// Host device name.
    #[serde(deserialize_with = "null_default")]
    pub device: String,
    /// CIDR block.
    #[serde(rename = "CIDR", deserialize_with = "null_default")]
    pub cidr: String,
    /// IP address.
    #[serde(rename = "IP", deserialize_with = "null_default")]
    pub ip: String,
    /// Bandwidth in Mbit/s.
    #[serde(rename = "MBits", deserialize_with = "null_default")]
    pub mbits: i64,
    /// Statically reserved ports.
    pub reserved_ports: Option<Vec<Port>>,
    /// Dynamically allocated ports.
    pub dynamic_ports: Option<Vec<Port>>,
    /// Whether the network is public.
    #[serde(deserialize_with = "null_default")]
    pub public: bool,
}

/// Labelled port.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Port {
    /// Port label.
    #[serde(deserialize_with = "null_default")]
    pub label: String,
    /// Port number (0 for dynamic ports before allocation).
    #[serde(deserialize_with = "null_default")]
    pub value: i64,
}

/// Rolling update strategy. `Stagger` is nanoseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UpdateStrategy {
    /// Delay between updates.
    #[serde(deserialize_with = "null_default")]
    pub stagger: i64,
    /// Tasks updated in parallel.
    #[serde(deserialize_with = "null_default")]
    pub max_parallel: i64,
}

/// Periodic launch configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PeriodicConfig {
    /// Whether periodic launches are enabled.
    #[serde(deserialize_with = "null_default")]
    pub enabled: bool,
    /// Schedule expression.
    #[serde(deserialize_with = "null_default")]
    pub spec: String,
    /// Schedule expression type, e.g. `cron`.
    #[serde(deserialize_with = "null_default")]
    pub spec_type: String,
    /// Skip a launch while the previous one is running.
    #[serde(deserialize_with = "null_default")]
    pub prohibit_overlap: bool,
}

/// Body shape accepted by `PUT /v1/job/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncJob {
    /// The wrapped job, if any.
    #[serde(rename = "Job", alias = "job", default)]
    pub job: Option<Job>,
}

impl SyncJob {
    /// Decode a raw job document.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Tasks of every group, in group then task declaration order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.job
            .iter()
            .flat_map(|j| j.task_groups.iter().flatten())
            .flat_map(|tg| tg.tasks.iter().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REDIS_JOB: &str = r#"{
        "Job": {
            "Region": "global",
            "ID": "cache",
            "Name": "cache",
            "Type": "service",
            "Priority": 50,
            "Datacenters": ["dc1"],
            "TaskGroups": [{
                "Name": "cache",
                "Count": 2,
                "RestartPolicy": {"Interval": 60000000000, "Attempts": 10, "Delay": 25000000000, "Mode": "delay"},
                "Tasks": [{
                    "Name": "redis",
                    "Driver": "docker",
                    "Config": {"image": "redis:3.2", "port_map": [{"db": 6379}], "privileged": false},
                    "Resources": {
                        "CPU": 500, "MemoryMB": 256,
                        "Networks": [{"MBits": 10, "DynamicPorts": [{"Label": "db", "Value": 0}]}]
                    },
                    "Services": [{"Name": "redis", "PortLabel": "db", "Checks": null}],
                    "KillTimeout": 5000000000
                }]
            }],
            "Update": {"Stagger": 10000000000, "MaxParallel": 1},
            "SomeFutureField": {"ignored": true}
        }
    }"#;

    #[test]
    fn decodes_scheduler_field_names() {
        let sj = SyncJob::from_json(REDIS_JOB).unwrap();
        let job = sj.job.as_ref().unwrap();
        assert_eq!(job.id, "cache");
        assert_eq!(job.job_type, "service");
        assert_eq!(job.datacenters.as_deref(), Some(&["dc1".to_string()][..]));
        assert_eq!(job.update.as_ref().unwrap().max_parallel, 1);

        let task = sj.tasks().next().unwrap();
        assert!(task.is_docker());
        assert_eq!(task.kill_timeout, 5_000_000_000);
        let res = task.resources.as_ref().unwrap();
        assert_eq!((res.cpu, res.memory_mb), (500, 256));
        let net = &res.networks.as_ref().unwrap()[0];
        assert_eq!(net.mbits, 10);
        assert_eq!(net.dynamic_ports.as_ref().unwrap()[0].label, "db");

        let cfg = task.config.as_ref().unwrap();
        assert_eq!(cfg["image"].as_str(), Some("redis:3.2"));
        assert_eq!(cfg["privileged"], ConfigValue::Bool(false));
        assert_eq!(cfg["port_map"].type_name(), "list");
    }

    #[test]
    fn missing_and_null_fields_take_zero_values() {
        let sj = SyncJob::from_json(r#"{"Job": {"ID": "x", "TaskGroups": null, "Meta": null}}"#).unwrap();
        let job = sj.job.unwrap();
        assert_eq!(job.priority, 0);
        assert!(job.task_groups.is_none());
        assert!(job.meta.is_none());

        assert!(SyncJob::from_json("{}").unwrap().job.is_none());
        assert!(SyncJob::from_json(r#"{"Job": null}"#).unwrap().job.is_none());
    }

    #[test]
    fn null_scalars_decode_as_zero_values() {
        let doc = r#"{"Job": {
            "ID": "x", "Priority": null, "Region": null, "AllAtOnce": null, "CreateIndex": null,
            "TaskGroups": [{"Name": null, "Count": null, "Tasks": [{
                "Name": "t", "Driver": "docker", "KillTimeout": null,
                "Config": {"image": "busybox:1"},
                "Resources": {"CPU": null, "Networks": [{"MBits": null, "Public": null}]}
            }]}]
        }}"#;
        let sj = SyncJob::from_json(doc).unwrap();
        let job = sj.job.as_ref().unwrap();
        assert_eq!((job.priority, job.region.as_str(), job.all_at_once), (0, "", false));

        let group = &job.task_groups.as_ref().unwrap()[0];
        assert_eq!((group.name.as_str(), group.count), ("", 0));
        let task = sj.tasks().next().unwrap();
        assert_eq!(task.kill_timeout, 0);
        assert_eq!(task.resources.as_ref().unwrap().cpu, 0);

        let row: JobSummary =
            serde_json::from_str(r#"{"ID": "web", "Status": null, "ModifyIndex": null}"#).unwrap();
        assert_eq!((row.status.as_str(), row.modify_index), ("", 0));
    }

    #[test]
    fn lowercase_envelope_key_is_accepted() {
        let sj = SyncJob::from_json(r#"{"job": {"ID": "lower"}}"#).unwrap();
        assert_eq!(sj.job.unwrap().id, "lower");
    }

    #[test]
    fn wrong_shape_is_rejected() {
        assert!(SyncJob::from_json("[1, 2]").is_err());
        assert!(SyncJob::from_json(r#"{"Job": {"Priority": "high"}}"#).is_err());
        assert!(SyncJob::from_json("not json").is_err());
    }

    #[test]
    fn summary_serializes_with_scheduler_names() {
        let s = JobSummary { id: "web".into(), job_type: "service".into(), ..Default::default() };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["ID"], "web");
        assert_eq!(v["Type"], "service");
        assert_eq!(v["StatusDescription"], "");
    }
}
