use crate::error::{CheckError, Result};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

/// A decoded GitHub Actions workflow. Only the fields the checks read are
/// declared; everything else in the file is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowDocument {
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default, deserialize_with = "lenient")]
    pub defaults: Option<Defaults>,
    #[serde(default, deserialize_with = "job_map")]
    pub jobs: IndexMap<String, Job>,
}

/// One entry under `jobs:`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Job {
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default, deserialize_with = "lenient")]
    pub defaults: Option<Defaults>,
    #[serde(default, deserialize_with = "lenient_steps")]
    pub steps: Vec<Step>,
}

impl Job {
    /// The job's declared name, falling back to its id.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => id,
        }
    }

    pub fn default_shell(&self) -> Option<&str> {
        self.defaults.as_ref().and_then(Defaults::run_shell)
    }
}

/// A single step of a job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Step {
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub uses: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub shell: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub run: Option<String>,
}

/// `defaults:` at workflow or job scope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Defaults {
    #[serde(default, deserialize_with = "lenient")]
    pub run: Option<RunDefaults>,
}

impl Defaults {
    pub fn run_shell(&self) -> Option<&str> {
        self.run
            .as_ref()
            .and_then(|r| r.shell.as_deref())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunDefaults {
    #[serde(default, deserialize_with = "scalar_string")]
    pub shell: Option<String>,
}

/// A `permissions:` declaration, at workflow or job scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Permissions {
    /// No `permissions` key at all.
    #[default]
    Absent,
    /// `permissions:` with a null or empty-string value.
    Empty,
    /// A bulk level such as `read-all` or `write-all`.
    Level(String),
    /// Per-scope entries, e.g. `contents: read`.
    Map(IndexMap<String, String>),
}

impl TryFrom<Value> for Permissions {
    type Error = String;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Permissions::Empty),
            Value::String(s) if s.is_empty() => Ok(Permissions::Empty),
            Value::String(s) => Ok(Permissions::Level(s)),
            Value::Mapping(mapping) => {
                let mut entries = IndexMap::new();
                for (key, value) in mapping {
                    match (key, value) {
                        (Value::String(key), Value::String(value)) => {
                            entries.insert(key, value);
                        }
                        (Value::String(key), _) => {
                            return Err(format!("permission '{}' has a non-string value", key));
                        }
                        (key, _) => {
                            return Err(format!("permission name {:?} is not a string", key));
                        }
                    }
                }
                Ok(Permissions::Map(entries))
            }
            other => Err(format!("permissions must be a string or a mapping, got {:?}", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Permissions::try_from(value).map_err(serde::de::Error::custom)
    }
}

/// Accept any YAML scalar where a string is expected (`name: 1.0` is a
/// valid job name). Collections decode as absent.
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Decode an optional section, treating a malformed one as absent.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_yaml::from_value(value).ok())
}

/// Steps that are not mappings are skipped.
fn lenient_steps<'de, D>(deserializer: D) -> std::result::Result<Vec<Step>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Sequence(items) => items
            .into_iter()
            .filter(Value::is_mapping)
            .filter_map(|item| serde_yaml::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// `jobs` must map each job id to a job object; `jobs:` with no value is
/// an empty map.
fn job_map<'de, D>(deserializer: D) -> std::result::Result<IndexMap<String, Job>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let mapping = match Value::deserialize(deserializer)? {
        Value::Null => return Ok(IndexMap::new()),
        Value::Mapping(mapping) => mapping,
        other => return Err(D::Error::custom(format!("jobs must be a mapping, got {:?}", other))),
    };

    let mut jobs = IndexMap::new();
    for (id, job) in mapping {
        let id = match id {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => return Err(D::Error::custom(format!("job id {:?} is not a string", other))),
        };
        if !job.is_mapping() {
            return Err(D::Error::custom(format!("job '{}' is not a mapping", id)));
        }
        let job = Job::deserialize(job).map_err(D::Error::custom)?;
        jobs.insert(id, job);
    }
    Ok(jobs)
}

/// Parser for GitHub Actions workflow YAML files.
pub struct GitHubActionsParser;

impl GitHubActionsParser {
    /// Decode raw workflow content. Invalid YAML is reported as
    /// [`CheckError::Yaml`]; valid YAML with an unexpected shape as
    /// [`CheckError::InvalidWorkflow`].
    pub fn parse(content: &[u8], path: &str) -> Result<WorkflowDocument> {
        let yaml: Value = serde_yaml::from_slice(content).map_err(|source| CheckError::Yaml {
            path: path.to_string(),
            source,
        })?;

        serde_yaml::from_value(yaml)
            .map_err(|e| CheckError::invalid_workflow(path, e.to_string()))
    }
}
