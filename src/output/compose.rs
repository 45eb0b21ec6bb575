//! docker-compose model accumulated across components

use crate::stack::ComponentId;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const COMPOSE_VERSION: &str = "3.8";
/// Label carrying the component that contributed a service.
pub const COMPONENT_LABEL: &str = "com.antigravity.component";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Healthcheck {
    pub test: Vec<String>,
    pub interval: String,
    pub timeout: String,
    pub retries: u32,
}

impl Healthcheck {
    pub fn cmd(args: &[&str]) -> Self {
        let mut test = vec!["CMD".to_string()];
        test.extend(args.iter().map(|a| a.to_string()));
        Self {
            test,
            interval: "10s".to_string(),
            timeout: "5s".to_string(),
            retries: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeService {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<Healthcheck>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
}

impl ComposeService {
    pub fn image(image: impl Into<String>) -> Self {
        Self {
            image: Some(image.into()),
            restart: Some("unless-stopped".to_string()),
            ..Default::default()
        }
    }

    /// Built from a local context instead of a published image.
    pub fn build(context: impl Into<String>) -> Self {
        Self {
            build: Some(context.into()),
            restart: Some("unless-stopped".to_string()),
            ..Default::default()
        }
    }

    pub fn container(mut self, name: impl Into<String>) -> Self {
        self.container_name = Some(name.into());
        self
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Runs once instead of being kept alive.
    pub fn oneshot(mut self) -> Self {
        self.restart = Some("no".to_string());
        self
    }

    pub fn port(mut self, host: u16, container: u16) -> Self {
        self.ports.push(format!("{}:{}", host, container));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn volume(mut self, spec: impl Into<String>) -> Self {
        self.volumes.push(spec.into());
        self
    }

    pub fn depends_on(mut self, service: impl Into<String>) -> Self {
        let service = service.into();
        if !self.depends_on.contains(&service) {
            self.depends_on.push(service);
        }
        self
    }

    pub fn healthcheck(mut self, check: Healthcheck) -> Self {
        self.healthcheck = Some(check);
        self
    }

    pub fn owner(&self) -> Option<&str> {
        self.labels.get(COMPONENT_LABEL).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpec {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub driver: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeFile {
    pub version: String,
    pub services: IndexMap<String, ComposeService>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub volumes: IndexMap<String, VolumeSpec>,
    pub networks: IndexMap<String, NetworkSpec>,
    #[serde(skip)]
    network: String,
}

impl ComposeFile {
    pub fn new(network: impl Into<String>) -> Self {
        let network = network.into();
        let mut networks = IndexMap::new();
        networks.insert(
            network.clone(),
            NetworkSpec {
                driver: "bridge".to_string(),
            },
        );
        Self {
            version: COMPOSE_VERSION.to_string(),
            services: IndexMap::new(),
            volumes: IndexMap::new(),
            networks,
            network,
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// Adds services contributed by `owner`, attaching the shared network
    /// and the owner label. Returns the names that replaced a service from
    /// another component.
    pub fn add_services(
        &mut self,
        owner: &ComponentId,
        services: IndexMap<String, ComposeService>,
    ) -> Vec<String> {
        let owner_label = owner.to_string();
        let mut replaced = Vec::new();

        for (name, mut service) in services {
            if !service.networks.contains(&self.network) {
                service.networks.push(self.network.clone());
            }
            service
                .labels
                .insert(COMPONENT_LABEL.to_string(), owner_label.clone());

            if let Some(previous) = self.services.insert(name.clone(), service) {
                if previous.owner() != Some(owner_label.as_str()) {
                    replaced.push(name);
                }
            }
        }
        replaced
    }

    pub fn add_volumes<I: IntoIterator<Item = String>>(&mut self, volumes: I) {
        for volume in volumes {
            self.volumes.entry(volume).or_default();
        }
    }

    /// Service names contributed by `owner`.
    pub fn services_of(&self, owner: &ComponentId) -> Vec<&str> {
        let label = owner.to_string();
        self.services
            .iter()
            .filter(|(_, s)| s.owner() == Some(label.as_str()))
            .map(|(n, _)| n.as_str())
            .collect()
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to render docker-compose.yml")
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut file: ComposeFile =
            serde_yaml::from_str(content).context("Failed to parse docker-compose.yml")?;
        if let Some(name) = file.networks.keys().next() {
            file.network = name.clone();
        }
        Ok(file)
    }
}
