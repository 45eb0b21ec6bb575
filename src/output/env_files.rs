//! Per-environment `.env` files and their helpers

use std::borrow::Cow;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub const ALL: [Environment; 3] = [Environment::Dev, Environment::Staging, Environment::Prod];

    pub fn name(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }

    pub fn file_name(&self) -> String {
        format!(".env.{}", self.name())
    }

    fn settings(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Environment::Dev => &[
                ("ENVIRONMENT", "dev"),
                ("DEBUG", "true"),
                ("LOG_LEVEL", "DEBUG"),
            ],
            Environment::Staging => &[
                ("ENVIRONMENT", "staging"),
                ("DEBUG", "false"),
                ("LOG_LEVEL", "INFO"),
                ("USE_CLOUD_SECRETS", "true"),
                ("ENABLE_MONITORING", "true"),
            ],
            Environment::Prod => &[
                ("ENVIRONMENT", "prod"),
                ("DEBUG", "false"),
                ("LOG_LEVEL", "WARNING"),
                ("USE_CLOUD_SECRETS", "true"),
                ("ENABLE_MONITORING", "true"),
                ("ENABLE_ALERTING", "true"),
                ("ENABLE_BACKUP", "true"),
            ],
        }
    }

    fn header(&self) -> &'static str {
        match self {
            Environment::Dev => {
                "# Development environment\n\
                 # Local Docker Compose services. Never commit this file.\n"
            }
            Environment::Staging => {
                "# Staging environment\n\
                 # Values written as ${...} are injected by CI/CD or a secrets manager.\n"
            }
            Environment::Prod => {
                "# Production environment\n\
                 # Secrets must come from a secrets manager, never from this file.\n"
            }
        }
    }
}

const SENSITIVE_SUFFIXES: &[&str] = &["PASSWORD", "SECRET", "KEY", "TOKEN"];

pub fn is_sensitive(key: &str) -> bool {
    SENSITIVE_SUFFIXES.iter().any(|s| key.ends_with(s))
}

fn is_endpoint(key: &str) -> bool {
    key.contains("HOST") || key.contains("ENDPOINT")
}

fn placeholder(key: &str) -> String {
    format!("${{{}}}", key)
}

/// Variables for `env`, derived from the dev values in `base`.
pub fn environment_vars(env: Environment, base: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut vars: BTreeMap<String, String> = base
        .iter()
        .map(|(key, value)| {
            let value = match env {
                Environment::Dev => value.clone(),
                Environment::Staging if is_sensitive(key) || is_endpoint(key) => placeholder(key),
                Environment::Prod if is_sensitive(key) => placeholder(key),
                _ => value.clone(),
            };
            (key.clone(), value)
        })
        .collect();
    for (key, value) in env.settings() {
        vars.insert(key.to_string(), value.to_string());
    }
    vars
}

fn is_placeholder(value: &str) -> bool {
    value.starts_with("${") && value.ends_with('}') && !value[2..value.len() - 1].contains(['$', '{', '}'])
}

fn is_plain(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_-./:,+=@%".contains(c)
}

/// Quotes `value` so that docker compose and `source` both read it verbatim.
/// `${KEY}` placeholders stay unquoted so they are still interpolated.
pub fn quote_value(value: &str) -> Cow<'_, str> {
    if value.is_empty() || is_placeholder(value) || value.chars().all(is_plain) {
        return Cow::Borrowed(value);
    }
    if !value.contains(['\'', '\n']) {
        return Cow::Owned(format!("'{}'", value));
    }
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "$$")
        .replace('\n', "\\n");
    Cow::Owned(format!("\"{}\"", escaped))
}

/// `KEY=VALUE` lines grouped by the key's first segment.
pub fn format_env(vars: &BTreeMap<String, String>, header: &str) -> String {
    let mut grouped: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
    for (key, value) in vars {
        let group = key.split_once('_').map(|(prefix, _)| prefix).unwrap_or("");
        grouped.entry(group).or_default().push((key, value));
    }

    let mut out = String::from(header);
    out.push('\n');
    for (group, entries) in grouped {
        if !group.is_empty() {
            out.push_str(&format!("# {}\n", group));
        }
        for (key, value) in entries {
            out.push_str(&format!("{}={}\n", key, quote_value(value)));
        }
        out.push('\n');
    }
    out
}

/// `.env.dev`, `.env.staging`, `.env.prod` and `.env.example`, in that order.
pub fn env_files(base: &BTreeMap<String, String>) -> Vec<(String, String)> {
    let mut files: Vec<(String, String)> = Environment::ALL
        .iter()
        .map(|env| (env.file_name(), format_env(&environment_vars(*env, base), env.header())))
        .collect();

    let example: BTreeMap<String, String> = base
        .iter()
        .map(|(k, v)| {
            let value = if is_sensitive(k) { "CHANGE_ME".to_string() } else { v.clone() };
            (k.clone(), value)
        })
        .collect();
    files.push((
        ".env.example".to_string(),
        format_env(
            &example,
            "# Environment template\n# Copy to .env.dev, .env.staging or .env.prod and fill in the values.\n",
        ),
    ));
    files
}

pub const SWITCH_ENV_SCRIPT: &str = r#"#!/bin/bash
# Switches the active .env between dev, staging and prod
set -e

ENVIRONMENTS=("dev" "staging" "prod")

if [ $# -eq 0 ]; then
    echo "Usage: $0 <dev|staging|prod>"
    exit 1
fi

ENV=$1
if [[ ! " ${ENVIRONMENTS[@]} " =~ " ${ENV} " ]]; then
    echo "Invalid environment: $ENV"
    exit 1
fi

if [ ! -f ".env.$ENV" ]; then
    echo "Environment file not found: .env.$ENV"
    exit 1
fi

if [ -f ".env" ]; then
    cp .env .env.backup
fi

cp ".env.$ENV" .env
echo "Switched to $ENV. Restart services with: docker-compose down && docker-compose up -d"
"#;

pub const GITIGNORE: &str = "# Environment files\n\
.env\n\
.env.dev\n\
.env.staging\n\
.env.prod\n\
.env.local\n\
.env.backup\n\
!.env.example\n\
\n\
# Python\n\
__pycache__/\n\
*.pyc\n\
.venv/\n\
\n\
# Tool state\n\
dbt_project/target/\n\
dbt_project/logs/\n\
.terraform/\n\
*.tfstate\n\
*.tfstate.backup\n\
secrets/\n";

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("POSTGRES_HOST".to_string(), "postgres".to_string()),
            ("POSTGRES_PASSWORD".to_string(), "s3cret".to_string()),
            ("POSTGRES_PORT".to_string(), "5432".to_string()),
            ("AIRFLOW_FERNET_KEY".to_string(), "abcd".to_string()),
        ])
    }

    #[test]
    fn test_is_sensitive() {
        assert!(is_sensitive("POSTGRES_PASSWORD"));
        assert!(is_sensitive("AIRFLOW_FERNET_KEY"));
        assert!(!is_sensitive("POSTGRES_PORT"));
    }

    #[test]
    fn test_dev_keeps_real_values() {
        let vars = environment_vars(Environment::Dev, &base());
        assert_eq!(vars["POSTGRES_PASSWORD"], "s3cret");
        assert_eq!(vars["POSTGRES_HOST"], "postgres");
        assert_eq!(vars["ENVIRONMENT"], "dev");
    }

    #[test]
    fn test_staging_and_prod_use_placeholders() {
        let staging = environment_vars(Environment::Staging, &base());
        assert_eq!(staging["POSTGRES_HOST"], "${POSTGRES_HOST}");
        assert_eq!(staging["POSTGRES_PASSWORD"], "${POSTGRES_PASSWORD}");
        assert_eq!(staging["POSTGRES_PORT"], "5432");

        let prod = environment_vars(Environment::Prod, &base());
        assert_eq!(prod["POSTGRES_HOST"], "postgres");
        assert_eq!(prod["AIRFLOW_FERNET_KEY"], "${AIRFLOW_FERNET_KEY}");
        assert_eq!(prod["ENABLE_ALERTING"], "true");
    }

    #[test]
    fn test_example_masks_secrets() {
        let files = env_files(&base());
        let names: Vec<&str> = files.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec![".env.dev", ".env.staging", ".env.prod", ".env.example"]);

        let example = &files[3].1;
        assert!(example.contains("POSTGRES_PASSWORD=CHANGE_ME\n"));
        assert!(example.contains("POSTGRES_PORT=5432\n"));
        assert!(!example.contains("s3cret"));
    }

    #[test]
    fn test_values_with_special_characters_are_quoted() {
        assert_eq!(quote_value("postgres"), "postgres");
        assert_eq!(quote_value("${POSTGRES_PASSWORD}"), "${POSTGRES_PASSWORD}");
        assert_eq!(quote_value("a@b%c$d#e"), "'a@b%c$d#e'");
        assert_eq!(quote_value("it's $HOME"), "\"it's $$HOME\"");
        assert_eq!(quote_value("line1\nline2"), "\"line1\\nline2\"");

        let vars = BTreeMap::from([("POSTGRES_PASSWORD".to_string(), "x$Y#z".to_string())]);
        let text = format_env(&vars, "# header\n");
        assert!(text.contains("POSTGRES_PASSWORD='x$Y#z'\n"));
    }

    #[test]
    fn test_format_groups_by_prefix() {
        let text = format_env(&base(), "# header\n");
        assert!(text.starts_with("# header\n"));
        let airflow = text.find("# AIRFLOW").unwrap();
        let postgres = text.find("# POSTGRES").unwrap();
        assert!(airflow < postgres);
        assert!(text.contains("POSTGRES_HOST=postgres\n"));
    }
}
